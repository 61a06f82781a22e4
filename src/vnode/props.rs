//! Property lists for tree descriptions
//!
//! Same shape as HTML attribute lists: ordered `(name, value)` pairs, with an
//! extension trait for keyed access. Values are dynamic so the same list can
//! feed host properties and component inputs.

use compact_str::CompactString;

use crate::object::{Object, Properties};
use crate::value::Value;

/// Ordered key-value properties of a VNode.
pub type Props = Vec<(CompactString, Value)>;

/// Extension trait for property operations on Props
pub trait PropsExt {
    /// Get a property value by name
    fn get_prop(&self, name: &str) -> Option<&Value>;

    /// Check if a property exists
    fn has_prop(&self, name: &str) -> bool;

    /// Set a property value (insert or update)
    fn set_prop(&mut self, name: impl Into<CompactString>, value: impl Into<Value>);

    /// Remove a property by name, returning the old value if present
    fn remove_prop(&mut self, name: &str) -> Option<Value>;

    /// Copy the properties into a fresh object
    fn to_object(&self) -> Object;
}

impl PropsExt for Props {
    fn get_prop(&self, name: &str) -> Option<&Value> {
        self.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    fn has_prop(&self, name: &str) -> bool {
        self.iter().any(|(k, _)| k == name)
    }

    fn set_prop(&mut self, name: impl Into<CompactString>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(prop) = self.iter_mut().find(|(k, _)| k == &name) {
            prop.1 = value;
        } else {
            self.push((name, value));
        }
    }

    fn remove_prop(&mut self, name: &str) -> Option<Value> {
        self.iter()
            .position(|(k, _)| k == name)
            .map(|pos| self.remove(pos).1)
    }

    fn to_object(&self) -> Object {
        let obj = Object::new();
        for (k, v) in self {
            obj.set(k, v.clone());
        }
        obj
    }
}

/// Build a `Props` list from `(name, value)` pairs. A repeated name keeps
/// its first position and its last value.
pub fn props<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Props
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    let mut out = Props::new();
    for (k, v) in entries {
        out.set_prop(k, v);
    }
    out
}

/// Shallow equality: same key set, strictly equal values.
pub fn props_shallow_equal(a: &Props, b: &Props) -> bool {
    let covers = |x: &Props, y: &Props| {
        x.iter()
            .all(|(k, v)| y.get_prop(k).is_some_and(|other| other.same(v)))
    };
    a.len() == b.len() && covers(a, b) && covers(b, a)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props_operations() {
        let mut p: Props = Vec::new();

        // Set
        p.set_prop("id", "main");
        p.set_prop("count", 2);
        assert_eq!(p.len(), 2);

        // Get
        assert_eq!(p.get_prop("id"), Some(&Value::from("main")));
        assert_eq!(p.get_prop("href"), None);

        // Has
        assert!(p.has_prop("count"));
        assert!(!p.has_prop("href"));

        // Update existing
        p.set_prop("count", 3);
        assert_eq!(p.get_prop("count"), Some(&Value::from(3)));
        assert_eq!(p.len(), 2);

        // Remove
        assert_eq!(p.remove_prop("id"), Some(Value::from("main")));
        assert!(!p.has_prop("id"));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_shallow_equal() {
        let shared = Object::new();
        let a = props([("x", Value::from(1)), ("o", Value::from(shared.clone()))]);
        let b = props([("o", Value::from(shared)), ("x", Value::from(1))]);
        assert!(props_shallow_equal(&a, &b));

        let c = props([("x", Value::from(1)), ("o", Value::from(Object::new()))]);
        assert!(!props_shallow_equal(&a, &c));

        let d = props([("x", 1)]);
        assert!(!props_shallow_equal(&a, &d));
    }

    #[test]
    fn test_duplicate_names() {
        let dup = props([("a", 1), ("a", 3)]);
        assert_eq!(dup, vec![(CompactString::from("a"), Value::from(3))]);

        // Raw lists bypass the builder; equality still checks both sides.
        let raw: Props = vec![("a".into(), Value::from(1)), ("a".into(), Value::from(1))];
        let other = props([("a", 1), ("b", 2)]);
        assert!(!props_shallow_equal(&raw, &other));
        assert!(!props_shallow_equal(&other, &raw));
    }

    #[test]
    fn test_to_object() {
        let p = props([("a", 1), ("b", 2)]);
        let obj = p.to_object();
        assert_eq!(obj.get("b"), Value::from(2));
        assert_eq!(obj.len(), 2);
    }
}
