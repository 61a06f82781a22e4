//! Identity-bearing property maps.
//!
//! An [`Object`] is the plain, untracked value that reactive proxies wrap. Two
//! handles are "the same object" iff they point at the same allocation; the
//! [`ObjectId`] gives that identity a hashable, index-based form so the
//! subscriber registry and proxy memo never keep an object alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::reactivity::runtime;
use crate::value::Value;

// =============================================================================
// ObjectId
// =============================================================================

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`Object`].
///
/// # Memory Layout
///
/// - 8 bytes (u64)
/// - Copy, no heap allocation
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 representation
    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

// =============================================================================
// Properties
// =============================================================================

/// Keyed read/write access shared by objects and the views over them.
pub trait Properties {
    /// Read `key`, yielding `Value::Null` when absent.
    fn get(&self, key: &str) -> Value;

    /// Write `key`. Returns `true` when the write is reported successful,
    /// which includes writes a read-only view silently suppressed.
    fn set(&self, key: &str, value: impl Into<Value>) -> bool;
}

// =============================================================================
// Object
// =============================================================================

struct ObjectInner {
    id: ObjectId,
    fields: RefCell<FxHashMap<CompactString, Value>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        runtime::forget_target(self.id);
    }
}

/// Reference-counted property map with identity semantics.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    /// Create an empty object.
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            id: ObjectId::next(),
            fields: RefCell::new(FxHashMap::default()),
        }))
    }

    /// Identity of this object.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Whether both handles refer to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Check if a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.0.fields.borrow().contains_key(key)
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.fields.borrow_mut().remove(key)
    }

    /// Keys currently present, sorted for deterministic iteration.
    pub fn keys(&self) -> Vec<CompactString> {
        let mut keys: Vec<_> = self.0.fields.borrow().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    /// Check if the object has no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace every field with `entries`.
    pub fn replace_all<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<CompactString>,
        V: Into<Value>,
    {
        let fresh: FxHashMap<CompactString, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        // Old values drop after the borrow is released.
        let _old = self.0.fields.replace(fresh);
    }
}

impl Properties for Object {
    fn get(&self, key: &str) -> Value {
        self.0.fields.borrow().get(key).cloned().unwrap_or_default()
    }

    fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let _old = self
            .0
            .fields
            .borrow_mut()
            .insert(CompactString::from(key), value.into());
        true
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Object
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let obj = Object::new();
        obj.replace_all(iter);
        obj
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.0.id)
            .field("keys", &self.keys())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_operations() {
        let obj = Object::new();
        assert!(obj.is_empty());

        obj.set("a", 1);
        obj.set("b", "two");
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.get("a"), Value::from(1));
        assert!(obj.get("missing").is_null());

        obj.set("a", 3);
        assert_eq!(obj.get("a"), Value::from(3));
        assert_eq!(obj.keys(), vec!["a", "b"]);

        assert_eq!(obj.remove("b"), Some(Value::from("two")));
        assert!(!obj.has("b"));
    }

    #[test]
    fn test_identity() {
        let a: Object = [("x", 1)].into_iter().collect();
        let b: Object = [("x", 1)].into_iter().collect();
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_ne!(a.id(), b.id());
    }
}
