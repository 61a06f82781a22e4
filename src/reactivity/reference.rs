//! Boxed reactive values.
//!
//! A [`Ref`] is a single mutable cell with its own dependency set. Writes of
//! a value strictly equal to the last raw value are skipped; this is the only
//! place the core suppresses same-value notifications. Object values are
//! stored behind a mutable proxy, while the raw object is kept separately for
//! the equality check.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::object::{Object, Properties};
use crate::value::Value;

use super::dep::DepId;
use super::effect::{track_dep, trigger_dep};
use super::proxy::reactive;
use super::runtime;

struct RefInner {
    value: RefCell<Value>,
    raw: RefCell<Value>,
    dep: DepId,
}

impl Drop for RefInner {
    fn drop(&mut self) {
        runtime::release_dep(self.dep);
    }
}

/// Single-value reactive cell. Cloning shares the cell.
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

/// Create a ref holding `value`.
pub fn new_ref(value: impl Into<Value>) -> Ref {
    Ref::new(value)
}

/// Object values are stored as their mutable proxy.
fn to_stored(raw: &Value) -> Value {
    match raw {
        Value::Object(o) => Value::Reactive(reactive(o)),
        other => other.clone(),
    }
}

impl Ref {
    /// Create a ref holding `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        let raw = value.into();
        Self(Rc::new(RefInner {
            value: RefCell::new(to_stored(&raw)),
            raw: RefCell::new(raw),
            dep: runtime::alloc_dep(),
        }))
    }

    /// Read the value, subscribing the current computation.
    pub fn get(&self) -> Value {
        track_dep(self.0.dep);
        self.get_untracked()
    }

    /// Read the value without subscribing.
    pub fn get_untracked(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Write the value. Returns `false` if it equals the last raw value and
    /// the write was skipped.
    pub fn set(&self, value: impl Into<Value>) -> bool {
        let raw = value.into();
        if self.0.raw.borrow().same(&raw) {
            return false;
        }
        let stored = to_stored(&raw);
        // Previous values drop after their borrows are released.
        let _old_raw = self.0.raw.replace(raw);
        let _old_value = self.0.value.replace(stored);
        trigger_dep(self.0.dep);
        true
    }

    /// Whether both handles refer to the same cell.
    #[inline]
    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of computations subscribed to this ref.
    pub fn subscriber_count(&self) -> usize {
        runtime::subscriber_count(self.0.dep)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&*self.0.value.borrow()).finish()
    }
}

/// Whether `value` is a ref.
#[inline]
pub fn is_ref(value: &Value) -> bool {
    value.is_ref()
}

/// The ref's value if `value` is a ref, otherwise `value` itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

// =============================================================================
// ProxyRefs
// =============================================================================

/// View that unwraps ref-valued properties on read and writes through them.
///
/// Lets render code treat `state.count` uniformly whether `count` holds a
/// plain value or a ref.
#[derive(Debug, Clone)]
pub struct ProxyRefs<T: Properties = Object> {
    target: T,
}

/// Wrap `target` in a ref-unwrapping view.
pub fn proxy_refs<T: Properties>(target: T) -> ProxyRefs<T> {
    ProxyRefs { target }
}

impl<T: Properties> ProxyRefs<T> {
    /// The wrapped target.
    pub fn target(&self) -> &T {
        &self.target
    }
}

impl<T: Properties> Properties for ProxyRefs<T> {
    fn get(&self, key: &str) -> Value {
        unref(&self.target.get(key))
    }

    fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        match self.target.get(key) {
            Value::Ref(existing) if !value.is_ref() => {
                existing.set(value);
                true
            }
            _ => self.target.set(key, value),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::reactivity::effect::effect;
    use crate::reactivity::proxy::is_reactive;

    fn watch(r: &Ref) -> (Rc<Cell<u32>>, crate::reactivity::Effect) {
        let runs = Rc::new(Cell::new(0));
        let (cell, count) = (r.clone(), runs.clone());
        let e = effect(move || {
            let _ = cell.get();
            count.set(count.get() + 1);
        });
        (runs, e)
    }

    #[test]
    fn test_equal_write_is_skipped() {
        let r = Ref::new(5);
        let (runs, _e) = watch(&r);

        assert!(!r.set(5));
        assert_eq!(runs.get(), 1);

        assert!(r.set(6));
        assert_eq!(runs.get(), 2);
        assert_eq!(r.get(), Value::from(6));
    }

    #[test]
    fn test_object_values_are_wrapped() {
        let origin = Object::new();
        origin.set("n", 1);
        let r = Ref::new(origin.clone());

        let stored = r.get();
        assert!(is_reactive(&stored));
        assert!(stored.as_reactive().is_some_and(|p| p.ptr_eq(&reactive(&origin))));

        // Equality uses the raw object, not its proxy.
        let (runs, _e) = watch(&r);
        assert!(!r.set(origin.clone()));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_nested_object_through_ref_is_tracked() {
        let origin = Object::new();
        origin.set("n", 1);
        let r = Ref::new(origin);
        let seen = Rc::new(Cell::new(0.0));
        let (cell, s) = (r.clone(), seen.clone());
        let _e = effect(move || {
            if let Value::Reactive(p) = cell.get() {
                s.set(p.get("n").as_number().copied().unwrap_or_default());
            }
        });

        if let Value::Reactive(p) = r.get() {
            p.set("n", 7);
        }
        assert_eq!(seen.get(), 7.0);
    }

    #[test]
    fn test_unref() {
        let r = Ref::new("hi");
        assert_eq!(unref(&Value::from(r.clone())), Value::from("hi"));
        assert_eq!(unref(&Value::from(3)), Value::from(3));
        assert!(is_ref(&Value::from(r)));
        assert!(!is_ref(&Value::Null));
    }

    #[test]
    fn test_proxy_refs_unwraps_and_writes_through() {
        let count = Ref::new(1);
        let state = Object::new();
        state.set("count", count.clone());
        state.set("label", "x");

        let view = proxy_refs(state.clone());
        assert_eq!(view.get("count"), Value::from(1));
        assert_eq!(view.get("label"), Value::from("x"));

        // Writing a plain value goes into the existing ref.
        view.set("count", 2);
        assert_eq!(count.get(), Value::from(2));
        assert!(state.get("count").as_ref_cell().is_some_and(|r| r.ptr_eq(&count)));

        // Writing a ref replaces the property.
        let other = Ref::new(10);
        view.set("count", other.clone());
        assert!(state.get("count").as_ref_cell().is_some_and(|r| r.ptr_eq(&other)));
        assert_eq!(view.get("count"), Value::from(10));
    }

    #[test]
    fn test_reads_outside_effects_do_not_subscribe() {
        let r = Ref::new(1);
        let _ = r.get();
        assert_eq!(r.subscriber_count(), 0);

        let (_runs, e) = watch(&r);
        assert_eq!(r.subscriber_count(), 1);
        e.stop();
        assert_eq!(r.subscriber_count(), 0);
    }
}
