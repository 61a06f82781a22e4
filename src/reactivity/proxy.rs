//! Reactive proxy layer.
//!
//! A [`Reactive`] is an explicit accessor wrapper over an [`Object`]: reads go
//! through [`Properties::get`] (which tracks), writes through
//! [`Properties::set`] (which triggers). Three modes exist:
//!
//! | Mode | Tracks reads | Nested objects | Writes |
//! |------|--------------|----------------|--------|
//! | `Mutable` | yes | wrapped mutable | forwarded, then trigger |
//! | `Readonly` | no | wrapped readonly | suppressed with a warning |
//! | `ShallowReadonly` | no | returned as-is | suppressed with a warning |
//!
//! Wrapping is memoized per `(object, mode)`, so wrapping the same object
//! twice in the same mode yields the same proxy identity.

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::error::{ReactiveError, ReactiveResult};
use crate::object::{Object, Properties};
use crate::value::Value;

use super::effect::{track, trigger};
use super::runtime::with_runtime;

/// Introspection keys answered by every proxy without touching its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveFlag {
    /// `true` for mutable proxies
    IsReactive,
    /// `true` for read-only proxies
    IsReadonly,
}

impl ReactiveFlag {
    /// The property key that reads this flag.
    pub const fn key(self) -> &'static str {
        match self {
            Self::IsReactive => "__v_isReactive",
            Self::IsReadonly => "__v_isReadonly",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "__v_isReactive" => Some(Self::IsReactive),
            "__v_isReadonly" => Some(Self::IsReadonly),
            _ => None,
        }
    }
}

/// Trap configuration of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyMode {
    /// Tracked reads, triggering writes
    Mutable,
    /// Untracked reads, deep read-only wrapping, suppressed writes
    Readonly,
    /// Untracked reads, no nested wrapping, suppressed writes
    ShallowReadonly,
}

impl ProxyMode {
    pub(crate) const ALL: [ProxyMode; 3] =
        [ProxyMode::Mutable, ProxyMode::Readonly, ProxyMode::ShallowReadonly];

    /// Build a mode from the two trap switches.
    pub const fn from_flags(readonly: bool, shallow: bool) -> Self {
        match (readonly, shallow) {
            (false, _) => Self::Mutable,
            (true, false) => Self::Readonly,
            (true, true) => Self::ShallowReadonly,
        }
    }

    #[inline]
    pub const fn is_readonly(self) -> bool {
        !matches!(self, Self::Mutable)
    }

    #[inline]
    pub const fn is_shallow(self) -> bool {
        matches!(self, Self::ShallowReadonly)
    }

    pub(crate) const fn slot(self) -> usize {
        match self {
            Self::Mutable => 0,
            Self::Readonly => 1,
            Self::ShallowReadonly => 2,
        }
    }
}

// =============================================================================
// Reactive
// =============================================================================

pub(crate) struct ProxyInner {
    target: Object,
    mode: ProxyMode,
}

/// Proxy view over an [`Object`].
#[derive(Clone)]
pub struct Reactive(Rc<ProxyInner>);

/// Wrap `origin` as a mutable reactive proxy.
pub fn reactive(origin: &Object) -> Reactive {
    create_proxy(origin, ProxyMode::Mutable)
}

/// Wrap `origin` as a deep read-only proxy.
pub fn readonly(origin: &Object) -> Reactive {
    create_proxy(origin, ProxyMode::Readonly)
}

/// Wrap `origin` as a read-only proxy that leaves nested objects unwrapped.
pub fn shallow_readonly(origin: &Object) -> Reactive {
    create_proxy(origin, ProxyMode::ShallowReadonly)
}

/// Memoized proxy construction.
fn create_proxy(origin: &Object, mode: ProxyMode) -> Reactive {
    let cached = with_runtime(|rt| {
        rt.proxies.borrow()[mode.slot()]
            .get(&origin.id())
            .and_then(Weak::upgrade)
    });
    if let Some(inner) = cached {
        return Reactive(inner);
    }

    let proxy = Reactive(Rc::new(ProxyInner { target: origin.clone(), mode }));
    let replaced = with_runtime(|rt| {
        rt.proxies.borrow_mut()[mode.slot()].insert(origin.id(), Rc::downgrade(&proxy.0))
    });
    drop(replaced);
    proxy
}

impl Reactive {
    /// The wrapped object.
    #[inline]
    pub fn raw(&self) -> &Object {
        &self.0.target
    }

    /// Trap configuration of this proxy.
    #[inline]
    pub fn mode(&self) -> ProxyMode {
        self.0.mode
    }

    /// Whether both handles are the same proxy.
    #[inline]
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Write `key`, reporting a suppressed read-only write as an error.
    pub fn try_set(&self, key: &str, value: impl Into<Value>) -> ReactiveResult<()> {
        if self.0.mode.is_readonly() {
            return Err(ReactiveError::readonly(key));
        }
        self.0.target.set(key, value);
        trigger(self.0.target.id(), key);
        Ok(())
    }

    /// Wrap a nested value the way this proxy's mode requires.
    fn wrap_nested(&self, value: Value) -> Value {
        if self.0.mode.is_shallow() {
            return value;
        }
        match value.raw_object() {
            Some(obj) => Value::Reactive(create_proxy(obj, self.0.mode)),
            None => value,
        }
    }
}

impl Properties for Reactive {
    fn get(&self, key: &str) -> Value {
        if let Some(flag) = ReactiveFlag::from_key(key) {
            let readonly = self.0.mode.is_readonly();
            return Value::Bool(match flag {
                ReactiveFlag::IsReactive => !readonly,
                ReactiveFlag::IsReadonly => readonly,
            });
        }

        let res = self.0.target.get(key);
        if res.raw_object().is_some() {
            return self.wrap_nested(res);
        }
        if !self.0.mode.is_readonly() {
            track(self.0.target.id(), key);
        }
        res
    }

    fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        if let Err(err) = self.try_set(key, value) {
            warn!(error = %err, "write suppressed");
        }
        true
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("mode", &self.0.mode)
            .field("target", &self.0.target)
            .finish()
    }
}

// =============================================================================
// Introspection
// =============================================================================

fn read_flag(value: &Value, flag: ReactiveFlag) -> bool {
    match value {
        Value::Reactive(r) => r.get(flag.key()).is_truthy(),
        Value::Object(o) => o.get(flag.key()).is_truthy(),
        _ => false,
    }
}

/// Whether `value` is a mutable reactive proxy.
pub fn is_reactive(value: &Value) -> bool {
    read_flag(value, ReactiveFlag::IsReactive)
}

/// Whether `value` is a read-only proxy.
pub fn is_readonly(value: &Value) -> bool {
    read_flag(value, ReactiveFlag::IsReadonly)
}

/// Whether `value` is any kind of proxy.
pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// The plain object behind a value, looking through proxies.
pub fn to_raw(value: &Value) -> Value {
    match value {
        Value::Reactive(r) => Value::Object(r.raw().clone()),
        other => other.clone(),
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

    fn obj(entries: &[(&str, i32)]) -> Object {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_read_then_write_reruns_once() {
        let state = reactive(&obj(&[("count", 0)]));
        let runs = Rc::new(Cell::new(0));
        let (s, r) = (state.clone(), runs.clone());
        let _e = effect(move || {
            let _ = s.get("count");
            r.set(r.get() + 1);
        });

        state.set("count", 1);
        assert_eq!(runs.get(), 2);
        assert_eq!(state.get("count"), Value::from(1));
    }

    #[test]
    fn test_same_value_write_still_triggers() {
        let state = reactive(&obj(&[("count", 0)]));
        let runs = Rc::new(Cell::new(0));
        let (s, r) = (state.clone(), runs.clone());
        let _e = effect(move || {
            let _ = s.get("count");
            r.set(r.get() + 1);
        });

        state.set("count", 0);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_memoized_identity() {
        let origin = obj(&[("a", 1)]);
        assert!(reactive(&origin).ptr_eq(&reactive(&origin)));
        assert!(readonly(&origin).ptr_eq(&readonly(&origin)));
        assert!(!reactive(&origin).ptr_eq(&readonly(&origin)));
        assert!(!readonly(&origin).ptr_eq(&shallow_readonly(&origin)));
    }

    #[test]
    fn test_readonly_write_is_suppressed() {
        let origin = obj(&[("a", 1)]);
        let view = readonly(&origin);
        assert!(view.set("a", 2));
        assert_eq!(origin.get("a"), Value::from(1));
        assert_eq!(view.try_set("a", 2), Err(ReactiveError::readonly("a")));
    }

    #[test]
    fn test_nested_wrapping() {
        let inner = obj(&[("x", 1)]);
        let outer = Object::new();
        outer.set("inner", inner.clone());

        let deep = reactive(&outer).get("inner");
        assert!(is_reactive(&deep));
        assert!(deep.as_reactive().is_some_and(|r| r.ptr_eq(&reactive(&inner))));

        let ro = readonly(&outer).get("inner");
        assert!(is_readonly(&ro));
        assert!(!is_reactive(&ro));

        let shallow = shallow_readonly(&outer).get("inner");
        assert!(shallow.is_object());
        assert!(!is_proxy(&shallow));
    }

    #[test]
    fn test_readonly_reads_are_untracked() {
        let origin = obj(&[("a", 1)]);
        let view = readonly(&origin);
        let runs = Rc::new(Cell::new(0));
        let (v, r) = (view.clone(), runs.clone());
        let e = effect(move || {
            let _ = v.get("a");
            r.set(r.get() + 1);
        });
        assert_eq!(e.dep_count(), 0);

        reactive(&origin).set("a", 2);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_introspection() {
        let origin = obj(&[]);
        let plain = Value::from(origin.clone());
        assert!(!is_proxy(&plain));
        assert!(!is_proxy(&Value::from(1)));

        let mutable = Value::from(reactive(&origin));
        assert!(is_reactive(&mutable));
        assert!(!is_readonly(&mutable));
        assert!(is_proxy(&mutable));

        let shallow = Value::from(shallow_readonly(&origin));
        assert!(is_readonly(&shallow));
        assert!(is_proxy(&shallow));

        assert_eq!(to_raw(&mutable), plain);
    }

    #[test]
    fn test_mode_flags() {
        assert_eq!(ProxyMode::from_flags(false, true), ProxyMode::Mutable);
        assert_eq!(ProxyMode::from_flags(true, false), ProxyMode::Readonly);
        assert_eq!(ProxyMode::from_flags(true, true), ProxyMode::ShallowReadonly);
    }
}
