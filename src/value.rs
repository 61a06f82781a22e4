//! Dynamic values stored in reactive objects, refs and element props.
//!
//! `Value` is the currency of the reactive layer: object fields, ref contents
//! and VNode props all hold values. Equality is strict: primitives compare by
//! value, handles (`Object`, `Reactive`, `Ref`) compare by identity.

use std::fmt;

use compact_str::CompactString;

use crate::object::Object;
use crate::reactivity::{Reactive, Ref};

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Number (integral values render without a fraction)
    Number(f64),
    /// String
    Str(CompactString),
    /// Plain, untracked object
    Object(Object),
    /// Proxy view over an object
    Reactive(Reactive),
    /// Single-value reactive cell
    Ref(Ref),
}

impl Value {
    // Generates for each variant (object -> Object, etc.):
    //   - is_xxx(&self) -> bool
    //   - as_xxx(&self) -> Option<&Type>
    impl_enum_accessors!(
        bool: bool,
        number: f64,
        str: CompactString,
        object: Object,
        reactive: Reactive,
    );

    /// Check if this is a Ref value
    #[inline]
    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    /// Try to get as ref reference
    #[inline]
    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Check for `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is object-shaped (a plain object, a proxy or a ref).
    #[inline]
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Reactive(_) | Value::Ref(_))
    }

    /// Truthiness in the usual dynamic-language sense.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Reactive(_) | Value::Ref(_) => true,
        }
    }

    /// The underlying object of a plain object or a proxy.
    pub fn raw_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            Value::Reactive(r) => Some(r.raw()),
            _ => None,
        }
    }

    /// Strict equality: identity for handles, value equality for primitives.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Reactive(a), Value::Reactive(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl_value_from!(Value;
    bool => Bool,
    f64 => Number,
    f32 => Number,
    i32 => Number,
    u32 => Number,
    &str => Str,
    String => Str,
    CompactString => Str,
    Object => Object,
    Reactive => Reactive,
    Ref => Ref,
);

impl From<i64> for Value {
    #[inline]
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(v: usize) -> Self {
        Value::Number(v as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Largest integer an `f64` holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// `n` as an `i64` when it is integral and exactly representable.
pub(crate) fn safe_integer(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then_some(n as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => match safe_integer(*n) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Value::Str(s) => f.write_str(s),
            Value::Object(_) | Value::Reactive(_) => f.write_str("[object Object]"),
            Value::Ref(r) => write!(f, "{}", r.get_untracked()),
        }
    }
}
