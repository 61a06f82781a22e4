//! Accessor generation macros
//!
//! These macros eliminate repetitive match code on the crate's sum types.
//! All macros use `paste` internally for identifier concatenation.

/// Generate is_xxx and as_xxx methods for single-field enum variants
///
/// Uses paste's `:camel` modifier to convert the method name to the variant name.
///
/// # Generated methods per variant:
/// - `is_xxx(&self) -> bool`
/// - `as_xxx(&self) -> Option<&Type>`
///
/// # Example
/// ```ignore
/// impl Value {
///     // object -> Object, reactive -> Reactive
///     impl_enum_accessors!(object: Object, reactive: Reactive);
/// }
/// ```
#[macro_export]
macro_rules! impl_enum_accessors {
    ($($variant:ident : $ty:ty),* $(,)?) => {
        ::paste::paste! {
            $(
                #[doc = "Check if this is a " [<$variant:camel>] " value"]
                #[inline]
                pub fn [<is_ $variant>](&self) -> bool {
                    matches!(self, Self::[<$variant:camel>](_))
                }

                #[doc = "Try to get as " $variant " reference"]
                #[inline]
                pub fn [<as_ $variant>](&self) -> Option<&$ty> {
                    match self { Self::[<$variant:camel>](v) => Some(v), _ => None }
                }
            )*
        }
    };
}

/// Generate `From` conversions into an enum for each `(source type => variant)` pair
///
/// # Example
/// ```ignore
/// impl_value_from!(Value; bool => Bool, f64 => Number);
/// ```
#[macro_export]
macro_rules! impl_value_from {
    ($target:ty; $($src:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$src> for $target {
                #[inline]
                fn from(v: $src) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug)]
    enum Shape {
        Circle(f64),
        Label(String),
    }

    impl Shape {
        impl_enum_accessors!(circle: f64, label: String);
    }

    impl_value_from!(Shape; f64 => Circle, &str => Label);

    #[test]
    fn test_generated_accessors() {
        let c: Shape = 2.0.into();
        assert!(c.is_circle());
        assert!(!c.is_label());
        assert_eq!(c.as_circle(), Some(&2.0));

        let l: Shape = "tag".into();
        assert_eq!(l.as_label().map(String::as_str), Some("tag"));
        assert!(l.as_circle().is_none());
    }
}
