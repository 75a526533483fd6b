//! Identity comparison used to short-circuit redundant `set` calls.
//!
//! This is stricter than loose equality and differs from IEEE float equality
//! in two places: `NaN` is the same value as `NaN`, and `+0.0` is not the
//! same value as `-0.0`.

use std::rc::Rc;

/// Strict identity comparison.
pub trait SameValue {
    /// Returns `true` when `self` and `other` are indistinguishable.
    fn same_value(&self, other: &Self) -> bool;
}

/// Identity of two `f64` values.
///
/// # Example
/// ```
/// use hamsta_core::reactive::same_value_f64;
///
/// assert!(same_value_f64(f64::NAN, f64::NAN));
/// assert!(!same_value_f64(0.0, -0.0));
/// assert!(same_value_f64(1.5, 1.5));
/// ```
pub fn same_value_f64(a: f64, b: f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a.to_bits() == b.to_bits()
}

pub fn same_value_f32(a: f32, b: f32) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a.to_bits() == b.to_bits()
}

impl SameValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        same_value_f64(*self, *other)
    }
}

impl SameValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        same_value_f32(*self, *other)
    }
}

macro_rules! same_value_via_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_via_eq!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, (), String,
    &'static str,
);

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

/// Shared pointers compare by identity, like object references.
impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_same_as_nan() {
        assert!(f64::NAN.same_value(&f64::NAN));
        assert!(!f64::NAN.same_value(&1.0));
        assert!(!1.0f64.same_value(&f64::NAN));
    }

    #[test]
    fn signed_zeros_are_distinct() {
        assert!(!0.0f64.same_value(&-0.0));
        assert!((-0.0f64).same_value(&-0.0));
        assert!(!0.0f32.same_value(&-0.0));
    }

    #[test]
    fn rc_compares_by_identity() {
        let a = Rc::new(5);
        let b = Rc::new(5);
        assert!(a.same_value(&a.clone()));
        assert!(!a.same_value(&b));
    }

    #[test]
    fn options_and_vectors_compare_elementwise() {
        assert!(Some(f64::NAN).same_value(&Some(f64::NAN)));
        assert!(!Some(1).same_value(&None));
        assert!(vec![1.0, f64::NAN].same_value(&vec![1.0, f64::NAN]));
        assert!(!vec![0.0].same_value(&vec![-0.0]));
    }
}
