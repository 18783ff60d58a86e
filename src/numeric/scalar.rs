use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::Rng;

/// Magnitude below which `Scalar::is_zero_approx` treats a value as zero.
///
/// Flow relaxation compares remaining capacity against this instead of exact
/// zero so that rounding residue in fixed-point types does not keep an edge
/// open forever. Not configurable.
pub const ZERO_EPSILON: f64 = 1e-3;

/// Arithmetic value the simulation runs on: pressures, velocities and flows.
///
/// Implemented for `f32`, `f64` and every `Fixed<R, K>`.
pub trait Scalar:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + Debug
    + Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
{
    /// Textual specifier, e.g. `double` or `fixed(32,16)`
    fn type_name() -> String;

    fn zero() -> Self {
        Self::default()
    }

    fn from_int(value: i32) -> Self;

    /// Nearest representable value
    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;

    fn abs(self) -> Self;

    /// Largest representable value strictly below `self`
    fn step_down(self) -> Self;

    /// Uniform sample in `[0, 1)`
    fn random01<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Parses a decimal literal as written in scenario files.
    fn parse_literal(text: &str) -> Option<Self> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Self::from_f64)
    }

    fn is_zero_approx(self) -> bool {
        self.abs().to_f64() < ZERO_EPSILON
    }

    /// Converts between scalar representations through `f64`.
    fn cast<T: Scalar>(self) -> T {
        T::from_f64(self.to_f64())
    }

    fn min_with(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    /// Converts to `T`, rounding down where the nearest `T` would exceed
    /// `self`.
    fn cast_at_most<T: Scalar>(self) -> T {
        let mut value: T = self.cast();
        while value.cast::<Self>() > self {
            value = value.step_down();
        }
        value
    }
}

macro_rules! float_scalar {
    ($($float:ty => $name:literal),* $(,)?) => {
        $(
            impl Scalar for $float {
                fn type_name() -> String {
                    $name.to_string()
                }

                fn from_int(value: i32) -> Self {
                    value as $float
                }

                fn from_f64(value: f64) -> Self {
                    value as $float
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn abs(self) -> Self {
                    <$float>::abs(self)
                }

                fn step_down(self) -> Self {
                    if self.is_nan() || self == <$float>::NEG_INFINITY {
                        return self;
                    }
                    if self == 0.0 {
                        return -<$float>::from_bits(1);
                    }
                    let bits = self.to_bits();
                    <$float>::from_bits(if self > 0.0 { bits - 1 } else { bits + 1 })
                }

                fn random01<R: Rng + ?Sized>(rng: &mut R) -> Self {
                    rng.gen::<$float>()
                }
            }
        )*
    };
}

float_scalar! {
    f32 => "float",
    f64 => "double",
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_float_random01_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let a = f32::random01(&mut rng);
            let b = f64::random01(&mut rng);
            assert!((0.0..1.0).contains(&a));
            assert!((0.0..1.0).contains(&b));
        }
    }

    #[test]
    fn test_zero_approx_uses_epsilon() {
        assert!(0.0005f64.is_zero_approx());
        assert!((-0.0005f64).is_zero_approx());
        assert!(!0.002f64.is_zero_approx());
    }

    #[test]
    fn test_step_down_is_one_ulp() {
        let capacity = 0.027994369785139927f64;
        assert!(capacity.step_down() < capacity);
        assert_eq!(capacity.step_down().to_bits(), capacity.to_bits() - 1);
        assert!(0.0f64.step_down() < 0.0);
        assert!((-1.0f32).step_down() < -1.0);
    }

    #[test]
    fn test_cast_at_most_never_rounds_up() {
        let v = 0.1f64;
        let narrowed: f32 = v.cast_at_most();
        assert!((narrowed as f64) <= v);
        assert!(((narrowed as f64) - v).abs() < 1e-7);
        assert_eq!(0.5f64.cast_at_most::<f32>(), 0.5);
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(f64::parse_literal(" 0.1 "), Some(0.1));
        assert_eq!(f32::parse_literal("-2"), Some(-2.0));
        assert_eq!(f64::parse_literal("abc"), None);
        assert_eq!(f64::parse_literal("inf"), None);
    }
}
