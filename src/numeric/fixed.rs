/// Binary fixed-point numbers
///
/// `Fixed<R, K>` stores a value `v` as the signed integer `v * 2^K` in the
/// storage type `R`. Addition and subtraction work on the raw integers
/// directly. Multiplication widens both operands, multiplies, then shifts
/// right by `K`. Division widens the dividend and shifts it left by `K`
/// before dividing by the divisor's raw value. Any result that does not fit
/// back into `R` aborts with a fixed-point overflow panic.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Shl, Shr, Sub, SubAssign};

use rand::Rng;

use super::Scalar;

/// Signed integer usable as fixed-point storage
pub trait RawInt: Copy + Ord + Hash + fmt::Debug + Default + Send + Sync + 'static {
    /// Integer twice as wide, used for multiplication and division
    type Wide: Copy
        + Ord
        + Mul<Output = Self::Wide>
        + Div<Output = Self::Wide>
        + Shl<u32, Output = Self::Wide>
        + Shr<u32, Output = Self::Wide>;

    const BITS: u32;
    const ONE: Self;

    fn widen(self) -> Self::Wide;
    fn narrow(wide: Self::Wide) -> Option<Self>;
    fn from_i128(value: i128) -> Option<Self>;
    fn from_f64(value: f64) -> Option<Self>;
    fn to_f64(self) -> f64;
    fn checked_add(self, rhs: Self) -> Option<Self>;
    fn checked_sub(self, rhs: Self) -> Option<Self>;
    fn checked_neg(self) -> Option<Self>;
    fn is_negative(self) -> bool;
}

macro_rules! raw_int {
    ($($int:ty => $wide:ty),* $(,)?) => {
        $(
            impl RawInt for $int {
                type Wide = $wide;

                const BITS: u32 = <$int>::BITS;
                const ONE: Self = 1;

                fn widen(self) -> $wide {
                    self as $wide
                }

                fn narrow(wide: $wide) -> Option<Self> {
                    <$int>::try_from(wide).ok()
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$int>::try_from(value).ok()
                }

                fn from_f64(value: f64) -> Option<Self> {
                    if value.is_finite() && value >= <$int>::MIN as f64 && value <= <$int>::MAX as f64 {
                        Some(value as $int)
                    } else {
                        None
                    }
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn checked_add(self, rhs: Self) -> Option<Self> {
                    <$int>::checked_add(self, rhs)
                }

                fn checked_sub(self, rhs: Self) -> Option<Self> {
                    <$int>::checked_sub(self, rhs)
                }

                fn checked_neg(self) -> Option<Self> {
                    <$int>::checked_neg(self)
                }

                fn is_negative(self) -> bool {
                    self < 0
                }
            }
        )*
    };
}

raw_int! {
    i8 => i16,
    i16 => i32,
    i32 => i64,
    i64 => i128,
}

#[cold]
#[inline(never)]
fn overflow(operation: &str) -> ! {
    panic!("fixed-point overflow in {operation}")
}

/// Fixed-point value with `K` fractional bits stored in `R`
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed<R: RawInt = i32, const K: u32 = 16> {
    raw: R,
}

impl<R: RawInt, const K: u32> Fixed<R, K> {
    const LAYOUT_CHECK: () = assert!(K < R::BITS, "fractional bits must leave room for the sign bit");

    pub const FRACTIONAL_BITS: u32 = K;

    pub fn from_raw(raw: R) -> Self {
        let _: () = Self::LAYOUT_CHECK;
        Self { raw }
    }

    pub fn raw(self) -> R {
        self.raw
    }

    fn scale() -> f64 {
        2f64.powi(K as i32)
    }
}

impl<R: RawInt, const K: u32> fmt::Debug for Fixed<R, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fixed").field(&self.to_f64()).finish()
    }
}

impl<R: RawInt, const K: u32> fmt::Display for Fixed<R, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl<R: RawInt, const K: u32> Add for Fixed<R, K> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match self.raw.checked_add(rhs.raw) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("addition"),
        }
    }
}

impl<R: RawInt, const K: u32> Sub for Fixed<R, K> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        match self.raw.checked_sub(rhs.raw) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("subtraction"),
        }
    }
}

impl<R: RawInt, const K: u32> Mul for Fixed<R, K> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let product = (self.raw.widen() * rhs.raw.widen()) >> K;
        match R::narrow(product) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("multiplication"),
        }
    }
}

impl<R: RawInt, const K: u32> Div for Fixed<R, K> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        // Shift before dividing; dividing first would drop the fraction.
        let quotient = (self.raw.widen() << K) / rhs.raw.widen();
        match R::narrow(quotient) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("division"),
        }
    }
}

impl<R: RawInt, const K: u32> Neg for Fixed<R, K> {
    type Output = Self;

    fn neg(self) -> Self {
        match self.raw.checked_neg() {
            Some(raw) => Self::from_raw(raw),
            None => overflow("negation"),
        }
    }
}

macro_rules! assign_ops {
    ($($trait:ident :: $method:ident => $op:tt),* $(,)?) => {
        $(
            impl<R: RawInt, const K: u32> $trait for Fixed<R, K> {
                fn $method(&mut self, rhs: Self) {
                    *self = *self $op rhs;
                }
            }
        )*
    };
}

assign_ops! {
    AddAssign::add_assign => +,
    SubAssign::sub_assign => -,
    MulAssign::mul_assign => *,
    DivAssign::div_assign => /,
}

impl<R: RawInt, const K: u32> Scalar for Fixed<R, K> {
    fn type_name() -> String {
        format!("fixed({},{})", R::BITS, K)
    }

    fn from_int(value: i32) -> Self {
        match R::from_i128((value as i128) << K) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("integer conversion"),
        }
    }

    fn from_f64(value: f64) -> Self {
        match R::from_f64((value * Self::scale()).round()) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("float conversion"),
        }
    }

    fn to_f64(self) -> f64 {
        self.raw.to_f64() / Self::scale()
    }

    fn abs(self) -> Self {
        if self.raw.is_negative() {
            -self
        } else {
            self
        }
    }

    fn step_down(self) -> Self {
        match self.raw.checked_sub(R::ONE) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("step down"),
        }
    }

    fn random01<G: Rng + ?Sized>(rng: &mut G) -> Self {
        let bits = rng.gen::<u64>() & ((1u64 << K) - 1);
        match R::from_i128(bits as i128) {
            Some(raw) => Self::from_raw(raw),
            None => overflow("random sample"),
        }
    }

    fn min_with(self, other: Self) -> Self {
        match other.cmp(&self) {
            Ordering::Less => other,
            _ => self,
        }
    }
}

/// Marker selecting the platform's fastest signed integer of at least `N` bits
pub struct FastWidth<const N: usize>;

pub trait FastInt {
    type Int: RawInt;
}

impl FastInt for FastWidth<8> {
    type Int = i8;
}

#[cfg(target_pointer_width = "64")]
impl FastInt for FastWidth<16> {
    type Int = i64;
}

#[cfg(target_pointer_width = "64")]
impl FastInt for FastWidth<32> {
    type Int = i64;
}

#[cfg(not(target_pointer_width = "64"))]
impl FastInt for FastWidth<16> {
    type Int = i32;
}

#[cfg(not(target_pointer_width = "64"))]
impl FastInt for FastWidth<32> {
    type Int = i32;
}

impl FastInt for FastWidth<64> {
    type Int = i64;
}

/// Fixed-point number over the fastest integer type of width `N`
pub type FastFixed<const N: usize, const K: u32> = Fixed<<FastWidth<N> as FastInt>::Int, K>;

/// Storage width in bits that `FastFixed<N, _>` actually uses.
pub fn fast_storage_bits(requested: usize) -> Option<u32> {
    match requested {
        8 => Some(<<FastWidth<8> as FastInt>::Int as RawInt>::BITS),
        16 => Some(<<FastWidth<16> as FastInt>::Int as RawInt>::BITS),
        32 => Some(<<FastWidth<32> as FastInt>::Int as RawInt>::BITS),
        64 => Some(<<FastWidth<64> as FastInt>::Int as RawInt>::BITS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type F = Fixed<i32, 16>;

    #[test]
    fn test_addition_is_exact_on_raw_values() {
        for (a, b) in [(1, 2), (-70_000, 12_345), (65_535, 1), (i32::MAX - 5, 5)] {
            assert_eq!(F::from_raw(a) + F::from_raw(b), F::from_raw(a + b));
        }
        assert_eq!(F::from_raw(10) - F::from_raw(25), F::from_raw(-15));
    }

    #[test]
    fn test_unit_multiplication_and_halving() {
        let one = F::from_int(1);
        assert_eq!(one * one, one);
        assert_eq!(one / F::from_int(2), F::from_f64(0.5));
        assert_eq!((one / F::from_int(2)).raw(), 1 << 15);
        assert_eq!(F::from_int(7) / F::from_int(2), F::from_f64(3.5));
    }

    #[test]
    fn test_multiplication_floors_negative_products() {
        // -1.5 * 0.5 is exact, a third of one is not
        assert_eq!(F::from_f64(-1.5) * F::from_f64(0.5), F::from_f64(-0.75));
        let third = F::from_int(1) / F::from_int(3);
        assert_eq!(third.raw(), 21_845);
        assert_eq!((-third * F::from_int(1)).raw(), -21_845);
        assert_eq!((-third * F::from_f64(0.5)).raw(), -10_923);
    }

    #[test]
    fn test_narrowing_cast_rounds_down_when_needed() {
        // nearest raw value lies above the double
        let capacity = 0.0038238525390625056f64;
        assert!(F::from_f64(capacity).to_f64() > capacity);
        let narrowed: F = capacity.cast_at_most();
        assert!(narrowed.to_f64() <= capacity);
        assert_eq!(narrowed.raw(), F::from_f64(capacity).raw() - 1);
        assert_eq!(F::from_raw(5).step_down().raw(), 4);
    }

    #[test]
    fn test_float_construction_rounds_to_nearest() {
        assert_eq!(F::from_f64(0.1).raw(), 6_554);
        assert_eq!(F::from_f64(-0.1).raw(), -6_554);
        assert_eq!(F::from_f64(0.8).raw(), 52_429);
        assert_eq!(F::from_int(-3).raw(), -3 << 16);
    }

    #[test]
    fn test_negation_abs_and_ordering() {
        let x = F::from_f64(-2.25);
        assert_eq!(x.abs(), F::from_f64(2.25));
        assert_eq!(-x, F::from_f64(2.25));
        assert!(x < F::zero());
        assert!(F::from_raw(1) > F::zero());
        assert_eq!(F::from_int(3).min_with(F::from_int(2)), F::from_int(2));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for raw in [0, 1, 6_554, -98_304, 123_456_789] {
            let value = F::from_raw(raw);
            assert_eq!(F::parse_literal(&value.to_string()), Some(value));
        }
    }

    #[test]
    #[should_panic(expected = "fixed-point overflow")]
    fn test_multiplication_overflow_aborts() {
        let _ = F::from_int(30_000) * F::from_int(30_000);
    }

    #[test]
    #[should_panic(expected = "fixed-point overflow")]
    fn test_addition_overflow_aborts() {
        let _ = F::from_raw(i32::MAX) + F::from_raw(1);
    }

    #[test]
    fn test_wide_storage_keeps_precision() {
        type Wide = Fixed<i64, 32>;
        let one = Wide::from_int(1);
        assert_eq!(one / Wide::from_int(2), Wide::from_f64(0.5));
        assert_eq!(Wide::from_int(40_000) * Wide::from_int(40_000), Wide::from_int(1_600_000_000));
    }

    #[test]
    fn test_random01_uses_fraction_bits_only() {
        let mut rng = StdRng::seed_from_u64(1337);
        for _ in 0..1000 {
            let sample = F::random01(&mut rng);
            assert!(sample >= F::zero());
            assert!(sample < F::from_int(1));
        }
    }

    #[test]
    fn test_fast_fixed_width() {
        assert_eq!(fast_storage_bits(8), Some(8));
        assert_eq!(fast_storage_bits(64), Some(64));
        assert_eq!(fast_storage_bits(12), None);
        let half = FastFixed::<32, 16>::from_f64(0.5);
        assert_eq!(half + half, FastFixed::<32, 16>::from_int(1));
    }
}
