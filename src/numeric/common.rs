use super::{Double, Fixed32_16, Fixed64_16, Fixed64_32, Float, Scalar};

/// Type both operands are promoted to in a mixed expression.
///
/// Floating point wins over fixed point, `f64` over `f32`, more fractional
/// bits over fewer, and the wider storage when fractional bits tie.
pub trait CommonType<Rhs: Scalar>: Scalar {
    type Output: Scalar;
}

pub type Common<A, B> = <A as CommonType<B>>::Output;

impl<T: Scalar> CommonType<T> for T {
    type Output = T;
}

macro_rules! promote {
    ($($a:ty, $b:ty => $out:ty;)*) => {
        $(
            impl CommonType<$b> for $a {
                type Output = $out;
            }

            impl CommonType<$a> for $b {
                type Output = $out;
            }
        )*
    };
}

promote! {
    Float, Double => Double;
    Float, Fixed32_16 => Float;
    Float, Fixed64_16 => Float;
    Float, Fixed64_32 => Float;
    Double, Fixed32_16 => Double;
    Double, Fixed64_16 => Double;
    Double, Fixed64_32 => Double;
    Fixed32_16, Fixed64_16 => Fixed64_16;
    Fixed32_16, Fixed64_32 => Fixed64_32;
    Fixed64_16, Fixed64_32 => Fixed64_32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;

    fn promotes_to<A, B, Out>() -> bool
    where
        A: CommonType<B>,
        B: Scalar,
        Out: 'static,
    {
        TypeId::of::<Common<A, B>>() == TypeId::of::<Out>()
    }

    #[test]
    fn test_promotion_rules() {
        assert!(promotes_to::<Fixed32_16, Fixed32_16, Fixed32_16>());
        assert!(promotes_to::<Fixed32_16, Fixed64_32, Fixed64_32>());
        assert!(promotes_to::<Fixed64_32, Fixed64_16, Fixed64_32>());
        assert!(promotes_to::<Fixed32_16, Fixed64_16, Fixed64_16>());
        assert!(promotes_to::<Fixed64_32, Float, Float>());
        assert!(promotes_to::<Double, Fixed32_16, Double>());
        assert!(promotes_to::<Float, Double, Double>());
    }
}
