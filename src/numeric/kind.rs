/// Runtime selection of the numeric representation
///
/// Numeric types are named on the command line (`double`, `fixed(32,16)`,
/// `fast_fixed(32,16)` ...). Each name resolves to one of a small closed set
/// of concrete scalar types, and a (pressure, velocity, flow) triple is
/// looked up in the support matrix below. Every listed triple is one static
/// instantiation of the engine; anything else is rejected.

use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

use super::fixed::fast_storage_bits;
use super::{CommonType, Double, Fixed32_16, Fixed64_16, Fixed64_32, Float, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericType {
    Float,
    Double,
    Fixed32_16,
    Fixed64_16,
    Fixed64_32,
}

impl NumericType {
    pub fn parse(text: &str) -> EngineResult<Self> {
        let normalized: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "float" => return Ok(NumericType::Float),
            "double" => return Ok(NumericType::Double),
            _ => {}
        }

        let unsupported = || EngineError::UnsupportedNumericType(text.to_string());

        if let Some(args) = call_args(&normalized, "fast_fixed") {
            let (bits, fraction) = parse_width_pair(args).ok_or_else(unsupported)?;
            let storage = fast_storage_bits(bits).ok_or_else(unsupported)?;
            return Self::fixed(storage, fraction).ok_or_else(unsupported);
        }

        if let Some(args) = call_args(&normalized, "fixed") {
            let (bits, fraction) = parse_width_pair(args).ok_or_else(unsupported)?;
            let storage = u32::try_from(bits).map_err(|_| unsupported())?;
            return Self::fixed(storage, fraction).ok_or_else(unsupported);
        }

        Err(unsupported())
    }

    fn fixed(storage_bits: u32, fraction_bits: u32) -> Option<Self> {
        match (storage_bits, fraction_bits) {
            (32, 16) => Some(NumericType::Fixed32_16),
            (64, 16) => Some(NumericType::Fixed64_16),
            (64, 32) => Some(NumericType::Fixed64_32),
            _ => None,
        }
    }

    pub fn name(self) -> String {
        match self {
            NumericType::Float => Float::type_name(),
            NumericType::Double => Double::type_name(),
            NumericType::Fixed32_16 => Fixed32_16::type_name(),
            NumericType::Fixed64_16 => Fixed64_16::type_name(),
            NumericType::Fixed64_32 => Fixed64_32::type_name(),
        }
    }
}

impl FromStr for NumericType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn call_args<'a>(text: &'a str, function: &str) -> Option<&'a str> {
    text.strip_prefix(function)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_width_pair(args: &str) -> Option<(usize, u32)> {
    let (bits, fraction) = args.split_once(',')?;
    Some((bits.parse().ok()?, fraction.parse().ok()?))
}

/// Generic entry point called with the concrete types of one supported triple
pub trait EngineVisitor {
    type Output;

    fn visit<P, V, VF>(self) -> Self::Output
    where
        P: Scalar,
        V: Scalar + CommonType<VF>,
        VF: Scalar;
}

macro_rules! support_matrix {
    ($(($p:ident, $v:ident, $vf:ident)),* $(,)?) => {
        /// Supported (pressure, velocity, flow) combinations
        pub const SUPPORTED_TRIPLES: &[(NumericType, NumericType, NumericType)] = &[
            $((NumericType::$p, NumericType::$v, NumericType::$vf)),*
        ];

        /// Runs `visitor` with the concrete types selected by `p`, `v` and `v_flow`.
        pub fn dispatch<E: EngineVisitor>(
            p: NumericType,
            v: NumericType,
            v_flow: NumericType,
            visitor: E,
        ) -> EngineResult<E::Output> {
            match (p, v, v_flow) {
                $((NumericType::$p, NumericType::$v, NumericType::$vf) => {
                    Ok(visitor.visit::<$p, $v, $vf>())
                })*
                _ => Err(unsupported_combination(p, v, v_flow)),
            }
        }
    };
}

support_matrix! {
    (Fixed32_16, Fixed32_16, Fixed32_16),
    (Fixed64_16, Fixed64_16, Fixed64_16),
    (Fixed64_32, Fixed64_32, Fixed64_32),
    (Float, Float, Float),
    (Double, Double, Double),
    (Fixed32_16, Fixed32_16, Double),
    (Fixed32_16, Double, Fixed32_16),
    (Double, Fixed32_16, Fixed64_32),
    (Fixed64_32, Fixed32_16, Fixed64_16),
    (Float, Fixed32_16, Double),
}

fn unsupported_combination(p: NumericType, v: NumericType, v_flow: NumericType) -> EngineError {
    let supported = SUPPORTED_TRIPLES
        .iter()
        .map(|(p, v, f)| format!("({p}, {v}, {f})"))
        .collect::<Vec<_>>()
        .join(", ");

    EngineError::UnsupportedCombination {
        p: p.name(),
        v: v.name(),
        v_flow: v_flow.name(),
        supported,
    }
}
