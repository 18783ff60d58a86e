/// Numeric representations for the simulation
///
/// The engine is generic over `Scalar`, implemented by the two float types
/// and by binary fixed-point numbers. The concrete types in use are picked
/// at startup through `NumericType` and `dispatch`.

pub mod common;
pub mod fixed;
pub mod kind;
pub mod scalar;

pub use common::{Common, CommonType};
pub use fixed::{FastFixed, Fixed, RawInt};
pub use kind::{dispatch, EngineVisitor, NumericType, SUPPORTED_TRIPLES};
pub use scalar::{Scalar, ZERO_EPSILON};

pub type Float = f32;
pub type Double = f64;
/// `fixed(32,16)`
pub type Fixed32_16 = Fixed<i32, 16>;
/// `fixed(64,16)`, also what `fast_fixed(32,16)` resolves to on 64-bit targets
pub type Fixed64_16 = Fixed<i64, 16>;
/// `fixed(64,32)`
pub type Fixed64_32 = Fixed<i64, 32>;
