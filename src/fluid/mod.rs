/// Cellular fluid simulation
///
/// `FluidEngine` owns every per-cell array and runs the tick pipeline:
/// gravity, pressure forces, flow relaxation, kinetic pressure feedback and
/// stochastic parcel propagation. Per-cell sweeps without cross-cell writes
/// go through the task pool; the recursive walks run in a `Traversal` on the
/// calling thread.

pub mod density;
pub mod engine;
pub mod parcel;
pub mod traversal;

pub use density::DensityTable;
pub use engine::{EngineConfig, FluidEngine, RunOptions, RunSummary, TickReport};
pub use parcel::Parcel;
pub use traversal::{FlowPush, Traversal};

#[cfg(test)]
mod tests;
