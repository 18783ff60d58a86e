// Worker pool driving the parallel sweeps of the simulation
pub mod task_pool;

pub use task_pool::{Scope, TaskId, TaskPool};
