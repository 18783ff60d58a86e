/// Grid storage for per-cell simulation state
///
/// `Grid<T>` picks a static or heap backend once from the requested shape,
/// `VectorField<T>` layers four directional values per cell on top of it, and
/// `partition` hands out disjoint row ranges to parallel tasks.

pub mod matrix;
pub mod partition;
pub mod vector_field;

pub use matrix::{DynamicMatrix, Grid, Matrix, StaticMatrix, KNOWN_SIZES};
pub use partition::{row_bands_mut, row_windows_mut, RowBand, RowWindow};
pub use vector_field::{Direction, VectorField, DELTAS};
