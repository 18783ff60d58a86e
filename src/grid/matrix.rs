use std::fmt;

/// Row-major 2-D storage with a fixed shape
pub trait Matrix<T: Copy + Default> {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn as_slice(&self) -> &[T];
    fn as_mut_slice(&mut self) -> &mut [T];

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        debug_assert!(col < self.cols(), "column {col} out of range");
        &self.as_slice()[row * self.cols() + col]
    }

    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        let cols = self.cols();
        debug_assert!(col < cols, "column {col} out of range");
        &mut self.as_mut_slice()[row * cols + col]
    }

    fn row(&self, row: usize) -> &[T] {
        let cols = self.cols();
        &self.as_slice()[row * cols..(row + 1) * cols]
    }

    fn row_mut(&mut self, row: usize) -> &mut [T] {
        let cols = self.cols();
        &mut self.as_mut_slice()[row * cols..(row + 1) * cols]
    }

    /// Sets every element back to `T::default()`
    fn reset(&mut self) {
        self.as_mut_slice().fill(T::default());
    }

    /// Copies every element of a same-shaped matrix.
    fn copy_from<M: Matrix<T> + ?Sized>(&mut self, other: &M) {
        assert!(
            self.rows() == other.rows() && self.cols() == other.cols(),
            "matrix shape mismatch: {}x{} <- {}x{}",
            self.rows(),
            self.cols(),
            other.rows(),
            other.cols()
        );
        self.as_mut_slice().copy_from_slice(other.as_slice());
    }
}

/// Inline storage for a shape known at compile time
#[derive(Clone)]
pub struct StaticMatrix<T, const N: usize, const M: usize> {
    cells: [[T; M]; N],
}

impl<T: Copy + Default, const N: usize, const M: usize> StaticMatrix<T, N, M> {
    pub fn new() -> Self {
        Self {
            cells: [[T::default(); M]; N],
        }
    }
}

impl<T: Copy + Default, const N: usize, const M: usize> Default for StaticMatrix<T, N, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default, const N: usize, const M: usize> Matrix<T> for StaticMatrix<T, N, M> {
    fn rows(&self) -> usize {
        N
    }

    fn cols(&self) -> usize {
        M
    }

    fn as_slice(&self) -> &[T] {
        self.cells.as_flattened()
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self.cells.as_flattened_mut()
    }
}

/// Heap storage for arbitrary shapes
#[derive(Clone, Debug)]
pub struct DynamicMatrix<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Copy + Default> DynamicMatrix<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![T::default(); rows * cols],
        }
    }
}

impl<T: Copy + Default> Matrix<T> for DynamicMatrix<T> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn as_slice(&self) -> &[T] {
        &self.cells
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }
}

macro_rules! known_sizes {
    ($($variant:ident => ($rows:literal, $cols:literal)),* $(,)?) => {
        /// Grid storage picked once from the requested shape
        ///
        /// Shapes from the known-size list get a `StaticMatrix`; everything
        /// else falls back to a `DynamicMatrix`.
        #[derive(Clone)]
        pub enum Grid<T> {
            $($variant(Box<StaticMatrix<T, $rows, $cols>>),)*
            Dynamic(DynamicMatrix<T>),
        }

        /// Shapes served by a static backend
        pub const KNOWN_SIZES: &[(usize, usize)] = &[$(($rows, $cols)),*];

        impl<T: Copy + Default> Grid<T> {
            pub fn new(rows: usize, cols: usize) -> Self {
                match (rows, cols) {
                    $(($rows, $cols) => {
                        log::debug!("Using StaticMatrix: N = {}, M = {}", rows, cols);
                        Grid::$variant(Box::new(StaticMatrix::new()))
                    })*
                    _ => {
                        log::debug!("Using DynamicMatrix: N = {}, M = {}", rows, cols);
                        Grid::Dynamic(DynamicMatrix::new(rows, cols))
                    }
                }
            }

            pub fn is_static(&self) -> bool {
                !matches!(self, Grid::Dynamic(_))
            }
        }

        impl<T: Copy + Default> Matrix<T> for Grid<T> {
            fn rows(&self) -> usize {
                match self {
                    $(Grid::$variant(_) => $rows,)*
                    Grid::Dynamic(matrix) => matrix.rows(),
                }
            }

            fn cols(&self) -> usize {
                match self {
                    $(Grid::$variant(_) => $cols,)*
                    Grid::Dynamic(matrix) => matrix.cols(),
                }
            }

            fn as_slice(&self) -> &[T] {
                match self {
                    $(Grid::$variant(matrix) => matrix.as_slice(),)*
                    Grid::Dynamic(matrix) => matrix.as_slice(),
                }
            }

            fn as_mut_slice(&mut self) -> &mut [T] {
                match self {
                    $(Grid::$variant(matrix) => matrix.as_mut_slice(),)*
                    Grid::Dynamic(matrix) => matrix.as_mut_slice(),
                }
            }
        }
    };
}

known_sizes! {
    Static36x84 => (36, 84),
    Static64x64 => (64, 64),
}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("static", &self.is_static())
            .finish()
    }
}
