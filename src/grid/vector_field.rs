use std::fmt;

use super::{Grid, Matrix};

/// Lattice offsets in storage order
pub const DELTAS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// One of the four cardinal directions. Rows grow downwards, so `Down` is
/// the offset `(1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Panics unless `(dx, dy)` is a unit lattice offset.
    pub fn from_offset(dx: isize, dy: isize) -> Self {
        match (dx, dy) {
            (-1, 0) => Direction::Up,
            (1, 0) => Direction::Down,
            (0, -1) => Direction::Left,
            (0, 1) => Direction::Right,
            _ => panic!("invalid direction offset ({dx}, {dy})"),
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn offset(self) -> (isize, isize) {
        DELTAS[self.index()]
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Neighbor of `(x, y)` inside a `rows x cols` grid
    #[inline]
    pub fn step(self, x: usize, y: usize, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let (dx, dy) = self.offset();
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < rows && ny < cols).then_some((nx, ny))
    }
}

/// Four directional values per cell
///
/// `VectorField::default()` is a null field without storage; it only becomes
/// usable once a sized field is assigned over it.
#[derive(Clone)]
pub struct VectorField<T> {
    cells: Option<Grid<[T; 4]>>,
}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for VectorField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cells {
            Some(cells) => f.debug_tuple("VectorField").field(cells).finish(),
            None => f.write_str("VectorField(null)"),
        }
    }
}

impl<T> Default for VectorField<T> {
    fn default() -> Self {
        Self { cells: None }
    }
}

impl<T: Copy + Default> VectorField<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cells: Some(Grid::new(rows, cols)),
        }
    }

    pub fn is_null(&self) -> bool {
        self.cells.is_none()
    }

    fn grid(&self) -> &Grid<[T; 4]> {
        match &self.cells {
            Some(grid) => grid,
            None => panic!("vector field used before it was sized"),
        }
    }

    fn grid_mut(&mut self) -> &mut Grid<[T; 4]> {
        match &mut self.cells {
            Some(grid) => grid,
            None => panic!("vector field used before it was sized"),
        }
    }

    pub fn rows(&self) -> usize {
        self.grid().rows()
    }

    pub fn cols(&self) -> usize {
        self.grid().cols()
    }

    /// Value stored for the offset `(dx, dy)` at `(x, y)`
    pub fn get(&mut self, x: usize, y: usize, dx: isize, dy: isize) -> &mut T {
        self.at_mut(x, y, Direction::from_offset(dx, dy))
    }

    pub fn add(&mut self, x: usize, y: usize, dx: isize, dy: isize, delta: T) -> &mut T
    where
        T: std::ops::AddAssign,
    {
        let value = self.get(x, y, dx, dy);
        *value += delta;
        value
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize, direction: Direction) -> T {
        self.grid().get(x, y)[direction.index()]
    }

    #[inline]
    pub fn at_mut(&mut self, x: usize, y: usize, direction: Direction) -> &mut T {
        &mut self.grid_mut().get_mut(x, y)[direction.index()]
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut [T; 4] {
        self.grid_mut().get_mut(x, y)
    }

    pub fn cells(&self) -> &[[T; 4]] {
        self.grid().as_slice()
    }

    pub fn cells_mut(&mut self) -> &mut [[T; 4]] {
        self.grid_mut().as_mut_slice()
    }

    /// Zeroes every directional value
    pub fn reset(&mut self) {
        self.grid_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_map_to_distinct_slots() {
        for (i, &(dx, dy)) in DELTAS.iter().enumerate() {
            let direction = Direction::from_offset(dx, dy);
            assert_eq!(direction.index(), i);
            assert_eq!(direction.offset(), (dx, dy));
            assert_eq!(direction.opposite().opposite(), direction);
        }
    }

    #[test]
    #[should_panic(expected = "invalid direction offset")]
    fn test_diagonal_offset_is_rejected() {
        let mut field = VectorField::<f64>::new(2, 2);
        field.get(0, 0, 1, 1);
    }

    #[test]
    fn test_debug_output_names_shape() {
        let sized = format!("{:?}", VectorField::<f32>::new(2, 3));
        assert!(sized.starts_with("VectorField(Grid"), "{sized}");
        assert!(sized.contains("rows: 2") && sized.contains("cols: 3"), "{sized}");
        assert_eq!(format!("{:?}", VectorField::<f32>::default()), "VectorField(null)");
    }

    #[test]
    fn test_get_add_and_reset() {
        let mut field = VectorField::<f64>::new(3, 4);
        *field.get(1, 2, 0, 1) = 0.5;
        assert_eq!(*field.add(1, 2, 0, 1, 0.25), 0.75);
        assert_eq!(field.at(1, 2, Direction::Right), 0.75);
        assert_eq!(field.at(1, 2, Direction::Left), 0.0);
        field.reset();
        assert!(field.cells().iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_null_field_becomes_live_on_assignment() {
        let mut field = VectorField::<f32>::default();
        assert!(field.is_null());
        field = VectorField::new(2, 2);
        assert!(!field.is_null());
        assert_eq!((field.rows(), field.cols()), (2, 2));
    }

    #[test]
    #[should_panic(expected = "before it was sized")]
    fn test_null_field_access_panics() {
        let mut field = VectorField::<f32>::default();
        field.reset();
    }

    #[test]
    fn test_step_stays_inside_grid() {
        assert_eq!(Direction::Up.step(0, 0, 3, 3), None);
        assert_eq!(Direction::Left.step(1, 0, 3, 3), None);
        assert_eq!(Direction::Down.step(2, 1, 3, 3), None);
        assert_eq!(Direction::Right.step(1, 1, 3, 3), Some((1, 2)));
        assert_eq!(Direction::Down.step(1, 1, 3, 3), Some((2, 1)));
    }
}
