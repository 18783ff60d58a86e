use crate::grid::{Grid, Matrix, VectorField};

/// Movable fluid state of one cell: medium, pressure and velocity vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Parcel<P, V> {
    pub medium: u8,
    pub pressure: P,
    pub velocity: [V; 4],
}

impl<P: Copy + Default, V: Copy + Default> Parcel<P, V> {
    /// Exchanges this parcel with the state stored at `(x, y)`.
    pub fn swap_with(
        &mut self,
        field: &mut Grid<u8>,
        pressure: &mut Grid<P>,
        velocity: &mut VectorField<V>,
        x: usize,
        y: usize,
    ) {
        std::mem::swap(field.get_mut(x, y), &mut self.medium);
        std::mem::swap(pressure.get_mut(x, y), &mut self.pressure);
        std::mem::swap(velocity.cell_mut(x, y), &mut self.velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_swaps_exchange_two_cells() {
        let mut field = Grid::<u8>::new(1, 2);
        let mut pressure = Grid::<f64>::new(1, 2);
        let mut velocity = VectorField::<f64>::new(1, 2);
        *field.get_mut(0, 0) = b'.';
        *field.get_mut(0, 1) = b' ';
        *pressure.get_mut(0, 0) = 3.0;
        *velocity.cell_mut(0, 1) = [1.0, 2.0, 3.0, 4.0];

        let mut parcel = Parcel::default();
        parcel.swap_with(&mut field, &mut pressure, &mut velocity, 0, 0);
        parcel.swap_with(&mut field, &mut pressure, &mut velocity, 0, 1);
        parcel.swap_with(&mut field, &mut pressure, &mut velocity, 0, 0);

        assert_eq!((*field.get(0, 0), *field.get(0, 1)), (b' ', b'.'));
        assert_eq!((*pressure.get(0, 0), *pressure.get(0, 1)), (0.0, 3.0));
        assert_eq!(velocity.cells()[0], [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(velocity.cells()[1], [0.0; 4]);
        assert_eq!(parcel, Parcel::default());
    }
}
