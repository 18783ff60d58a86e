use crate::numeric::Scalar;

/// Density per medium byte, immutable once the engine is built
#[derive(Clone, Debug)]
pub struct DensityTable<P> {
    values: [Option<P>; 256],
}

impl<P: Scalar> Default for DensityTable<P> {
    fn default() -> Self {
        Self { values: [None; 256] }
    }
}

impl<P: Scalar> DensityTable<P> {
    /// Returns the previous density of `medium`, if any.
    pub fn insert(&mut self, medium: u8, density: P) -> Option<P> {
        self.values[medium as usize].replace(density)
    }

    pub fn get(&self, medium: u8) -> Option<P> {
        self.values[medium as usize]
    }

    /// Density of a medium known to be in the table
    #[inline]
    pub fn of(&self, medium: u8) -> P {
        match self.values[medium as usize] {
            Some(density) => density,
            None => panic!("no density for medium '{}'", medium as char),
        }
    }
}
