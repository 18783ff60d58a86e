//! Splitting row-major cell storage into disjoint mutable pieces
//!
//! Parallel phases hand each pool task exclusive `&mut` access to the rows
//! it writes. Bands cover contiguous rows; windows cover a center row plus
//! its two neighbors, so tasks of one `row mod 3` class never overlap.

/// Contiguous rows `first_row..first_row + cells.len() / cols`
pub struct RowBand<'a, T> {
    pub first_row: usize,
    pub cols: usize,
    pub cells: &'a mut [T],
}

impl<'a, T> RowBand<'a, T> {
    /// Absolute `(row, col)` of each cell in the band
    pub fn iter_mut(&mut self) -> impl Iterator<Item = ((usize, usize), &mut T)> + '_ {
        let (first_row, cols) = (self.first_row, self.cols);
        self.cells
            .iter_mut()
            .enumerate()
            .map(move |(i, cell)| ((first_row + i / cols, i % cols), cell))
    }
}

/// Splits `cells` into bands of at most `rows_per_band` rows.
pub fn row_bands_mut<T>(cells: &mut [T], cols: usize, rows_per_band: usize) -> Vec<RowBand<'_, T>> {
    assert!(cols > 0 && rows_per_band > 0, "empty band shape");
    cells
        .chunks_mut(cols * rows_per_band)
        .enumerate()
        .map(|(i, chunk)| RowBand {
            first_row: i * rows_per_band,
            cols,
            cells: chunk,
        })
        .collect()
}

/// Rows `center - 1 ..= center + 1`, clipped to the grid
pub struct RowWindow<'a, T> {
    pub center: usize,
    pub first_row: usize,
    pub cols: usize,
    pub cells: &'a mut [T],
}

impl<'a, T> RowWindow<'a, T> {
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.first_row && row < self.first_row + self.cells.len() / self.cols
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        assert!(
            self.contains_row(row) && col < self.cols,
            "cell ({row}, {col}) outside window around row {}",
            self.center
        );
        &mut self.cells[(row - self.first_row) * self.cols + col]
    }
}

/// Windows around every row `x` with `x % 3 == class`.
pub fn row_windows_mut<T>(cells: &mut [T], cols: usize, class: usize) -> Vec<RowWindow<'_, T>> {
    assert!(cols > 0 && class < 3, "invalid window request");
    let rows = cells.len() / cols;
    let mut windows = Vec::with_capacity(rows / 3 + 1);
    let mut rest = cells;
    let mut rest_first_row = 0;
    let mut center = class;

    while center < rows {
        let first_row = center.saturating_sub(1);
        let end_row = (center + 2).min(rows);

        let (_, tail) = std::mem::take(&mut rest).split_at_mut((first_row - rest_first_row) * cols);
        let (window, tail) = tail.split_at_mut((end_row - first_row) * cols);

        windows.push(RowWindow {
            center,
            first_row,
            cols,
            cells: window,
        });

        rest = tail;
        rest_first_row = end_row;
        center += 3;
    }

    windows
}
