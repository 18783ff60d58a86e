use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{EngineError, EngineResult};
use crate::grid::{row_bands_mut, row_windows_mut, Direction, Grid, Matrix, VectorField};
use crate::numeric::{Common, CommonType, Scalar};
use crate::scenario::{write_snapshot, Scenario, WALL};
use crate::thread_pool::TaskPool;

use super::density::DensityTable;
use super::traversal::{open_neighbor, Traversal};

/// Medium whose kinetic losses are damped in pressure feedback
const DAMPED_MEDIUM: u8 = b'.';
const KINETIC_DAMPING: f64 = 0.8;

/// Cells per task in flat copy sweeps
const COPY_CHUNK: usize = 1000;

/// Engine construction parameters
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub worker_threads: usize,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            seed: 1337,
        }
    }
}

/// How `FluidEngine::run` drives the simulation
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticks: u64,
    /// Print the grid after every tick in which a parcel moved
    pub render: bool,
    /// Write a snapshot after every `n` ticks
    pub snapshot_interval: Option<u64>,
    pub snapshot_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 1_000_000,
            render: true,
            snapshot_interval: None,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub propagating_ticks: u64,
    pub snapshots_written: u64,
    pub elapsed: Duration,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport<P> {
    /// Zero-based index of the tick
    pub tick: u64,
    /// Whether any parcel moved
    pub propagated: bool,
    pub flow_epochs: usize,
    /// Net pressure change from force application and kinetic feedback
    pub total_delta_p: P,
}

/// Cellular fluid simulation over pressure type `P`, velocity type `V` and
/// flow type `VF`
pub struct FluidEngine<P, V, VF> {
    rows: usize,
    cols: usize,
    field: Grid<u8>,
    density: DensityTable<P>,
    gravity: V,
    pressure: Grid<P>,
    pressure_snapshot: Grid<P>,
    velocity: VectorField<V>,
    flow: VectorField<VF>,
    last_use: Grid<i64>,
    epoch: i64,
    neighbor_count: Grid<u8>,
    rng: StdRng,
    pool: TaskPool,
    tick: u64,
}

impl<P, V, VF> FluidEngine<P, V, VF>
where
    P: Scalar,
    V: Scalar + CommonType<VF>,
    VF: Scalar,
{
    pub fn new(scenario: Scenario<P, V>, config: &EngineConfig) -> EngineResult<Self> {
        let Scenario {
            rows,
            cols,
            field: layout,
            gravity,
            densities,
        } = scenario;

        if rows == 0 || cols == 0 {
            return Err(EngineError::InvalidArgument(format!("empty grid {rows}x{cols}")));
        }
        if layout.len() != rows || layout.iter().any(|row| row.len() != cols) {
            return Err(EngineError::InvalidArgument(format!(
                "grid rows do not match the declared {rows}x{cols} shape"
            )));
        }

        let mut density = DensityTable::default();
        for &(medium, value) in &densities {
            if medium == WALL {
                return Err(EngineError::InvalidArgument("walls cannot have a density".into()));
            }
            if density.insert(medium, value).is_some() {
                return Err(EngineError::InvalidArgument(format!(
                    "duplicate density for medium '{}'",
                    medium as char
                )));
            }
        }

        let mut field = Grid::new(rows, cols);
        for (x, row) in layout.iter().enumerate() {
            if let Some(y) = row
                .iter()
                .position(|&medium| medium != WALL && density.get(medium).is_none())
            {
                return Err(EngineError::InvalidArgument(format!(
                    "medium '{}' at ({x}, {y}) has no density",
                    row[y] as char
                )));
            }
            field.row_mut(x).copy_from_slice(row);
        }

        let mut engine = Self {
            rows,
            cols,
            field,
            density,
            gravity,
            pressure: Grid::new(rows, cols),
            pressure_snapshot: Grid::new(rows, cols),
            velocity: VectorField::new(rows, cols),
            flow: VectorField::new(rows, cols),
            last_use: Grid::new(rows, cols),
            epoch: 0,
            neighbor_count: Grid::new(rows, cols),
            rng: StdRng::seed_from_u64(config.seed),
            pool: TaskPool::new(config.worker_threads)?,
            tick: 0,
        };
        engine.count_neighbors();

        log::info!(
            "Fluid engine ready: {}x{} grid, {} fluid cells, {} workers, seed {}",
            rows,
            cols,
            engine.fluid_cells(),
            engine.pool.threads(),
            config.seed
        );
        Ok(engine)
    }

    pub fn from_path(path: impl AsRef<Path>, config: &EngineConfig) -> EngineResult<Self> {
        Self::new(Scenario::load(path)?, config)
    }

    fn band_height(&self) -> usize {
        self.rows.div_ceil(self.pool.threads()).max(1)
    }

    fn count_neighbors(&mut self) {
        let band_height = self.band_height();
        let Self {
            pool,
            field,
            neighbor_count,
            cols,
            ..
        } = self;
        let field: &Grid<u8> = field;

        pool.scope(|scope| {
            for mut band in row_bands_mut(neighbor_count.as_mut_slice(), *cols, band_height) {
                scope.submit(move || {
                    for ((x, y), count) in band.iter_mut() {
                        *count = if *field.get(x, y) == WALL {
                            0
                        } else {
                            Direction::ALL
                                .into_iter()
                                .filter(|&direction| open_neighbor(field, x, y, direction).is_some())
                                .count() as u8
                        };
                    }
                });
            }
        });
    }

    /// Adds gravity to the downward velocity of every fluid cell resting on
    /// fluid.
    pub fn apply_gravity(&mut self) {
        let band_height = self.band_height();
        let Self {
            pool,
            field,
            velocity,
            gravity,
            cols,
            ..
        } = self;
        let field: &Grid<u8> = field;
        let gravity = *gravity;

        pool.scope(|scope| {
            for mut band in row_bands_mut(velocity.cells_mut(), *cols, band_height) {
                scope.submit(move || {
                    for ((x, y), cell) in band.iter_mut() {
                        if *field.get(x, y) != WALL && open_neighbor(field, x, y, Direction::Down).is_some() {
                            cell[Direction::Down.index()] += gravity;
                        }
                    }
                });
            }
        });
    }

    /// Converts pressure differences into velocity.
    ///
    /// Returns the net pressure change.
    pub fn apply_pressure_forces(&mut self) -> P {
        self.snapshot_pressure();

        let mut total_delta_p = P::zero();
        for x in 0..self.rows {
            for y in 0..self.cols {
                let medium = *self.field.get(x, y);
                if medium == WALL {
                    continue;
                }
                let here = *self.pressure_snapshot.get(x, y);

                for direction in Direction::ALL {
                    let Some((nx, ny)) = open_neighbor(&self.field, x, y, direction) else {
                        continue;
                    };
                    let there = *self.pressure_snapshot.get(nx, ny);
                    if there >= here {
                        continue;
                    }

                    let mut force = here - there;
                    let neighbor_density = self.density.of(*self.field.get(nx, ny));
                    let contribution = self.velocity.at_mut(nx, ny, direction.opposite());
                    let contribution_force = contribution.cast::<P>() * neighbor_density;
                    if contribution_force >= force {
                        *contribution -= (force / neighbor_density).cast::<V>();
                        continue;
                    }
                    force -= contribution_force;
                    *contribution = V::zero();

                    *self.velocity.at_mut(x, y, direction) += (force / self.density.of(medium)).cast::<V>();
                    let share = force / P::from_int(i32::from(*self.neighbor_count.get(x, y)));
                    *self.pressure.get_mut(x, y) -= share;
                    total_delta_p -= share;
                }
            }
        }
        total_delta_p
    }

    fn snapshot_pressure(&mut self) {
        let Self {
            pool,
            pressure,
            pressure_snapshot,
            ..
        } = self;

        pool.scope(|scope| {
            let targets = pressure_snapshot.as_mut_slice().chunks_mut(COPY_CHUNK);
            for (target, source) in targets.zip(pressure.as_slice().chunks(COPY_CHUNK)) {
                scope.submit(move || target.copy_from_slice(source));
            }
        });
    }

    /// Relaxes the flow field against the current velocities.
    ///
    /// Returns the number of flow epochs it took.
    pub fn recalc_flow(&mut self) -> usize {
        let epochs = self.traversal().relax_flow();
        log::debug!("Flow relaxed in {} epochs", epochs);
        epochs
    }

    /// Replaces velocities by the realized flow and turns the lost kinetic
    /// energy into pressure.
    ///
    /// Cells are processed in three passes by `row mod 3`; a cell only writes
    /// pressure in its own row and the two adjacent ones, so the tasks of one
    /// pass never overlap. Returns the net pressure change.
    pub fn recalc_pressure(&mut self) -> P {
        let Self {
            pool,
            field,
            density,
            pressure,
            velocity,
            flow,
            neighbor_count,
            cols,
            ..
        } = self;
        let (field, density, flow, neighbor_count) = (&*field, &*density, &*flow, &*neighbor_count);
        let cols = *cols;

        let mut total_delta_p = P::zero();
        for class in 0..3 {
            let windows = row_windows_mut(pressure.as_mut_slice(), cols, class);
            let velocity_rows = velocity
                .cells_mut()
                .chunks_mut(cols)
                .enumerate()
                .filter(|(x, _)| x % 3 == class)
                .map(|(_, row)| row);
            let mut partials = vec![P::zero(); windows.len()];

            pool.scope(|scope| {
                for ((mut window, velocity_row), partial) in windows.into_iter().zip(velocity_rows).zip(partials.iter_mut()) {
                    scope.submit(move || {
                        *partial = kinetic_feedback_row::<P, V, VF>(
                            &mut window,
                            velocity_row,
                            field,
                            density,
                            flow,
                            neighbor_count,
                        );
                    });
                }
            });

            // summed in row order, independent of task completion order
            for partial in partials {
                total_delta_p += partial;
            }
        }
        total_delta_p
    }

    /// Stochastic parcel propagation. Returns whether any parcel moved.
    pub fn maybe_propagate(&mut self) -> bool {
        self.traversal().propagate_parcels()
    }

    fn traversal(&mut self) -> Traversal<'_, P, V, VF, StdRng> {
        Traversal::new(
            &mut self.field,
            &mut self.pressure,
            &mut self.velocity,
            &mut self.flow,
            &mut self.last_use,
            &mut self.epoch,
            &mut self.rng,
        )
    }

    /// Runs the full pipeline once.
    pub fn tick(&mut self) -> TickReport<P> {
        let tick = self.tick;

        self.apply_gravity();
        let mut total_delta_p = self.apply_pressure_forces();
        let flow_epochs = self.recalc_flow();
        total_delta_p += self.recalc_pressure();
        let propagated = self.maybe_propagate();

        self.tick += 1;
        log::trace!(
            "Tick {}: propagated={}, flow epochs={}, delta p={}",
            tick,
            propagated,
            flow_epochs,
            total_delta_p
        );

        TickReport {
            tick,
            propagated,
            flow_epochs,
            total_delta_p,
        }
    }

    /// Runs with rendering on stdout.
    pub fn run(&mut self, options: &RunOptions) -> EngineResult<RunSummary> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_with_output(options, &mut out)
    }

    pub fn run_with_output<W: Write>(&mut self, options: &RunOptions, out: &mut W) -> EngineResult<RunSummary> {
        let started = Instant::now();
        let snapshot_interval = options.snapshot_interval.filter(|&interval| interval > 0);
        let mut summary = RunSummary::default();

        for _ in 0..options.ticks {
            let report = self.tick();

            if report.propagated {
                summary.propagating_ticks += 1;
                if options.render {
                    write!(out, "Tick {}:\n{}\n", report.tick, self.render_field())
                        .map_err(|source| EngineError::io("<output>", source))?;
                }
            }

            if let Some(interval) = snapshot_interval {
                if (report.tick + 1) % interval == 0 {
                    write_snapshot(&self.snapshot(), &options.snapshot_dir, report.tick)?;
                    summary.snapshots_written += 1;
                }
            }
        }
        out.flush().map_err(|source| EngineError::io("<output>", source))?;

        summary.ticks = options.ticks;
        summary.elapsed = started.elapsed();
        log::debug!(
            "{} of {} ticks propagated, {} snapshots",
            summary.propagating_ticks,
            summary.ticks,
            summary.snapshots_written
        );
        Ok(summary)
    }

    /// Current obstacle map, gravity and the densities of media present
    pub fn snapshot(&self) -> Scenario<P, V> {
        let field = (0..self.rows).map(|x| self.field.row(x).to_vec()).collect();
        let densities = self
            .medium_counts()
            .into_iter()
            .map(|(medium, _)| (medium, self.density.of(medium)))
            .collect();

        Scenario {
            rows: self.rows,
            cols: self.cols,
            field,
            gravity: self.gravity,
            densities,
        }
    }

    /// Grid rows, each terminated by a newline
    pub fn render_field(&self) -> String {
        let mut text = String::with_capacity(self.rows * (self.cols + 1));
        for x in 0..self.rows {
            text.extend(self.field.row(x).iter().map(|&medium| medium as char));
            text.push('\n');
        }
        text
    }

    /// Number of cells per non-wall medium, in byte order
    pub fn medium_counts(&self) -> Vec<(u8, usize)> {
        let mut counts = [0usize; 256];
        for &medium in self.field.as_slice() {
            counts[medium as usize] += 1;
        }
        counts
            .iter()
            .enumerate()
            .filter(|&(medium, &count)| count > 0 && medium as u8 != WALL)
            .map(|(medium, &count)| (medium as u8, count))
            .collect()
    }

    fn fluid_cells(&self) -> usize {
        self.field.as_slice().iter().filter(|&&medium| medium != WALL).count()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn medium(&self, x: usize, y: usize) -> u8 {
        *self.field.get(x, y)
    }

    pub fn pressure(&self, x: usize, y: usize) -> P {
        *self.pressure.get(x, y)
    }

    pub fn velocity(&self, x: usize, y: usize, direction: Direction) -> V {
        self.velocity.at(x, y, direction)
    }

    pub fn flow(&self, x: usize, y: usize, direction: Direction) -> VF {
        self.flow.at(x, y, direction)
    }

    pub fn neighbor_count(&self, x: usize, y: usize) -> u8 {
        *self.neighbor_count.get(x, y)
    }

    pub fn density(&self, medium: u8) -> Option<P> {
        self.density.get(medium)
    }

    pub fn gravity(&self) -> V {
        self.gravity
    }

    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    /// Ticks run so far
    pub fn ticks_done(&self) -> u64 {
        self.tick
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.threads()
    }

    #[cfg(test)]
    pub(crate) fn set_pressure(&mut self, x: usize, y: usize, value: P) {
        *self.pressure.get_mut(x, y) = value;
    }

    #[cfg(test)]
    pub(crate) fn set_velocity(&mut self, x: usize, y: usize, direction: Direction, value: V) {
        *self.velocity.at_mut(x, y, direction) = value;
    }
}

/// Kinetic feedback for the center row of `window`. Returns the pressure
/// added.
fn kinetic_feedback_row<P, V, VF>(
    window: &mut crate::grid::RowWindow<'_, P>,
    velocity_row: &mut [[V; 4]],
    field: &Grid<u8>,
    density: &DensityTable<P>,
    flow: &VectorField<VF>,
    neighbor_count: &Grid<u8>,
) -> P
where
    P: Scalar,
    V: Scalar + CommonType<VF>,
    VF: Scalar,
{
    let x = window.center;
    let damping = P::from_f64(KINETIC_DAMPING);
    let mut added = P::zero();

    for (y, cell) in velocity_row.iter_mut().enumerate() {
        let medium = *field.get(x, y);
        if medium == WALL {
            continue;
        }
        let rho = density.of(medium);

        for direction in Direction::ALL {
            let old_v = cell[direction.index()];
            if old_v <= V::zero() {
                continue;
            }
            let new_v = flow.at(x, y, direction);
            let old_c: Common<V, VF> = old_v.cast();
            let new_c: Common<V, VF> = new_v.cast();
            assert!(
                new_c <= old_c,
                "flow {new_c} exceeds velocity {old_c} at ({x}, {y}) towards {direction:?}"
            );
            cell[direction.index()] = new_v.cast();

            let mut force = (old_c - new_c).cast::<P>() * rho;
            if medium == DAMPED_MEDIUM {
                force *= damping;
            }

            let (tx, ty) = open_neighbor(field, x, y, direction).unwrap_or((x, y));
            let share = force / P::from_int(i32::from(*neighbor_count.get(tx, ty)));
            *window.get_mut(tx, ty) += share;
            added += share;
        }
    }
    added
}
