//! Single-threaded graph walks over the grid
//!
//! Flow relaxation and parcel propagation are depth-first walks that use the
//! per-cell `last_use` stamps as their visited set. Within one epoch `E`:
//!
//! * `last_use < E - 1`: not visited yet
//! * `last_use == E - 1`: on the current walk's stack
//! * `last_use == E`: finished
//!
//! `Traversal` holds exclusive borrows of every array the walks touch, so
//! nothing else can run while one is alive.

use rand::Rng;

use crate::grid::{Direction, Grid, Matrix, VectorField};
use crate::numeric::{Common, CommonType, Scalar};
use crate::scenario::WALL;

use super::parcel::Parcel;

/// Neighbor of `(x, y)` in `direction` unless it is a wall or off the grid
#[inline]
pub(crate) fn open_neighbor(field: &Grid<u8>, x: usize, y: usize, direction: Direction) -> Option<(usize, usize)> {
    let (nx, ny) = direction.step(x, y, field.rows(), field.cols())?;
    (*field.get(nx, ny) != WALL).then_some((nx, ny))
}

/// Outcome of one `propagate_flow` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowPush<C> {
    /// Flow committed on the way out of the cell
    pub amount: C,
    /// Whether the walk found a cycle that still carries flow outwards
    pub open: bool,
    /// Cell that closed the cycle, meaningful only when `open`
    pub end: (usize, usize),
}

pub struct Traversal<'a, P, V, VF, R> {
    rows: usize,
    cols: usize,
    field: &'a mut Grid<u8>,
    pressure: &'a mut Grid<P>,
    velocity: &'a mut VectorField<V>,
    flow: &'a mut VectorField<VF>,
    last_use: &'a mut Grid<i64>,
    epoch: &'a mut i64,
    rng: &'a mut R,
}

impl<'a, P, V, VF, R> Traversal<'a, P, V, VF, R>
where
    P: Scalar,
    V: Scalar + CommonType<VF>,
    VF: Scalar,
    R: Rng,
{
    pub fn new(
        field: &'a mut Grid<u8>,
        pressure: &'a mut Grid<P>,
        velocity: &'a mut VectorField<V>,
        flow: &'a mut VectorField<VF>,
        last_use: &'a mut Grid<i64>,
        epoch: &'a mut i64,
        rng: &'a mut R,
    ) -> Self {
        Self {
            rows: field.rows(),
            cols: field.cols(),
            field,
            pressure,
            velocity,
            flow,
            last_use,
            epoch,
            rng,
        }
    }

    /// Starts a new epoch; every stamp from earlier epochs reads as unvisited.
    pub fn begin_epoch(&mut self) -> i64 {
        *self.epoch += 2;
        *self.epoch
    }

    #[inline]
    fn stamp(&self, x: usize, y: usize) -> i64 {
        *self.last_use.get(x, y)
    }

    #[inline]
    fn set_stamp(&mut self, x: usize, y: usize, stamp: i64) {
        *self.last_use.get_mut(x, y) = stamp;
    }

    #[inline]
    fn open_neighbor(&self, x: usize, y: usize, direction: Direction) -> Option<(usize, usize)> {
        open_neighbor(self.field, x, y, direction)
    }

    fn is_fluid(&self, x: usize, y: usize) -> bool {
        *self.field.get(x, y) != WALL
    }

    /// Adds `amount` to the flow out of `(x, y)`, never past the velocity
    /// capacity of that edge.
    fn commit_flow(&mut self, x: usize, y: usize, direction: Direction, amount: Common<V, VF>) {
        let capacity: Common<V, VF> = self.velocity.at(x, y, direction).cast();
        let used: Common<V, VF> = self.flow.at(x, y, direction).cast();
        let total = (used + amount).min_with(capacity);
        *self.flow.at_mut(x, y, direction) = total.cast_at_most();
    }

    /// Pushes up to `limit` units of flow out of `(x, y)` along edges with
    /// spare velocity capacity, looking for a cycle back into the walk.
    pub fn propagate_flow(&mut self, x: usize, y: usize, limit: Common<V, VF>) -> FlowPush<Common<V, VF>> {
        let epoch = *self.epoch;
        self.set_stamp(x, y, epoch - 1);
        let mut total = Common::<V, VF>::zero();

        for direction in Direction::ALL {
            let Some((nx, ny)) = self.open_neighbor(x, y, direction) else {
                continue;
            };
            if self.stamp(nx, ny) >= epoch {
                continue;
            }

            let capacity: Common<V, VF> = self.velocity.at(x, y, direction).cast();
            let used: Common<V, VF> = self.flow.at(x, y, direction).cast();
            let spare = capacity - used;
            if spare.is_zero_approx() {
                continue;
            }
            let amount = limit.min_with(spare);

            if self.stamp(nx, ny) == epoch - 1 {
                self.commit_flow(x, y, direction, amount);
                self.set_stamp(x, y, epoch);
                return FlowPush {
                    amount,
                    open: true,
                    end: (nx, ny),
                };
            }

            let pushed = self.propagate_flow(nx, ny, amount);
            total += pushed.amount;
            if pushed.open {
                self.commit_flow(x, y, direction, pushed.amount);
                self.set_stamp(x, y, epoch);
                // a cycle closed at this very cell carries nothing further out
                return FlowPush {
                    amount: pushed.amount,
                    open: pushed.end != (x, y),
                    end: pushed.end,
                };
            }
        }

        self.set_stamp(x, y, epoch);
        FlowPush {
            amount: total,
            open: false,
            end: (0, 0),
        }
    }

    /// Clears the flow field and repeats flow epochs until none moves flow.
    ///
    /// Returns the number of epochs used.
    pub fn relax_flow(&mut self) -> usize {
        self.flow.reset();
        let unit = Common::<V, VF>::from_int(1);
        let mut epochs = 0;

        loop {
            let epoch = self.begin_epoch();
            epochs += 1;
            let mut moved = false;

            for x in 0..self.rows {
                for y in 0..self.cols {
                    if self.is_fluid(x, y) && self.stamp(x, y) != epoch {
                        let pushed = self.propagate_flow(x, y, unit);
                        if pushed.amount > Common::<V, VF>::zero() {
                            moved = true;
                        }
                    }
                }
            }

            if !moved {
                return epochs;
            }
        }
    }

    /// Sum of non-negative outgoing velocities towards unfinished neighbors
    pub fn move_prob(&self, x: usize, y: usize) -> V {
        let epoch = *self.epoch;
        let mut sum = V::zero();
        for direction in Direction::ALL {
            let Some((nx, ny)) = self.open_neighbor(x, y, direction) else {
                continue;
            };
            if self.stamp(nx, ny) == epoch {
                continue;
            }
            let v = self.velocity.at(x, y, direction);
            if v < V::zero() {
                continue;
            }
            sum += v;
        }
        sum
    }

    /// Random walk that moves parcels along positive velocities.
    ///
    /// On success every parcel on the walk (except the first) is exchanged
    /// with its successor, shifting the chain by one cell.
    pub fn propagate_move(&mut self, x: usize, y: usize, is_first: bool) -> bool {
        let epoch = *self.epoch;
        self.set_stamp(x, y, epoch - i64::from(is_first));

        let mut moved = false;
        let mut target = (x, y);
        loop {
            let mut cumulative = [V::zero(); 4];
            let mut sum = V::zero();
            let mut last_weighted = None;
            for direction in Direction::ALL {
                if let Some((nx, ny)) = self.open_neighbor(x, y, direction) {
                    let v = self.velocity.at(x, y, direction);
                    if self.stamp(nx, ny) != epoch && v >= V::zero() {
                        sum += v;
                        if v > V::zero() {
                            last_weighted = Some(direction.index());
                        }
                    }
                }
                cumulative[direction.index()] = sum;
            }

            if sum == V::zero() {
                break;
            }

            let draw = V::random01(&mut *self.rng) * sum;
            let index = match cumulative.partition_point(|&c| c <= draw) {
                upper if upper < cumulative.len() => upper,
                // a draw rounded up to `sum` falls back to the last weighted edge
                _ => last_weighted.unwrap_or(cumulative.len() - 1),
            };
            let direction = Direction::ALL[index];

            let Some((nx, ny)) = self.open_neighbor(x, y, direction) else {
                panic!("parcel walk from ({x}, {y}) picked blocked direction {direction:?}");
            };
            assert!(
                self.velocity.at(x, y, direction) > V::zero() && self.stamp(nx, ny) < epoch,
                "parcel walk from ({x}, {y}) picked exhausted direction {direction:?}"
            );

            target = (nx, ny);
            moved = self.stamp(nx, ny) == epoch - 1 || self.propagate_move(nx, ny, false);
            if moved {
                break;
            }
        }

        self.set_stamp(x, y, epoch);
        for direction in Direction::ALL {
            if let Some((nx, ny)) = self.open_neighbor(x, y, direction) {
                if self.stamp(nx, ny) < epoch - 1 && self.velocity.at(x, y, direction) < V::zero() {
                    self.propagate_stop(nx, ny, false);
                }
            }
        }

        if moved && !is_first {
            let (nx, ny) = target;
            let mut parcel = Parcel::<P, V>::default();
            parcel.swap_with(self.field, self.pressure, self.velocity, x, y);
            parcel.swap_with(self.field, self.pressure, self.velocity, nx, ny);
            parcel.swap_with(self.field, self.pressure, self.velocity, x, y);
        }
        moved
    }

    /// Marks `(x, y)` finished for this epoch, then spreads to neighbors
    /// that have no positive velocity left into unvisited cells.
    pub fn propagate_stop(&mut self, x: usize, y: usize, force: bool) {
        let epoch = *self.epoch;
        if !force {
            let still_flowing = Direction::ALL.into_iter().any(|direction| {
                self.open_neighbor(x, y, direction).is_some_and(|(nx, ny)| {
                    self.stamp(nx, ny) < epoch - 1 && self.velocity.at(x, y, direction) > V::zero()
                })
            });
            if still_flowing {
                return;
            }
        }

        self.set_stamp(x, y, epoch);
        for direction in Direction::ALL {
            let Some((nx, ny)) = self.open_neighbor(x, y, direction) else {
                continue;
            };
            if self.stamp(nx, ny) == epoch || self.velocity.at(x, y, direction) > V::zero() {
                continue;
            }
            self.propagate_stop(nx, ny, false);
        }
    }

    /// One stochastic propagation sweep over the grid.
    ///
    /// Returns whether any parcel walk succeeded.
    pub fn propagate_parcels(&mut self) -> bool {
        let epoch = self.begin_epoch();
        let mut moved = false;

        for x in 0..self.rows {
            for y in 0..self.cols {
                if !self.is_fluid(x, y) || self.stamp(x, y) == epoch {
                    continue;
                }
                let draw = V::random01(&mut *self.rng);
                if draw < self.move_prob(x, y) {
                    moved |= self.propagate_move(x, y, true);
                } else {
                    self.propagate_stop(x, y, true);
                }
            }
        }

        moved
    }
}
