//! Tiled execution with halo erosion.
//!
//! Each pass loads every tile together with a halo margin of `halo_radius`
//! cells, advances the tile in local memory for up to
//! `halo_radius / stencil_radius` generations and writes back its interior.
//! Every generation invalidates `stencil_radius` cells at the border of the
//! local buffer, so the region that is computed shrinks with each step:
//!
//! ```text
//!  step 0        step 1        step 2
//!  +--------+    +--------+    +--------+
//!  |########|    |        |    |        |
//!  |########|    | ###### |    |        |
//!  |########|    | ###### |    |  ####  |   # = valid cells
//!  |########|    | ###### |    |  ####  |
//!  |########|    | ###### |    |        |
//!  |########|    |        |    |        |
//!  +--------+    +--------+    +--------+
//! ```
//!
//! After the last step the interior is still valid and is written back.
//! Tiles of a pass only read the grid committed by the previous pass, so they
//! are advanced in parallel.

use std::time::Instant;

use rayon::prelude::*;
use stencilstream_core::config::StencilConfig;
use stencilstream_core::error::Result;
use stencilstream_core::index::{Id, Uid};
use stencilstream_core::sample::{RuntimeRecorder, RuntimeSample};
use tracing::{debug, info, trace};

use super::kernel::ExecutionKernel;
use super::{Executor, ExecutorState};
use crate::stencil::{Cell, TransitionFunction};
use crate::tiling::{Grid, IoKernel, LocalBuffer, Tile, TransferStats};

/// Advance a loaded tile by up to `steps` generations.
///
/// `local` holds the halo-inclusive region of `tile` as produced by
/// [`IoKernel::load`]. The number of generations is capped by what the halo
/// margin allows. Returns the advanced buffer, whose interior is valid, and the
/// number of generations applied.
pub(crate) fn advance_tile<T: Cell, F: TransitionFunction<T>>(
    kernel: &ExecutionKernel<'_, T, F>,
    mut local: LocalBuffer<T>,
    tile: &Tile,
    steps: usize,
    generation: u64,
) -> (LocalBuffer<T>, usize) {
    let halo = tile.geometry().halo_radius;
    let radius = kernel.stencil_radius();
    let steps = steps.min(halo / radius);
    let range = local.range();
    let origin = Id::from(tile.get_interior_offset()) - Id::new(halo as isize, halo as isize);

    let mut scratch = local.clone();
    for step in 1..=steps {
        let margin = Uid::new(step * radius, step * radius);
        let end = range.saturating_sub(margin);
        kernel.step(&local, &mut scratch, margin, end, origin, generation + (step - 1) as u64);
        std::mem::swap(&mut local, &mut scratch);
    }

    (local, steps)
}

/// Executor that decomposes the grid into tiles.
#[derive(Debug)]
pub struct TilingExecutor<T, F> {
    state: ExecutorState<T, F>,
    io: IoKernel,
    transfers: TransferStats,
}

impl<T: Cell, F: TransitionFunction<T>> TilingExecutor<T, F> {
    /// Create an executor for `grid`.
    ///
    /// Fails with `InvalidArgument` if the halo radius is smaller than the
    /// stencil radius.
    pub fn new(config: StencilConfig, grid: Grid<T>, trans_func: F, halo_value: T) -> Result<Self> {
        config.validate_for_tiling()?;
        let state = ExecutorState::new(config, grid, trans_func, halo_value)?;
        let io = IoKernel::new(state.config.geometry);

        let range = state.grid.get_grid_range();
        let tiles = state.grid.get_tile_range();
        info!(
            "Tiling executor created: grid {}x{}, {}x{} tiles, {} generations per pass",
            range.c,
            range.r,
            tiles.c,
            tiles.r,
            state.config.generations_per_pass()
        );
        Ok(Self {
            state,
            io,
            transfers: TransferStats::default(),
        })
    }

    /// Handle to the runtime recorder.
    pub fn recorder(&self) -> RuntimeRecorder {
        self.state.recorder.clone()
    }

    /// Configuration of this executor.
    pub fn config(&self) -> &StencilConfig {
        &self.state.config
    }

    /// Tile transfers of every committed call to `advance`.
    pub fn get_transfer_stats(&self) -> TransferStats {
        self.transfers
    }
}

impl<T: Cell, F: TransitionFunction<T>> Executor for TilingExecutor<T, F> {
    type Cell = T;
    type TransFunc = F;

    fn get_grid_range(&self) -> Uid {
        self.state.grid.get_grid_range()
    }

    fn get_trans_func(&self) -> &F {
        &self.state.trans_func
    }

    fn get_halo_value(&self) -> T {
        self.state.halo_value
    }

    fn get_i_generation(&self) -> u64 {
        self.state.i_generation
    }

    fn set_input(&mut self, grid: Grid<T>) -> Result<()> {
        self.state.set_input(grid)
    }

    fn copy_output(&self) -> Grid<T> {
        self.state.grid.clone()
    }

    fn advance(&mut self, n_generations: u64) -> Result<()> {
        let target = self.state.target_generation(n_generations)?;
        if n_generations == 0 {
            return Ok(());
        }

        let state = &self.state;
        let io = &self.io;
        let range = state.grid.get_grid_range();
        let halo_value = state.halo_value;
        let per_pass = state.config.generations_per_pass() as u64;
        let kernel = ExecutionKernel::new(
            &state.trans_func,
            state.config.stencil_radius,
            halo_value,
            range,
        );

        // Scratch copy, committed once every pass has completed.
        let mut current = state.grid.clone();
        let tiles: Vec<Tile> = current.tiles().collect();
        let mut generation = state.i_generation;
        let mut transfers = TransferStats::default();

        while generation < target {
            let steps = per_pass.min(target - generation) as usize;
            let start = Instant::now();

            let advanced: Vec<(Tile, LocalBuffer<T>, TransferStats)> = tiles
                .par_iter()
                .map(|tile| {
                    let (local, stats) = io.load(&current, tile, halo_value);
                    let (local, applied) = advance_tile(&kernel, local, tile, steps, generation);
                    debug_assert_eq!(applied, steps);
                    (*tile, local, stats)
                })
                .collect();

            // Every tile has read the previous generation; interiors are disjoint.
            for (tile, local, stats) in &advanced {
                transfers += *stats + io.store(&mut current, tile, local);
            }

            generation += steps as u64;
            if state.config.runtime_analysis {
                state.recorder.add_pass(start.elapsed(), range.area() as u64 * steps as u64);
            }
            debug!(
                "Tiling pass: {} tiles, {} generations, now at generation {}",
                tiles.len(),
                steps,
                generation
            );
        }

        trace!(
            "Transfers: {} bursts read ({} padding cells), {} bursts written",
            transfers.bursts_read,
            transfers.padding_cells,
            transfers.bursts_written
        );

        self.state.grid = current;
        self.state.i_generation = target;
        self.transfers += transfers;
        Ok(())
    }

    fn get_runtime_sample(&self) -> RuntimeSample {
        self.state.recorder.sample()
    }

    fn reset_runtime_sample(&self) {
        self.state.recorder.reset()
    }
}
