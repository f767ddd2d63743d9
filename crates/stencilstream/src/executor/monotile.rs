//! Monotile execution.
//!
//! The whole grid is loaded into one local buffer bordered by `stencil_radius`
//! halo cells, advanced generation by generation without touching backing
//! storage, and written back once at the end of the call.

use std::time::Instant;

use stencilstream_core::config::StencilConfig;
use stencilstream_core::error::{Result, StencilError};
use stencilstream_core::index::{Id, Uid};
use stencilstream_core::sample::{RuntimeRecorder, RuntimeSample};
use tracing::{debug, info};

use super::kernel::ExecutionKernel;
use super::{Executor, ExecutorState};
use crate::stencil::{Cell, TransitionFunction};
use crate::tiling::{Grid, LocalBuffer};

/// Executor for grids that fit into a single tile.
#[derive(Debug)]
pub struct MonotileExecutor<T, F> {
    state: ExecutorState<T, F>,
}

impl<T: Cell, F: TransitionFunction<T>> MonotileExecutor<T, F> {
    /// Create an executor for `grid`.
    ///
    /// Fails with `CapacityExceeded` if the grid is larger than one tile.
    pub fn new(config: StencilConfig, grid: Grid<T>, trans_func: F, halo_value: T) -> Result<Self> {
        Self::check_capacity(&config, &grid)?;
        let state = ExecutorState::new(config, grid, trans_func, halo_value)?;

        let range = state.grid.get_grid_range();
        info!(
            "Monotile executor created: grid {}x{}, stencil radius {}",
            range.c, range.r, state.config.stencil_radius
        );
        Ok(Self { state })
    }

    fn check_capacity(config: &StencilConfig, grid: &Grid<T>) -> Result<()> {
        if !super::fits_single_tile(config, grid) {
            return Err(StencilError::CapacityExceeded {
                grid: grid.get_grid_range(),
                tile: config.geometry.tile_range(),
            });
        }
        Ok(())
    }

    /// Handle to the runtime recorder.
    pub fn recorder(&self) -> RuntimeRecorder {
        self.state.recorder.clone()
    }

    /// Configuration of this executor.
    pub fn config(&self) -> &StencilConfig {
        &self.state.config
    }
}

impl<T: Cell, F: TransitionFunction<T>> Executor for MonotileExecutor<T, F> {
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
        Self::check_capacity(&self.state.config, &grid)?;
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

        let state = &mut self.state;
        let radius = state.config.stencil_radius;
        let range = state.grid.get_grid_range();
        let margin = Uid::new(radius, radius);
        let origin = Id::new(-(radius as isize), -(radius as isize));

        let mut src = LocalBuffer::filled(range + margin + margin, state.halo_value);
        for c in 0..range.c {
            src.column_mut(c + radius)[radius..radius + range.r].copy_from_slice(state.grid.column(c));
        }
        let mut dst = src.clone();

        let kernel = ExecutionKernel::new(&state.trans_func, radius, state.halo_value, range);
        let pipeline_length = state.config.monotile_pipeline_length() as u64;
        let mut generation = state.i_generation;

        while generation < target {
            let steps = pipeline_length.min(target - generation);
            let start = Instant::now();

            for _ in 0..steps {
                kernel.step(&src, &mut dst, margin, margin + range, origin, generation);
                std::mem::swap(&mut src, &mut dst);
                generation += 1;
            }

            if state.config.runtime_analysis {
                state.recorder.add_pass(start.elapsed(), range.area() as u64 * steps);
            }
            debug!("Monotile pass: {} generations, now at generation {}", steps, generation);
        }

        for c in 0..range.c {
            state
                .grid
                .column_mut(c)
                .copy_from_slice(&src.column(c + radius)[radius..radius + range.r]);
        }
        state.i_generation = target;
        Ok(())
    }

    fn get_runtime_sample(&self) -> RuntimeSample {
        self.state.recorder.sample()
    }

    fn reset_runtime_sample(&self) {
        self.state.recorder.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::Stencil;

    fn config() -> StencilConfig {
        StencilConfig::builder()
            .tile(8, 8)
            .burst_length(4)
            .halo_radius(2)
            .build()
            .unwrap()
    }

    fn count_live(stencil: &Stencil<u8>) -> u8 {
        let mut alive = 0;
        for c in -1..=1 {
            for r in -1..=1 {
                if (c, r) != (0, 0) {
                    alive += stencil[Id::new(c, r)];
                }
            }
        }
        match (stencil[Id::new(0, 0)], alive) {
            (1, 2) | (_, 3) => 1,
            _ => 0,
        }
    }

    #[test]
    fn test_capacity_exceeded() {
        let grid: Grid<u8> = Grid::new(9, 8, config().geometry).unwrap();
        let result = MonotileExecutor::new(config(), grid, count_live, 0);
        assert_eq!(
            result.err(),
            Some(StencilError::CapacityExceeded {
                grid: Uid::new(9, 8),
                tile: Uid::new(8, 8),
            })
        );
    }

    #[test]
    fn test_set_input_capacity() {
        let grid: Grid<u8> = Grid::new(8, 8, config().geometry).unwrap();
        let mut executor = MonotileExecutor::new(config(), grid, count_live, 0).unwrap();

        let too_big: Grid<u8> = Grid::new(8, 12, config().geometry).unwrap();
        assert!(matches!(
            executor.set_input(too_big),
            Err(StencilError::CapacityExceeded { .. })
        ));
        assert_eq!(executor.get_grid_range(), Uid::new(8, 8));
    }

    #[test]
    fn test_blinker_oscillates() {
        // Vertical blinker in column 2, rows 1..4.
        let mut columns = vec![vec![0u8; 5]; 5];
        for row in 1..4 {
            columns[2][row] = 1;
        }
        let grid = Grid::from_columns(columns.clone(), config().geometry).unwrap();
        let mut executor = MonotileExecutor::new(config(), grid, count_live, 0).unwrap();

        executor.advance(1).unwrap();
        let horizontal = executor.copy_output().to_columns();
        for c in 0..5 {
            for r in 0..5 {
                let expected = u8::from(r == 2 && (1..4).contains(&c));
                assert_eq!(horizontal[c][r], expected);
            }
        }

        executor.advance(1).unwrap();
        assert_eq!(executor.copy_output().to_columns(), columns);
        assert_eq!(executor.get_i_generation(), 2);
    }

    #[test]
    fn test_passes_follow_pipeline_length() {
        let grid: Grid<u8> = Grid::new(4, 4, config().geometry).unwrap();
        let mut executor = MonotileExecutor::new(config(), grid, count_live, 0).unwrap();

        // Halo radius 2 and stencil radius 1: two generations per pass.
        executor.advance(5).unwrap();
        let sample = executor.get_runtime_sample();
        assert_eq!(sample.get_n_passes(), 3);
        assert_eq!(sample.cells_processed, 5 * 16);

        executor.reset_runtime_sample();
        assert_eq!(executor.get_runtime_sample().get_n_passes(), 0);
    }

    #[test]
    fn test_runtime_analysis_disabled() {
        let config = StencilConfig {
            runtime_analysis: false,
            ..config()
        };
        let grid: Grid<u8> = Grid::new(4, 4, config.geometry).unwrap();
        let mut executor = MonotileExecutor::new(config, grid, count_live, 0).unwrap();

        executor.advance(4).unwrap();
        assert_eq!(executor.get_runtime_sample(), RuntimeSample::default());
    }

    #[test]
    fn test_zero_generations() {
        let grid = Grid::filled(3, 3, 1u8, config().geometry).unwrap();
        let mut executor = MonotileExecutor::new(config(), grid.clone(), count_live, 0).unwrap();
        executor.advance(0).unwrap();
        assert_eq!(executor.copy_output(), grid);
        assert_eq!(executor.get_i_generation(), 0);
    }
}
