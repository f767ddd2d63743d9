//! Stencil executors.
//!
//! Every execution strategy implements [`Executor`]. A strategy owns the grid
//! and advances it by whole generations; [`ExecutionStrategy`] selects one of
//! them from the configuration and the grid size, and [`SingleQueueExecutor`]
//! runs it behind an in-order [`ExecutionQueue`](stencilstream_core::ExecutionQueue).

mod kernel;
mod monotile;
mod single_queue;
mod tiling;

pub use monotile::MonotileExecutor;
pub use single_queue::SingleQueueExecutor;
pub use tiling::TilingExecutor;

use stencilstream_core::config::{StencilConfig, StrategyKind};
use stencilstream_core::error::{Result, StencilError};
use stencilstream_core::index::Uid;
use stencilstream_core::sample::{RuntimeRecorder, RuntimeSample};
use tracing::{info, warn};

use crate::stencil::{Cell, TransitionFunction};
use crate::tiling::Grid;

/// Common interface of all execution strategies.
pub trait Executor {
    /// Cell type of the grid.
    type Cell: Cell;
    /// Transition function applied to every cell.
    type TransFunc: TransitionFunction<Self::Cell>;

    /// Dimensions of the grid.
    fn get_grid_range(&self) -> Uid;

    /// The transition function.
    fn get_trans_func(&self) -> &Self::TransFunc;

    /// Value of every cell outside the grid.
    fn get_halo_value(&self) -> Self::Cell;

    /// Number of generations computed so far.
    fn get_i_generation(&self) -> u64;

    /// Replace the grid. The generation index is kept.
    fn set_input(&mut self, grid: Grid<Self::Cell>) -> Result<()>;

    /// Copy of the current grid.
    fn copy_output(&self) -> Grid<Self::Cell>;

    /// Advance the grid by `n_generations`.
    ///
    /// Either every generation is committed or the grid is left untouched.
    fn advance(&mut self, n_generations: u64) -> Result<()>;

    /// Snapshot of the passes recorded since the last reset.
    fn get_runtime_sample(&self) -> RuntimeSample;

    /// Forget all recorded passes.
    fn reset_runtime_sample(&self);

    /// Advance the grid by a signed number of generations.
    ///
    /// Negative counts are rejected and leave the grid untouched.
    fn run(&mut self, n_generations: i64) -> Result<()> {
        let n_generations = u64::try_from(n_generations).map_err(|_| {
            StencilError::invalid_argument(format!(
                "number of generations must not be negative, got {}",
                n_generations
            ))
        })?;
        self.advance(n_generations)
    }
}

/// State shared by every strategy.
#[derive(Debug)]
pub(crate) struct ExecutorState<T, F> {
    pub(crate) grid: Grid<T>,
    pub(crate) trans_func: F,
    pub(crate) halo_value: T,
    pub(crate) config: StencilConfig,
    pub(crate) i_generation: u64,
    pub(crate) recorder: RuntimeRecorder,
}

impl<T: Cell, F: TransitionFunction<T>> ExecutorState<T, F> {
    pub(crate) fn new(config: StencilConfig, grid: Grid<T>, trans_func: F, halo_value: T) -> Result<Self> {
        config.validate()?;
        Self::check_geometry(&config, &grid)?;
        Ok(Self {
            grid,
            trans_func,
            halo_value,
            config,
            i_generation: 0,
            recorder: RuntimeRecorder::new(),
        })
    }

    pub(crate) fn check_geometry(config: &StencilConfig, grid: &Grid<T>) -> Result<()> {
        if grid.geometry() != &config.geometry {
            return Err(StencilError::invalid_argument(format!(
                "grid geometry {:?} does not match the configured geometry {:?}",
                grid.geometry(),
                config.geometry
            )));
        }
        Ok(())
    }

    pub(crate) fn set_input(&mut self, grid: Grid<T>) -> Result<()> {
        Self::check_geometry(&self.config, &grid)?;
        self.grid = grid;
        Ok(())
    }

    /// Generation index after advancing by `n_generations`.
    pub(crate) fn target_generation(&self, n_generations: u64) -> Result<u64> {
        self.i_generation.checked_add(n_generations).ok_or_else(|| {
            StencilError::invalid_argument(format!(
                "advancing generation {} by {} overflows the generation index",
                self.i_generation, n_generations
            ))
        })
    }
}

/// Whether `grid` fits into a single tile of `config`.
pub(crate) fn fits_single_tile<T: Copy>(config: &StencilConfig, grid: &Grid<T>) -> bool {
    let range = grid.get_grid_range();
    range.c <= config.geometry.tile_width && range.r <= config.geometry.tile_height
}

/// The strategy chosen for one executor.
#[derive(Debug)]
pub enum ExecutionStrategy<T, F> {
    /// The whole grid stays resident in one tile.
    Monotile(MonotileExecutor<T, F>),
    /// The grid is decomposed into tiles with halo margins.
    Tiling(TilingExecutor<T, F>),
}

impl<T: Cell, F: TransitionFunction<T>> ExecutionStrategy<T, F> {
    /// Pick a strategy for `grid` according to `config.strategy`.
    ///
    /// `Auto` uses monotile whenever the grid fits into one tile. Forcing
    /// monotile on a grid that does not fit fails with `CapacityExceeded`.
    pub fn select(config: StencilConfig, grid: Grid<T>, trans_func: F, halo_value: T) -> Result<Self> {
        let fits = fits_single_tile(&config, &grid);
        let range = grid.get_grid_range();
        let requested = config.strategy;

        let strategy = match requested {
            StrategyKind::Auto if fits => {
                Self::Monotile(MonotileExecutor::new(config, grid, trans_func, halo_value)?)
            }
            StrategyKind::Auto => Self::Tiling(TilingExecutor::new(config, grid, trans_func, halo_value)?),
            StrategyKind::Monotile => {
                Self::Monotile(MonotileExecutor::new(config, grid, trans_func, halo_value)?)
            }
            StrategyKind::Tiling => {
                if fits {
                    warn!(
                        "Tiling forced for grid {}x{} that fits into a single tile",
                        range.c, range.r
                    );
                }
                Self::Tiling(TilingExecutor::new(config, grid, trans_func, halo_value)?)
            }
        };

        info!("Selected {:?} strategy for grid {}x{}", strategy.kind(), range.c, range.r);
        Ok(strategy)
    }

    /// The selected strategy.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Monotile(_) => StrategyKind::Monotile,
            Self::Tiling(_) => StrategyKind::Tiling,
        }
    }

    /// Handle to the recorder the strategy writes passes into.
    pub fn recorder(&self) -> RuntimeRecorder {
        match self {
            Self::Monotile(executor) => executor.recorder(),
            Self::Tiling(executor) => executor.recorder(),
        }
    }

    fn inner(&self) -> &dyn Executor<Cell = T, TransFunc = F> {
        match self {
            Self::Monotile(executor) => executor,
            Self::Tiling(executor) => executor,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Executor<Cell = T, TransFunc = F> {
        match self {
            Self::Monotile(executor) => executor,
            Self::Tiling(executor) => executor,
        }
    }
}

impl<T: Cell, F: TransitionFunction<T>> Executor for ExecutionStrategy<T, F> {
    type Cell = T;
    type TransFunc = F;

    fn get_grid_range(&self) -> Uid {
        self.inner().get_grid_range()
    }

    fn get_trans_func(&self) -> &F {
        self.inner().get_trans_func()
    }

    fn get_halo_value(&self) -> T {
        self.inner().get_halo_value()
    }

    fn get_i_generation(&self) -> u64 {
        self.inner().get_i_generation()
    }

    fn set_input(&mut self, grid: Grid<T>) -> Result<()> {
        self.inner_mut().set_input(grid)
    }

    fn copy_output(&self) -> Grid<T> {
        self.inner().copy_output()
    }

    fn advance(&mut self, n_generations: u64) -> Result<()> {
        self.inner_mut().advance(n_generations)
    }

    fn get_runtime_sample(&self) -> RuntimeSample {
        self.inner().get_runtime_sample()
    }

    fn reset_runtime_sample(&self) {
        self.inner().reset_runtime_sample()
    }
}
