//! # StencilStream
//!
//! Execution engine for iterative 2D stencil computations.
//!
//! A stencil computation repeatedly applies a transition function to every
//! cell of a grid; the new value of a cell depends on a small square
//! neighborhood of the previous generation. This crate runs such computations
//! on domains of any size:
//!
//! - [`tiling`] - The grid, its decomposition into tiles with halo margins,
//!   and burst-aligned transfers between backing storage and local buffers
//! - [`stencil`] - The [`Stencil`] window and the [`TransitionFunction`] trait
//! - [`executor`] - Monotile and tiling strategies, and the
//!   [`SingleQueueExecutor`] that runs them through an in-order queue
//!
//! ## Example
//!
//! ```
//! use stencilstream::prelude::*;
//!
//! let config = StencilConfig::builder()
//!     .tile(8, 8)
//!     .burst_length(4)
//!     .strategy(StrategyKind::Tiling)
//!     .build()
//!     .unwrap();
//!
//! // A single live cell that spreads to its right neighbor every generation.
//! let mut columns = vec![vec![false; 4]; 20];
//! columns[0][2] = true;
//!
//! let spread = |s: &Stencil<bool>| s[Id::new(0, 0)] || s[Id::new(-1, 0)];
//! let executor = SingleQueueExecutor::from_columns(config, columns, spread, false).unwrap();
//!
//! executor.run_blocking(10).unwrap();
//! let output = executor.copy_output();
//! assert_eq!(output.get(Uid::new(10, 2)), Some(true));
//! assert_eq!(output.get(Uid::new(11, 2)), Some(false));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod executor;
pub mod stencil;
pub mod tiling;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::executor::{
        ExecutionStrategy, Executor, MonotileExecutor, SingleQueueExecutor, TilingExecutor,
    };
    pub use crate::stencil::{Cell, Stencil, TransitionFunction};
    pub use crate::tiling::{Grid, IoKernel, LocalBuffer, Tile, TransferStats};
    pub use stencilstream_core::prelude::*;
}

// Re-exports for convenience
pub use executor::{ExecutionStrategy, Executor, SingleQueueExecutor};
pub use stencil::{Cell, Stencil, TransitionFunction};
pub use stencilstream_core::{
    Id, Result, RuntimeSample, StencilConfig, StencilError, StrategyKind, TileGeometry, Uid,
};
pub use tiling::Grid;
