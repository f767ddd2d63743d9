//! # StencilStream Core
//!
//! Core types for the StencilStream stencil execution engine.
//!
//! This crate provides the foundational pieces shared by every execution
//! strategy:
//!
//! - [`Uid`] / [`Id`] - `(column, row)` coordinates with a fixed
//!   column-major storage convention
//! - [`StencilConfig`] - Tile geometry, burst length and strategy selection
//! - [`StencilError`] - Error taxonomy of configuration and execution
//! - [`ExecutionQueue`] - In-order job queue with awaitable completion events
//! - [`RuntimeSample`] - Elapsed time and throughput of executed passes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod index;
pub mod queue;
pub mod sample;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{StencilConfig, StencilConfigBuilder, StrategyKind, TileGeometry};
    pub use crate::error::*;
    pub use crate::index::*;
    pub use crate::queue::{ExecutionQueue, QueueEvent, QueueStats};
    pub use crate::sample::{RuntimeRecorder, RuntimeSample};
}

// Re-exports for convenience
pub use config::{StencilConfig, StrategyKind, TileGeometry};
pub use error::{Result, StencilError};
pub use index::{GenericId, Id, Uid};
pub use queue::{ExecutionQueue, QueueEvent, QueueStats};
pub use sample::{RuntimeRecorder, RuntimeSample};
