//! Error types for stencil execution.

use thiserror::Error;

use crate::index::Uid;

/// Result type for stencil operations.
pub type Result<T> = std::result::Result<T, StencilError>;

/// Errors that can occur while configuring or running a stencil computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StencilError {
    /// A tile, part or cell index exceeds its configured range.
    #[error("{what} index {index} is out of bounds for range {range}")]
    OutOfBounds {
        /// What was indexed (e.g. "tile", "part").
        what: &'static str,
        /// The offending index.
        index: Uid,
        /// The valid range.
        range: Uid,
    },

    /// Malformed argument or configuration.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The burst length cannot be aligned with the tile geometry.
    #[error("Burst length {burst_length} is incompatible with tile height {tile_height}")]
    AlignmentError {
        /// Configured burst length in cells.
        burst_length: usize,
        /// Configured tile height in cells.
        tile_height: usize,
    },

    /// The grid does not fit into a single tile.
    #[error("Grid range {grid} exceeds the tile range {tile}")]
    CapacityExceeded {
        /// Range of the grid.
        grid: Uid,
        /// Range of one tile.
        tile: Uid,
    },

    /// The execution queue worker has shut down.
    #[error("Execution queue is closed")]
    QueueClosed,

    /// A job on the execution queue panicked. The queue keeps running.
    #[error("Queued job panicked: {0}")]
    JobPanicked(String),

    /// The execution queue worker could not be started.
    #[error("Failed to start execution queue worker: {0}")]
    QueueSpawn(String),
}

impl StencilError {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an out-of-bounds error.
    pub fn out_of_bounds(what: &'static str, index: Uid, range: Uid) -> Self {
        Self::OutOfBounds { what, index, range }
    }

    /// Whether this error is detected while configuring, as opposed to per call.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::AlignmentError { .. } | Self::CapacityExceeded { .. }
        )
    }
}
