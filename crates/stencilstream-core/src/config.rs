//! Execution configuration.
//!
//! All values are fixed at construction time. Validation happens once, when a
//! grid or an executor is built, and never inside a run.
//!
//! ```
//! use stencilstream_core::config::{StencilConfig, StrategyKind};
//!
//! let config = StencilConfig::builder()
//!     .tile(64, 64)
//!     .halo_radius(2)
//!     .burst_length(16)
//!     .strategy(StrategyKind::Tiling)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.generations_per_pass(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, StencilError};
use crate::index::Uid;

/// Default tile side length in cells.
pub const DEFAULT_TILE_SIZE: usize = 1024;

/// Default burst length in cells.
pub const DEFAULT_BURST_LENGTH: usize = 64;

/// Geometry shared by a grid and all of its tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGeometry {
    /// Columns per tile.
    pub tile_width: usize,
    /// Rows per tile.
    pub tile_height: usize,
    /// Width of the halo margin loaded around each tile.
    pub halo_radius: usize,
    /// Cells moved per burst-aligned transfer.
    pub burst_length: usize,
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            halo_radius: 1,
            burst_length: DEFAULT_BURST_LENGTH,
        }
    }
}

impl TileGeometry {
    /// Create a geometry.
    pub fn new(tile_width: usize, tile_height: usize, halo_radius: usize, burst_length: usize) -> Self {
        Self {
            tile_width,
            tile_height,
            halo_radius,
            burst_length,
        }
    }

    /// Tile dimensions as a range.
    pub fn tile_range(&self) -> Uid {
        Uid::new(self.tile_width, self.tile_height)
    }

    /// Dimensions of a tile including its halo margin on every side.
    pub fn local_range(&self) -> Uid {
        Uid::new(
            self.tile_width + 2 * self.halo_radius,
            self.tile_height + 2 * self.halo_radius,
        )
    }

    /// Check that tile interiors can be transferred in whole bursts.
    ///
    /// Columns are the contiguous axis. When the burst length divides the
    /// tile height, a full interior column splits into whole bursts counted
    /// from the tile's first interior row. Halo parts are walked from the
    /// halo offset and carry no alignment guarantee relative to the grid.
    pub fn validate(&self) -> Result<()> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(StencilError::invalid_argument(format!(
                "tile dimensions must be non-zero, got {}x{}",
                self.tile_width, self.tile_height
            )));
        }
        if self.burst_length == 0 || self.tile_height % self.burst_length != 0 {
            return Err(StencilError::AlignmentError {
                burst_length: self.burst_length,
                tile_height: self.tile_height,
            });
        }
        Ok(())
    }
}

/// Which execution strategy an executor should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Pick monotile when the grid fits into one tile, tiling otherwise.
    #[default]
    Auto,
    /// Keep the whole grid resident in one tile.
    Monotile,
    /// Decompose the grid into tiles with halo margins.
    Tiling,
}

/// Complete configuration of a stencil executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StencilConfig {
    /// Tile and transfer geometry.
    pub geometry: TileGeometry,
    /// Reach of the transition function per generation.
    pub stencil_radius: usize,
    /// Maximum number of generations computed per pass.
    ///
    /// `None` uses as many as the halo radius allows.
    pub pipeline_length: Option<usize>,
    /// Record a runtime sample for every pass.
    pub runtime_analysis: bool,
    /// Requested execution strategy.
    pub strategy: StrategyKind,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            geometry: TileGeometry::default(),
            stencil_radius: 1,
            pipeline_length: None,
            runtime_analysis: true,
            strategy: StrategyKind::Auto,
        }
    }
}

impl StencilConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder.
    pub fn builder() -> StencilConfigBuilder {
        StencilConfigBuilder::new()
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        if self.stencil_radius == 0 {
            return Err(StencilError::invalid_argument(
                "stencil radius must be at least 1",
            ));
        }
        if self.pipeline_length == Some(0) {
            return Err(StencilError::invalid_argument(
                "pipeline length must be at least 1",
            ));
        }
        Ok(())
    }

    /// Validate the additional constraints of the tiling strategy.
    pub fn validate_for_tiling(&self) -> Result<()> {
        self.validate()?;
        if self.geometry.halo_radius < self.stencil_radius {
            return Err(StencilError::invalid_argument(format!(
                "halo radius {} is smaller than the stencil radius {}",
                self.geometry.halo_radius, self.stencil_radius
            )));
        }
        Ok(())
    }

    /// Number of generations a loaded tile can advance before its interior
    /// needs fresher neighbor data.
    pub fn generations_per_pass(&self) -> usize {
        let by_halo = (self.geometry.halo_radius / self.stencil_radius.max(1)).max(1);
        match self.pipeline_length {
            Some(len) => len.min(by_halo).max(1),
            None => by_halo,
        }
    }

    /// Number of generations the monotile strategy computes per pass.
    pub fn monotile_pipeline_length(&self) -> usize {
        self.pipeline_length
            .unwrap_or_else(|| self.geometry.halo_radius / self.stencil_radius.max(1))
            .max(1)
    }
}

/// Builder for [`StencilConfig`].
#[derive(Debug, Clone, Default)]
pub struct StencilConfigBuilder {
    config: StencilConfig,
}

impl StencilConfigBuilder {
    /// Create a builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set tile width and height.
    pub fn tile(mut self, width: usize, height: usize) -> Self {
        self.config.geometry.tile_width = width;
        self.config.geometry.tile_height = height;
        self
    }

    /// Set the halo radius.
    pub fn halo_radius(mut self, radius: usize) -> Self {
        self.config.geometry.halo_radius = radius;
        self
    }

    /// Set the burst length.
    pub fn burst_length(mut self, length: usize) -> Self {
        self.config.geometry.burst_length = length;
        self
    }

    /// Set the stencil radius.
    pub fn stencil_radius(mut self, radius: usize) -> Self {
        self.config.stencil_radius = radius;
        self
    }

    /// Set the pipeline length.
    pub fn pipeline_length(mut self, length: usize) -> Self {
        self.config.pipeline_length = Some(length);
        self
    }

    /// Enable or disable runtime analysis.
    pub fn runtime_analysis(mut self, enabled: bool) -> Self {
        self.config.runtime_analysis = enabled;
        self
    }

    /// Set the execution strategy.
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<StencilConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
