//! Tiles and their burst-sized parts.
//!
//! A tile owns a rectangular interior of the grid plus a halo margin of
//! `halo_radius` cells on every side. Both ranges are clipped at the grid
//! edges.
//!
//! ```text
//!   halo-inclusive range
//!  +---+-------------------+---+
//!  |   |                   |   |
//!  | h |     interior      | h |     columns are split into parts of
//!  |   |                   |   |     `burst_length` rows, walking down
//!  +---+-------------------+---+     from the top of the halo range
//! ```
//!
//! Storage is column-major, so a column of the halo-inclusive range is one
//! contiguous run of cells. Each column is walked in `burst_length` strides;
//! every stride is one part. The last part of a column is clipped to the
//! range, but it is still transferred as a full burst.

use stencilstream_core::config::TileGeometry;
use stencilstream_core::error::{Result, StencilError};
use stencilstream_core::index::Uid;

/// One tile of a [`Grid`](super::Grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    id: Uid,
    interior_offset: Uid,
    interior_range: Uid,
    halo_offset: Uid,
    halo_range: Uid,
    geometry: TileGeometry,
}

impl Tile {
    /// Create the tile at tile-grid position `id` of a grid with `grid_range`.
    pub(crate) fn new(id: Uid, grid_range: Uid, geometry: TileGeometry) -> Self {
        let tile_range = geometry.tile_range();
        let halo = Uid::new(geometry.halo_radius, geometry.halo_radius);

        let interior_offset = Uid::new(id.c * tile_range.c, id.r * tile_range.r);
        let interior_end = (interior_offset + tile_range).component_min(grid_range);
        let interior_range = interior_end.saturating_sub(interior_offset);

        let halo_offset = interior_offset.saturating_sub(halo);
        let halo_end = (interior_end + halo).component_min(grid_range);
        let halo_range = halo_end.saturating_sub(halo_offset);

        Self {
            id,
            interior_offset,
            interior_range,
            halo_offset,
            halo_range,
            geometry,
        }
    }

    /// Position of this tile in the tile grid.
    pub fn get_tile_id(&self) -> Uid {
        self.id
    }

    /// First interior cell, in grid coordinates.
    pub fn get_interior_offset(&self) -> Uid {
        self.interior_offset
    }

    /// Interior dimensions, clipped at the grid edges.
    pub fn get_interior_range(&self) -> Uid {
        self.interior_range
    }

    /// First halo-inclusive cell, in grid coordinates.
    pub fn get_halo_offset(&self) -> Uid {
        self.halo_offset
    }

    /// Halo-inclusive dimensions, clipped at the grid edges.
    pub fn get_halo_range(&self) -> Uid {
        self.halo_range
    }

    /// Geometry the tile was cut with.
    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    fn parts_per_column(&self) -> usize {
        self.halo_range.r.div_ceil(self.geometry.burst_length)
    }

    /// Number of burst-sized parts.
    pub fn n_parts(&self) -> usize {
        self.halo_range.c * self.parts_per_column()
    }

    fn check_part(&self, part_index: usize) -> Result<()> {
        let n_parts = self.n_parts();
        if part_index >= n_parts {
            return Err(StencilError::out_of_bounds(
                "part",
                Uid::new(part_index, 0),
                Uid::new(n_parts, 1),
            ));
        }
        Ok(())
    }

    /// First cell of part `part_index`, in grid coordinates.
    pub fn get_part_offset(&self, part_index: usize) -> Result<Uid> {
        self.check_part(part_index)?;
        let per_column = self.parts_per_column();
        let column = part_index / per_column;
        let chunk = part_index % per_column;
        Ok(Uid::new(
            self.halo_offset.c + column,
            self.halo_offset.r + chunk * self.geometry.burst_length,
        ))
    }

    /// Valid extent of part `part_index`: one column, at most one burst of rows.
    pub fn get_part_range(&self, part_index: usize) -> Result<Uid> {
        let offset = self.get_part_offset(part_index)?;
        let remaining = self.halo_offset.r + self.halo_range.r - offset.r;
        Ok(Uid::new(1, remaining.min(self.geometry.burst_length)))
    }

    /// Number of cells moved for part `part_index`, padding included.
    pub fn get_part_transfer_length(&self, part_index: usize) -> Result<usize> {
        self.check_part(part_index)?;
        Ok(self.geometry.burst_length)
    }

    /// Iterate over `(offset, range)` of every part.
    pub fn parts(&self) -> impl Iterator<Item = (Uid, Uid)> + '_ {
        (0..self.n_parts()).filter_map(move |i| {
            let offset = self.get_part_offset(i).ok()?;
            let range = self.get_part_range(i).ok()?;
            Some((offset, range))
        })
    }
}
