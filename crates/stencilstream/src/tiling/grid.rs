//! Grid management for tiled stencil execution.
//!
//! The grid owns the full logical domain in backing storage and partitions it
//! into a regular array of [`Tile`]s:
//!
//! ```text
//! +--------+--------+-----+
//! | Tile   | Tile   | Tile|
//! | (0,0)  | (1,0)  |(2,0)|   tiles at the right and bottom edges
//! +--------+--------+-----+   are clipped to the grid range
//! | Tile   | Tile   | Tile|
//! | (0,1)  | (1,1)  |(2,1)|
//! +--------+--------+-----+
//! ```
//!
//! Cells are stored column-major: cell `(c, r)` lives at `c * height + r`.
//! The grid never mutates cells on its own; executors write whole tile
//! interiors through the [`IoKernel`](super::IoKernel).

use stencilstream_core::config::TileGeometry;
use stencilstream_core::error::{Result, StencilError};
use stencilstream_core::index::Uid;

use super::Tile;

/// The full logical domain of a stencil computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    range: Uid,
    geometry: TileGeometry,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Create a grid with every cell set to its default value.
    pub fn new(width: usize, height: usize, geometry: TileGeometry) -> Result<Self>
    where
        T: Default,
    {
        Self::filled(width, height, T::default(), geometry)
    }

    /// Create a grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: T, geometry: TileGeometry) -> Result<Self> {
        let area = checked_area(width, height)?;
        Self::from_vec(width, height, vec![value; area], geometry)
    }

    /// Adopt a column-major cell buffer.
    pub fn from_vec(
        width: usize,
        height: usize,
        cells: Vec<T>,
        geometry: TileGeometry,
    ) -> Result<Self> {
        geometry.validate()?;
        if width == 0 || height == 0 {
            return Err(StencilError::invalid_argument(format!(
                "grid dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let area = checked_area(width, height)?;
        if cells.len() != area {
            return Err(StencilError::invalid_argument(format!(
                "buffer holds {} cells, a {}x{} grid needs {}",
                cells.len(),
                width,
                height,
                area
            )));
        }

        Ok(Self {
            range: Uid::new(width, height),
            geometry,
            cells,
        })
    }

    /// Adopt a buffer indexed `[column][row]`.
    pub fn from_columns(columns: Vec<Vec<T>>, geometry: TileGeometry) -> Result<Self> {
        let width = columns.len();
        let height = columns.first().map(Vec::len).unwrap_or(0);
        if columns.iter().any(|column| column.len() != height) {
            return Err(StencilError::invalid_argument(
                "all columns must have the same number of rows",
            ));
        }
        let cells = columns.into_iter().flatten().collect();
        Self::from_vec(width, height, cells, geometry)
    }

    /// Copy a row-major buffer (`row * width + column`) into a new grid.
    pub fn from_row_major(
        width: usize,
        height: usize,
        data: &[T],
        geometry: TileGeometry,
    ) -> Result<Self> {
        let area = checked_area(width, height)?;
        if data.len() != area {
            return Err(StencilError::invalid_argument(format!(
                "buffer holds {} cells, a {}x{} grid needs {}",
                data.len(),
                width,
                height,
                area
            )));
        }
        let mut cells = Vec::with_capacity(data.len());
        for c in 0..width {
            for r in 0..height {
                cells.push(data[r * width + c]);
            }
        }
        Self::from_vec(width, height, cells, geometry)
    }

    /// Dimensions of the domain.
    pub fn get_grid_range(&self) -> Uid {
        self.range
    }

    /// Number of tiles along each axis.
    pub fn get_tile_range(&self) -> Uid {
        self.range.div_ceil(self.geometry.tile_range())
    }

    /// Geometry of the tiles.
    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// The tile at `tile_id`.
    pub fn get_tile(&self, tile_id: Uid) -> Result<Tile> {
        let tile_range = self.get_tile_range();
        if !tile_id.is_within(tile_range) {
            return Err(StencilError::out_of_bounds("tile", tile_id, tile_range));
        }
        Ok(Tile::new(tile_id, self.range, self.geometry))
    }

    /// All tiles, column by column.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        let tile_range = self.get_tile_range();
        (0..tile_range.c).flat_map(move |c| {
            (0..tile_range.r).map(move |r| Tile::new(Uid::new(c, r), self.range, self.geometry))
        })
    }

    /// Read one cell, `None` outside the grid.
    pub fn get(&self, id: Uid) -> Option<T> {
        if id.is_within(self.range) {
            Some(self.cells[id.linear(self.range.r)])
        } else {
            None
        }
    }

    /// One column of backing storage.
    pub fn column(&self, c: usize) -> &[T] {
        let height = self.range.r;
        &self.cells[c * height..(c + 1) * height]
    }

    pub(crate) fn column_mut(&mut self, c: usize) -> &mut [T] {
        let height = self.range.r;
        &mut self.cells[c * height..(c + 1) * height]
    }

    /// Raw column-major cells.
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Copy the cells out, indexed `[column][row]`.
    pub fn to_columns(&self) -> Vec<Vec<T>> {
        self.cells
            .chunks(self.range.r)
            .map(<[T]>::to_vec)
            .collect()
    }

    /// Release the column-major cell buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.cells
    }
}

/// Number of cells of a `width` x `height` grid.
fn checked_area(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        StencilError::invalid_argument(format!(
            "a {}x{} grid has more cells than fit in memory",
            width, height
        ))
    })
}
