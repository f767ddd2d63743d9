//! Burst-sized transfers between backing storage and local memory.
//!
//! ## Local buffer layout
//!
//! ```text
//!  local (0,0)
//!  +--+----------------+--+
//!  |  |   halo (h)     |  |
//!  +--+----------------+--+
//!  |h |   interior     | h|     (tile_width + 2h) x (tile_height + 2h)
//!  |  |                |  |
//!  +--+----------------+--+
//!  |  |   halo (h)     |  |
//!  +--+----------------+--+
//! ```
//!
//! Local cell `(h, h)` is the first interior cell of the tile. Cells of the
//! local buffer that fall outside the grid keep the halo value. Halo radius
//! and burst length are always taken from the tile being transferred.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use stencilstream_core::config::TileGeometry;
use stencilstream_core::index::Uid;
use tracing::trace;

use super::{Grid, LocalBuffer, Tile};

/// Transfer counters of one or more load/store operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Tiles loaded into local memory.
    pub tiles_loaded: u64,
    /// Bursts read from backing storage.
    pub bursts_read: u64,
    /// Bursts written to backing storage.
    pub bursts_written: u64,
    /// Cells moved by reads, padding included.
    pub cells_read: u64,
    /// Cells written back.
    pub cells_written: u64,
    /// Padding cells read and discarded.
    pub padding_cells: u64,
}

impl Add for TransferStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for TransferStats {
    fn add_assign(&mut self, rhs: Self) {
        self.tiles_loaded += rhs.tiles_loaded;
        self.bursts_read += rhs.bursts_read;
        self.bursts_written += rhs.bursts_written;
        self.cells_read += rhs.cells_read;
        self.cells_written += rhs.cells_written;
        self.padding_cells += rhs.padding_cells;
    }
}

/// Moves tile data between a [`Grid`] and a [`LocalBuffer`].
///
/// The kernel's own geometry only sizes [`get_buffer_range`](Self::get_buffer_range);
/// transfers follow the geometry of the tile they are given.
#[derive(Debug, Clone, Copy)]
pub struct IoKernel {
    geometry: TileGeometry,
}

impl IoKernel {
    /// Create a kernel for tiles cut with `geometry`.
    pub fn new(geometry: TileGeometry) -> Self {
        Self { geometry }
    }

    /// Range of the local working buffer.
    pub fn get_buffer_range(&self) -> Uid {
        self.geometry.local_range()
    }

    /// Rows per column of the local working buffer.
    pub fn get_buffer_height(&self) -> usize {
        self.geometry.local_range().r
    }

    /// Local position of the grid cell `cell` of `tile`.
    #[inline(always)]
    fn to_local(tile: &Tile, cell: Uid) -> Uid {
        let halo = tile.geometry().halo_radius;
        let origin = tile.get_interior_offset();
        Uid::new(cell.c + halo - origin.c, cell.r + halo - origin.r)
    }

    /// Load the halo-inclusive region of `tile` into a fresh local buffer.
    pub fn load<T: Copy>(
        &self,
        grid: &Grid<T>,
        tile: &Tile,
        halo_value: T,
    ) -> (LocalBuffer<T>, TransferStats) {
        let mut local = LocalBuffer::filled(tile.geometry().local_range(), halo_value);
        let stats = self.load_into(grid, tile, halo_value, &mut local);
        (local, stats)
    }

    /// Load the halo-inclusive region of `tile` into `local`.
    ///
    /// Every cell that the tile's parts do not cover, i.e. everything outside
    /// the grid, is set to `halo_value`.
    pub fn load_into<T: Copy>(
        &self,
        grid: &Grid<T>,
        tile: &Tile,
        halo_value: T,
        local: &mut LocalBuffer<T>,
    ) -> TransferStats {
        debug_assert_eq!(local.range(), tile.geometry().local_range());
        local.fill(halo_value);

        let burst_length = tile.geometry().burst_length;
        let mut burst = Vec::with_capacity(burst_length);
        let mut stats = TransferStats {
            tiles_loaded: 1,
            ..TransferStats::default()
        };

        for (offset, range) in tile.parts() {
            let column = grid.column(offset.c);
            let last = offset.r + range.r - 1;

            // Full burst; padding reads are clamped to the last valid cell.
            burst.clear();
            burst.extend((0..burst_length).map(|i| column[(offset.r + i).min(last)]));

            let target = Self::to_local(tile, offset);
            local.column_mut(target.c)[target.r..target.r + range.r]
                .copy_from_slice(&burst[..range.r]);

            stats.bursts_read += 1;
            stats.cells_read += burst_length as u64;
            stats.padding_cells += (burst_length - range.r) as u64;
        }

        trace!(
            "Loaded tile {}: {} bursts, {} padding cells",
            tile.get_tile_id(),
            stats.bursts_read,
            stats.padding_cells
        );
        stats
    }

    /// Write the interior of `tile` from `local` back to `grid`.
    ///
    /// Halo cells are never written. Each interior column is written in
    /// chunks of `burst_length` rows counted from the tile's first interior
    /// row; the last chunk of a column writes only its valid prefix.
    pub fn store<T: Copy>(&self, grid: &mut Grid<T>, tile: &Tile, local: &LocalBuffer<T>) -> TransferStats {
        let burst_length = tile.geometry().burst_length;
        let offset = tile.get_interior_offset();
        let range = tile.get_interior_range();
        let mut stats = TransferStats::default();

        for c in offset.c..offset.c + range.c {
            let source = Self::to_local(tile, Uid::new(c, offset.r));
            let local_column = local.column(source.c);
            let grid_column = grid.column_mut(c);

            let mut written = 0;
            while written < range.r {
                let len = burst_length.min(range.r - written);
                let from = source.r + written;
                let to = offset.r + written;
                grid_column[to..to + len].copy_from_slice(&local_column[from..from + len]);

                written += len;
                stats.bursts_written += 1;
                stats.cells_written += len as u64;
            }
        }

        trace!(
            "Stored tile {}: {} bursts, {} cells",
            tile.get_tile_id(),
            stats.bursts_written,
            stats.cells_written
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALO: i32 = -1;

    /// 8x8 grid where every cell holds `c * 100 + r`.
    fn numbered_grid(geometry: TileGeometry) -> Grid<i32> {
        let cells = (0..8)
            .flat_map(|c| (0..8).map(move |r| c * 100 + r))
            .collect();
        Grid::from_vec(8, 8, cells, geometry).unwrap()
    }

    #[test]
    fn test_buffer_height() {
        let io = IoKernel::new(TileGeometry::new(4, 8, 2, 4));
        assert_eq!(io.get_buffer_height(), 12);
        assert_eq!(io.get_buffer_range(), Uid::new(8, 12));
    }

    #[test]
    fn test_load_inner_tile() {
        let geometry = TileGeometry::new(4, 4, 1, 4);
        let grid = numbered_grid(geometry);
        let io = IoKernel::new(geometry);
        let tile = grid.get_tile(Uid::new(1, 1)).unwrap();

        let (local, stats) = io.load(&grid, &tile, HALO);

        // Local (1, 1) is the first interior cell (4, 4).
        assert_eq!(local.get(Uid::new(1, 1)), 404);
        // Local (0, 0) is the halo cell (3, 3).
        assert_eq!(local.get(Uid::new(0, 0)), 303);
        // Right and bottom halo lie outside the grid.
        assert_eq!(local.get(Uid::new(5, 2)), HALO);
        assert_eq!(local.get(Uid::new(2, 5)), HALO);
        assert_eq!(local.get(Uid::new(4, 4)), 707);

        // 5 columns of 5 rows: one full and one clipped burst each.
        assert_eq!(stats.bursts_read, 10);
        assert_eq!(stats.cells_read, 40);
        assert_eq!(stats.padding_cells, 15);
    }

    #[test]
    fn test_load_fills_outer_halo() {
        let geometry = TileGeometry::new(4, 4, 2, 4);
        let grid = numbered_grid(geometry);
        let io = IoKernel::new(geometry);
        let tile = grid.get_tile(Uid::new(0, 0)).unwrap();

        let (local, _) = io.load(&grid, &tile, HALO);
        for i in 0..8 {
            assert_eq!(local.get(Uid::new(0, i)), HALO);
            assert_eq!(local.get(Uid::new(1, i)), HALO);
            assert_eq!(local.get(Uid::new(i, 0)), HALO);
            assert_eq!(local.get(Uid::new(i, 1)), HALO);
        }
        assert_eq!(local.get(Uid::new(2, 2)), 0);
        assert_eq!(local.get(Uid::new(7, 7)), 505);
    }

    #[test]
    fn test_store_writes_interior_only() {
        let geometry = TileGeometry::new(4, 4, 1, 4);
        let mut grid = numbered_grid(geometry);
        let io = IoKernel::new(geometry);
        let tile = grid.get_tile(Uid::new(1, 0)).unwrap();

        let local = LocalBuffer::filled(io.get_buffer_range(), 9999);
        let stats = io.store(&mut grid, &tile, &local);

        assert_eq!(stats.bursts_written, 4);
        assert_eq!(stats.cells_written, 16);
        for c in 0..8 {
            for r in 0..8 {
                let value = grid.get(Uid::new(c, r)).unwrap();
                if (4..8).contains(&c) && r < 4 {
                    assert_eq!(value, 9999);
                } else {
                    assert_eq!(value, (c * 100 + r) as i32);
                }
            }
        }
    }

    #[test]
    fn test_store_partial_edge_tile() {
        let geometry = TileGeometry::new(4, 4, 1, 2);
        let mut grid: Grid<u8> = Grid::new(6, 5, geometry).unwrap();
        let io = IoKernel::new(geometry);
        let tile = grid.get_tile(Uid::new(1, 1)).unwrap();
        assert_eq!(tile.get_interior_range(), Uid::new(2, 1));

        let local = LocalBuffer::filled(io.get_buffer_range(), 7u8);
        let stats = io.store(&mut grid, &tile, &local);

        // One valid row per column: a single partial burst each.
        assert_eq!(stats.bursts_written, 2);
        assert_eq!(stats.cells_written, 2);
        assert_eq!(grid.get(Uid::new(4, 4)), Some(7));
        assert_eq!(grid.get(Uid::new(5, 4)), Some(7));
        assert_eq!(grid.get(Uid::new(5, 3)), Some(0));
    }

    #[test]
    fn test_bursts_count_from_tile_rows() {
        let geometry = TileGeometry::new(4, 6, 1, 3);
        let cells = (0..4).flat_map(|c| (0..13).map(move |r| c * 100 + r)).collect();
        let grid = Grid::from_vec(4, 13, cells, geometry).unwrap();
        let tile = grid.get_tile(Uid::new(0, 1)).unwrap();
        assert_eq!(tile.get_halo_offset(), Uid::new(0, 5));

        // Reads start at the halo offset, not on a multiple of the burst length.
        let starts: Vec<usize> = tile
            .parts()
            .filter(|(offset, _)| offset.c == 0)
            .map(|(offset, _)| offset.r)
            .collect();
        assert_eq!(starts, vec![5, 8, 11]);

        let io = IoKernel::new(geometry);
        let (local, load_stats) = io.load(&grid, &tile, HALO);
        assert_eq!(load_stats.bursts_read, 12);
        assert_eq!(load_stats.padding_cells, 4);

        // Writes split the six interior rows into two whole bursts.
        let mut copy: Grid<i32> = Grid::new(4, 13, geometry).unwrap();
        let store_stats = io.store(&mut copy, &tile, &local);
        assert_eq!(store_stats.bursts_written, 8);
        assert_eq!(store_stats.cells_written, 24);
        assert_eq!(copy.get(Uid::new(2, 6)), Some(206));
        assert_eq!(copy.get(Uid::new(2, 11)), Some(211));
        assert_eq!(copy.get(Uid::new(2, 12)), Some(0));
    }

    #[test]
    fn test_transfers_follow_tile_geometry() {
        let geometry = TileGeometry::new(4, 4, 2, 2);
        let grid = numbered_grid(geometry);
        let tile = grid.get_tile(Uid::new(1, 1)).unwrap();
        let matching = IoKernel::new(geometry);
        let narrow = IoKernel::new(TileGeometry::new(4, 4, 1, 4));

        let (expected, expected_stats) = matching.load(&grid, &tile, HALO);
        let (local, stats) = narrow.load(&grid, &tile, HALO);
        assert_eq!(local.range(), Uid::new(8, 8));
        assert_eq!(local, expected);
        assert_eq!(stats, expected_stats);
        // Local (0, 0) is grid (2, 2) with a halo radius of 2.
        assert_eq!(local.get(Uid::new(0, 0)), 202);

        let mut copy: Grid<i32> = Grid::new(8, 8, geometry).unwrap();
        let stored = narrow.store(&mut copy, &tile, &local);
        assert_eq!(stored.bursts_written, 8);
        assert_eq!(copy.get(Uid::new(4, 4)), Some(404));
        assert_eq!(copy.get(Uid::new(7, 7)), Some(707));
        assert_eq!(copy.get(Uid::new(3, 3)), Some(0));
    }

    #[test]
    fn test_load_store_round_trip() {
        let geometry = TileGeometry::new(4, 4, 2, 2);
        let grid = numbered_grid(geometry);
        let mut copy: Grid<i32> = Grid::new(8, 8, geometry).unwrap();
        let io = IoKernel::new(geometry);

        let mut total = TransferStats::default();
        for tile in grid.tiles() {
            let (local, load_stats) = io.load(&grid, &tile, HALO);
            total += load_stats + io.store(&mut copy, &tile, &local);
        }

        assert_eq!(copy, grid);
        assert_eq!(total.cells_written, 64);
        assert_eq!(total.tiles_loaded, 4);
    }
}
