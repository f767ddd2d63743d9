//! Domain decomposition: grids, tiles and burst-aligned I/O.

mod buffer;
mod grid;
mod io_kernel;
mod tile;

pub use buffer::LocalBuffer;
pub use grid::Grid;
pub use io_kernel::{IoKernel, TransferStats};
pub use tile::Tile;
