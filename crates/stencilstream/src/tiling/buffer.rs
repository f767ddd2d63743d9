//! Compute-local working buffers.

use stencilstream_core::index::Uid;

/// A column-major working buffer in compute-local memory.
///
/// Cell `(c, r)` lives at index `c * height + r`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBuffer<T> {
    range: Uid,
    data: Vec<T>,
}

impl<T: Copy> LocalBuffer<T> {
    /// Create a buffer with every cell set to `value`.
    pub fn filled(range: Uid, value: T) -> Self {
        Self {
            range,
            data: vec![value; range.area()],
        }
    }

    /// Buffer dimensions.
    pub fn range(&self) -> Uid {
        self.range
    }

    /// Rows per column, the stride between columns.
    pub fn height(&self) -> usize {
        self.range.r
    }

    /// Read a cell.
    #[inline(always)]
    pub fn get(&self, id: Uid) -> T {
        self.data[id.linear(self.range.r)]
    }

    /// Write a cell.
    #[inline(always)]
    pub fn set(&mut self, id: Uid, value: T) {
        let idx = id.linear(self.range.r);
        self.data[idx] = value;
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// One full column.
    pub fn column(&self, c: usize) -> &[T] {
        let height = self.range.r;
        &self.data[c * height..(c + 1) * height]
    }

    /// One full column, mutable.
    pub fn column_mut(&mut self, c: usize) -> &mut [T] {
        let height = self.range.r;
        &mut self.data[c * height..(c + 1) * height]
    }

    /// Raw column-major cells.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Raw column-major cells, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
