//! Stencil windows and transition functions.
//!
//! A transition function maps the neighborhood of one cell to the cell's next
//! value. The neighborhood is passed as a [`Stencil`]: a square window of
//! `diameter × diameter` cells centered on the updated cell, plus the cell's
//! absolute position, the generation index of the input and the grid range.
//!
//! ```text
//!            dc = -1     dc = 0     dc = +1
//!          +----------+----------+----------+
//! dr = -1  | (-1, -1) | ( 0, -1) | (+1, -1) |
//!          +----------+----------+----------+
//! dr =  0  | (-1,  0) | ( 0,  0) | (+1,  0) |   stencil[Id::new(dc, dr)]
//!          +----------+----------+----------+
//! dr = +1  | (-1, +1) | ( 0, +1) | (+1, +1) |
//!          +----------+----------+----------+
//! ```
//!
//! Cells outside the grid read as the halo value.

use std::ops::{Index, IndexMut};

use stencilstream_core::index::{Id, Uid};

use crate::tiling::LocalBuffer;

/// Marker trait for cell types.
pub trait Cell: Copy + Send + Sync + 'static {}

impl<T: Copy + Send + Sync + 'static> Cell for T {}

/// A pure per-cell update rule.
pub trait TransitionFunction<T: Cell>: Send + Sync {
    /// Compute the next value of the stencil's center cell.
    fn apply(&self, stencil: &Stencil<T>) -> T;
}

impl<T, F> TransitionFunction<T> for F
where
    T: Cell,
    F: Fn(&Stencil<T>) -> T + Send + Sync,
{
    #[inline(always)]
    fn apply(&self, stencil: &Stencil<T>) -> T {
        self(stencil)
    }
}

/// Neighborhood window of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil<T> {
    /// Absolute position of the center cell.
    pub id: Id,
    /// Generation index of the cells in this window.
    pub generation: u64,
    /// Range of the whole grid.
    pub grid_range: Uid,
    radius: usize,
    /// Window cells, column-major.
    cells: Vec<T>,
}

impl<T: Cell> Stencil<T> {
    /// Create a window of the given radius with every cell set to `fill`.
    pub fn new(radius: usize, fill: T) -> Self {
        let diameter = 2 * radius + 1;
        Self {
            id: Id::new(0, 0),
            generation: 0,
            grid_range: Uid::ZERO,
            radius,
            cells: vec![fill; diameter * diameter],
        }
    }

    /// Reach of the window in every direction.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Side length of the window.
    pub fn diameter(&self) -> usize {
        2 * self.radius + 1
    }

    /// Fill the window from a local buffer, centered on `center`.
    ///
    /// `center` must be at least `radius` cells away from every buffer edge.
    #[inline]
    pub(crate) fn load(
        &mut self,
        buffer: &LocalBuffer<T>,
        center: Uid,
        id: Id,
        generation: u64,
        grid_range: Uid,
    ) {
        let diameter = self.diameter();
        let height = buffer.height();
        let data = buffer.as_slice();
        let first_row = center.r - self.radius;

        for dc in 0..diameter {
            let column = center.c + dc - self.radius;
            let base = column * height + first_row;
            self.cells[dc * diameter..(dc + 1) * diameter]
                .copy_from_slice(&data[base..base + diameter]);
        }

        self.id = id;
        self.generation = generation;
        self.grid_range = grid_range;
    }

    #[inline(always)]
    fn offset_index(&self, offset: Id) -> usize {
        let radius = self.radius as isize;
        assert!(
            offset.c.abs() <= radius && offset.r.abs() <= radius,
            "stencil offset {} exceeds radius {}",
            offset,
            radius
        );
        let c = (offset.c + radius) as usize;
        let r = (offset.r + radius) as usize;
        c * self.diameter() + r
    }

    #[inline(always)]
    fn position_index(&self, position: Uid) -> usize {
        let diameter = self.diameter();
        assert!(
            position.c < diameter && position.r < diameter,
            "stencil position {} exceeds diameter {}",
            position,
            diameter
        );
        position.c * diameter + position.r
    }
}

/// Access by offset from the center, `-radius ..= radius` on both axes.
impl<T: Cell> Index<Id> for Stencil<T> {
    type Output = T;

    fn index(&self, offset: Id) -> &T {
        &self.cells[self.offset_index(offset)]
    }
}

impl<T: Cell> IndexMut<Id> for Stencil<T> {
    fn index_mut(&mut self, offset: Id) -> &mut T {
        let idx = self.offset_index(offset);
        &mut self.cells[idx]
    }
}

/// Access by window position, `0 .. diameter` on both axes.
impl<T: Cell> Index<Uid> for Stencil<T> {
    type Output = T;

    fn index(&self, position: Uid) -> &T {
        &self.cells[self.position_index(position)]
    }
}

impl<T: Cell> IndexMut<Uid> for Stencil<T> {
    fn index_mut(&mut self, position: Uid) -> &mut T {
        let idx = self.position_index(position);
        &mut self.cells[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: usize = 2;

    #[test]
    fn test_diameter() {
        let stencil = Stencil::new(RADIUS, 0i64);
        assert_eq!(stencil.diameter(), 2 * RADIUS + 1);
        assert_eq!(stencil.radius(), RADIUS);
    }

    #[test]
    fn test_index_by_offset() {
        let mut stencil = Stencil::new(RADIUS, 0isize);
        let radius = RADIUS as isize;

        for c in -radius..=radius {
            for r in -radius..=radius {
                stencil[Id::new(c, r)] = c + r;
            }
        }

        for c in 0..stencil.diameter() {
            for r in 0..stencil.diameter() {
                assert_eq!(
                    stencil[Uid::new(c, r)],
                    c as isize + r as isize - 2 * radius
                );
            }
        }
    }

    #[test]
    fn test_index_by_position() {
        let mut stencil = Stencil::new(RADIUS, 0isize);
        let radius = RADIUS as isize;

        for c in 0..stencil.diameter() {
            for r in 0..stencil.diameter() {
                stencil[Uid::new(c, r)] = (c + r) as isize;
            }
        }

        for c in -radius..=radius {
            for r in -radius..=radius {
                assert_eq!(stencil[Id::new(c, r)], c + r + 2 * radius);
            }
        }
    }

    #[test]
    #[should_panic(expected = "exceeds radius")]
    fn test_offset_outside_window() {
        let stencil = Stencil::new(1, 0u8);
        let _value = stencil[Id::new(2, 0)];
    }

    #[test]
    fn test_load_from_buffer() {
        // 4x4 buffer where each cell stores its column-major index.
        let mut buffer = LocalBuffer::filled(Uid::new(4, 4), 0usize);
        for c in 0..4 {
            for r in 0..4 {
                buffer.set(Uid::new(c, r), c * 4 + r);
            }
        }

        let mut stencil = Stencil::new(1, 0usize);
        stencil.load(&buffer, Uid::new(1, 2), Id::new(10, 20), 7, Uid::new(32, 32));

        assert_eq!(stencil[Id::new(0, 0)], 6);
        assert_eq!(stencil[Id::new(-1, -1)], 1);
        assert_eq!(stencil[Id::new(1, 1)], 11);
        assert_eq!(stencil[Id::new(0, -1)], 5);
        assert_eq!(stencil.id, Id::new(10, 20));
        assert_eq!(stencil.generation, 7);
        assert_eq!(stencil.grid_range, Uid::new(32, 32));
    }

    #[test]
    fn test_closure_is_transition_function() {
        let f = |stencil: &Stencil<f32>| stencil[Id::new(0, 0)] * 2.0;
        let stencil = Stencil::new(1, 1.5f32);
        assert_eq!(f.apply(&stencil), 3.0);
    }
}
