//! Per-generation compute kernel.

use rayon::prelude::*;
use stencilstream_core::index::{Id, Uid};

use crate::stencil::{Cell, Stencil, TransitionFunction};
use crate::tiling::LocalBuffer;

/// Applies a transition function to a rectangular region of a local buffer.
pub(crate) struct ExecutionKernel<'a, T, F> {
    trans_func: &'a F,
    stencil_radius: usize,
    halo_value: T,
    grid_range: Uid,
}

impl<'a, T: Cell, F: TransitionFunction<T>> ExecutionKernel<'a, T, F> {
    pub(crate) fn new(trans_func: &'a F, stencil_radius: usize, halo_value: T, grid_range: Uid) -> Self {
        Self {
            trans_func,
            stencil_radius,
            halo_value,
            grid_range,
        }
    }

    pub(crate) fn stencil_radius(&self) -> usize {
        self.stencil_radius
    }

    /// Compute one generation of the local cells in `[start, end)`.
    ///
    /// `origin` is the grid position of local cell `(0, 0)` and may be
    /// negative. Every window must lie inside `src`, so `start` and the
    /// distance from `end` to the buffer edge must be at least the stencil
    /// radius. Cells outside the grid are set to the halo value. Cells of
    /// `dst` outside the region are left untouched.
    pub(crate) fn step(
        &self,
        src: &LocalBuffer<T>,
        dst: &mut LocalBuffer<T>,
        start: Uid,
        end: Uid,
        origin: Id,
        generation: u64,
    ) {
        debug_assert_eq!(src.range(), dst.range());
        debug_assert!(start.c >= self.stencil_radius && start.r >= self.stencil_radius);
        debug_assert!(end.c + self.stencil_radius <= src.range().c);
        debug_assert!(end.r + self.stencil_radius <= src.range().r);

        let height = dst.height();
        let grid_range = Id::from(self.grid_range);

        dst.as_mut_slice()
            .par_chunks_mut(height)
            .enumerate()
            .skip(start.c)
            .take(end.c.saturating_sub(start.c))
            .for_each(|(c, column)| {
                let mut stencil = Stencil::new(self.stencil_radius, self.halo_value);
                for (r, cell) in column.iter_mut().enumerate().take(end.r).skip(start.r) {
                    let id = origin + Id::new(c as isize, r as isize);
                    let inside = id.c >= 0 && id.r >= 0 && id.c < grid_range.c && id.r < grid_range.r;
                    *cell = if inside {
                        stencil.load(src, Uid::new(c, r), id, generation, self.grid_range);
                        self.trans_func.apply(&stencil)
                    } else {
                        self.halo_value
                    };
                }
            });
    }
}
