//! Two-dimensional coordinates.
//!
//! A coordinate is a `(column, row)` pair. The same type describes cell
//! positions, tile positions and ranges; which one is meant is always clear
//! from context and never mixed within one computation.
//!
//! Storage throughout the workspace is column-major: cell `(c, r)` of a grid
//! with `height` rows lives at linear index `c * height + r`.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A generic `(column, row)` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GenericId<T> {
    /// Column (horizontal position).
    pub c: T,
    /// Row (vertical position).
    pub r: T,
}

impl<T> GenericId<T> {
    /// Create a new coordinate.
    pub const fn new(c: T, r: T) -> Self {
        Self { c, r }
    }
}

/// Unsigned coordinate used for cells, tiles and ranges.
pub type Uid = GenericId<usize>;

/// Signed coordinate used for offsets inside a stencil window.
pub type Id = GenericId<isize>;

impl Uid {
    /// The origin `(0, 0)`.
    pub const ZERO: Uid = Uid::new(0, 0);

    /// Number of cells covered when this coordinate is read as a range.
    pub const fn area(&self) -> usize {
        self.c * self.r
    }

    /// Linear column-major index of this cell inside a buffer with `height` rows.
    #[inline(always)]
    pub const fn linear(&self, height: usize) -> usize {
        self.c * height + self.r
    }

    /// Check whether this cell lies inside `range` (exclusive on both axes).
    #[inline(always)]
    pub const fn is_within(&self, range: Uid) -> bool {
        self.c < range.c && self.r < range.r
    }

    /// Ceiling division on both axes.
    pub fn div_ceil(&self, divisor: Uid) -> Uid {
        Uid::new(self.c.div_ceil(divisor.c), self.r.div_ceil(divisor.r))
    }

    /// Component-wise minimum.
    ///
    /// Coordinates have no total order; clamping a range to another one
    /// always goes through this method.
    pub fn component_min(&self, other: Uid) -> Uid {
        Uid::new(self.c.min(other.c), self.r.min(other.r))
    }

    /// Component-wise saturating subtraction.
    pub fn saturating_sub(&self, other: Uid) -> Uid {
        Uid::new(self.c.saturating_sub(other.c), self.r.saturating_sub(other.r))
    }
}

impl Id {
    /// Convert to an unsigned coordinate if both components are non-negative.
    pub fn to_uid(&self) -> Option<Uid> {
        if self.c < 0 || self.r < 0 {
            return None;
        }
        Some(Uid::new(self.c as usize, self.r as usize))
    }
}

impl From<Uid> for Id {
    fn from(id: Uid) -> Self {
        Id::new(id.c as isize, id.r as isize)
    }
}

impl From<(usize, usize)> for Uid {
    fn from((c, r): (usize, usize)) -> Self {
        Uid::new(c, r)
    }
}

impl<T: Add<Output = T>> Add for GenericId<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.c + rhs.c, self.r + rhs.r)
    }
}

impl<T: Sub<Output = T>> Sub for GenericId<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.c - rhs.c, self.r - rhs.r)
    }
}

impl<T: fmt::Display> fmt::Display for GenericId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.c, self.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_major_linear_index() {
        // 3 columns x 4 rows: columns are contiguous.
        let height = 4;
        assert_eq!(Uid::new(0, 0).linear(height), 0);
        assert_eq!(Uid::new(0, 3).linear(height), 3);
        assert_eq!(Uid::new(1, 0).linear(height), 4);
        assert_eq!(Uid::new(2, 1).linear(height), 9);
    }

    #[test]
    fn test_div_ceil() {
        let range = Uid::new(10, 8);
        assert_eq!(range.div_ceil(Uid::new(4, 4)), Uid::new(3, 2));
        assert_eq!(range.div_ceil(Uid::new(10, 8)), Uid::new(1, 1));
        assert_eq!(Uid::new(1, 1).div_ceil(Uid::new(64, 64)), Uid::new(1, 1));
    }

    #[test]
    fn test_signed_conversion() {
        let id: Id = Uid::new(3, 5).into();
        assert_eq!(id, Id::new(3, 5));
        assert_eq!(id.to_uid(), Some(Uid::new(3, 5)));
        assert_eq!(Id::new(-1, 2).to_uid(), None);
    }

    #[test]
    fn test_is_within() {
        let range = Uid::new(4, 2);
        assert!(Uid::new(3, 1).is_within(range));
        assert!(!Uid::new(4, 1).is_within(range));
        assert!(!Uid::new(0, 2).is_within(range));
    }

    #[test]
    fn test_arithmetic_and_display() {
        assert_eq!(Uid::new(1, 2) + Uid::new(3, 4), Uid::new(4, 6));
        assert_eq!(Id::new(1, 2) - Id::new(3, 4), Id::new(-2, -2));
        assert_eq!(Uid::new(1, 2).saturating_sub(Uid::new(3, 1)), Uid::new(0, 1));
    }

    #[test]
    fn test_component_min_clamps_each_axis() {
        // Smaller column, larger row: both axes must clamp independently.
        assert_eq!(Uid::new(5, 9).component_min(Uid::new(8, 8)), Uid::new(5, 8));
        assert_eq!(Uid::new(9, 5).component_min(Uid::new(8, 8)), Uid::new(8, 5));
        assert_eq!(Uid::new(3, 3).component_min(Uid::new(8, 8)), Uid::new(3, 3));
        assert_eq!(format!("{}", Uid::new(7, 9)), "(7, 9)");
    }
}
