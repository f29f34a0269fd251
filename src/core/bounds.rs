use crate::core::constants::{GRID_HEIGHT, GRID_WIDTH};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in grid metres.
///
/// Degenerate results of [`intersect`](BoundingBox::intersect) and
/// [`inset`](BoundingBox::inset) are reported as [`BoundingBox::NULL`], which is
/// distinct from any zero-area box. Callers must check [`is_null`](BoundingBox::is_null)
/// before using such a result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// The empty sentinel: every coordinate at negative infinity.
    pub const NULL: BoundingBox = BoundingBox {
        min_x: f64::NEG_INFINITY,
        min_y: f64::NEG_INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    /// The full extent of the national grid.
    pub const GRID: BoundingBox = BoundingBox {
        min_x: 0.0,
        min_y: 0.0,
        max_x: GRID_WIDTH,
        max_y: GRID_HEIGHT,
    };

    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a box from its center point and size
    pub fn from_center_size(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self::new(
            cx - half_width,
            cy - half_height,
            cx + half_width,
            cy + half_height,
        )
    }

    pub fn is_null(&self) -> bool {
        self.min_x == f64::NEG_INFINITY
            && self.min_y == f64::NEG_INFINITY
            && self.max_x == f64::NEG_INFINITY
            && self.max_y == f64::NEG_INFINITY
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    /// True when the box has positive width and height.
    pub fn is_proper(&self) -> bool {
        !self.is_null() && self.width() > 0.0 && self.height() > 0.0
    }

    /// Checks if the box contains a point (edges inclusive)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Checks whether two boxes overlap with positive area
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// The overlap of two boxes, or [`BoundingBox::NULL`] if it has no area.
    pub fn intersect(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_null() || other.is_null() {
            return Self::NULL;
        }
        Self::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        )
        .or_null()
    }

    /// Shrinks every edge inwards by `dx`/`dy` (negative values grow the box).
    /// Returns [`BoundingBox::NULL`] if nothing is left.
    pub fn inset(&self, dx: f64, dy: f64) -> BoundingBox {
        if self.is_null() {
            return Self::NULL;
        }
        Self::new(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x - dx,
            self.max_y - dy,
        )
        .or_null()
    }

    /// Smallest box covering both. The null box is the identity.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_null() {
            return *other;
        }
        if other.is_null() {
            return *self;
        }
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Clamps each edge independently to `[0, GRID_WIDTH] x [0, GRID_HEIGHT]`.
    pub fn clip_to_grid_bounds(&self) -> BoundingBox {
        if self.is_null() {
            return Self::NULL;
        }
        Self::new(
            self.min_x.clamp(0.0, GRID_WIDTH),
            self.min_y.clamp(0.0, GRID_HEIGHT),
            self.max_x.clamp(0.0, GRID_WIDTH),
            self.max_y.clamp(0.0, GRID_HEIGHT),
        )
    }

    fn or_null(self) -> BoundingBox {
        // NaN edges fail both comparisons and collapse to null as well
        if self.max_x - self.min_x > 0.0 && self.max_y - self.min_y > 0.0 {
            self
        } else {
            Self::NULL
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_center_size() {
        let bbox = BoundingBox::from_center_size(45_000.0, 45_000.0, 320.0, 320.0);
        assert_eq!(bbox, BoundingBox::new(44_840.0, 44_840.0, 45_160.0, 45_160.0));
        assert_eq!(bbox.width(), 320.0);
        assert_eq!(bbox.center_x(), 45_000.0);
    }

    #[test]
    fn test_intersect_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert!(a.intersects(&b));
        assert_eq!(a.intersect(&b), BoundingBox::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(a.intersect(&b), b.intersect(&a));
    }

    #[test]
    fn test_intersect_disjoint_and_touching_is_null() {
        let a = BoundingBox::new(0.0, 0.0, 5.0, 5.0);
        let far = BoundingBox::new(10.0, 10.0, 15.0, 15.0);
        let touching = BoundingBox::new(5.0, 0.0, 10.0, 5.0);
        assert!(a.intersect(&far).is_null());
        assert!(a.intersect(&touching).is_null());
        assert!(!a.intersects(&touching));
    }

    #[test]
    fn test_null_is_distinct_from_zero_area() {
        let zero = BoundingBox::new(3.0, 3.0, 3.0, 3.0);
        assert!(!zero.is_null());
        assert!(!zero.is_proper());
        assert!(BoundingBox::NULL.is_null());
        assert!(BoundingBox::NULL.intersect(&BoundingBox::GRID).is_null());
    }

    #[test]
    fn test_inset() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(a.inset(2.0, 3.0), BoundingBox::new(2.0, 3.0, 8.0, 17.0));
        assert!(a.inset(5.0, 1.0).is_null());
        assert_eq!(a.inset(-1.0, -1.0), BoundingBox::new(-1.0, -1.0, 11.0, 21.0));
        assert!(!a.inset(0.0, 0.0).is_null());
    }

    #[test]
    fn test_clip_to_grid_bounds() {
        let a = BoundingBox::new(-100.0, 1_299_000.0, 200.0, 1_400_000.0);
        assert_eq!(
            a.clip_to_grid_bounds(),
            BoundingBox::new(0.0, 1_299_000.0, 200.0, 1_300_000.0)
        );
    }

    #[test]
    fn test_union_with_null() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(4.0, -2.0, 5.0, 0.5);
        assert_eq!(BoundingBox::NULL.union(&a), a);
        assert_eq!(a.union(&BoundingBox::NULL), a);
        assert_eq!(a.union(&b), BoundingBox::new(0.0, -2.0, 5.0, 1.0));
    }

    #[test]
    fn test_contains() {
        let a = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert!(a.contains(15.0, 25.0));
        assert!(a.contains(10.0, 40.0));
        assert!(!a.contains(5.0, 25.0));
    }
}
