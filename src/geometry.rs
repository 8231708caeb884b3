use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Magnitudes below this are treated as zero when normalising directions.
pub const EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn get(self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// Returns a copy moved by `delta` along `axis`.
    pub fn offset(self, axis: Axis, delta: f32) -> Self {
        match axis {
            Axis::X => Self::new(self.x + delta, self.y),
            Axis::Y => Self::new(self.x, self.y + delta),
        }
    }

    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() < EPSILON && (self.y - other.y).abs() < EPSILON
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The axis a port normal or a segment runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn cross(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Bounds {
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            top: y,
            right: x + width,
            bottom: y + height,
            left: x,
        }
    }

    /// A zero-sized box around a single point, used for free connection ends.
    pub fn from_point(p: Point) -> Self {
        Self {
            top: p.y,
            right: p.x,
            bottom: p.y,
            left: p.x,
        }
    }

    pub fn of_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::from_point(*first);
        for p in rest {
            bounds.left = bounds.left.min(p.x);
            bounds.right = bounds.right.max(p.x);
            bounds.top = bounds.top.min(p.y);
            bounds.bottom = bounds.bottom.max(p.y);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    fn range(&self, axis: Axis) -> (f32, f32) {
        match axis {
            Axis::X => (self.left, self.right),
            Axis::Y => (self.top, self.bottom),
        }
    }

    /// Closed-interval overlap of the two boxes' projections on `axis`.
    pub fn overlaps_on(&self, other: &Bounds, axis: Axis) -> bool {
        let (a_min, a_max) = self.range(axis);
        let (b_min, b_max) = other.range(axis);
        a_min <= b_max && b_min <= a_max
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.overlaps_on(other, Axis::X) && self.overlaps_on(other, Axis::Y)
    }
}

/// Per-axis overlap of two boxes, as reported by [`overlapped_dimensions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub x: bool,
    pub y: bool,
}

pub fn overlapped_dimensions(a: &Bounds, b: &Bounds) -> Overlap {
    Overlap {
        x: a.overlaps_on(b, Axis::X),
        y: a.overlaps_on(b, Axis::Y),
    }
}

/// Sign of `value` as -1, 0 or +1, with a dead zone of [`EPSILON`].
pub fn sign(value: f32) -> i8 {
    if value > EPSILON {
        1
    } else if value < -EPSILON {
        -1
    } else {
        0
    }
}

/// Normalised direction from `from` to `to`, one sign per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeDirection {
    pub x: i8,
    pub y: i8,
}

impl RelativeDirection {
    pub fn between(from: Point, to: Point) -> Self {
        Self {
            x: sign(to.x - from.x),
            y: sign(to.y - from.y),
        }
    }

    pub fn get(self, axis: Axis) -> i8 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

pub fn distance(a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Like `f32::clamp` but never panics; an inverted range collapses to `max`.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Axis an orthogonal segment runs along.
///
/// Diagonal segments and coincident endpoints are caller bugs and are
/// reported instead of being approximated.
pub fn segment_axis(from: Point, to: Point) -> Result<Axis> {
    let same_x = (from.x - to.x).abs() < EPSILON;
    let same_y = (from.y - to.y).abs() < EPSILON;
    match (same_x, same_y) {
        (true, true) => Err(Error::CoincidentPoints { point: from }),
        (false, true) => Ok(Axis::X),
        (true, false) => Ok(Axis::Y),
        (false, false) => Err(Error::DiagonalSegment { from, to }),
    }
}

/// A segment with its endpoints sorted per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedSegment {
    pub axis: Axis,
    pub min: Point,
    pub max: Point,
}

impl NormalizedSegment {
    pub fn new(from: Point, to: Point) -> Result<Self> {
        let axis = segment_axis(from, to)?;
        let min = Point::new(from.x.min(to.x), from.y.min(to.y));
        let max = Point::new(from.x.max(to.x), from.y.max(to.y));
        Ok(Self { axis, min, max })
    }

    /// Strict interior crossing of two perpendicular segments.
    pub fn crossing(&self, other: &NormalizedSegment) -> Option<Point> {
        if self.axis == other.axis {
            return None;
        }
        let (horizontal, vertical) = match self.axis {
            Axis::X => (self, other),
            Axis::Y => (other, self),
        };
        let x = vertical.min.x;
        let y = horizontal.min.y;
        let inside_h = x > horizontal.min.x + EPSILON && x < horizontal.max.x - EPSILON;
        let inside_v = y > vertical.min.y + EPSILON && y < vertical.max.y - EPSILON;
        (inside_h && inside_v).then_some(Point::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_has_dead_zone() {
        assert_eq!(sign(0.0005), 0);
        assert_eq!(sign(-4.0), -1);
        assert_eq!(sign(12.0), 1);
    }

    #[test]
    fn overlap_is_per_axis() {
        let a = Bounds::from_rect(0.0, 0.0, 100.0, 50.0);
        let b = Bounds::from_rect(300.0, 0.0, 100.0, 50.0);
        let overlap = overlapped_dimensions(&a, &b);
        assert!(!overlap.x);
        assert!(overlap.y);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn diagonal_segment_is_rejected() {
        let err = segment_axis(Point::new(0.0, 0.0), Point::new(5.0, 5.0)).unwrap_err();
        assert!(matches!(err, Error::DiagonalSegment { .. }));
        let err = segment_axis(Point::new(1.0, 1.0), Point::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, Error::CoincidentPoints { .. }));
    }

    #[test]
    fn perpendicular_segments_cross_strictly_inside() {
        let h = NormalizedSegment::new(Point::new(100.0, 50.0), Point::new(0.0, 50.0)).unwrap();
        let v = NormalizedSegment::new(Point::new(40.0, 0.0), Point::new(40.0, 90.0)).unwrap();
        assert_eq!(h.crossing(&v), Some(Point::new(40.0, 50.0)));

        // touching at an endpoint is not a crossing
        let t = NormalizedSegment::new(Point::new(0.0, 50.0), Point::new(0.0, 90.0)).unwrap();
        assert_eq!(h.crossing(&t), None);
    }

    #[test]
    fn clamp_keeps_value_in_range() {
        assert_eq!(clamp(5.0, 0.0, 3.0), 3.0);
        assert_eq!(clamp(-1.0, 0.0, 3.0), 0.0);
        assert_eq!(clamp(1.0, 4.0, 2.0), 2.0);
    }
}
