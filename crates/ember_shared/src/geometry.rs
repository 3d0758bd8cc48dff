//! Integer screen-space geometry.
//!
//! These are the canonical representations carried inside draw records.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A point in screen pixels.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Creates a new Point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Origin
    pub const ZERO: Self = Self::new(0, 0);

    /// Sentinel for "no position", e.g. an unset rotation center
    pub const UNDEFINED: Self = Self::new(i32::MAX, i32::MAX);
}

impl std::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An axis-aligned rectangle in screen pixels.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Rectangle {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub w: i32,
    /// Height
    pub h: i32,
}

impl Rectangle {
    /// Creates a new Rectangle
    #[must_use]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Empty rectangle at the origin
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Top-left corner
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// True if width or height is not positive.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Half-open containment: the right and bottom edges are outside.
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.w
            && point.y >= self.y
            && point.y < self.y + self.h
    }

    /// Returns the overlapping area of two rectangles, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if self.is_empty() || other.is_empty() {
            return None;
        }

        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.w).min(other.x + other.w);
        let bottom = (self.y + self.h).min(other.y + other.h);

        (right > left && bottom > top).then(|| Self::new(left, top, right - left, bottom - top))
    }
}

/// Free-function form of [`Rectangle::contains`].
#[inline]
#[must_use]
pub const fn is_point_in_rect(point: Point, rect: &Rectangle) -> bool {
    rect.contains(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_in_rect_edges() {
        let rect = Rectangle::new(10, 10, 20, 5);

        assert!(is_point_in_rect(Point::new(10, 10), &rect));
        assert!(is_point_in_rect(Point::new(29, 14), &rect));
        assert!(!is_point_in_rect(Point::new(30, 14), &rect));
        assert!(!is_point_in_rect(Point::new(15, 15), &rect));
        assert!(!is_point_in_rect(Point::new(9, 12), &rect));
    }

    #[test]
    fn test_intersection() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(5, 5, 10, 10);

        assert_eq!(a.intersection(&b), Some(Rectangle::new(5, 5, 5, 5)));
        assert_eq!(a.intersection(&Rectangle::new(10, 0, 4, 4)), None);
        assert_eq!(a.intersection(&Rectangle::ZERO), None);
    }

    #[test]
    fn test_point_ops() {
        assert_eq!(Point::new(1, 2) + Point::new(3, 4), Point::new(4, 6));
        assert_eq!(Point::new(1, 2) - Point::new(3, 4), Point::new(-2, -2));
    }
}
