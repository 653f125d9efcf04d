//! Geometry value types shared by every placement step.
//!
//! All coordinates are in points, y grows downward, and every type is `Copy`.
//! `Rect - Spacing` insets a rectangle, `Rect + Spacing` outsets it.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing measured sizes against the space offered.
pub const EPSILON: f32 = 1e-3;

/// Quantizes a coordinate to 1/100 of a point for use in cache keys.
pub fn quantize(value: f32) -> i64 {
    (value * 100.0).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub const ZERO: Extent = Extent {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

impl Sub<Spacing> for Extent {
    type Output = Extent;

    fn sub(self, spacing: Spacing) -> Extent {
        Extent::new(
            (self.width - spacing.horizontal()).max(0.0),
            (self.height - spacing.vertical()).max(0.0),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        debug_assert!(right >= left - EPSILON, "negative width: {left}..{right}");
        debug_assert!(bottom >= top - EPSILON, "negative height: {top}..{bottom}");
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn from_origin(origin: Point, extent: Extent) -> Self {
        Rect::new(
            origin.x,
            origin.x + extent.width,
            origin.y,
            origin.y + extent.height,
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width(), self.height())
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.right.max(other.right),
            self.top.min(other.top),
            self.bottom.max(other.bottom),
        )
    }

    pub fn translate(&self, offset: Point) -> Rect {
        Rect::new(
            self.left + offset.x,
            self.right + offset.x,
            self.top + offset.y,
            self.bottom + offset.y,
        )
    }
}

impl Sub<Spacing> for Rect {
    type Output = Rect;

    fn sub(self, spacing: Spacing) -> Rect {
        let left = self.left + spacing.left;
        let top = self.top + spacing.top;
        Rect::new(
            left,
            (self.right - spacing.right).max(left),
            top,
            (self.bottom - spacing.bottom).max(top),
        )
    }
}

impl Add<Spacing> for Rect {
    type Output = Rect;

    fn add(self, spacing: Spacing) -> Rect {
        Rect::new(
            self.left - spacing.left,
            self.right + spacing.right,
            self.top - spacing.top,
            self.bottom + spacing.bottom,
        )
    }
}

/// Margin or padding around a box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spacing {
    #[serde(default)]
    pub left: f32,
    #[serde(default)]
    pub right: f32,
    #[serde(default)]
    pub top: f32,
    #[serde(default)]
    pub bottom: f32,
}

impl Spacing {
    pub const ZERO: Spacing = Spacing {
        left: 0.0,
        right: 0.0,
        top: 0.0,
        bottom: 0.0,
    };

    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Same value on all four sides.
    pub fn balanced(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

impl Add for Spacing {
    type Output = Spacing;

    fn add(self, other: Spacing) -> Spacing {
        Spacing::new(
            self.left + other.left,
            self.right + other.right,
            self.top + other.top,
            self.bottom + other.bottom,
        )
    }
}
