//! Pure geometry helpers shared by the view engine, input dispatcher and renderer.
//!
//! Everything here works in `f64` so that screen/world round trips stay exact to well
//! below a pixel even at extreme zoom levels. Conversion to egui's `f32` types happens
//! only at the painting boundary.

use eframe::egui;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// A 2D point or displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal component
    pub x: f64,
    /// Vertical component
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    /// Creates a point from its components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length when used as a displacement.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Midpoint between `self` and `other`.
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Converts to an egui position for painting.
    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x as f32, self.y as f32)
    }
}

impl From<egui::Pos2> for Point {
    fn from(p: egui::Pos2) -> Self {
        Point::new(p.x as f64, p.y as f64)
    }
}

impl From<egui::Vec2> for Point {
    fn from(v: egui::Vec2) -> Self {
        Point::new(v.x as f64, v.y as f64)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Restricts `v` to `[lo, hi]`.
///
/// Unlike [`f64::clamp`] this never panics, and a NaN input collapses to `lo`.
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() || v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// Euclidean distance between two endpoints, in whatever space they are expressed.
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).length()
}

/// Maps a screen position to world (image pixel) coordinates.
pub fn screen_to_world(screen: Point, zoom: f64, offset: Point) -> Point {
    (screen - offset) / zoom
}

/// Maps a world position to screen coordinates: `w * zoom + offset`.
pub fn world_to_screen(world: Point, zoom: f64, offset: Point) -> Point {
    world * zoom + offset
}

/// Snaps `end` so the segment from `start` is horizontal or vertical.
///
/// The axis with the larger absolute delta stays free; the other is pinned to `start`.
pub fn constrain_to_axis(start: Point, end: Point) -> Point {
    let d = end - start;
    if d.x.abs() >= d.y.abs() {
        Point::new(end.x, start.y)
    } else {
        Point::new(start.x, end.y)
    }
}
