//! Basic geometry of the plotter: positions in step units, and the shapes
//! that the plotter knows how to draw.
//!
//! Everything here is measured in motor steps. There's no notion of physical
//! length: the host is expected to have scaled its drawing already.
//!
//! This crate supports `no_std` and uses `libm` for the little bit of
//! floating point that the curved shapes need.

#![cfg_attr(not(feature = "std"), no_std)]

use serde::{Deserialize, Serialize};

pub mod shape;

pub use shape::{
    Circle, CubicCurve, Ellipse, Polygon, Rotation, Shape, ShapeError, ShapeKind, Waypoint,
    MAX_POLYGON_VERTICES,
};

/// A position of the pen, measured in steps from the home corner.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A pair of things, one for each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XY<T> {
    pub x: T,
    pub y: T,
}

impl<T> XY<T> {
    pub fn new(x: T, y: T) -> Self {
        XY { x, y }
    }
}

/// Something that can move the pen around.
///
/// The motion controller is the real implementation; shapes only ever talk
/// to it through this trait.
pub trait Travel {
    /// Moves to `(x, y)`, with the pen down if `marking` is true and up otherwise.
    ///
    /// Returns the position that was actually reached, which might not be the
    /// requested one (for example, if the machine ran into a travel limit).
    fn travel(&mut self, x: i32, y: i32, marking: bool) -> Position;

    fn current_position(&self) -> Position;
}
