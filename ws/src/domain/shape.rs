//! Window geometry

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position and size of a window in screen device pixels
///
/// Coordinates are signed: windows on a monitor left of or above the primary
/// one have negative positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Shape {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Center point, where consumers typically anchor a window's visual
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.w) * 0.5,
            f64::from(self.y) + f64::from(self.h) * 0.5,
        )
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}{:+}{:+}", self.w, self.h, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center() {
        assert_eq!(Shape::new(0, 0, 800, 600).center(), (400.0, 300.0));
        assert_eq!(Shape::new(-100, 10, 51, 20).center(), (-74.5, 20.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::new(900, 0, 600, 400).to_string(), "600x400+900+0");
        assert_eq!(Shape::new(-20, -5, 10, 10).to_string(), "10x10-20-5");
    }
}
