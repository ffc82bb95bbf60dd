//! Detector pixel type

use super::key::pack_key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything with integer sensor coordinates
///
/// This is the only view of a pixel that [`crate::Blob`] needs.
pub trait PixelCoords {
    fn x(&self) -> u32;
    fn y(&self) -> u32;
}

/// A single hit pixel in a detector frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    /// Hit count recorded by the sensor for this pixel
    pub count: u32,
}

impl Pixel {
    pub fn new(x: u32, y: u32, count: u32) -> Self {
        Pixel { x, y, count }
    }

    /// Packed key for this pixel's position
    pub fn key(&self) -> u32 {
        pack_key(self.x, self.y)
    }
}

impl PixelCoords for Pixel {
    fn x(&self) -> u32 {
        self.x
    }

    fn y(&self) -> u32 {
        self.y
    }
}

impl PixelCoords for (u32, u32) {
    fn x(&self) -> u32 {
        self.0
    }

    fn y(&self) -> u32 {
        self.1
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) x{}", self.x, self.y, self.count)
    }
}
