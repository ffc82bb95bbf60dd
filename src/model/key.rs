//! Packed pixel-coordinate keys
//!
//! A pixel key squeezes an `(x, y)` coordinate into one `u32`:
//!
//! ```text
//! key = (x << 8) + y      (wrapping u32 arithmetic, same as x * 256 + y)
//! ```
//!
//! The packing assumes both coordinates lie in `0..=255`. Nothing checks
//! that. A `y` of 256 or more spills into the `x` byte, so `(1, 0)` and
//! `(0, 256)` both pack to `256`. That collision is a property of the
//! format and stays as is; widening the key would change every stored blob.

/// Bits reserved for the `y` coordinate
pub const PIXEL_KEY_SHIFT: u32 = 8;

/// Largest coordinate value that packs without colliding
pub const PIXEL_AXIS_MAX: u32 = (1 << PIXEL_KEY_SHIFT) - 1;

/// Pack a coordinate pair into a pixel key
#[inline]
pub fn pack_key(x: u32, y: u32) -> u32 {
    (x << PIXEL_KEY_SHIFT).wrapping_add(y)
}

/// Split a pixel key back into `(x, y)`
///
/// Only the inverse of [`pack_key`] when both coordinates were in range.
#[inline]
pub fn unpack_key(key: u32) -> (u32, u32) {
    (key >> PIXEL_KEY_SHIFT, key & PIXEL_AXIS_MAX)
}
