//! Blob - one connected region of hit pixels, stored as packed keys

use crate::model::{pack_key, unpack_key, PixelCoords};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of pixel keys making up one region of interest
///
/// Keys keep insertion order and duplicates are kept. Two blobs are equal
/// only if they hold the same keys in the same order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blob {
    pixel_keys: Vec<u32>,
}

impl Blob {
    /// Create an empty blob
    pub fn new() -> Self {
        Blob {
            pixel_keys: Vec::new(),
        }
    }

    /// Append a pixel, packing its coordinates into a key
    ///
    /// Coordinates are not range checked; see [`crate::model::pack_key`].
    pub fn add_pixel<P: PixelCoords + ?Sized>(&mut self, pixel: &P) {
        self.pixel_keys.push(pack_key(pixel.x(), pixel.y()));
    }

    /// Append an already packed key verbatim
    pub fn add_pixel_key(&mut self, key: u32) {
        self.pixel_keys.push(key);
    }

    pub fn keys(&self) -> &[u32] {
        &self.pixel_keys
    }

    pub fn len(&self) -> usize {
        self.pixel_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_keys.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, u32> {
        self.pixel_keys.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, u32> {
        self.pixel_keys.iter_mut()
    }

    /// Keys unpacked back into `(x, y)` pairs
    pub fn coords(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.pixel_keys.iter().map(|&k| unpack_key(k))
    }
}

impl<'a> IntoIterator for &'a Blob {
    type Item = &'a u32;
    type IntoIter = std::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut Blob {
    type Item = &'a mut u32;
    type IntoIter = std::slice::IterMut<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl IntoIterator for Blob {
    type Item = u32;
    type IntoIter = std::vec::IntoIter<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.pixel_keys.into_iter()
    }
}

impl FromIterator<u32> for Blob {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Blob {
            pixel_keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<u32> for Blob {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        self.pixel_keys.extend(iter);
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blob keys:")?;
        for key in &self.pixel_keys {
            write!(f, "{}, ", key)?;
        }
        Ok(())
    }
}
