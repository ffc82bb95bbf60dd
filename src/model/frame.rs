//! Detector frames and their record codec
//!
//! A LANE file stores frames as opaque records. [`FrameRecord`] is the
//! contract a frame type has to meet to live in a [`crate::LaneFile`]:
//! value equality plus a self-delimiting binary encoding on a byte stream.
//!
//! [`Frame`] is the stock implementation: a sparse list of hit pixels on a
//! 256x256 sensor, encoded with bincode (fixed-width little-endian ints).

use super::pixel::Pixel;
use crate::{Error, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{ErrorKind, Read, Write};

/// Sensor width in pixels
pub const FRAME_WIDTH: u32 = 256;

/// Sensor height in pixels
pub const FRAME_HEIGHT: u32 = 256;

/// Upper bound on one encoded frame record
pub const MAX_FRAME_BYTES: u64 = 16 * 1024 * 1024;

/// A frame type that can be stored in a LANE file
pub trait FrameRecord: Clone + PartialEq + Sized {
    /// Append this frame's record to `writer`
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// Read exactly one record from `reader`
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self>;
}

/// One acquisition frame: the pixels that registered hits
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pixels: Vec<Pixel>,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Frame { pixels: Vec::new() }
    }

    /// Create a frame from a list of hit pixels
    pub fn from_pixels(pixels: impl IntoIterator<Item = Pixel>) -> Self {
        Frame {
            pixels: pixels.into_iter().collect(),
        }
    }

    /// Record a hit pixel
    pub fn add_pixel(&mut self, pixel: Pixel) {
        self.pixels.push(pixel);
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Sum of hit counts over every pixel
    pub fn total_count(&self) -> u64 {
        self.pixels.iter().map(|p| p.count as u64).sum()
    }

    /// Hit count at a coordinate (summed if the pixel was recorded twice)
    pub fn count_at(&self, x: u32, y: u32) -> u64 {
        self.pixels
            .iter()
            .filter(|p| p.x == x && p.y == y)
            .map(|p| p.count as u64)
            .sum()
    }

    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .with_limit(MAX_FRAME_BYTES)
    }
}

impl FrameRecord for Frame {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        Frame::options()
            .serialize_into(writer, self)
            .map_err(encode_error)
    }

    fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        Frame::options()
            .deserialize_from(reader)
            .map_err(decode_error)
    }
}

fn encode_error(err: bincode::Error) -> Error {
    match *err {
        bincode::ErrorKind::Io(e) => Error::Io(e),
        other => Error::Serialization(Box::new(other)),
    }
}

fn decode_error(err: bincode::Error) -> Error {
    match *err {
        bincode::ErrorKind::Io(ref e) if e.kind() == ErrorKind::UnexpectedEof => {
            Error::Truncated("frame record ends early".into())
        }
        bincode::ErrorKind::Io(e) => Error::Io(e),
        bincode::ErrorKind::SizeLimit => Error::Malformed(format!(
            "frame record exceeds {} bytes",
            MAX_FRAME_BYTES
        )),
        other => Error::Malformed(format!("bad frame record: {}", other)),
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame: {} hit pixel(s), total count {}",
            self.pixel_count(),
            self.total_count()
        )
    }
}
