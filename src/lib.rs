//! # lucid_lane
//!
//! The LANE intermediate format for raw detector frames, and the pixel blobs
//! used by downstream analysis.
//!
//! ## Core Concepts
//!
//! - **Frames**: hit pixels captured in one acquisition window
//! - **Channels**: acquisition streams; each LANE file maps channel ids to frames
//! - **Pixel keys**: an `(x, y)` coordinate packed into one `u32` as `x * 256 + y`
//! - **Blobs**: ordered pixel keys for one connected region of a frame
//!
//! ## Example
//!
//! ```no_run
//! use lucid_lane::{Frame, LaneFile, Pixel};
//!
//! let mut file = LaneFile::new();
//! file.set_file_id(1);
//! file.add_frame(Frame::from_pixels([Pixel::new(3, 4, 1)]));
//! file.write("run.lane")?;
//!
//! let back = LaneFile::open("run.lane")?;
//! assert_eq!(file, back);
//! # Ok::<(), lucid_lane::Error>(())
//! ```

pub mod blob;
pub mod cluster;
pub mod config;
pub mod lane_file;
pub mod logging;
pub mod model;

mod error;

pub use blob::Blob;
pub use cluster::find_blobs;
pub use config::{LaneConfig, LogFormat, LogLevel, OutputFormat};
pub use error::{Error, Result};
pub use lane_file::{LaneFile, DEFAULT_CHANNEL};
pub use model::{pack_key, unpack_key, Frame, FrameRecord, Pixel, PixelCoords};
