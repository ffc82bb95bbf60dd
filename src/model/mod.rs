//! Value types shared by the LANE container and blob analysis

mod frame;
mod key;
mod pixel;

pub use frame::{Frame, FrameRecord, FRAME_HEIGHT, FRAME_WIDTH, MAX_FRAME_BYTES};
pub use key::{pack_key, unpack_key, PIXEL_AXIS_MAX, PIXEL_KEY_SHIFT};
pub use pixel::{Pixel, PixelCoords};
