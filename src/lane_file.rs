//! LANE intermediate file: detector frames grouped by acquisition channel
//!
//! File format (all integers u32 little-endian):
//! ```text
//! [HEADER: 8 bytes]
//!   - file_id
//!   - start_time
//!
//! [CHANNELS: variable, ascending channel id, until end of file]
//!   - channel_id
//!   - frame_count
//!   - frame_count frame records (see FrameRecord)
//! ```
//!
//! The body has no channel count; a clean end of file at a channel boundary
//! ends it. Running out of bytes anywhere else is a truncated file.

use crate::model::{Frame, FrameRecord};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Channel that receives frames when none is named
pub const DEFAULT_CHANNEL: u32 = 0;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 8;

/// In-memory LANE file
///
/// Frames are owned values, grouped per channel in the order they were added.
/// Equality compares the channel map only; `file_id` and `start_time` are
/// metadata and do not take part.
#[derive(Clone, Debug)]
pub struct LaneFile<F = Frame> {
    channels: BTreeMap<u32, Vec<F>>,
    file_id: u32,
    start_time: u32,
}

impl<F> Default for LaneFile<F> {
    fn default() -> Self {
        LaneFile {
            channels: BTreeMap::new(),
            file_id: 0,
            start_time: 0,
        }
    }
}

impl<F: FrameRecord> LaneFile<F> {
    /// Create an empty file with zeroed metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a LANE file from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let parsed = Self::read_from(&mut BufReader::new(file))?;

        info!(
            path = %path.display(),
            file_id = parsed.file_id,
            channels = parsed.channel_count(),
            frames = parsed.frame_count(),
            "read LANE file"
        );
        Ok(parsed)
    }

    /// Replace this file's contents with the file at `path`
    ///
    /// On error `self` is left exactly as it was.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<()> {
        *self = Self::open(path)?;
        Ok(())
    }

    /// Write this file to `path`, replacing anything already there
    ///
    /// The data is staged in a temporary file next to `path` and renamed
    /// over it once complete. On error the previous file is left as it was.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let staged = NamedTempFile::new_in(dir)?;
        let mut writer = BufWriter::new(staged);
        self.write_to(&mut writer)?;

        let staged = writer.into_inner().map_err(|e| e.into_error())?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| Error::Io(e.error))?;

        info!(
            path = %path.display(),
            file_id = self.file_id,
            channels = self.channel_count(),
            frames = self.frame_count(),
            "wrote LANE file"
        );
        Ok(())
    }

    /// Parse a complete LANE stream
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let file_id = read_u32(reader, "file id")?;
        let start_time = read_u32(reader, "start time")?;

        let mut channels = BTreeMap::new();
        while let Some(channel_id) = read_u32_or_end(reader)? {
            if channels.contains_key(&channel_id) {
                return Err(Error::Malformed(format!(
                    "channel {} appears more than once",
                    channel_id
                )));
            }

            let frame_count = read_u32(reader, "frame count")?;
            let mut frames = Vec::new();
            for index in 0..frame_count {
                let frame = F::decode_from(reader).map_err(|e| match e {
                    Error::Truncated(msg) => Error::Truncated(format!(
                        "channel {} frame {} of {}: {}",
                        channel_id, index, frame_count, msg
                    )),
                    other => other,
                })?;
                frames.push(frame);
            }

            debug!(channel = channel_id, frames = frames.len(), "decoded channel");
            channels.insert(channel_id, frames);
        }

        Ok(LaneFile {
            channels,
            file_id,
            start_time,
        })
    }

    /// Serialize the whole file onto a stream
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.file_id.to_le_bytes())?;
        writer.write_all(&self.start_time.to_le_bytes())?;

        // BTreeMap iteration gives ascending channel ids
        for (&channel_id, frames) in &self.channels {
            let count = u32::try_from(frames.len()).map_err(|_| Error::TooManyFrames {
                channel: channel_id,
                count: frames.len(),
            })?;
            writer.write_all(&channel_id.to_le_bytes())?;
            writer.write_all(&count.to_le_bytes())?;
            for frame in frames {
                frame.encode_into(writer)?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Append a frame to the default channel
    pub fn add_frame(&mut self, frame: F) {
        self.add_frame_to(frame, DEFAULT_CHANNEL);
    }

    /// Append a frame to `channel_id`, creating the channel if needed
    pub fn add_frame_to(&mut self, frame: F, channel_id: u32) {
        self.channels.entry(channel_id).or_default().push(frame);
    }

    /// Copy of a channel's frames; empty if the channel does not exist
    pub fn get_frames(&self, channel_id: u32) -> Vec<F> {
        self.frames(channel_id).to_vec()
    }

    /// Borrow a channel's frames; empty if the channel does not exist
    pub fn frames(&self, channel_id: u32) -> &[F] {
        self.channels
            .get(&channel_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl<F> LaneFile<F> {
    pub fn set_file_id(&mut self, file_id: u32) {
        self.file_id = file_id;
    }

    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    pub fn set_start_time(&mut self, start_time: u32) {
        self.start_time = start_time;
    }

    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    /// Channel ids in ascending order
    pub fn channel_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.channels.keys().copied()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Total number of frames across all channels
    pub fn frame_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Drop all frames and reset the metadata
    pub fn clear(&mut self) {
        self.channels.clear();
        self.file_id = 0;
        self.start_time = 0;
    }
}

impl<F: PartialEq> PartialEq for LaneFile<F> {
    fn eq(&self, other: &Self) -> bool {
        self.channels == other.channels
    }
}

impl<F: fmt::Display> fmt::Display for LaneFile<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LANE file {}", self.file_id)?;
        writeln!(f, "start time: {}", self.start_time)?;
        writeln!(f, "channels: {}", self.channels.len())?;
        for (channel_id, frames) in &self.channels {
            writeln!(f, "  channel {}: {} frame(s)", channel_id, frames.len())?;
            for (index, frame) in frames.iter().enumerate() {
                writeln!(f, "    [{}] {}", index, frame)?;
            }
        }
        Ok(())
    }
}

fn read_u32<R: Read>(reader: &mut R, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::Truncated(format!("missing {}", what)),
        _ => Error::Io(e),
    })?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a u32, or `None` if the stream ends cleanly before its first byte
fn read_u32_or_end<R: Read>(reader: &mut R) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(Error::Truncated(format!(
                    "channel id cut off after {} byte(s)",
                    filled
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(Some(u32::from_le_bytes(buf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Pixel;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn frame(seed: u32) -> Frame {
        Frame::from_pixels([
            Pixel::new(seed % 256, (seed * 7) % 256, seed + 1),
            Pixel::new((seed + 1) % 256, (seed * 3) % 256, 2),
        ])
    }

    fn populated(channels: u32, frames_per_channel: u32) -> LaneFile {
        let mut file = LaneFile::new();
        file.set_file_id(42);
        file.set_start_time(1_400_000_000);
        for channel in 0..channels {
            for i in 0..frames_per_channel {
                file.add_frame_to(frame(channel * 100 + i), channel);
            }
        }
        file
    }

    #[test]
    fn test_new_is_empty() {
        let file: LaneFile = LaneFile::new();
        assert!(file.is_empty());
        assert_eq!(file.file_id(), 0);
        assert_eq!(file.start_time(), 0);
        assert_eq!(file.frame_count(), 0);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.lane");

        for (channels, frames) in [(0, 0), (1, 1), (3, 4), (7, 2)] {
            let original = populated(channels, frames);
            original.write(&path).unwrap();

            let restored = LaneFile::open(&path).unwrap();
            assert_eq!(original, restored);
            assert_eq!(restored.file_id(), 42);
            assert_eq!(restored.start_time(), 1_400_000_000);
            assert_eq!(restored.frame_count(), (channels * frames) as usize);
        }
    }

    #[test]
    fn test_default_channel() {
        let mut file = LaneFile::new();
        file.add_frame(frame(1));

        assert_eq!(file.get_frames(DEFAULT_CHANNEL), vec![frame(1)]);
        assert_eq!(file.get_frames(0), vec![frame(1)]);
    }

    #[test]
    fn test_frames_accumulate_in_order() {
        let mut file = LaneFile::new();
        file.add_frame_to(frame(3), 5);
        file.add_frame_to(frame(1), 5);
        file.add_frame_to(frame(2), 5);

        assert_eq!(file.get_frames(5), vec![frame(3), frame(1), frame(2)]);
        assert_eq!(file.channel_count(), 1);
    }

    #[test]
    fn test_absent_channel_is_empty() {
        let file = populated(2, 2);
        assert!(file.get_frames(99).is_empty());
        assert!(file.frames(99).is_empty());
    }

    #[test]
    fn test_copy_is_independent() {
        let original = populated(2, 1);
        let mut copy = original.clone();
        copy.add_frame_to(frame(9), 1);

        assert_eq!(original.get_frames(1).len(), 1);
        assert_eq!(copy.get_frames(1).len(), 2);
        assert_ne!(original, copy);
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut source = populated(2, 2);
        let moved = std::mem::take(&mut source);

        assert!(source.is_empty());
        assert_eq!(source.file_id(), 0);
        assert_eq!(moved.frame_count(), 4);
        assert_ne!(source, moved);
    }

    #[test]
    fn test_equality_ignores_metadata() {
        let a = populated(2, 2);
        let mut b = a.clone();
        b.set_file_id(7);
        b.set_start_time(8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_read_replaces_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("small.lane");
        populated(1, 1).write(&path).unwrap();

        let mut file = populated(4, 3);
        file.read(&path).unwrap();

        assert_eq!(file, populated(1, 1));
        assert!(file.get_frames(3).is_empty());
    }

    #[test]
    fn test_failed_read_keeps_state() {
        let dir = tempdir().unwrap();
        let mut file = populated(2, 2);

        let err = file.read(dir.path().join("missing.lane")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(file, populated(2, 2));
        assert_eq!(file.file_id(), 42);

        let truncated = dir.path().join("truncated.lane");
        let mut bytes = Vec::new();
        populated(4, 1).write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        std::fs::write(&truncated, bytes).unwrap();

        let err = file.read(&truncated).unwrap_err();
        assert!(matches!(err, Error::Truncated(_)), "got {:?}", err);
        assert_eq!(file, populated(2, 2));
        assert_eq!(file.file_id(), 42);
        assert_eq!(file.start_time(), 1_400_000_000);
    }

    fn oversized_frame() -> Frame {
        // 1.5M pixels encode past the per-record limit
        Frame::from_pixels((0..1_500_000u32).map(|i| Pixel::new(i % 256, (i / 256) % 256, 1)))
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keep.lane");

        let mut file = LaneFile::new();
        file.add_frame_to(frame(1), 7);
        file.write(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        file.add_frame(oversized_frame());
        let err = file.write(&path).unwrap_err();
        assert!(err.is_content_error(), "got {:?}", err);

        assert_eq!(std::fs::read(&path).unwrap(), before);
        let reopened: LaneFile<Frame> = LaneFile::open(&path).unwrap();
        assert_eq!(reopened.get_frames(7), vec![frame(1)]);
        assert!(reopened.get_frames(0).is_empty());

        // No staging files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_creates_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.lane");

        let mut file = LaneFile::new();
        file.add_frame(oversized_frame());
        assert!(file.write(&path).is_err());

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = LaneFile::<Frame>::open(dir.path().join("nope.lane")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_content_error());
    }

    #[test]
    fn test_header_only_is_valid_empty_file() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&10u32.to_le_bytes());

        let file = LaneFile::<Frame>::read_from(&mut Cursor::new(bytes)).unwrap();
        assert!(file.is_empty());
        assert_eq!(file.file_id(), 9);
        assert_eq!(file.start_time(), 10);
    }

    #[test]
    fn test_zero_byte_file_is_truncated() {
        let err = LaneFile::<Frame>::read_from(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::Truncated(_)));
    }

    #[test]
    fn test_truncation_anywhere_is_detected() {
        let mut bytes = Vec::new();
        populated(2, 2).write_to(&mut bytes).unwrap();

        for len in 1..bytes.len() {
            let result = LaneFile::<Frame>::read_from(&mut Cursor::new(&bytes[..len]));
            match result {
                Err(Error::Truncated(_)) => {}
                // A cut exactly between channel records is a shorter valid file
                Ok(file) => assert!(file.frame_count() < 4, "cut at {}", len),
                Err(other) => panic!("cut at {}: unexpected {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_duplicate_channel_is_malformed() {
        let mut one = LaneFile::new();
        one.add_frame_to(frame(1), 3);
        let mut bytes = Vec::new();
        one.write_to(&mut bytes).unwrap();
        let record = bytes[HEADER_SIZE..].to_vec();
        bytes.extend_from_slice(&record);

        let err = LaneFile::<Frame>::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let mut a = LaneFile::new();
        a.add_frame_to(frame(1), 9);
        a.add_frame_to(frame(2), 2);
        let mut b = LaneFile::new();
        b.add_frame_to(frame(2), 2);
        b.add_frame_to(frame(1), 9);

        let (mut bytes_a, mut bytes_b) = (Vec::new(), Vec::new());
        a.write_to(&mut bytes_a).unwrap();
        b.write_to(&mut bytes_b).unwrap();
        assert_eq!(bytes_a, bytes_b);

        // Lowest channel id comes first after the header
        assert_eq!(&bytes_a[HEADER_SIZE..HEADER_SIZE + 4], &2u32.to_le_bytes());
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("over.lane");
        populated(5, 5).write(&path).unwrap();
        populated(1, 1).write(&path).unwrap();

        assert_eq!(LaneFile::open(&path).unwrap(), populated(1, 1));
    }

    #[test]
    fn test_display() {
        let mut file = LaneFile::new();
        file.set_file_id(3);
        file.set_start_time(100);
        file.add_frame_to(Frame::from_pixels([Pixel::new(1, 1, 4)]), 2);

        assert_eq!(
            file.to_string(),
            "LANE file 3\nstart time: 100\nchannels: 1\n  channel 2: 1 frame(s)\n    [0] frame: 1 hit pixel(s), total count 4\n"
        );
    }

    /// A minimal frame type: one counter per frame
    #[derive(Clone, Debug, PartialEq)]
    struct Counter(u16);

    impl FrameRecord for Counter {
        fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
            writer.write_all(&self.0.to_le_bytes())?;
            Ok(())
        }

        fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
            let mut buf = [0u8; 2];
            reader
                .read_exact(&mut buf)
                .map_err(|_| Error::Truncated("counter".into()))?;
            Ok(Counter(u16::from_le_bytes(buf)))
        }
    }

    #[test]
    fn test_custom_frame_type() {
        let mut file: LaneFile<Counter> = LaneFile::new();
        file.add_frame(Counter(1));
        file.add_frame_to(Counter(2), 1);

        let mut bytes = Vec::new();
        file.write_to(&mut bytes).unwrap();
        // header + 2 * (channel id + count + one 2-byte frame)
        assert_eq!(bytes.len(), HEADER_SIZE + 2 * (4 + 4 + 2));

        let restored = LaneFile::<Counter>::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(file, restored);
    }
}
