//! lane CLI - inspect and build LANE intermediate files
//!
//! Results go to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use lucid_lane::logging::init_logging;
use lucid_lane::{
    find_blobs, Frame, LaneConfig, LaneFile, LogFormat, LogLevel, OutputFormat, Pixel,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lane")]
#[command(about = "Inspect and build LANE intermediate detector files")]
#[command(version)]
struct Cli {
    /// Output format (json or text)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Log level
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Log format
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Config file (defaults to ~/.config/lucid-lane/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty LANE file
    Create {
        /// Path of the file to create
        path: PathBuf,
        /// File ID stored in the header
        #[arg(long, default_value = "0")]
        file_id: u32,
        /// Start time stored in the header
        #[arg(long, default_value = "0")]
        start_time: u32,
    },

    /// Show header and per-channel frame counts
    Info {
        path: PathBuf,
    },

    /// Append a frame read from a JSON pixel list
    Add {
        /// LANE file to append to (created if missing)
        path: PathBuf,
        /// JSON file holding [{"x": .., "y": .., "count": ..}, ...]
        pixels: PathBuf,
        /// Channel to append to
        #[arg(short, long)]
        channel: Option<u32>,
    },

    /// List the frames of one channel
    Frames {
        path: PathBuf,
        #[arg(short, long)]
        channel: Option<u32>,
    },

    /// Cluster the hit pixels of a channel's frames into blobs
    Blobs {
        path: PathBuf,
        #[arg(short, long)]
        channel: Option<u32>,
        /// Only this frame index
        #[arg(long)]
        frame: Option<usize>,
    },

    /// Compare the frame contents of two LANE files
    Compare {
        a: PathBuf,
        b: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LaneConfig::load(path)?,
        None => LaneConfig::load_default()?,
    };
    let format = cli.format.unwrap_or(config.format);
    init_logging(
        cli.log_format.unwrap_or(config.log_format),
        cli.log_level.unwrap_or(config.log_level),
    );

    match cli.command {
        Commands::Create {
            path,
            file_id,
            start_time,
        } => {
            let mut file = LaneFile::<Frame>::new();
            file.set_file_id(file_id);
            file.set_start_time(start_time);
            file.write(&path)?;
            output(
                &format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Created LANE file at {}", path.display())
                }),
            )?;
        }

        Commands::Info { path } => {
            let file = LaneFile::<Frame>::open(&path)?;
            match format {
                OutputFormat::Text => print!("{}", file),
                OutputFormat::Json => {
                    let channels: Vec<_> = file
                        .channel_ids()
                        .map(|id| {
                            serde_json::json!({
                                "channel": id,
                                "frames": file.frames(id).len()
                            })
                        })
                        .collect();
                    output(
                        &format,
                        &serde_json::json!({
                            "file_id": file.file_id(),
                            "start_time": file.start_time(),
                            "frame_count": file.frame_count(),
                            "channels": channels
                        }),
                    )?;
                }
            }
        }

        Commands::Add {
            path,
            pixels,
            channel,
        } => {
            let channel = channel.unwrap_or(config.default_channel);
            let content = std::fs::read_to_string(&pixels)?;
            let pixels: Vec<Pixel> = serde_json::from_str(&content)?;
            let frame = Frame::from_pixels(pixels);
            let hits = frame.pixel_count();

            let mut file = open_or_new(&path)?;
            file.add_frame_to(frame, channel);
            file.write(&path)?;
            output(
                &format,
                &serde_json::json!({
                    "status": "ok",
                    "channel": channel,
                    "pixels": hits,
                    "frames": file.frames(channel).len()
                }),
            )?;
        }

        Commands::Frames { path, channel } => {
            let channel = channel.unwrap_or(config.default_channel);
            let file = LaneFile::<Frame>::open(&path)?;
            let items: Vec<_> = file
                .frames(channel)
                .iter()
                .enumerate()
                .map(|(index, frame)| {
                    serde_json::json!({
                        "index": index,
                        "pixels": frame.pixel_count(),
                        "total_count": frame.total_count()
                    })
                })
                .collect();
            output(
                &format,
                &serde_json::json!({
                    "channel": channel,
                    "count": items.len(),
                    "frames": items
                }),
            )?;
        }

        Commands::Blobs {
            path,
            channel,
            frame,
        } => {
            let channel = channel.unwrap_or(config.default_channel);
            let file = LaneFile::<Frame>::open(&path)?;
            let frames = file.frames(channel);
            let selected: Vec<(usize, &Frame)> = match frame {
                Some(index) => {
                    let f = frames.get(index).ok_or_else(|| {
                        anyhow::anyhow!(
                            "Channel {} has {} frame(s), no frame {}",
                            channel,
                            frames.len(),
                            index
                        )
                    })?;
                    vec![(index, f)]
                }
                None => frames.iter().enumerate().collect(),
            };

            let items: Vec<_> = selected
                .into_iter()
                .map(|(index, f)| {
                    serde_json::json!({
                        "frame": index,
                        "blobs": find_blobs(f)
                            .iter()
                            .map(|b| b.keys().to_vec())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            output(
                &format,
                &serde_json::json!({
                    "channel": channel,
                    "frames": items
                }),
            )?;
        }

        Commands::Compare { a, b } => {
            let left = LaneFile::<Frame>::open(&a)?;
            let right = LaneFile::<Frame>::open(&b)?;
            let equal = left == right;
            output(
                &format,
                &serde_json::json!({
                    "equal": equal,
                    "a": { "file_id": left.file_id(), "frames": left.frame_count() },
                    "b": { "file_id": right.file_id(), "frames": right.frame_count() }
                }),
            )?;
            if !equal {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn open_or_new(path: &Path) -> anyhow::Result<LaneFile<Frame>> {
    if path.exists() {
        Ok(LaneFile::open(path)?)
    } else {
        Ok(LaneFile::new())
    }
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value)?);
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}
