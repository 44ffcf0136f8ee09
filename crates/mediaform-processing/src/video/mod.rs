//! Video access through the system `ffmpeg`/`ffprobe` binaries.
//!
//! Frames travel as raw RGB24 over pipes, one frame in memory at a time.

mod ffmpeg;
mod probe;

pub(crate) use ffmpeg::{FrameReader, FrameWriter};
pub(crate) use probe::{probe_video, VideoInfo};

/// Frame rate used when the container does not declare one
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// MP4 family files carry an `ftyp` box at offset 4
pub(crate) fn looks_like_mp4(data: &[u8]) -> bool {
    data.len() >= 12 && &data[4..8] == b"ftyp"
}
