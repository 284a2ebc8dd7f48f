//! Frame source: stream metadata and decoded frames from a video container.
//!
//! - [`probe`]: dimensions, frame rate, frame count, audio presence (`ffprobe`)
//! - [`ffmpeg`]: a [`FrameSource`] iterator of raw RGB frames (`ffmpeg`)

pub mod ffmpeg;
pub mod probe;

pub use ffmpeg::FrameSource;
pub use probe::{probe_video, VideoInfo};
