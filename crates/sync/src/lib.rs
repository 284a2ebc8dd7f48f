//! Playback synchronization.
//!
//! The loop pulls encoded frames from a [`FrameFeed`], writes them to a
//! [`FrameSink`](tui_video_term::FrameSink), and holds each one until its
//! successor is due, following the audio clock when there is one and the
//! wall clock otherwise.

pub mod audio;
pub mod drift;
pub mod pacer;
pub mod player;

pub use audio::{AudioClock, FfplayAudio};
pub use drift::{AudioAction, AudioState, DriftController, SyncDecision};
pub use pacer::WallClockPacer;
pub use player::{FrameFeed, PlaybackLoop, PlaybackReport};
