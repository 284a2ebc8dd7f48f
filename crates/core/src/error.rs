//! Error kinds shared by every stage of the pipeline.

use std::path::PathBuf;

pub type VideoResult<T> = Result<T, VideoError>;

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    /// The file is missing or its container cannot be opened. Fatal, no frames.
    #[error("video source unavailable '{}': {reason}", path.display())]
    UnavailableSource { path: PathBuf, reason: String },

    /// Decoding failed mid-stream. The stream ends early but cleanly.
    #[error("decode interrupted: {0}")]
    DecodeInterrupted(String),

    /// The encoder worker did not exit within the join window.
    #[error("encoder worker did not exit within {waited_ms}ms")]
    TransportTimeout { waited_ms: u64 },

    /// A write or read outside the addressed grid, slot, or region.
    /// Indicates a programming error rather than a runtime failure.
    #[error("bounds violation: {0}")]
    BoundsViolation(String),

    /// The audio subsystem failed.
    #[error("audio error: {0}")]
    Audio(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VideoError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnavailableSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeInterrupted(msg.into())
    }

    pub fn bounds(msg: impl Into<String>) -> Self {
        Self::BoundsViolation(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Whether this error is a broken pipe, i.e. the peer process is gone.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}
