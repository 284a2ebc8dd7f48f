//! File logging.
//!
//! Stdout carries the video (and, in the worker, the ready queue), so logs go
//! to a file. The playback process truncates it on start; the encoder worker
//! appends to the same file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// `TUI_VIDEO_LOG`, or `tui-video.log` in the temp directory.
pub fn log_path() -> PathBuf {
    std::env::var_os("TUI_VIDEO_LOG")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("tui-video.log"))
}

/// Subscriber writing to `log_file`, filtered by `RUST_LOG` (default `info`).
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

/// Install the global subscriber. `truncate` starts a fresh log.
pub fn init_global(path: &Path, truncate: bool) -> io::Result<()> {
    if truncate {
        File::create(path)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    build_subscriber(file)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_path_is_reported() {
        let path = Path::new("/nonexistent-tui-video-dir/tui-video.log");
        assert!(init_global(path, true).is_err());
        assert!(init_global(path, false).is_err());
    }
}
