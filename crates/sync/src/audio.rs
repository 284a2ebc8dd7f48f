//! Audio playback and the clock the synchronizer follows.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tui_video_core::{VideoError, VideoResult};

/// An audio output whose presentation time drives video pacing.
pub trait AudioClock {
    fn start(&mut self) -> VideoResult<()>;

    /// Seconds of audio played so far.
    fn position(&mut self) -> VideoResult<f64>;

    fn pause(&mut self) -> VideoResult<()>;

    fn resume(&mut self) -> VideoResult<()>;

    /// Silence output immediately. Only `close` follows a mute.
    fn mute(&mut self) -> VideoResult<()>;

    fn close(&mut self) -> VideoResult<()>;
}

/// Audio through an `ffplay` child process.
///
/// ffplay exposes no clock, so position is tracked locally: wall time spent
/// in the playing state. Pause and mute stop the process with `SIGSTOP`,
/// resume continues it with `SIGCONT`.
///
/// The clock starts when ffplay is spawned, not when its first sample is
/// heard, so it runs ahead of the real audio by ffplay's startup delay. That
/// delay cannot be observed from outside the process; set a fixed estimate
/// with [`FfplayAudio::with_start_latency`] (`TUI_VIDEO_AUDIO_LATENCY_MS`).
pub struct FfplayAudio {
    path: PathBuf,
    start_latency: Duration,
    child: Option<Child>,
    played: Duration,
    resumed_at: Option<Instant>,
    muted: bool,
}

impl FfplayAudio {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            start_latency: Duration::ZERO,
            child: None,
            played: Duration::ZERO,
            resumed_at: None,
            muted: false,
        }
    }

    /// Subtract `latency` from every reported position.
    pub fn with_start_latency(mut self, latency: Duration) -> Self {
        self.start_latency = latency;
        self
    }

    /// `TUI_VIDEO_AUDIO_LATENCY_MS`, or zero.
    pub fn start_latency_from_env() -> Duration {
        std::env::var("TUI_VIDEO_AUDIO_LATENCY_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO)
    }

    fn signal(&self, sig: Signal) -> VideoResult<()> {
        let Some(child) = self.child.as_ref() else {
            return Ok(());
        };
        let pid = Pid::from_raw(child.id() as i32);
        kill(pid, sig).map_err(|e| VideoError::audio(format!("{} to ffplay failed: {e}", sig.as_str())))
    }

    fn elapsed(&self) -> Duration {
        self.played + self.resumed_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// A failed ffplay is an audio error; a finished one just means the audio
    /// track ended before the video.
    fn check_exit(&mut self) -> VideoResult<()> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        if let Some(status) = child.try_wait()? {
            self.child = None;
            if !status.success() {
                return Err(VideoError::audio(format!("ffplay exited with {status}")));
            }
            tracing::debug!("audio track finished");
        }
        Ok(())
    }
}

impl AudioClock for FfplayAudio {
    fn start(&mut self) -> VideoResult<()> {
        let child = Command::new("ffplay")
            .args(["-nodisp", "-autoexit", "-vn", "-loglevel", "quiet"])
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::audio(format!("failed to run ffplay: {e}")))?;
        tracing::info!(pid = child.id(), "audio started");
        self.child = Some(child);
        self.played = Duration::ZERO;
        self.resumed_at = Some(Instant::now());
        Ok(())
    }

    fn position(&mut self) -> VideoResult<f64> {
        self.check_exit()?;
        Ok(self.elapsed().saturating_sub(self.start_latency).as_secs_f64())
    }

    fn pause(&mut self) -> VideoResult<()> {
        if let Some(t) = self.resumed_at.take() {
            self.played += t.elapsed();
            self.signal(Signal::SIGSTOP)?;
            tracing::debug!(at = self.played.as_secs_f64(), "audio paused");
        }
        Ok(())
    }

    fn resume(&mut self) -> VideoResult<()> {
        if self.muted || self.resumed_at.is_some() {
            return Ok(());
        }
        self.signal(Signal::SIGCONT)?;
        self.resumed_at = Some(Instant::now());
        tracing::debug!(at = self.played.as_secs_f64(), "audio resumed");
        Ok(())
    }

    fn mute(&mut self) -> VideoResult<()> {
        self.muted = true;
        self.pause()
    }

    fn close(&mut self) -> VideoResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        self.resumed_at = None;
        // SIGKILL also ends a stopped process.
        if let Err(e) = child.kill() {
            tracing::debug!("ffplay kill: {e}");
        }
        child.wait()?;
        tracing::info!("audio closed");
        Ok(())
    }
}

impl Drop for FfplayAudio {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("audio close failed: {e}");
        }
    }
}
