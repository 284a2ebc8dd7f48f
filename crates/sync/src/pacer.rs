//! Wall-clock pacing for streams without audio.

use std::time::{Duration, Instant};

use tui_video_types::RESYNC_THRESHOLD_SECS;

/// Holds each frame until `start + (index - origin) * interval`.
///
/// Falling behind by more than the resync bound re-anchors the schedule at the
/// current frame, so lost time is dropped instead of replayed at full speed.
#[derive(Debug, Clone)]
pub struct WallClockPacer {
    interval: Duration,
    resync: Duration,
    start: Instant,
    origin: u64,
}

impl WallClockPacer {
    pub fn new(frame_rate: f64, now: Instant) -> Self {
        let interval = if frame_rate.is_finite() && frame_rate > 0.0 {
            Duration::from_secs_f64(1.0 / frame_rate)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            resync: Duration::from_secs_f64(RESYNC_THRESHOLD_SECS),
            start: now,
            origin: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Restart the schedule with `index` due at `now`.
    pub fn reset(&mut self, index: u64, now: Instant) {
        self.start = now;
        self.origin = index;
    }

    /// When frame `index` is due.
    pub fn due(&self, index: u64) -> Instant {
        let frames = index.saturating_sub(self.origin);
        self.start + self.interval.mul_f64(frames as f64)
    }

    /// How long to wait before frame `index` may be shown.
    pub fn wait(&mut self, index: u64, now: Instant) -> Duration {
        let due = self.due(index);
        if due >= now {
            return due - now;
        }
        if now - due > self.resync {
            tracing::debug!(index, behind_ms = (now - due).as_millis() as u64, "pacer resync");
            self.reset(index, now);
        }
        Duration::ZERO
    }
}
