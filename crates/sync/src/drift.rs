//! Audio drift policy.

use std::time::Duration;

use tui_video_types::{RESYNC_THRESHOLD_SECS, SYNC_EPSILON_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Playing,
    Paused,
}

/// What the audio clock should do this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioAction {
    Keep,
    Pause,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncDecision {
    /// Time to hold the current frame. Never negative.
    pub sleep: Duration,
    pub audio: AudioAction,
    pub drift: f64,
}

/// Tracks whether audio is running and decides how to close the gap between
/// video and audio presentation times.
///
/// | drift (video - audio) | sleep | audio |
/// |-----------------------|-------|-------|
/// | `> epsilon`           | drift | resume if paused |
/// | `< -resync`           | 0     | pause if playing |
/// | otherwise             | 0     | resume if paused |
#[derive(Debug, Clone)]
pub struct DriftController {
    state: AudioState,
    epsilon: f64,
    resync: f64,
}

impl Default for DriftController {
    fn default() -> Self {
        Self::new(SYNC_EPSILON_SECS, RESYNC_THRESHOLD_SECS)
    }
}

impl DriftController {
    pub fn new(epsilon: f64, resync: f64) -> Self {
        Self {
            state: AudioState::Playing,
            epsilon,
            resync,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn decide(&mut self, video_pts: f64, audio_pts: f64) -> SyncDecision {
        let drift = video_pts - audio_pts;

        let (sleep, target) = if drift > self.epsilon {
            (
                Duration::try_from_secs_f64(drift).unwrap_or(Duration::ZERO),
                AudioState::Playing,
            )
        } else if drift < -self.resync {
            (Duration::ZERO, AudioState::Paused)
        } else {
            (Duration::ZERO, AudioState::Playing)
        };

        let audio = match (self.state, target) {
            (AudioState::Playing, AudioState::Paused) => AudioAction::Pause,
            (AudioState::Paused, AudioState::Playing) => AudioAction::Resume,
            _ => AudioAction::Keep,
        };
        self.state = target;

        SyncDecision {
            sleep,
            audio,
            drift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_ahead_sleeps_for_the_drift() {
        let mut c = DriftController::default();
        let d = c.decide(1.05, 1.0);
        assert!((d.sleep.as_secs_f64() - 0.05).abs() < 1e-9);
        assert_eq!(d.audio, AudioAction::Keep);
    }

    #[test]
    fn drift_within_epsilon_does_not_sleep() {
        let mut c = DriftController::default();
        assert_eq!(c.decide(1.0005, 1.0).sleep, Duration::ZERO);
    }

    #[test]
    fn audio_far_ahead_pauses_once() {
        let mut c = DriftController::default();
        assert_eq!(c.decide(1.0, 1.3).audio, AudioAction::Pause);
        assert_eq!(c.state(), AudioState::Paused);
        assert_eq!(c.decide(1.04, 1.3).audio, AudioAction::Keep);
    }

    #[test]
    fn small_lag_keeps_or_resumes_playing() {
        let mut c = DriftController::default();
        assert_eq!(c.decide(1.0, 1.1).audio, AudioAction::Keep);
        assert_eq!(c.state(), AudioState::Playing);

        c.decide(0.0, 1.0);
        assert_eq!(c.decide(0.9, 1.0).audio, AudioAction::Resume);
        assert_eq!(c.state(), AudioState::Playing);
    }

    #[test]
    fn paused_and_video_ahead_resumes_and_sleeps() {
        let mut c = DriftController::default();
        c.decide(0.0, 1.0);
        let d = c.decide(1.1, 1.0);
        assert_eq!(d.audio, AudioAction::Resume);
        assert!(d.sleep > Duration::ZERO);
    }

    #[test]
    fn exactly_at_resync_bound_stays_playing() {
        let mut c = DriftController::new(0.001, 0.25);
        assert_eq!(c.decide(0.0, 0.25).audio, AudioAction::Keep);
        assert_eq!(c.state(), AudioState::Playing);
    }
}
