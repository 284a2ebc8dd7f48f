//! The playback loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tui_video_core::{VideoError, VideoResult};
use tui_video_telemetry::{FrameStats, TelemetrySender};
use tui_video_term::FrameSink;

use crate::audio::AudioClock;
use crate::drift::{AudioAction, DriftController};
use crate::pacer::WallClockPacer;

/// A source of encoded frames, consumed in order.
pub trait FrameFeed {
    /// Replace `out` with the next frame. Blocks until one is ready; returns
    /// false at end of stream.
    fn next_frame_into(&mut self, out: &mut Vec<u8>) -> VideoResult<bool>;

    /// Frames ready but not yet read.
    fn buffered(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackReport {
    pub frames_shown: u64,
    pub bytes_written: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Writes frames to a sink at the stream's frame rate.
///
/// With audio, each frame is held until the audio clock reaches the next
/// frame's presentation time (see [`DriftController`]). Without audio, a
/// [`WallClockPacer`] does the same against the monotonic clock.
pub struct PlaybackLoop<A: AudioClock> {
    frame_rate: f64,
    total_frames: u64,
    audio: Option<A>,
    drift: DriftController,
    telemetry: Option<TelemetrySender>,
}

impl<A: AudioClock> PlaybackLoop<A> {
    pub fn new(frame_rate: f64, total_frames: u64) -> Self {
        Self {
            frame_rate,
            total_frames,
            audio: None,
            drift: DriftController::default(),
            telemetry: None,
        }
    }

    pub fn with_audio(mut self, audio: A) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetrySender) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn audio(&self) -> Option<&A> {
        self.audio.as_ref()
    }

    /// Play until the feed ends or `cancel` is set.
    ///
    /// On error the audio is muted and paused before it is closed, then the
    /// error is returned.
    pub fn run<F, S>(
        &mut self,
        feed: &mut F,
        sink: &mut S,
        cancel: &AtomicBool,
    ) -> VideoResult<PlaybackReport>
    where
        F: FrameFeed,
        S: FrameSink,
    {
        let result = self.play(feed, sink, cancel);
        if let Err(e) = &result {
            tracing::warn!("playback failed: {e}");
            self.silence();
        }
        self.close_audio();
        result
    }

    fn play<F: FrameFeed, S: FrameSink>(
        &mut self,
        feed: &mut F,
        sink: &mut S,
        cancel: &AtomicBool,
    ) -> VideoResult<PlaybackReport> {
        let started = Instant::now();
        let mut report = PlaybackReport::default();
        let mut frame = Vec::new();
        let mut next = Vec::new();

        if !feed.next_frame_into(&mut frame)? {
            return Ok(report);
        }

        let mut pacer = WallClockPacer::new(self.frame_rate, Instant::now());
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.start() {
                self.fall_back_to_wall_clock(&e);
            }
        }
        tracing::info!(
            frame_rate = self.frame_rate,
            total_frames = self.total_frames,
            audio = self.audio.is_some(),
            "playback started"
        );

        let mut index: u64 = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                tracing::info!(frames = report.frames_shown, "playback cancelled");
                break;
            }

            let step = Instant::now();
            sink.write_frame(&frame)?;
            report.frames_shown += 1;
            report.bytes_written += frame.len() as u64;

            let more = feed.next_frame_into(&mut next)?;
            // Hold the frame just written until its successor is due.
            let idle = self.pace(index + 1, &mut pacer)?;
            self.publish(&report, feed.buffered(), frame.len(), idle, step.elapsed());

            index += 1;
            if !more {
                break;
            }
            std::mem::swap(&mut frame, &mut next);
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            frames = report.frames_shown,
            bytes = report.bytes_written,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "playback finished"
        );
        Ok(report)
    }

    /// Hold the current frame until frame `next_index` is due.
    fn pace(&mut self, next_index: u64, pacer: &mut WallClockPacer) -> VideoResult<Duration> {
        let wait = match self.audio.as_mut() {
            Some(audio) => {
                let video_pts = next_index as f64 / self.frame_rate.max(f64::MIN_POSITIVE);
                let audio_pts = match audio.position() {
                    Ok(pts) => pts,
                    Err(e) => {
                        self.fall_back_to_wall_clock(&e);
                        pacer.reset(next_index, Instant::now());
                        return Ok(Duration::ZERO);
                    }
                };
                let decision = self.drift.decide(video_pts, audio_pts);
                match decision.audio {
                    AudioAction::Pause => {
                        tracing::debug!(drift = decision.drift, "audio ahead, pausing");
                        audio.pause()?;
                    }
                    AudioAction::Resume => audio.resume()?,
                    AudioAction::Keep => {}
                }
                decision.sleep
            }
            None => pacer.wait(next_index, Instant::now()),
        };
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        Ok(wait)
    }

    fn publish(
        &self,
        report: &PlaybackReport,
        buffered: usize,
        frame_len: usize,
        idle: Duration,
        step: Duration,
    ) {
        let Some(telemetry) = self.telemetry.as_ref() else {
            return;
        };
        let step = step.as_secs_f64();
        let playback_speed = if step > 0.0 && self.frame_rate > 0.0 {
            (1.0 / step) / self.frame_rate
        } else {
            0.0
        };
        telemetry.publish(FrameStats {
            frames_shown: report.frames_shown,
            total_frames: self.total_frames,
            frames_buffered: buffered,
            idle_time_per_frame: idle.as_secs_f64(),
            data_throughput: frame_len as f64 / 1024.0,
            playback_speed,
        });
    }

    /// Drop the audio clock and pace the rest of the stream on the wall clock.
    fn fall_back_to_wall_clock(&mut self, cause: &VideoError) {
        tracing::warn!("audio unavailable, using wall clock: {cause}");
        if let Some(mut audio) = self.audio.take() {
            if let Err(e) = audio.close() {
                tracing::debug!("audio close after failure: {e}");
            }
        }
    }

    fn silence(&mut self) {
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        if let Err(e) = audio.mute() {
            tracing::warn!("audio mute failed: {e}");
        }
        if let Err(e) = audio.pause() {
            tracing::warn!("audio pause failed: {e}");
        }
    }

    fn close_audio(&mut self) {
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.close() {
                tracing::warn!("audio close failed: {e}");
            }
        }
    }
}
