//! Encoder worker: the producer side of the transport, run as a child process.
//!
//! The playback process re-executes its own binary with [`WORKER_SUBCOMMAND`]
//! and the arguments from [`WorkerArgs::to_cli_args`]. The worker attaches to
//! the shared region by name, reads free slot indices on stdin and writes
//! ready records on stdout. Nothing else may go to stdout.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::PathBuf;

use nix::sys::signal::{signal, SigHandler, Signal};
use tui_video_core::{VideoError, VideoResult};
use tui_video_source::{probe_video, FrameSource};
use tui_video_transport::{RingConfig, RingProducer, SendOutcome, SlotPool};
use tui_video_types::{GridGeometry, SourceFrame};

use crate::encoder::FrameDiffEncoder;

/// Hidden subcommand that turns the binary into an encoder worker.
pub const WORKER_SUBCOMMAND: &str = "__encode-worker";

/// Everything the worker needs, passed on its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs {
    pub path: PathBuf,
    pub geometry: GridGeometry,
    pub threshold: u32,
    pub region: String,
    pub ring: RingConfig,
}

impl WorkerArgs {
    /// Flags following [`WORKER_SUBCOMMAND`].
    pub fn to_cli_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(13);
        let mut push = |flag: &str, value: String| {
            args.push(flag.into());
            args.push(value.into());
        };
        push("--width", self.geometry.width.to_string());
        push("--height", self.geometry.height.to_string());
        push("--threshold", self.threshold.to_string());
        push("--region", self.region.clone());
        push("--slot-size", self.ring.slot_size.to_string());
        push("--slots", self.ring.slot_count.to_string());
        args.push(self.path.clone().into_os_string());
        args
    }
}

/// How a producer run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProduceEnd {
    EndOfStream,
    Cancelled,
    /// Decoding failed mid-stream; everything before it was delivered.
    Interrupted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceSummary {
    pub frames: u64,
    pub bytes: u64,
    pub end: ProduceEnd,
}

/// Encode every frame from `frames` into the ring, then publish end-of-stream.
///
/// A decode error ends the stream early but cleanly. The end marker goes out
/// on every path, including errors from the encoder or the ring itself.
pub fn produce<I, R, W>(
    frames: I,
    encoder: &mut FrameDiffEncoder,
    ring: &mut RingProducer<R, W>,
) -> VideoResult<ProduceSummary>
where
    I: IntoIterator<Item = VideoResult<SourceFrame>>,
    R: Read,
    W: Write,
{
    let result = pump(frames, encoder, ring);
    if let Err(e) = ring.finish() {
        match &result {
            Ok(summary) if summary.end == ProduceEnd::Cancelled => {
                tracing::debug!("end marker after cancel not delivered: {e}")
            }
            _ => tracing::warn!("end marker not delivered: {e}"),
        }
    }
    result
}

fn pump<I, R, W>(
    frames: I,
    encoder: &mut FrameDiffEncoder,
    ring: &mut RingProducer<R, W>,
) -> VideoResult<ProduceSummary>
where
    I: IntoIterator<Item = VideoResult<SourceFrame>>,
    R: Read,
    W: Write,
{
    let mut summary = ProduceSummary {
        frames: 0,
        bytes: 0,
        end: ProduceEnd::EndOfStream,
    };

    for frame in frames {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(frames = summary.frames, "decode stopped early: {e}");
                summary.end = ProduceEnd::Interrupted(e.to_string());
                break;
            }
        };

        let encoded = encoder.encode_frame(&frame)?;
        let len = encoded.bytes.len();
        tracing::trace!(
            frame = summary.frames,
            cells = encoded.changed_cells,
            bytes = len,
            "frame encoded"
        );
        if ring.send_frame(encoded.bytes)? == SendOutcome::Cancelled {
            tracing::info!(frames = summary.frames, "producer cancelled");
            summary.end = ProduceEnd::Cancelled;
            break;
        }
        summary.frames += 1;
        summary.bytes += len as u64;
    }

    Ok(summary)
}

/// Worker process entry point.
///
/// If the region cannot be attached the worker exits without a ring; the
/// consumer then reads a closed pipe, which it treats as end-of-stream.
pub fn run_worker(args: &WorkerArgs) -> VideoResult<ProduceSummary> {
    ignore_interrupts();

    let pool = SlotPool::open(&args.region, args.ring)?;
    let mut ring = RingProducer::new(pool, std::io::stdin().lock(), std::io::stdout().lock());

    let setup = FrameDiffEncoder::new(args.geometry, args.threshold).and_then(|encoder| {
        let info = probe_video(&args.path)?;
        Ok((encoder, FrameSource::open(&info)?))
    });
    let (mut encoder, source) = match setup {
        Ok(parts) => parts,
        Err(e) => {
            if let Err(finish) = ring.finish() {
                tracing::warn!("end marker not delivered: {finish}");
            }
            return Err(e);
        }
    };

    tracing::info!(
        path = %args.path.display(),
        width = args.geometry.width,
        height = args.geometry.height,
        threshold = args.threshold,
        "encoder worker started"
    );
    let summary = produce(source, &mut encoder, &mut ring)?;
    tracing::info!(
        frames = summary.frames,
        bytes = summary.bytes,
        end = ?summary.end,
        "encoder worker finished"
    );
    Ok(summary)
}

/// Ctrl-C reaches the whole foreground process group; the playback process
/// decides when the worker stops.
fn ignore_interrupts() {
    // Safety: installing SIG_IGN runs no handler code.
    if let Err(e) = unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) } {
        tracing::warn!("failed to ignore SIGINT in worker: {e}");
    }
}

pub(crate) fn missing_pipe() -> VideoError {
    VideoError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "worker stdio not captured",
    ))
}
