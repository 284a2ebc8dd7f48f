//! Consumer-side handle on a running encoder worker.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tui_video_core::{VideoError, VideoResult};
use tui_video_source::{probe_video, VideoInfo};
use tui_video_sync::FrameFeed;
use tui_video_transport::{unique_region_name, RingConfig, RingConsumer, SlotPool};
use tui_video_types::{
    GridGeometry, DEFAULT_RESOLUTION, DEFAULT_THRESHOLD, SHUTDOWN_JOIN_TIMEOUT_MS,
};

use crate::worker::{missing_pipe, WorkerArgs, WORKER_SUBCOMMAND};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Grid height in pixel rows; odd values round up.
    pub resolution: u16,
    pub threshold: u32,
    pub ring: RingConfig,
    pub join_timeout: Duration,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            threshold: DEFAULT_THRESHOLD,
            ring: RingConfig::default(),
            join_timeout: Duration::from_millis(SHUTDOWN_JOIN_TIMEOUT_MS),
        }
    }
}

/// How to start the worker process: a program plus any leading arguments
/// before [`WORKER_SUBCOMMAND`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLauncher {
    program: PathBuf,
    leading: Vec<OsString>,
}

impl WorkerLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading: Vec::new(),
        }
    }

    /// Re-execute the running binary.
    pub fn current_exe() -> VideoResult<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.leading.push(arg.into());
        self
    }

    fn command(&self, args: &WorkerArgs) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading)
            .arg(WORKER_SUBCOMMAND)
            .args(args.to_cli_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd
    }
}

pub struct VideoDecoder;

impl VideoDecoder {
    /// Probe `path`, create the shared ring, and start the encoder worker.
    ///
    /// The source is probed before anything else, so a missing or unreadable
    /// file fails with [`VideoError::UnavailableSource`] and leaves no process
    /// or shared memory behind.
    pub fn start(
        path: &Path,
        options: PlaybackOptions,
        launcher: &WorkerLauncher,
    ) -> VideoResult<DiffStream> {
        let info = probe_video(path)?;
        let geometry = info.geometry(options.resolution)?;

        let region = unique_region_name();
        let pool = SlotPool::create(&region, options.ring)?;
        let args = WorkerArgs {
            path: path.to_path_buf(),
            geometry,
            threshold: options.threshold,
            region,
            ring: options.ring,
        };

        let mut worker = launcher.command(&args).spawn()?;
        let (ready, free) = match (worker.stdout.take(), worker.stdin.take()) {
            (Some(ready), Some(free)) => (ready, free),
            _ => {
                if let Err(e) = worker.kill() {
                    tracing::debug!("worker kill: {e}");
                }
                if let Err(e) = worker.wait() {
                    tracing::debug!("worker wait: {e}");
                }
                return Err(missing_pipe());
            }
        };

        tracing::info!(
            path = %path.display(),
            pid = worker.id(),
            cols = geometry.cols(),
            rows = geometry.block_rows(),
            fps = info.frame_rate(),
            frames = info.frame_count,
            "encoder worker spawned"
        );

        let mut stream = DiffStream {
            ring: Some(RingConsumer::new(pool, ready, free)),
            worker: Some(worker),
            info,
            geometry,
            join_timeout: options.join_timeout,
            frames_received: 0,
            bytes_received: 0,
        };
        if let Some(ring) = stream.ring.as_mut() {
            ring.seed_free()?;
        }
        Ok(stream)
    }
}

/// Encoded frames arriving from the worker, in order.
///
/// Dropping the stream shuts the worker down and releases the shared region.
pub struct DiffStream {
    ring: Option<RingConsumer<ChildStdout, ChildStdin>>,
    worker: Option<Child>,
    info: VideoInfo,
    geometry: GridGeometry,
    join_timeout: Duration,
    frames_received: u64,
    bytes_received: u64,
}

impl DiffStream {
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn frame_rate(&self) -> f64 {
        self.info.frame_rate()
    }

    pub fn total_frames(&self) -> u64 {
        self.info.frame_count
    }

    pub fn has_audio(&self) -> bool {
        self.info.has_audio
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Frames encoded and waiting.
    pub fn buffered(&self) -> usize {
        self.ring.as_ref().map(|r| r.buffered()).unwrap_or(0)
    }

    /// Next frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> VideoResult<Option<Vec<u8>>> {
        let mut frame = Vec::new();
        Ok(self.next_frame_into(&mut frame)?.then_some(frame))
    }

    pub fn next_frame_into(&mut self, out: &mut Vec<u8>) -> VideoResult<bool> {
        let Some(ring) = self.ring.as_mut() else {
            out.clear();
            return Ok(false);
        };
        let more = ring.recv_frame_into(out)?;
        if more {
            self.frames_received += 1;
            self.bytes_received += out.len() as u64;
        }
        Ok(more)
    }

    /// Stop the worker and release the ring.
    ///
    /// The worker gets a cancel record and closed pipes, then the join timeout
    /// to exit; after that it is killed and [`VideoError::TransportTimeout`]
    /// is returned. The shared region is unlinked only once the worker has
    /// been reaped. Calling this again is a no-op.
    pub fn shutdown(&mut self) -> VideoResult<()> {
        let pool = self.ring.take().map(|mut ring| {
            ring.cancel();
            ring.into_pool()
        });
        let result = match self.worker.take() {
            Some(worker) => join_or_kill(worker, self.join_timeout),
            None => Ok(()),
        };
        drop(pool);
        result
    }
}

fn join_or_kill(mut worker: Child, timeout: Duration) -> VideoResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = worker.try_wait()? {
            if status.success() {
                tracing::debug!("encoder worker exited");
            } else {
                tracing::warn!(%status, "encoder worker exited abnormally");
            }
            return Ok(());
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    if let Err(e) = worker.kill() {
        tracing::debug!("worker kill: {e}");
    }
    worker.wait()?;
    let waited_ms = timeout.as_millis() as u64;
    tracing::warn!(waited_ms, "encoder worker killed after join timeout");
    Err(VideoError::TransportTimeout { waited_ms })
}

impl FrameFeed for DiffStream {
    fn next_frame_into(&mut self, out: &mut Vec<u8>) -> VideoResult<bool> {
        DiffStream::next_frame_into(self, out)
    }

    fn buffered(&self) -> usize {
        DiffStream::buffered(self)
    }
}

impl Iterator for DiffStream {
    type Item = VideoResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl Drop for DiffStream {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("stream shutdown: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_fails_before_spawning() {
        let launcher = WorkerLauncher::new("/bin/false");
        let err = VideoDecoder::start(
            Path::new("/no/such/video.mp4"),
            PlaybackOptions::default(),
            &launcher,
        )
        .err()
        .unwrap();
        assert!(matches!(err, VideoError::UnavailableSource { .. }));
    }

    #[test]
    fn join_kills_a_worker_that_ignores_cancel() {
        let worker = Command::new("sleep").arg("5").spawn().unwrap();
        let started = Instant::now();
        let err = join_or_kill(worker, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, VideoError::TransportTimeout { waited_ms: 50 }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn join_returns_once_the_worker_exits() {
        let worker = Command::new("true").spawn().unwrap();
        join_or_kill(worker, Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn launcher_places_subcommand_after_leading_args() {
        let launcher = WorkerLauncher::new("/usr/bin/env").arg("tui-video");
        let args = WorkerArgs {
            path: PathBuf::from("a.mp4"),
            geometry: GridGeometry::new(4, 2).unwrap(),
            threshold: 1,
            region: "/r".into(),
            ring: RingConfig::default(),
        };
        let cmd = launcher.command(&args);
        let argv: Vec<_> = cmd.get_args().collect();
        assert_eq!(argv[0], "tui-video");
        assert_eq!(argv[1], WORKER_SUBCOMMAND);
        assert_eq!(argv.last().copied().unwrap(), "a.mp4");
    }
}
