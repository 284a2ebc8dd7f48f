//! Streaming frame decode through a system `ffmpeg` process.
//!
//! We use the `ffmpeg` binary rather than linking libav so there are no native
//! dev headers to build against. Frames arrive as raw `rgb24` on a pipe and are
//! read one at a time, so memory stays at one frame regardless of file length.

use std::ffi::OsStr;
use std::io::{ErrorKind, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use tui_video_core::{VideoError, VideoResult};
use tui_video_types::{SourceFrame, CHANNELS};

use crate::probe::VideoInfo;

/// Bytes of ffmpeg's stderr kept for error reports.
const STDERR_TAIL: usize = 4096;

pub struct FrameSource {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frame_len: usize,
    decoded: u64,
    finished: bool,
}

impl FrameSource {
    /// Start decoding the stream described by `info`.
    pub fn open(info: &VideoInfo) -> VideoResult<Self> {
        Self::open_with("ffmpeg", info)
    }

    /// Like [`FrameSource::open`], running `program` in place of `ffmpeg`.
    ///
    /// Output is scaled to the probed size, so a stream that ffmpeg
    /// autorotates still arrives with the stride the frame size implies.
    pub fn open_with(program: impl AsRef<OsStr>, info: &VideoInfo) -> VideoResult<Self> {
        let frame_len = info.width as usize * info.height as usize * CHANNELS;
        if frame_len == 0 {
            return Err(VideoError::unavailable(
                &info.path,
                "decoded frame size is zero",
            ));
        }

        let mut child = Command::new(program)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&info.path)
            .arg("-vf")
            .arg(format!("scale={}:{}", info.width, info.height))
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VideoError::unavailable(&info.path, format!("failed to run ffmpeg: {e}"))
            })?;
        let stdout = child.stdout.take();
        let stderr = match child.stderr.take().map(drain_stderr).transpose() {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(kill) = child.kill() {
                    tracing::debug!("ffmpeg kill: {kill}");
                }
                if let Err(wait) = child.wait() {
                    tracing::debug!("ffmpeg wait: {wait}");
                }
                return Err(e.into());
            }
        };

        tracing::debug!(
            path = %info.path.display(),
            width = info.width,
            height = info.height,
            "ffmpeg decoder started"
        );

        Ok(Self {
            child,
            stdout,
            stderr,
            width: info.width,
            height: info.height,
            frame_len,
            decoded: 0,
            finished: false,
        })
    }

    pub fn decoded_frames(&self) -> u64 {
        self.decoded
    }

    /// Read the next frame. `Ok(None)` on a clean end of stream.
    pub fn read_frame(&mut self) -> VideoResult<Option<SourceFrame>> {
        if self.finished {
            return Ok(None);
        }
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; self.frame_len];
        let mut filled = 0usize;
        while filled < self.frame_len {
            match stdout.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(VideoError::decode(format!(
                        "read failed after {} frames: {e}",
                        self.decoded
                    )));
                }
            }
        }

        if filled == self.frame_len {
            self.decoded += 1;
            return Ok(Some(SourceFrame {
                width: self.width,
                height: self.height,
                data,
            }));
        }

        self.finished = true;
        self.stdout = None;
        let status = self.child.wait()?;
        let stderr = self.stderr_tail();

        if filled > 0 {
            return Err(VideoError::decode(format!(
                "truncated frame {} ({filled} of {} bytes)",
                self.decoded, self.frame_len
            )));
        }
        if !status.success() {
            return Err(VideoError::decode(format!(
                "ffmpeg exited with {status} after {} frames: {}",
                self.decoded,
                stderr.trim()
            )));
        }
        Ok(None)
    }
}

impl FrameSource {
    fn stderr_tail(&mut self) -> String {
        let Some(handle) = self.stderr.take() else {
            return String::new();
        };
        match handle.join() {
            Ok(tail) => tail,
            Err(_) => {
                tracing::debug!("ffmpeg stderr reader panicked");
                String::new()
            }
        }
    }
}

/// Read ffmpeg's stderr until it closes, keeping the last [`STDERR_TAIL`]
/// bytes. ffmpeg blocks once the pipe fills, so it has to be drained while
/// frames are read.
fn drain_stderr(mut stderr: ChildStderr) -> std::io::Result<JoinHandle<String>> {
    thread::Builder::new()
        .name("ffmpeg-stderr".into())
        .spawn(move || {
            let mut tail: Vec<u8> = Vec::with_capacity(STDERR_TAIL * 2);
            let mut buf = [0u8; 4096];
            loop {
                match stderr.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        tail.extend_from_slice(&buf[..n]);
                        if tail.len() > STDERR_TAIL * 2 {
                            tail.drain(..tail.len() - STDERR_TAIL);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!("ffmpeg stderr read: {e}");
                        break;
                    }
                }
            }
            if tail.len() > STDERR_TAIL {
                tail.drain(..tail.len() - STDERR_TAIL);
            }
            String::from_utf8_lossy(&tail).into_owned()
        })
}

impl Iterator for FrameSource {
    type Item = VideoResult<SourceFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.stdout = None;
        if let Err(e) = self.child.kill() {
            tracing::debug!("ffmpeg kill: {e}");
        }
        if let Err(e) = self.child.wait() {
            tracing::debug!("ffmpeg wait: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;

    /// Serializes script writes with spawns so no child inherits a script
    /// that is still open for writing (ETXTBSY).
    static SPAWN: Mutex<()> = Mutex::new(());

    /// Start a source backed by a shell script standing in for ffmpeg.
    fn open_fake(name: &str, body: &str) -> FrameSource {
        let _guard = SPAWN.lock().unwrap_or_else(|e| e.into_inner());
        let dir = std::env::temp_dir().join(format!("tui-video-ffmpeg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path: PathBuf = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        FrameSource::open_with(&path, &info_2x2()).unwrap()
    }

    fn info_2x2() -> VideoInfo {
        VideoInfo {
            path: PathBuf::from("clip.mp4"),
            width: 2,
            height: 2,
            fps_num: 25,
            fps_den: 1,
            frame_count: 1,
            has_audio: false,
        }
    }

    /// Run `f` on a thread and give up after `secs`.
    fn within<T: Send + 'static>(secs: u64, f: impl FnOnce() -> T + Send + 'static) -> T {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(f());
        });
        rx.recv_timeout(Duration::from_secs(secs))
            .expect("decoder did not return in time")
    }

    #[test]
    fn chatty_stderr_does_not_stall_frames() {
        let frames = within(10, || {
            let mut source = open_fake(
                "chatty",
                "head -c 300000 /dev/zero | tr '\\0' x >&2\nhead -c 12 /dev/zero",
            );
            let first = source.read_frame().unwrap();
            let rest = source.read_frame().unwrap();
            (first, rest)
        });
        let first = frames.0.unwrap();
        assert_eq!((first.width, first.height), (2, 2));
        assert_eq!(first.data, vec![0u8; 12]);
        assert!(frames.1.is_none());
    }

    #[test]
    fn failed_exit_reports_the_stderr_tail() {
        let err = within(10, || {
            let mut source = open_fake(
                "broken",
                "head -c 100000 /dev/zero | tr '\\0' x >&2\necho 'moov atom not found' >&2\nexit 1",
            );
            source.read_frame().unwrap_err()
        });
        let msg = err.to_string();
        assert!(msg.contains("moov atom not found"), "{msg}");
        assert!(msg.len() < STDERR_TAIL + 200);
    }

    #[test]
    fn output_is_scaled_to_the_probed_size() {
        let err = within(10, || {
            let mut source = open_fake("args", "echo \"$@\" >&2\nexit 1");
            source.read_frame().unwrap_err()
        });
        assert!(err.to_string().contains("-vf scale=2:2"), "{err}");
    }
}
