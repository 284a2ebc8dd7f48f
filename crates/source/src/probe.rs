//! Stream metadata via `ffprobe`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tui_video_core::{VideoError, VideoResult};
use tui_video_types::GridGeometry;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub frame_count: u64,
    pub has_audio: bool,
}

impl VideoInfo {
    pub fn frame_rate(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }

    /// Block grid for this source at `resolution` pixel rows.
    pub fn geometry(&self, resolution: u16) -> VideoResult<GridGeometry> {
        GridGeometry::from_source(self.width, self.height, resolution).ok_or_else(|| {
            VideoError::bounds(format!(
                "cannot fit {}x{} source into resolution {resolution}",
                self.width, self.height
            ))
        })
    }
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    tags: Option<ProbeTags>,
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy
    /// `rotate` tag.
    fn rotation(&self) -> i64 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .map(|deg| deg.round() as i64)
            .unwrap_or(0)
    }
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe `path`. Any failure to open or understand the container is
/// reported as [`VideoError::UnavailableSource`].
pub fn probe_video(path: &Path) -> VideoResult<VideoInfo> {
    if !path.is_file() {
        return Err(VideoError::unavailable(path, "no such file"));
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoError::unavailable(path, format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(VideoError::unavailable(
            path,
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }

    parse_probe_json(path, &out.stdout)
}

pub(crate) fn parse_probe_json(path: &Path, json: &[u8]) -> VideoResult<VideoInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| VideoError::unavailable(path, format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VideoError::unavailable(path, "no video stream found"))?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(VideoError::unavailable(path, "missing video dimensions")),
    };
    // ffmpeg applies the rotation when decoding, so frames come out in
    // display orientation.
    let rotation = video.rotation();
    let (width, height) = if rotation.rem_euclid(180) == 90 {
        tracing::debug!(rotation, "rotated stream, swapping frame dimensions");
        (height, width)
    } else {
        (width, height)
    };
    let (fps_num, fps_den) = parse_ff_ratio(video.r_frame_rate.as_deref().unwrap_or("0/1"))
        .filter(|(n, _)| *n > 0)
        .ok_or_else(|| VideoError::unavailable(path, "invalid video frame rate"))?;

    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let frame_count = video
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            (duration * f64::from(fps_num) / f64::from(fps_den))
                .round()
                .max(0.0) as u64
        });

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoInfo {
        path: path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        frame_count,
        has_audio,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
