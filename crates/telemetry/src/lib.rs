//! Debug telemetry: per-frame playback stats as JSON datagrams.
//!
//! Bridges the synchronous playback loop with an async UDP sender. The loop
//! hands stats to a bounded channel with `try_send`; a task on a private
//! tokio runtime serializes and sends them. A full channel, an unreachable
//! receiver, or a send error all drop the datagram. Telemetry never stalls
//! playback.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tui_video_core::VideoResult;
use tui_video_types::DEFAULT_TELEMETRY_PORT;

/// One datagram per displayed frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameStats {
    pub frames_shown: u64,
    pub total_frames: u64,
    /// Frames encoded and waiting in the ring.
    pub frames_buffered: usize,
    /// Seconds slept by the pacer this step.
    pub idle_time_per_frame: f64,
    /// Size of this frame's payload in KiB.
    pub data_throughput: f64,
    /// Achieved frame rate over nominal frame rate; 1.0 is real time.
    pub playback_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub host: String,
    pub port: u16,
    pub queue_depth: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TELEMETRY_PORT,
            queue_depth: 64,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("TUI_VIDEO_DEBUG_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = env::var("TUI_VIDEO_DEBUG_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let queue_depth = env::var("TUI_VIDEO_DEBUG_QUEUE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.queue_depth);

        Self {
            host,
            port,
            queue_depth,
        }
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Running telemetry sender.
pub struct TelemetrySender {
    tx: mpsc::Sender<FrameStats>,
    _rt: Runtime,
}

impl TelemetrySender {
    pub fn start(config: TelemetryConfig) -> VideoResult<Self> {
        let (tx, rx) = mpsc::channel::<FrameStats>(config.queue_depth.max(1));
        let rt = Runtime::new()?;
        let target = config.target();
        tracing::info!(%target, "telemetry enabled");
        rt.spawn(async move {
            if let Err(e) = run_sender(&target, rx).await {
                tracing::warn!(%target, "telemetry sender stopped: {e}");
            }
        });
        Ok(Self { tx, _rt: rt })
    }

    /// Queue `stats` for sending. Returns false when the datagram was dropped.
    pub fn publish(&self, stats: FrameStats) -> bool {
        self.tx.try_send(stats).is_ok()
    }
}

async fn run_sender(target: &str, mut rx: mpsc::Receiver<FrameStats>) -> std::io::Result<()> {
    let addr: SocketAddr = tokio::net::lookup_host(target)
        .await?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address"))?;
    let bind: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(addr).await?;

    while let Some(stats) = rx.recv().await {
        let payload = match serde_json::to_vec(&stats) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("telemetry encode failed: {e}");
                continue;
            }
        };
        if let Err(e) = socket.send(&payload).await {
            tracing::trace!("telemetry datagram dropped: {e}");
        }
    }
    Ok(())
}
