//! Ring buffer sizing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tui_video_types::{DEFAULT_SLOT_COUNT, DEFAULT_SLOT_SIZE};

/// Slot size and count of the shared ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    pub slot_size: usize,
    pub slot_count: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            slot_size: DEFAULT_SLOT_SIZE,
            slot_count: DEFAULT_SLOT_COUNT,
        }
    }
}

impl RingConfig {
    /// Read `TUI_VIDEO_SLOT_SIZE` / `TUI_VIDEO_SLOTS`, falling back to defaults.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let slot_size = env::var("TUI_VIDEO_SLOT_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.slot_size);
        let slot_count = env::var("TUI_VIDEO_SLOTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0 && n < u32::MAX as usize)
            .unwrap_or(defaults.slot_count);

        Self {
            slot_size,
            slot_count,
        }
    }

    /// Total bytes of the shared region.
    pub fn region_len(&self) -> Option<usize> {
        self.slot_size.checked_mul(self.slot_count)
    }
}

/// A POSIX shared memory name unique to this process and call.
pub fn unique_region_name() -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("/tui-video-{}-{n}-{nanos:x}", std::process::id())
}
