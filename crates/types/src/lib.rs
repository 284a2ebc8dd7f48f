//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the player.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (encoder worker, transport, playback loop).
//!
//! # Block Geometry
//!
//! Every terminal cell shows two vertically stacked source pixels using the
//! upper half-block glyph (`▀`): the foreground paints the upper pixel and the
//! background paints the lower one. A grid of `height` pixel rows therefore
//! maps onto `height / 2` terminal rows, and the height is always rounded up to
//! an even number.
//!
//! # Encoder Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `DEFAULT_THRESHOLD` | 150 | Weighted change score a block must exceed to redraw |
//! | `DEFAULT_RESOLUTION` | 32 | Grid height in source pixel rows |
//! | `WEIGHT_RED` | 3 | Perceptual weight of the red channel |
//! | `WEIGHT_GREEN` | 6 | Perceptual weight of the green channel |
//! | `WEIGHT_BLUE` | 1 | Perceptual weight of the blue channel |
//!
//! # Transport Constants
//!
//! - `DEFAULT_SLOT_SIZE`: 4 MiB per shared memory slot
//! - `DEFAULT_SLOT_COUNT`: 512 slots
//! - `SHUTDOWN_JOIN_TIMEOUT_MS`: 1000ms before the worker is force-killed
//!
//! # Sync Constants
//!
//! - `SYNC_EPSILON_SECS`: video must lead audio by more than 1ms before we sleep
//! - `RESYNC_THRESHOLD_SECS`: audio (or the wall clock) leading by more than
//!   200ms pauses audio / drops lost time
//!
//! # Examples
//!
//! ```
//! use tui_video_types::{GridGeometry, Rgb};
//!
//! // A 1920x1080 source at resolution 31 is rounded up to 32 pixel rows.
//! let geometry = GridGeometry::from_source(1920, 1080, 31).unwrap();
//! assert_eq!(geometry.height, 32);
//! assert_eq!(geometry.width, 57);
//! assert_eq!(geometry.block_rows(), 16);
//!
//! let white = Rgb::new(255, 255, 255);
//! assert_eq!(white, Rgb::WHITE);
//! ```

/// Upper half-block glyph: foreground = upper pixel, background = lower pixel.
pub const HALF_BLOCK: &str = "▀";

/// Default compression threshold (weighted change score).
pub const DEFAULT_THRESHOLD: u32 = 150;

/// Default grid height in source pixel rows.
pub const DEFAULT_RESOLUTION: u16 = 32;

/// Perceptual weight of the red channel.
pub const WEIGHT_RED: u32 = 3;

/// Perceptual weight of the green channel (luma is dominated by green).
pub const WEIGHT_GREEN: u32 = 6;

/// Perceptual weight of the blue channel.
pub const WEIGHT_BLUE: u32 = 1;

/// Weights in pixel channel order (R, G, B).
pub const PERCEPTUAL_WEIGHTS: [u32; CHANNELS] = [WEIGHT_RED, WEIGHT_GREEN, WEIGHT_BLUE];

/// Channels per pixel.
pub const CHANNELS: usize = 3;

/// Shared memory slot size (4 MiB).
pub const DEFAULT_SLOT_SIZE: usize = 4 * 1024 * 1024;

/// Number of shared memory slots.
pub const DEFAULT_SLOT_COUNT: usize = 512;

/// Graceful join window for the encoder worker before it is killed.
pub const SHUTDOWN_JOIN_TIMEOUT_MS: u64 = 1000;

/// Video must lead audio by more than this before the loop sleeps.
pub const SYNC_EPSILON_SECS: f64 = 0.001;

/// Lag beyond which audio is paused (or wall-clock time is dropped).
pub const RESYNC_THRESHOLD_SECS: f64 = 0.2;

/// Default UDP port of the debug telemetry receiver.
pub const DEFAULT_TELEMETRY_PORT: u16 = 9999;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Half of a block: the upper or lower source pixel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    Upper,
    Lower,
}

impl Half {
    pub const fn index(self) -> usize {
        match self {
            Half::Upper => 0,
            Half::Lower => 1,
        }
    }
}

/// Round a requested resolution up to an even pixel height.
///
/// # Examples
///
/// ```
/// use tui_video_types::even_height;
///
/// assert_eq!(even_height(32), 32);
/// assert_eq!(even_height(33), 34);
/// ```
pub const fn even_height(resolution: u16) -> u16 {
    if resolution % 2 == 0 {
        resolution
    } else {
        resolution.saturating_add(1)
    }
}

/// Pixel dimensions of the resized frame that feeds the block grid.
///
/// `width` is the number of terminal columns; `height` is the number of
/// source pixel rows (twice the number of terminal rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridGeometry {
    pub width: u16,
    pub height: u16,
}

impl GridGeometry {
    /// Build a geometry directly. `height` must be even and both sides non-zero.
    pub fn new(width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 || height % 2 != 0 {
            return None;
        }
        Some(Self { width, height })
    }

    /// Derive the grid from the source resolution, preserving aspect ratio.
    ///
    /// `width = round(height * source_width / source_height)`, at least 1.
    pub fn from_source(source_width: u32, source_height: u32, resolution: u16) -> Option<Self> {
        if source_width == 0 || source_height == 0 || resolution == 0 {
            return None;
        }
        let height = even_height(resolution);
        let aspect = f64::from(source_width) / f64::from(source_height);
        let width = (f64::from(height) * aspect).round().max(1.0);
        if width > f64::from(u16::MAX) {
            return None;
        }
        Self::new(width as u16, height)
    }

    /// Terminal rows (one per block row).
    pub fn block_rows(&self) -> usize {
        self.height as usize / 2
    }

    /// Terminal columns.
    pub fn cols(&self) -> usize {
        self.width as usize
    }

    /// Total number of blocks (terminal cells).
    pub fn block_count(&self) -> usize {
        self.block_rows() * self.cols()
    }

    /// Bytes in one tightly packed RGB frame at this geometry.
    pub fn pixel_bytes(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }
}

/// A decoded frame at source resolution, tightly packed RGB24.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl SourceFrame {
    /// Wrap raw RGB24 bytes. Returns `None` when the length does not match.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if expected == 0 || data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// A single-color frame.
    pub fn solid(width: u32, height: u32, color: Rgb) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&[color.r, color.g, color.b]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Overwrite one pixel. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&[color.r, color.g, color.b]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_block_is_the_upper_half_glyph() {
        assert_eq!(HALF_BLOCK.chars().collect::<Vec<_>>(), vec!['\u{2580}']);
        assert_eq!(HALF_BLOCK.len(), 3);
    }

    #[test]
    fn perceptual_weights_favor_green() {
        assert!(WEIGHT_GREEN > WEIGHT_RED);
        assert!(WEIGHT_RED > WEIGHT_BLUE);
        assert_eq!(PERCEPTUAL_WEIGHTS, [3, 6, 1]);
    }

    #[test]
    fn transport_defaults() {
        assert_eq!(DEFAULT_SLOT_SIZE, 4 * 1024 * 1024);
        assert_eq!(DEFAULT_SLOT_COUNT, 512);
        assert_eq!(DEFAULT_THRESHOLD, 150);
    }

    #[test]
    fn geometry_rounds_odd_resolution_up() {
        let g = GridGeometry::from_source(640, 480, 15).unwrap();
        assert_eq!(g.height, 16);
        assert_eq!(g.width, 21); // 16 * 4/3 = 21.33
        assert_eq!(g.block_rows(), 8);
        assert_eq!(g.block_count(), 8 * 21);
    }

    #[test]
    fn geometry_rejects_degenerate_sources() {
        assert!(GridGeometry::from_source(0, 480, 32).is_none());
        assert!(GridGeometry::from_source(640, 0, 32).is_none());
        assert!(GridGeometry::from_source(640, 480, 0).is_none());
        assert!(GridGeometry::new(4, 3).is_none());
    }

    #[test]
    fn very_tall_sources_keep_one_column() {
        let g = GridGeometry::from_source(1, 10_000, 8).unwrap();
        assert_eq!(g.width, 1);
    }

    #[test]
    fn source_frame_checks_length() {
        assert!(SourceFrame::from_rgb(2, 2, vec![0; 12]).is_some());
        assert!(SourceFrame::from_rgb(2, 2, vec![0; 11]).is_none());

        let mut f = SourceFrame::solid(2, 2, Rgb::BLACK);
        f.set_pixel(1, 1, Rgb::WHITE);
        assert_eq!(&f.data[9..12], &[255, 255, 255]);
        f.set_pixel(5, 5, Rgb::WHITE);
        assert_eq!(f.data.len(), 12);
    }
}
