//! Block grid: a resized frame partitioned into vertically stacked pixel pairs.

use tui_video_types::{GridGeometry, Half, Rgb, CHANNELS};

use crate::error::{VideoError, VideoResult};

/// Resized frame shaped `(rows, 2, cols, 3)` in one contiguous `i16` buffer.
///
/// Values are stored signed so that per-channel differences never wrap.
/// Strides: channel = 1, column = 3, half = `3 * cols`, row = `6 * cols`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGrid {
    rows: usize,
    cols: usize,
    data: Vec<i16>,
}

impl BlockGrid {
    /// An all-black grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * 2 * cols * CHANNELS],
        }
    }

    /// Build from tightly packed RGB24 pixels at exactly `geometry`.
    pub fn from_rgb(pixels: &[u8], geometry: GridGeometry) -> VideoResult<Self> {
        if pixels.len() != geometry.pixel_bytes() {
            return Err(VideoError::bounds(format!(
                "pixel buffer has {} bytes, grid {}x{} needs {}",
                pixels.len(),
                geometry.width,
                geometry.height,
                geometry.pixel_bytes()
            )));
        }
        // Row-major RGB pixels already have the (rows, 2, cols, 3) layout.
        Ok(Self {
            rows: geometry.block_rows(),
            cols: geometry.cols(),
            data: pixels.iter().map(|&v| i16::from(v)).collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn same_shape(&self, other: &BlockGrid) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    /// Raw values, in `(row, half, col, channel)` order.
    pub fn values(&self) -> &[i16] {
        &self.data
    }

    #[inline(always)]
    fn offset(&self, row: usize, half: usize, col: usize) -> usize {
        ((row * 2 + half) * self.cols + col) * CHANNELS
    }

    /// The three channel values of one half of one block.
    #[inline]
    pub fn pixel(&self, row: usize, half: Half, col: usize) -> Option<&[i16]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let i = self.offset(row, half.index(), col);
        Some(&self.data[i..i + CHANNELS])
    }

    /// Color of one half of one block, clamped into `0..=255`.
    #[inline]
    pub fn color(&self, row: usize, half: Half, col: usize) -> Option<Rgb> {
        self.pixel(row, half, col).map(|p| {
            Rgb::new(
                p[0].clamp(0, 255) as u8,
                p[1].clamp(0, 255) as u8,
                p[2].clamp(0, 255) as u8,
            )
        })
    }

    /// Paint both halves of a block.
    pub fn set_block(&mut self, row: usize, col: usize, upper: Rgb, lower: Rgb) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        for (half, c) in [(0, upper), (1, lower)] {
            let i = self.offset(row, half, col);
            self.data[i] = i16::from(c.r);
            self.data[i + 1] = i16::from(c.g);
            self.data[i + 2] = i16::from(c.b);
        }
    }

    /// Copy one block (both halves) from `other`. Shapes must match.
    #[inline]
    pub fn copy_block_from(&mut self, other: &BlockGrid, row: usize, col: usize) {
        debug_assert!(self.same_shape(other));
        for half in 0..2 {
            let i = self.offset(row, half, col);
            self.data[i..i + CHANNELS].copy_from_slice(&other.data[i..i + CHANNELS]);
        }
    }

    /// Slice holding one half-row of pixels (all columns).
    #[inline]
    pub(crate) fn half_row(&self, row: usize, half: usize) -> &[i16] {
        let start = self.offset(row, half, 0);
        &self.data[start..start + self.cols * CHANNELS]
    }
}
