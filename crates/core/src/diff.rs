//! Perceptual change detection against the committed screen state.
//!
//! The encoder keeps one [`DiffState`] per stream. Each frame produces a
//! [`ChangeMask`]; blocks whose weighted score exceeds the threshold are
//! copied into the committed grid, everything else keeps its old value.
//! There is no feedback from the consumer: once computed, a commit is final.

use tui_video_types::{CHANNELS, PERCEPTUAL_WEIGHTS};

use crate::grid::BlockGrid;

/// Boolean grid `rows x cols`, true where a block must be redrawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeMask {
    rows: usize,
    cols: usize,
    bits: Vec<bool>,
}

impl ChangeMask {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            bits: vec![false; rows * cols],
        }
    }

    /// Reshape and clear, keeping the allocation when the size is unchanged.
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.bits.clear();
        self.bits.resize(rows * cols, false);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.bits[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, changed: bool) {
        if row < self.rows && col < self.cols {
            self.bits[row * self.cols + col] = changed;
        }
    }

    pub fn fill(&mut self, changed: bool) {
        self.bits.fill(changed);
    }

    pub fn changed_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_clear(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    /// Changed blocks as `(row, col)`, top-to-bottom then left-to-right.
    pub fn iter_changed(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols.max(1);
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(move |(i, _)| (i / cols, i % cols))
    }
}

/// Weighted Manhattan distance of one block between two grids of equal shape.
///
/// Sums `|a - b| * weight` over both halves and all three channels.
#[inline]
pub fn block_score(a: &BlockGrid, b: &BlockGrid, row: usize, col: usize) -> u32 {
    let mut score = 0u32;
    for half in 0..2 {
        let pa = &a.half_row(row, half)[col * CHANNELS..(col + 1) * CHANNELS];
        let pb = &b.half_row(row, half)[col * CHANNELS..(col + 1) * CHANNELS];
        for ch in 0..CHANNELS {
            score += u32::from(pa[ch].abs_diff(pb[ch])) * PERCEPTUAL_WEIGHTS[ch];
        }
    }
    score
}

/// Committed screen state plus the change threshold.
#[derive(Debug, Clone)]
pub struct DiffState {
    threshold: u32,
    committed: Option<BlockGrid>,
}

impl DiffState {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            committed: None,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Grid values last committed as rendered, if any frame was seen.
    pub fn committed(&self) -> Option<&BlockGrid> {
        self.committed.as_ref()
    }

    /// Forget the committed state so the next frame is a full repaint.
    pub fn invalidate(&mut self) {
        self.committed = None;
    }

    /// Diff `next` against the committed state, write the mask, and commit.
    ///
    /// The first frame (or a frame whose shape differs from the committed
    /// one) marks every block changed. Otherwise only blocks with a score
    /// strictly above the threshold are marked and copied into the
    /// committed grid; unchanged blocks keep their old committed value.
    pub fn update(&mut self, next: &BlockGrid, mask: &mut ChangeMask) {
        mask.reset(next.rows(), next.cols());

        let committed = match self.committed.as_mut() {
            Some(c) if c.same_shape(next) => c,
            _ => {
                mask.fill(true);
                self.committed = Some(next.clone());
                return;
            }
        };

        for row in 0..next.rows() {
            for col in 0..next.cols() {
                if block_score(committed, next, row, col) > self.threshold {
                    mask.set(row, col, true);
                    committed.copy_block_from(next, row, col);
                }
            }
        }
    }
}
