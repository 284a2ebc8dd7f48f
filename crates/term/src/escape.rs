//! Escape-sequence encoding of changed half-block cells.
//!
//! Output for every changed block, in row-major order:
//!
//! - a cursor move, unless the cell directly follows the previous one on the
//!   same row (no move at all) or starts the next row (`\r\n`); the first cell
//!   of a frame always gets an absolute move
//! - `ESC[38;2;r;g;bm` for the upper color and `ESC[48;2;r;g;bm` for the lower
//!   color, each skipped when equal to the last value emitted on that channel
//! - `▀`, or a plain space when both halves share one color (background only)

use arrayvec::ArrayVec;
use crossterm::{
    cursor,
    style::{Color, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use tui_video_core::{BlockGrid, ChangeMask, VideoError, VideoResult};
use tui_video_types::{Half, Rgb, HALF_BLOCK};

/// `ESC[65535;65535H` is 14 bytes.
const MOVE_SEQ_CAP: usize = 16;

const SOLID_GLYPH: u8 = b' ';
const LINE_BREAK: &[u8] = b"\r\n";

/// Pre-rendered absolute cursor moves for every cell of a grid.
#[derive(Debug, Clone)]
pub struct MoveTable {
    rows: usize,
    cols: usize,
    seqs: Vec<ArrayVec<u8, MOVE_SEQ_CAP>>,
}

impl MoveTable {
    pub fn new(rows: usize, cols: usize) -> VideoResult<Self> {
        if rows > u16::MAX as usize || cols > u16::MAX as usize {
            return Err(VideoError::bounds(format!(
                "grid {cols}x{rows} exceeds terminal addressing"
            )));
        }
        let mut seqs = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let mut seq = ArrayVec::new();
                seq.queue(cursor::MoveTo(col as u16, row as u16))?;
                seqs.push(seq);
            }
        }
        Ok(Self { rows, cols, seqs })
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&[u8]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.seqs[row * self.cols + col].as_slice())
    }
}

/// Serializes changed blocks of a [`BlockGrid`] into escape sequences.
#[derive(Debug, Clone)]
pub struct CellEncoder {
    moves: MoveTable,
}

impl CellEncoder {
    pub fn new(rows: usize, cols: usize) -> VideoResult<Self> {
        Ok(Self {
            moves: MoveTable::new(rows, cols)?,
        })
    }

    /// Encode every block set in `mask` into `out` (cleared first).
    ///
    /// Returns the number of cells written.
    pub fn encode_into(
        &self,
        grid: &BlockGrid,
        mask: &ChangeMask,
        out: &mut Vec<u8>,
    ) -> VideoResult<usize> {
        out.clear();
        if mask.rows() != grid.rows() || mask.cols() != grid.cols() {
            return Err(VideoError::bounds(format!(
                "mask {}x{} does not match grid {}x{}",
                mask.cols(),
                mask.rows(),
                grid.cols(),
                grid.rows()
            )));
        }

        let mut last_cell: Option<(usize, usize)> = None;
        let mut fg: Option<Rgb> = None;
        let mut bg: Option<Rgb> = None;
        let mut cells = 0usize;

        for (row, col) in mask.iter_changed() {
            match last_cell {
                Some((prev_row, prev_col)) if row == prev_row && col == prev_col + 1 => {}
                Some((prev_row, _)) if row == prev_row + 1 && col == 0 => {
                    out.extend_from_slice(LINE_BREAK);
                }
                _ => {
                    let seq = self.moves.get(row, col).ok_or_else(|| {
                        VideoError::bounds(format!("cell ({col}, {row}) outside move table"))
                    })?;
                    out.extend_from_slice(seq);
                }
            }

            let (upper, lower) = match (
                grid.color(row, Half::Upper, col),
                grid.color(row, Half::Lower, col),
            ) {
                (Some(u), Some(l)) => (u, l),
                _ => {
                    return Err(VideoError::bounds(format!(
                        "cell ({col}, {row}) outside grid"
                    )))
                }
            };

            if upper == lower {
                if bg != Some(lower) {
                    out.queue(SetBackgroundColor(rgb_to_color(lower)))?;
                    bg = Some(lower);
                }
                out.push(SOLID_GLYPH);
            } else {
                if fg != Some(upper) {
                    out.queue(SetForegroundColor(rgb_to_color(upper)))?;
                    fg = Some(upper);
                }
                if bg != Some(lower) {
                    out.queue(SetBackgroundColor(rgb_to_color(lower)))?;
                    bg = Some(lower);
                }
                out.extend_from_slice(HALF_BLOCK.as_bytes());
            }

            last_cell = Some((row, col));
            cells += 1;
        }

        Ok(cells)
    }
}

pub(crate) fn rgb_to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(grid: &BlockGrid, mask: &ChangeMask) -> Vec<u8> {
        let enc = CellEncoder::new(grid.rows(), grid.cols()).unwrap();
        let mut out = Vec::new();
        enc.encode_into(grid, mask, &mut out).unwrap();
        out
    }

    #[test]
    fn move_table_matches_ansi_cursor_position() {
        let table = MoveTable::new(3, 4).unwrap();
        assert_eq!(table.get(0, 0), Some(&b"\x1b[1;1H"[..]));
        assert_eq!(table.get(2, 3), Some(&b"\x1b[3;4H"[..]));
        assert!(table.get(3, 0).is_none());
    }

    #[test]
    fn adjacent_cells_share_one_move() {
        let grid = BlockGrid::new(1, 3);
        let mut mask = ChangeMask::new(1, 3);
        mask.set(0, 1, true);
        mask.set(0, 2, true);
        assert_eq!(encode(&grid, &mask), b"\x1b[1;2H\x1b[48;2;0;0;0m  ".to_vec());
    }

    #[test]
    fn next_row_start_uses_line_break() {
        let grid = BlockGrid::new(2, 2);
        let mut mask = ChangeMask::new(2, 2);
        mask.set(0, 1, true);
        mask.set(1, 0, true);
        assert_eq!(
            encode(&grid, &mask),
            b"\x1b[1;2H\x1b[48;2;0;0;0m \r\n ".to_vec()
        );
    }

    #[test]
    fn gaps_use_absolute_moves() {
        let grid = BlockGrid::new(3, 3);
        let mut mask = ChangeMask::new(3, 3);
        mask.set(0, 0, true);
        mask.set(0, 2, true);
        mask.set(2, 0, true);
        assert_eq!(
            encode(&grid, &mask),
            b"\x1b[1;1H\x1b[48;2;0;0;0m \x1b[1;3H \x1b[3;1H ".to_vec()
        );
    }

    #[test]
    fn first_cell_at_row_start_still_moves() {
        let grid = BlockGrid::new(2, 1);
        let mut mask = ChangeMask::new(2, 1);
        mask.set(1, 0, true);
        assert!(encode(&grid, &mask).starts_with(b"\x1b[2;1H"));
    }

    #[test]
    fn half_block_sets_both_channels_and_elides_repeats() {
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        let mut grid = BlockGrid::new(1, 3);
        grid.set_block(0, 0, red, blue);
        grid.set_block(0, 1, red, blue);
        grid.set_block(0, 2, blue, blue);
        let mut mask = ChangeMask::new(1, 3);
        mask.fill(true);

        let mut expected = b"\x1b[1;1H\x1b[38;2;255;0;0m\x1b[48;2;0;0;255m".to_vec();
        expected.extend_from_slice("▀▀ ".as_bytes());
        assert_eq!(encode(&grid, &mask), expected);
    }

    #[test]
    fn mismatched_mask_is_a_bounds_violation() {
        let enc = CellEncoder::new(2, 2).unwrap();
        let mut out = Vec::new();
        let err = enc
            .encode_into(&BlockGrid::new(2, 2), &ChangeMask::new(1, 2), &mut out)
            .unwrap_err();
        assert!(matches!(err, VideoError::BoundsViolation(_)));
    }

    #[test]
    fn rgb_converts_to_truecolor() {
        assert_eq!(
            rgb_to_color(Rgb::new(1, 2, 3)),
            Color::Rgb { r: 1, g: 2, b: 3 }
        );
    }
}
