//! Change-detection encoder: decoded frame in, escape bytes out.

use tui_video_core::{resize_to_grid, BlockGrid, ChangeMask, DiffState, VideoError, VideoResult};
use tui_video_term::CellEncoder;
use tui_video_types::{GridGeometry, SourceFrame};

/// Bytes for one frame, borrowed from the encoder's reusable buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedFrame<'a> {
    pub bytes: &'a [u8],
    pub changed_cells: usize,
}

impl EncodedFrame<'_> {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encoder context for one stream.
///
/// Owns the committed screen state, the change mask, and the output buffer.
/// After the first full frame, [`FrameDiffEncoder::encode_grid`] reuses all
/// three and does not allocate.
pub struct FrameDiffEncoder {
    geometry: GridGeometry,
    state: DiffState,
    mask: ChangeMask,
    cells: CellEncoder,
    out: Vec<u8>,
}

impl FrameDiffEncoder {
    pub fn new(geometry: GridGeometry, threshold: u32) -> VideoResult<Self> {
        let (rows, cols) = (geometry.block_rows(), geometry.cols());
        Ok(Self {
            geometry,
            state: DiffState::new(threshold),
            mask: ChangeMask::new(rows, cols),
            cells: CellEncoder::new(rows, cols)?,
            out: Vec::new(),
        })
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn threshold(&self) -> u32 {
        self.state.threshold()
    }

    pub fn committed(&self) -> Option<&BlockGrid> {
        self.state.committed()
    }

    /// Resize `frame` to the grid and encode it.
    pub fn encode_frame(&mut self, frame: &SourceFrame) -> VideoResult<EncodedFrame<'_>> {
        let grid = resize_to_grid(frame, self.geometry)?;
        self.encode_grid(&grid)
    }

    /// Diff an already-resized grid against the committed state and emit the
    /// changed blocks.
    pub fn encode_grid(&mut self, grid: &BlockGrid) -> VideoResult<EncodedFrame<'_>> {
        if grid.rows() != self.geometry.block_rows() || grid.cols() != self.geometry.cols() {
            return Err(VideoError::bounds(format!(
                "grid {}x{} does not match encoder geometry {}x{}",
                grid.cols(),
                grid.rows(),
                self.geometry.cols(),
                self.geometry.block_rows()
            )));
        }
        self.state.update(grid, &mut self.mask);
        let changed_cells = self.cells.encode_into(grid, &self.mask, &mut self.out)?;
        Ok(EncodedFrame {
            bytes: &self.out,
            changed_cells,
        })
    }
}
