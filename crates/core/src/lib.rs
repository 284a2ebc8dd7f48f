//! Core encoder model - pure, deterministic, and testable
//!
//! This crate holds the numeric half of the change-detection encoder. It has
//! **no dependencies** on terminals, processes, or I/O:
//!
//! - [`grid`]: [`BlockGrid`], the resized frame as `(rows, 2, cols, 3)` signed values
//! - [`diff`]: [`DiffState`] (committed screen state) and [`ChangeMask`]
//! - [`resize`]: bilinear resize from source resolution to the grid
//! - [`error`]: [`VideoError`], shared by every stage of the pipeline
//!
//! # Example
//!
//! ```
//! use tui_video_core::{BlockGrid, ChangeMask, DiffState};
//! use tui_video_types::Rgb;
//!
//! let mut state = DiffState::new(50);
//! let mut mask = ChangeMask::default();
//!
//! // First frame: full repaint.
//! let black = BlockGrid::new(2, 2);
//! state.update(&black, &mut mask);
//! assert_eq!(mask.changed_count(), 4);
//!
//! // Identical frame: nothing to redraw.
//! state.update(&black, &mut mask);
//! assert!(mask.is_clear());
//!
//! // One block turns white.
//! let mut next = black.clone();
//! next.set_block(0, 0, Rgb::WHITE, Rgb::WHITE);
//! state.update(&next, &mut mask);
//! assert_eq!(mask.iter_changed().collect::<Vec<_>>(), vec![(0, 0)]);
//! ```

pub mod diff;
pub mod error;
pub mod grid;
pub mod resize;

pub use tui_video_types as types;

pub use diff::{block_score, ChangeMask, DiffState};
pub use error::{VideoError, VideoResult};
pub use grid::BlockGrid;
pub use resize::resize_to_grid;
