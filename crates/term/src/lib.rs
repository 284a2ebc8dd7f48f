//! Terminal output layer.
//!
//! Two halves: [`escape`] turns changed grid blocks into the smallest escape
//! sequence stream we can manage (run-aware cursor moves, sticky colors,
//! solid-cell collapsing), and [`session`] owns the real terminal while a
//! video plays.
//!
//! Goals:
//! - Keep encoding pure (bytes into a reusable `Vec<u8>`, no terminal access)
//! - Restore the terminal on every exit path
//! - Byte-exact ANSI output that tests can assert on

pub mod escape;
pub mod session;

pub use tui_video_core as core;
pub use tui_video_types as types;

pub use escape::{CellEncoder, MoveTable};
pub use session::{FrameSink, TerminalSession};
