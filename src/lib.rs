//! Terminal video player (workspace facade crate).
//!
//! The implementation lives in dedicated crates under `crates/`; this package
//! re-exports them under short names and holds the process-level plumbing
//! shared by the player and the encoder worker.

pub use tui_video_core as core;
pub use tui_video_engine as engine;
pub use tui_video_source as source;
pub use tui_video_sync as sync;
pub use tui_video_telemetry as telemetry;
pub use tui_video_term as term;
pub use tui_video_transport as transport;
pub use tui_video_types as types;

pub mod logging;
pub mod signal;
