//! Encoder pipeline across two processes.
//!
//! - [`encoder`]: [`FrameDiffEncoder`], one stream's change-detection context
//! - [`worker`]: the producer loop, run inside the encoder worker process
//! - [`decoder`]: [`VideoDecoder`] / [`DiffStream`], the playback-side handle
//!   that spawns the worker and reads its frames

pub mod decoder;
pub mod encoder;
pub mod worker;

pub use decoder::{DiffStream, PlaybackOptions, VideoDecoder, WorkerLauncher};
pub use encoder::{EncodedFrame, FrameDiffEncoder};
pub use worker::{produce, run_worker, ProduceEnd, ProduceSummary, WorkerArgs, WORKER_SUBCOMMAND};
