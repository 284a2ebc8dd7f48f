//! Cross-process frame transport.
//!
//! Encoded frames travel from the encoder worker to the playback process
//! through a shared memory region cut into fixed-size slots. Slot indices
//! circulate over two pipes:
//!
//! ```text
//!   consumer ──free (u32 index)──────────────▶ worker
//!   consumer ◀──ready (index, len, flags)───── worker
//! ```
//!
//! The consumer seeds every index on the free queue up front. The worker
//! blocks on the free queue when all slots are in flight, which is the only
//! backpressure in the pipeline.
//!
//! - [`config`]: slot geometry and region naming
//! - [`shm`]: the mapped region ([`SharedRegion`], [`SlotPool`])
//! - [`queue`]: the pipe record formats
//! - [`ring`]: frame chunking and reassembly on top of both

pub mod config;
pub mod queue;
pub mod ring;
pub mod shm;

pub use config::{unique_region_name, RingConfig};
pub use queue::{ReadyEntry, ReadyMsg, SENTINEL_SLOT};
pub use ring::{RingConsumer, RingProducer, SendOutcome};
pub use shm::{SharedRegion, SlotPool};
