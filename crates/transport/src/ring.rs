//! Frame-level ring: splits encoded frames across slots and reassembles them.

use std::io::{Read, Write};
use std::os::fd::AsRawFd;

use tui_video_core::VideoResult;

use crate::queue::{FreeReceiver, FreeSender, ReadyEntry, ReadyMsg, ReadyReceiver, ReadySender};
use crate::shm::SlotPool;

/// Result of handing one frame to the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The consumer cancelled (or vanished) while we waited for a slot.
    Cancelled,
}

/// Worker end: waits for free slots, fills them, publishes ready records.
pub struct RingProducer<R: Read, W: Write> {
    pool: SlotPool,
    free: FreeReceiver<R>,
    ready: ReadySender<W>,
}

impl<R: Read, W: Write> RingProducer<R, W> {
    pub fn new(pool: SlotPool, free: R, ready: W) -> Self {
        Self {
            pool,
            free: FreeReceiver::new(free),
            ready: ReadySender::new(ready),
        }
    }

    /// Copy `bytes` into as many slots as needed, in order.
    ///
    /// An empty frame still occupies one slot with a zero-length chunk so the
    /// consumer keeps one frame per source frame.
    pub fn send_frame(&mut self, bytes: &[u8]) -> VideoResult<SendOutcome> {
        let slot_size = self.pool.slot_size();
        let mut offset = 0;
        loop {
            let Some(slot) = self.free.recv()? else {
                return Ok(SendOutcome::Cancelled);
            };
            let end = bytes.len().min(offset + slot_size);
            self.pool.write(slot, &bytes[offset..end])?;
            let last = end == bytes.len();
            self.ready.send(ReadyEntry {
                slot,
                len: (end - offset) as u32,
                last,
            })?;
            offset = end;
            if last {
                return Ok(SendOutcome::Delivered);
            }
        }
    }

    /// Publish end-of-stream.
    pub fn finish(&mut self) -> VideoResult<()> {
        self.ready.finish()?;
        Ok(())
    }
}

/// Consumer end: owns the shared region, seeds and recycles slots.
pub struct RingConsumer<R: Read, W: Write> {
    ready: ReadyReceiver<R>,
    free: FreeSender<W>,
    pool: SlotPool,
    ended: bool,
    producer_gone: bool,
}

impl<R: Read, W: Write> RingConsumer<R, W> {
    pub fn new(pool: SlotPool, ready: R, free: W) -> Self {
        Self {
            ready: ReadyReceiver::new(ready),
            free: FreeSender::new(free),
            pool,
            ended: false,
            producer_gone: false,
        }
    }

    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// Hand every slot to the producer. Call once, before the first frame.
    pub fn seed_free(&mut self) -> VideoResult<()> {
        let count = self.pool.slot_count() as u32;
        match self.free.seed(count) {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                self.producer_gone = true;
                Ok(())
            }
            r => Ok(r?),
        }
    }

    /// Next complete frame, or `None` at end of stream.
    pub fn recv_frame(&mut self) -> VideoResult<Option<Vec<u8>>> {
        let mut frame = Vec::new();
        Ok(self.recv_frame_into(&mut frame)?.then_some(frame))
    }

    /// Reassemble the next frame into `out` (cleared first).
    ///
    /// Each slot is copied out before its index goes back on the free queue.
    /// Chunks that precede the end marker without a final chunk are dropped.
    pub fn recv_frame_into(&mut self, out: &mut Vec<u8>) -> VideoResult<bool> {
        out.clear();
        if self.ended {
            return Ok(false);
        }
        loop {
            match self.ready.recv()? {
                ReadyMsg::End => {
                    if !out.is_empty() {
                        tracing::debug!(bytes = out.len(), "discarding partial frame at end of stream");
                        out.clear();
                    }
                    self.ended = true;
                    return Ok(false);
                }
                ReadyMsg::Chunk(entry) => {
                    self.pool.read_into(entry.slot, entry.len as usize, out)?;
                    self.release(entry.slot)?;
                    if entry.last {
                        return Ok(true);
                    }
                }
            }
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Ask the producer to stop. Errors are ignored: it may already be gone.
    pub fn cancel(&mut self) {
        if self.producer_gone {
            return;
        }
        if let Err(e) = self.free.cancel() {
            tracing::debug!("free queue cancel not delivered: {e}");
        }
        self.producer_gone = true;
    }

    /// Close both pipes and keep only the shared region.
    pub fn into_pool(self) -> SlotPool {
        self.pool
    }

    fn release(&mut self, slot: u32) -> VideoResult<()> {
        if self.producer_gone {
            return Ok(());
        }
        match self.free.send(slot) {
            // The producer exits after its end marker; the ready queue may still hold records.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                self.producer_gone = true;
                Ok(())
            }
            r => Ok(r?),
        }
    }
}

impl<R: Read + AsRawFd, W: Write> RingConsumer<R, W> {
    /// Ready records not yet consumed.
    pub fn buffered(&self) -> usize {
        self.ready.queued()
    }
}
