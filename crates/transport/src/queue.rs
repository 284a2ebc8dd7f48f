//! Fixed-size index records exchanged over pipes.
//!
//! Two queues run between consumer and encoder worker:
//!
//! | Queue | Direction | Record (little-endian) |
//! |-------|-----------|------------------------|
//! | free  | consumer -> worker | `slot: u32` |
//! | ready | worker -> consumer | `slot: u32, len: u32, flags: u32` |
//!
//! `u32::MAX` in the slot field is the sentinel on both: "cancel" on the free
//! queue, "end of stream" on the ready queue. A closed pipe reads as the
//! sentinel, so a peer that dies mid-stream looks like one that finished.

use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::AsRawFd;

use tui_video_core::VideoResult;

/// Slot value marking end-of-stream (ready) or cancellation (free).
pub const SENTINEL_SLOT: u32 = u32::MAX;

pub const FREE_RECORD_LEN: usize = 4;
pub const READY_RECORD_LEN: usize = 12;

const FLAG_LAST: u32 = 1;

/// One chunk of a frame sitting in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEntry {
    pub slot: u32,
    pub len: u32,
    /// Final chunk of its frame.
    pub last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyMsg {
    Chunk(ReadyEntry),
    End,
}

impl ReadyMsg {
    fn encode(self) -> [u8; READY_RECORD_LEN] {
        let (slot, len, flags) = match self {
            ReadyMsg::Chunk(e) => (e.slot, e.len, if e.last { FLAG_LAST } else { 0 }),
            ReadyMsg::End => (SENTINEL_SLOT, 0, 0),
        };
        let mut rec = [0u8; READY_RECORD_LEN];
        rec[0..4].copy_from_slice(&slot.to_le_bytes());
        rec[4..8].copy_from_slice(&len.to_le_bytes());
        rec[8..12].copy_from_slice(&flags.to_le_bytes());
        rec
    }

    fn decode(rec: &[u8; READY_RECORD_LEN]) -> Self {
        let word = |i: usize| u32::from_le_bytes([rec[i], rec[i + 1], rec[i + 2], rec[i + 3]]);
        let slot = word(0);
        if slot == SENTINEL_SLOT {
            return ReadyMsg::End;
        }
        ReadyMsg::Chunk(ReadyEntry {
            slot,
            len: word(4),
            last: word(8) & FLAG_LAST != 0,
        })
    }
}

/// Read exactly `buf.len()` bytes; `Ok(false)` on a closed pipe.
fn read_record<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match r.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Worker side of the ready queue.
pub struct ReadySender<W: Write> {
    inner: W,
}

impl<W: Write> ReadySender<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Publish one chunk. Flushed immediately so the consumer sees it.
    pub fn send(&mut self, entry: ReadyEntry) -> io::Result<()> {
        self.write_msg(ReadyMsg::Chunk(entry))
    }

    pub fn finish(&mut self) -> io::Result<()> {
        self.write_msg(ReadyMsg::End)
    }

    fn write_msg(&mut self, msg: ReadyMsg) -> io::Result<()> {
        self.inner.write_all(&msg.encode())?;
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Consumer side of the ready queue.
pub struct ReadyReceiver<R: Read> {
    inner: R,
}

impl<R: Read> ReadyReceiver<R> {
    /// `inner` must be unbuffered for [`ReadyReceiver::queued`] to be exact.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Block until the next record. A closed pipe yields [`ReadyMsg::End`].
    pub fn recv(&mut self) -> VideoResult<ReadyMsg> {
        let mut rec = [0u8; READY_RECORD_LEN];
        if !read_record(&mut self.inner, &mut rec)? {
            return Ok(ReadyMsg::End);
        }
        Ok(ReadyMsg::decode(&rec))
    }
}

impl<R: Read + AsRawFd> ReadyReceiver<R> {
    /// Complete records waiting in the pipe, without blocking.
    pub fn queued(&self) -> usize {
        let mut pending: libc::c_int = 0;
        // Safety: FIONREAD writes one c_int into `pending`.
        let rc = unsafe { libc::ioctl(self.inner.as_raw_fd(), libc::FIONREAD, &mut pending as *mut libc::c_int) };
        if rc < 0 || pending < 0 {
            return 0;
        }
        pending as usize / READY_RECORD_LEN
    }
}

/// Consumer side of the free queue.
pub struct FreeSender<W: Write> {
    inner: W,
}

impl<W: Write> FreeSender<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Return `slot` to the producer.
    pub fn send(&mut self, slot: u32) -> io::Result<()> {
        self.inner.write_all(&slot.to_le_bytes())?;
        self.inner.flush()
    }

    /// Hand out slots `0..count` in one write.
    pub fn seed(&mut self, count: u32) -> io::Result<()> {
        let mut buf = Vec::with_capacity(count as usize * FREE_RECORD_LEN);
        for slot in 0..count {
            buf.extend_from_slice(&slot.to_le_bytes());
        }
        self.inner.write_all(&buf)?;
        self.inner.flush()
    }

    /// Tell a producer blocked on the free queue to stop.
    pub fn cancel(&mut self) -> io::Result<()> {
        self.send(SENTINEL_SLOT)
    }
}

/// Worker side of the free queue.
pub struct FreeReceiver<R: Read> {
    inner: R,
}

impl<R: Read> FreeReceiver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Next free slot, or `None` once cancelled or the consumer is gone.
    pub fn recv(&mut self) -> VideoResult<Option<u32>> {
        let mut rec = [0u8; FREE_RECORD_LEN];
        if !read_record(&mut self.inner, &mut rec)? {
            return Ok(None);
        }
        match u32::from_le_bytes(rec) {
            SENTINEL_SLOT => Ok(None),
            slot => Ok(Some(slot)),
        }
    }
}
