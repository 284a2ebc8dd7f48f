//! POSIX shared memory region split into fixed-size slots.
//!
//! The consumer creates (and finally unlinks) the region; the encoder worker
//! opens it by name. Both map it `MAP_SHARED`. No synchronization lives in the
//! region itself: a slot is only touched by whoever currently owns its index,
//! and ownership moves through the free/ready queues.

use std::ffi::c_void;
use std::io;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::ptr::NonNull;

use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use tui_video_core::{VideoError, VideoResult};

use crate::config::RingConfig;

/// A mapped shared memory segment.
///
/// # Safety
///
/// The mapping stays valid until `Drop`. Concurrent access from the other
/// process is only safe for byte ranges this side owns by protocol.
pub struct SharedRegion {
    name: String,
    base: NonNull<c_void>,
    len: usize,
    owner: bool,
}

// Safety: the region is plain memory; access discipline is enforced by slot ownership.
unsafe impl Send for SharedRegion {}

impl SharedRegion {
    /// Create a new segment of `len` bytes. Fails if `name` already exists.
    pub fn create(name: &str, len: usize) -> VideoResult<Self> {
        let size = NonZeroUsize::new(len)
            .ok_or_else(|| VideoError::bounds("shared region length is zero"))?;
        let off = libc::off_t::try_from(len)
            .map_err(|_| VideoError::bounds(format!("shared region of {len} bytes too large")))?;

        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(io::Error::from)?;

        if let Err(e) = ftruncate(&fd, off) {
            discard(name);
            return Err(io::Error::from(e).into());
        }

        match Self::map(name, &fd, size) {
            Ok(base) => {
                tracing::debug!(name, len, "shared region created");
                Ok(Self {
                    name: name.to_string(),
                    base,
                    len,
                    owner: true,
                })
            }
            Err(e) => {
                discard(name);
                Err(e)
            }
        }
    }

    /// Attach to an existing segment created by [`SharedRegion::create`].
    pub fn open(name: &str, len: usize) -> VideoResult<Self> {
        let size = NonZeroUsize::new(len)
            .ok_or_else(|| VideoError::bounds("shared region length is zero"))?;
        let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(io::Error::from)?;
        let base = Self::map(name, &fd, size)?;
        Ok(Self {
            name: name.to_string(),
            base,
            len,
            owner: false,
        })
    }

    fn map(name: &str, fd: &std::os::fd::OwnedFd, size: NonZeroUsize) -> VideoResult<NonNull<c_void>> {
        // Safety: fresh mapping of a descriptor we own; no existing memory is aliased.
        let base = unsafe {
            mmap(
                None,
                size,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                fd,
                0,
            )
        }
        .map_err(|e| {
            tracing::warn!(name, "mmap failed: {e}");
            io::Error::from(e)
        })?;
        Ok(base)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // Safety: `base` maps `len` bytes for the lifetime of `self`.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr() as *const u8, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // Safety: as above; `&mut self` rules out aliasing within this process.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr() as *mut u8, self.len) }
    }
}

/// Unlink a segment whose setup failed.
fn discard(name: &str) {
    if let Err(e) = shm_unlink(name) {
        tracing::debug!(name, "shm_unlink after failed setup: {e}");
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // Safety: `base`/`len` came from a successful mmap and are unmapped once.
        if let Err(e) = unsafe { munmap(self.base, self.len) } {
            tracing::debug!(name = %self.name, "munmap failed: {e}");
        }
        if self.owner {
            if let Err(e) = shm_unlink(self.name.as_str()) {
                tracing::debug!(name = %self.name, "shm_unlink failed: {e}");
            }
        }
    }
}

/// A [`SharedRegion`] addressed as `slot_count` slots of `slot_size` bytes.
pub struct SlotPool {
    region: SharedRegion,
    slot_size: usize,
    slot_count: usize,
}

impl SlotPool {
    /// Create the backing region (consumer side).
    pub fn create(name: &str, config: RingConfig) -> VideoResult<Self> {
        let len = Self::region_len(config)?;
        Ok(Self::wrap(SharedRegion::create(name, len)?, config))
    }

    /// Attach to an existing region (producer side).
    pub fn open(name: &str, config: RingConfig) -> VideoResult<Self> {
        let len = Self::region_len(config)?;
        Ok(Self::wrap(SharedRegion::open(name, len)?, config))
    }

    fn region_len(config: RingConfig) -> VideoResult<usize> {
        if config.slot_count == 0 || config.slot_count >= u32::MAX as usize {
            return Err(VideoError::bounds(format!(
                "slot count {} out of range",
                config.slot_count
            )));
        }
        config
            .region_len()
            .ok_or_else(|| VideoError::bounds("shared region size overflows"))
    }

    fn wrap(region: SharedRegion, config: RingConfig) -> Self {
        Self {
            region,
            slot_size: config.slot_size,
            slot_count: config.slot_count,
        }
    }

    pub fn name(&self) -> &str {
        self.region.name()
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn range(&self, slot: u32, len: usize) -> VideoResult<Range<usize>> {
        let slot = slot as usize;
        if slot >= self.slot_count || len > self.slot_size {
            return Err(VideoError::bounds(format!(
                "slot {slot} len {len} outside pool of {} x {} bytes",
                self.slot_count, self.slot_size
            )));
        }
        let start = slot * self.slot_size;
        Ok(start..start + len)
    }

    /// Copy `bytes` into the start of `slot`.
    pub fn write(&mut self, slot: u32, bytes: &[u8]) -> VideoResult<()> {
        let range = self.range(slot, bytes.len())?;
        self.region.as_mut_slice()[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Append the first `len` bytes of `slot` to `out`.
    pub fn read_into(&self, slot: u32, len: usize, out: &mut Vec<u8>) -> VideoResult<()> {
        let range = self.range(slot, len)?;
        out.extend_from_slice(&self.region.as_slice()[range]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::unique_region_name;

    fn small() -> RingConfig {
        RingConfig {
            slot_size: 8,
            slot_count: 4,
        }
    }

    #[test]
    fn writes_are_visible_through_a_second_mapping() {
        let name = unique_region_name();
        let mut owner = SlotPool::create(&name, small()).unwrap();
        let reader = SlotPool::open(&name, small()).unwrap();

        owner.write(2, b"hello").unwrap();
        let mut out = Vec::new();
        reader.read_into(2, 5, &mut out).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn out_of_range_slots_are_rejected() {
        let name = unique_region_name();
        let mut pool = SlotPool::create(&name, small()).unwrap();
        assert!(matches!(
            pool.write(4, b"x").unwrap_err(),
            VideoError::BoundsViolation(_)
        ));
        assert!(matches!(
            pool.write(0, &[0; 9]).unwrap_err(),
            VideoError::BoundsViolation(_)
        ));
    }

    #[test]
    fn owner_unlinks_on_drop() {
        let name = unique_region_name();
        drop(SlotPool::create(&name, small()).unwrap());
        assert!(SlotPool::open(&name, small()).is_err());
    }

    #[test]
    fn failed_setup_leaves_no_segment_behind() {
        let name = unique_region_name();
        // Larger than any address space, so sizing or mapping fails.
        assert!(SharedRegion::create(&name, i64::MAX as usize).is_err());
        assert!(SharedRegion::open(&name, 8).is_err());
    }

    #[test]
    fn duplicate_create_fails() {
        let name = unique_region_name();
        let _first = SlotPool::create(&name, small()).unwrap();
        assert!(SlotPool::create(&name, small()).is_err());
    }
}
