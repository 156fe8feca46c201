//! The publish side of a ring.
//!
//! At most one writer per ring file. The writer is wait-free: publishing a
//! frame is a payload copy, a slot-header store, a release store of the
//! sequence counter, and a futex wake. Nothing a reader does can stall it.

use crate::clock::epoch_ns;
use crate::error::IccError;
use crate::futex;
use crate::layout::{
    FILE_HEADER_SIZE, RingConfig, SLOT_HEADER_SIZE, SLOT_SEQ_OFFSET, ring_path, seq_to_slot,
};
use std::fs;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use tephra_mmap::MmapFileMut;

/// The single writer of one ring file.
///
/// Created by the service at startup; dropping it unmaps, closes, and
/// unlinks the file. Readers never unlink.
#[derive(Debug)]
pub struct RingWriter {
    mm: MmapFileMut,
    base: *mut u8,
    frame_size: usize,
    slot_size: usize,
    mask: u32,
}

// The raw base pointer aliases memory owned by `mm`, which moves with the
// struct. Single ownership, so handing the writer to a task thread is fine;
// it is deliberately not Sync.
unsafe impl Send for RingWriter {}

impl RingWriter {
    /// Create the ring file for `identifier` under `shm_dir`, truncated to
    /// the exact layout size and zeroed (the counter starts at 0).
    pub fn create(
        shm_dir: &Path,
        identifier: &str,
        frame_size: usize,
        cfg: RingConfig,
    ) -> Result<Self, IccError> {
        assert!(frame_size > 0, "frame size must be non-zero");
        let path = ring_path(shm_dir, identifier);
        let mut mm = MmapFileMut::create_rw(&path, cfg.file_size(frame_size) as u64)?;
        let base = mm.as_mut_ptr();
        Ok(Self {
            mm,
            base,
            frame_size,
            slot_size: cfg.slot_size(frame_size),
            mask: cfg.mask(),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    #[inline(always)]
    fn counter(&self) -> &AtomicU32 {
        // SAFETY: offset 0 of the mapping is the 4-aligned counter word,
        // initialized to zero by file creation.
        unsafe { &*(self.base as *const AtomicU32) }
    }

    /// Publish one frame. `payload` must be exactly the frame size.
    ///
    /// Order matters: payload, then slot header (capture timestamp and the
    /// slot's target sequence), then the release store of the counter that
    /// makes all of it visible, then the wake. Returns the sequence number
    /// assigned to the frame.
    pub fn publish(&mut self, payload: &[u8]) -> Result<u32, IccError> {
        if payload.len() != self.frame_size {
            return Err(IccError::FrameSize {
                expected: self.frame_size,
                got: payload.len(),
            });
        }

        let next = self.counter().load(Ordering::Relaxed).wrapping_add(1);
        let idx = seq_to_slot(next, self.mask) as usize;

        // SAFETY: idx is masked into capacity, so the slot lies inside the
        // mapping; slot fields may be unaligned (the stride is 16 + frame
        // size), hence the unaligned stores. Visibility to other processes
        // is carried entirely by the release store of the counter below.
        unsafe {
            let slot = self.base.add(FILE_HEADER_SIZE + idx * self.slot_size);
            ptr::copy_nonoverlapping(
                payload.as_ptr(),
                slot.add(SLOT_HEADER_SIZE),
                self.frame_size,
            );
            ptr::write_unaligned(slot as *mut u64, epoch_ns());
            ptr::write_unaligned(slot.add(SLOT_SEQ_OFFSET) as *mut u32, next);
        }

        self.counter().store(next, Ordering::Release);
        futex::wake_all(self.counter());
        Ok(next)
    }
}

impl Drop for RingWriter {
    fn drop(&mut self) {
        // Unlink before the mapping goes away; open readers keep their
        // mapping alive through their own file handles.
        let _ = fs::remove_file(self.mm.path());
    }
}
