//! The await-next side of a ring.
//!
//! Any number of readers may follow one ring; each keeps a private cursor
//! and copies frames out of the mapping, so a stalled or dead reader costs
//! the writer nothing. A reader that falls more than one ring behind simply
//! observes a sequence gap — loss is detected, never prevented.

use crate::cancel::CancelToken;
use crate::error::IccError;
use crate::futex;
use crate::layout::{
    FILE_HEADER_SIZE, RingConfig, SLOT_HEADER_SIZE, SLOT_SEQ_OFFSET, ring_path, seq_to_slot,
};
use std::io;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering, fence};
use std::time::Duration;
use tephra_mmap::MmapFile;

/// How long one kernel wait lasts before the cancellation flag is polled.
/// Bounds the latency of [`CancelToken::cancel`] as seen by a blocked read.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Where a fresh reader's cursor starts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StartPosition {
    /// Follow the live stream: first read returns the next frame published
    /// after open. The default for dashboards and other live viewers.
    #[default]
    Live,
    /// Start from sequence zero, so a frame already sitting in the ring at
    /// open time is returned immediately. For consumers that must not skip
    /// whatever is current (the config channel, loss-sensitive sinks).
    Origin,
}

/// One frame copied out of a ring, plus its metadata.
#[derive(Debug, Clone)]
pub struct RingMessage {
    /// Owned copy of the frame bytes; never a pointer into the mapping.
    pub payload: Vec<u8>,
    /// Wall-clock capture time, nanoseconds since the Unix epoch.
    pub recv_ts_ns: u64,
    /// Sequence number the writer assigned to this frame.
    pub seq: u32,
    /// Frames published between this message and the previous one returned
    /// to this reader, but never observed by it.
    pub missed: u32,
}

/// A follower of one ring file. Maps the file read-only and never unlinks.
#[derive(Debug)]
pub struct RingReader {
    /// Owns the mmap lifetime; not touched after init.
    _mm: MmapFile,
    base: *const u8,
    frame_size: usize,
    slot_size: usize,
    mask: u32,
    cursor: u32,
}

// The base pointer aliases the read-only mapping kept alive by `_mm`. One cursor
// per reader; not Sync.
unsafe impl Send for RingReader {}

impl RingReader {
    /// Open the ring for `identifier` under `shm_dir`.
    ///
    /// The frame size is recovered from the file length, so a reader needs
    /// no schema to attach. A missing file maps to [`IccError::NotReady`];
    /// a file whose length fits no slot layout maps to
    /// [`IccError::BadSchema`].
    pub fn open(
        shm_dir: &Path,
        identifier: &str,
        cfg: RingConfig,
        start: StartPosition,
    ) -> Result<Self, IccError> {
        let path = ring_path(shm_dir, identifier);
        let meta = fs_metadata(&path, identifier)?;
        let frame_size = cfg
            .frame_size_for_file(meta.len())
            .ok_or_else(|| IccError::BadSchema {
                identifier: identifier.to_string(),
                file_size: meta.len(),
                capacity: cfg.capacity,
            })?;

        let mm = MmapFile::open_ro(&path)?;
        let base = mm.as_ptr();
        let mut reader = Self {
            _mm: mm,
            base,
            frame_size,
            slot_size: cfg.slot_size(frame_size),
            mask: cfg.mask(),
            cursor: 0,
        };
        if start == StartPosition::Live {
            reader.cursor = reader.counter().load(Ordering::Acquire);
        }
        Ok(reader)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Last sequence this reader has returned (or its starting point).
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    #[inline(always)]
    fn counter(&self) -> &AtomicU32 {
        // SAFETY: offset 0 of the mapping is the 4-aligned counter word.
        // The mapping is read-only, which is fine: waiting on a futex word
        // only reads it.
        unsafe { &*(self.base as *const AtomicU32) }
    }

    /// Block until a frame newer than the cursor is available, then return
    /// an owned copy of it.
    ///
    /// Always returns the *latest* published frame, not the next
    /// sequential one; intermediate frames the writer lapped past are
    /// reported through [`RingMessage::missed`]. On cancellation the
    /// cursor is untouched and [`IccError::Cancelled`] is returned.
    pub fn read(&mut self, cancel: &CancelToken) -> Result<RingMessage, IccError> {
        loop {
            if cancel.is_cancelled() {
                return Err(IccError::Cancelled);
            }

            let cur = self.counter().load(Ordering::Acquire);
            if cur <= self.cursor {
                // Nothing new (or a spurious wake). Compare-and-sleep on
                // the counter word; the kernel refuses to park us if the
                // value already moved.
                futex::wait(self.counter(), cur, Some(WAIT_SLICE));
                continue;
            }

            let idx = seq_to_slot(cur, self.mask) as usize;
            let mut payload = vec![0u8; self.frame_size];

            // SAFETY: idx is masked into capacity. Slot fields may be
            // unaligned (stride 16 + frame size), hence unaligned reads.
            // The acquire load of the counter above ordered these reads
            // after the writer's stores for sequence `cur`.
            let recv_ts_ns = unsafe {
                let slot = self.base.add(FILE_HEADER_SIZE + idx * self.slot_size);
                let ts = ptr::read_unaligned(slot as *const u64);
                ptr::copy_nonoverlapping(
                    slot.add(SLOT_HEADER_SIZE),
                    payload.as_mut_ptr(),
                    self.frame_size,
                );
                ts
            };

            // Re-read the slot's target sequence after the copy. If the
            // writer wrapped the ring and reused this slot mid-copy, the
            // target no longer equals `cur` and the torn copy is discarded.
            fence(Ordering::Acquire);
            let target = unsafe {
                let slot = self.base.add(FILE_HEADER_SIZE + idx * self.slot_size);
                ptr::read_unaligned(slot.add(SLOT_SEQ_OFFSET) as *const u32)
            };
            if target != cur {
                continue;
            }

            let missed = cur.wrapping_sub(self.cursor).wrapping_sub(1);
            self.cursor = cur;
            return Ok(RingMessage {
                payload,
                recv_ts_ns,
                seq: cur,
                missed,
            });
        }
    }
}

fn fs_metadata(path: &Path, identifier: &str) -> Result<std::fs::Metadata, IccError> {
    std::fs::metadata(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            IccError::NotReady {
                identifier: identifier.to_string(),
                source: e,
            }
        } else {
            IccError::Io(e)
        }
    })
}
