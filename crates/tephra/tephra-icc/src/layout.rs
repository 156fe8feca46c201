//! Binary layout of the ring file and its size arithmetic.
//!
//! The layout is fixed so that every consumer on the host, in any process,
//! can map the same file and agree on where things live:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ file header: sequence counter (AtomicU32, the futex word)    │ 8 B
//! ├──────────────────────────────────────────────────────────────┤
//! │ slot[0]: recv_ts_ns (u64) │ target seq (u32) │ pad │ payload │ 16 B + frame
//! ├──────────────────────────────────────────────────────────────┤
//! │ slot[1] ...                                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ slot[R-1]                                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All fields are host-native byte order; the transport is intra-host only.
//! The counter word is the single linearization point: the writer stores it
//! with release semantics after filling a slot, and a reader that loads it
//! with acquire semantics is guaranteed to see that slot's contents.

use std::path::{Path, PathBuf};

/// Bytes reserved at the start of the file: the u32 sequence counter,
/// padded to 8.
pub const FILE_HEADER_SIZE: usize = 8;

/// Bytes of per-slot header: u64 receive timestamp, u32 target sequence,
/// u32 pad.
pub const SLOT_HEADER_SIZE: usize = 16;

/// Offset of the target-sequence word inside a slot header.
pub const SLOT_SEQ_OFFSET: usize = 8;

/// Capacity of every telemetry ring. Sized so a reader that wakes on each
/// message tolerates a backlog on the order of seconds at expected rates.
pub const TELEMETRY_RING_CAPACITY: usize = 256;

/// Fixed name prefix for every ring file the service owns.
pub const SHM_FILE_PREFIX: &str = "scoria-service-";

/// Reserved ring identifier carrying the schema blob (see the config
/// channel). Telemetry rings use the decimal UDP port instead.
pub const TELEMETRY_CONFIG_KEY: &str = "telemetry-config";

/// Per-ring capacity. Must be a power of two so sequence numbers map to
/// slot indices with a mask.
#[derive(Debug, Copy, Clone)]
pub struct RingConfig {
    pub capacity: usize,
}

impl RingConfig {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of 2");
        Self { capacity }
    }

    /// Ring used by every telemetry stream.
    pub fn telemetry() -> Self {
        Self::new(TELEMETRY_RING_CAPACITY)
    }

    /// The degenerate single-slot ring used by the config channel.
    pub fn single_slot() -> Self {
        Self::new(1)
    }

    #[inline(always)]
    pub fn mask(&self) -> u32 {
        (self.capacity as u32) - 1
    }

    /// Stride of one slot for the given frame size.
    #[inline(always)]
    pub fn slot_size(&self, frame_size: usize) -> usize {
        SLOT_HEADER_SIZE + frame_size
    }

    /// Total file size for the given frame size.
    pub fn file_size(&self, frame_size: usize) -> usize {
        FILE_HEADER_SIZE + self.capacity * self.slot_size(frame_size)
    }

    /// Invert [`Self::file_size`]: recover the frame size from an existing
    /// file's length, or `None` when the length does not correspond to any
    /// frame size at this capacity.
    pub fn frame_size_for_file(&self, file_size: u64) -> Option<usize> {
        let slots = (file_size as usize).checked_sub(FILE_HEADER_SIZE)?;
        if slots % self.capacity != 0 {
            return None;
        }
        let slot_size = slots / self.capacity;
        let frame = slot_size.checked_sub(SLOT_HEADER_SIZE)?;
        if frame == 0 { None } else { Some(frame) }
    }
}

/// Map a sequence number to its slot index.
#[inline(always)]
pub fn seq_to_slot(seq: u32, mask: u32) -> u32 {
    seq & mask
}

/// Path of the ring file for a stream identifier (a decimal port, or
/// [`TELEMETRY_CONFIG_KEY`]).
pub fn ring_path(shm_dir: &Path, identifier: &str) -> PathBuf {
    shm_dir.join(format!("{SHM_FILE_PREFIX}{identifier}"))
}
