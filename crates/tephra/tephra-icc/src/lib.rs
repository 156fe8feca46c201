//! `tephra-icc`: Inter-process communication primitives for Tephra.
//!
//! This crate provides the shared-memory transport that carries telemetry
//! frames from the ground-station service to every consumer on the host:
//! - Single-writer, multi-reader broadcast over a memory-mapped ring file
//! - One ring file per telemetry stream, keyed by UDP port
//! - Futex-based wakeups so readers sleep between frames
//!
//! # Core Components
//!
//! - [`RingWriter`]: creates a ring file and publishes frames into it
//! - [`RingReader`]: follows an existing ring file, one cursor per reader
//! - [`TelemetryStream`]: the port-keyed facade downstream consumers use
//! - [`CancelToken`]: cooperative cancellation for every blocking wait
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐      <shm_dir>/scoria-service-<port>     ┌────────────┐
//! │ RingWriter │ ──────────────────────────────────────── │ RingReader │
//! │ (service)  │             (mmap region)                │ (process B)│
//! └────────────┘                                          └────────────┘
//!                                                         ┌────────────┐
//!                                                         │ RingReader │
//!                                                         │ (process C)│
//!                                                         └────────────┘
//! ```
//!
//! The writer is wait-free: it never blocks on readers, and a reader that
//! stalls or dies only loses frames for itself. Loss is observable through
//! the sequence numbers carried on every message.
//!
//! # Internal Modules
//!
//! - `layout`: binary layout of the ring file and size arithmetic
//! - `writer` / `reader`: the publish and await-next protocols
//! - `futex`: thin wrapper over the Linux futex syscall
//! - `stream`: the port-keyed reader facade
//! - `cancel`: cancellation token shared by all blocking operations
//! - `clock`: epoch-nanosecond capture timestamps

mod cancel;
mod clock;
mod error;
mod futex;
mod layout;
mod reader;
mod stream;
mod writer;

pub use cancel::CancelToken;
pub use clock::epoch_ns;
pub use error::IccError;
pub use layout::{
    RingConfig, SHM_FILE_PREFIX, TELEMETRY_CONFIG_KEY, TELEMETRY_RING_CAPACITY, ring_path,
};
pub use reader::{RingMessage, RingReader, StartPosition};
pub use stream::TelemetryStream;
pub use writer::RingWriter;
