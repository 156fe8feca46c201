//! Port-keyed facade over [`RingReader`].
//!
//! Every downstream process — viewers, database forwarders, bridge
//! producers — follows a telemetry stream through exactly this interface;
//! none of them touches the ring layout directly.

use crate::cancel::CancelToken;
use crate::error::IccError;
use crate::layout::RingConfig;
use crate::reader::{RingMessage, RingReader, StartPosition};
use std::path::Path;

/// A blocking follower of one telemetry port's stream.
pub struct TelemetryStream {
    reader: RingReader,
    port: u16,
}

impl TelemetryStream {
    /// Attach to the ring for `port` in live (tail-follow) mode.
    pub fn open(shm_dir: &Path, port: u16) -> Result<Self, IccError> {
        Self::open_from(shm_dir, port, StartPosition::Live)
    }

    /// Attach with an explicit start position; `StartPosition::Origin` also
    /// returns a frame that was already current when the stream opened.
    pub fn open_from(
        shm_dir: &Path,
        port: u16,
        start: StartPosition,
    ) -> Result<Self, IccError> {
        let reader = RingReader::open(
            shm_dir,
            &port.to_string(),
            RingConfig::telemetry(),
            start,
        )?;
        Ok(Self { reader, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Frame size of this stream, recovered from the ring file.
    pub fn frame_size(&self) -> usize {
        self.reader.frame_size()
    }

    /// Block until the next frame (or cancellation). The returned message
    /// owns its payload; `missed` carries the loss observed since the last
    /// returned frame.
    pub fn read(&mut self, cancel: &CancelToken) -> Result<RingMessage, IccError> {
        self.reader.read(cancel)
    }
}
