use std::io;

/// Errors surfaced by the shared-memory transport.
///
/// Transient data-path conditions (a torn slot copy, a spurious futex wake)
/// are absorbed inside the read loop and never become error values; what is
/// left is the taxonomy callers actually branch on.
#[derive(Debug, thiserror::Error)]
pub enum IccError {
    /// The ring file does not exist. The service is not running yet.
    #[error("shared memory segment '{identifier}' not found (is the service running?)")]
    NotReady {
        identifier: String,
        #[source]
        source: io::Error,
    },

    /// The ring file exists but its size does not match a valid slot layout.
    #[error("shared memory segment '{identifier}' has size {file_size}, which is not a valid ring layout for capacity {capacity}")]
    BadSchema {
        identifier: String,
        file_size: u64,
        capacity: usize,
    },

    /// The blocking operation was aborted by a cancellation signal.
    /// The reader cursor is unchanged.
    #[error("operation cancelled")]
    Cancelled,

    /// Payload length handed to the writer does not match the ring's frame size.
    #[error("payload of {got} bytes does not match ring frame size {expected}")]
    FrameSize { expected: usize, got: usize },

    /// Unrecoverable OS failure (file creation, truncation, mmap).
    #[error("shared memory I/O failed")]
    Io(#[from] io::Error),
}
