//! Custom error types for the bci2k-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum Bci2kError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The file is structurally invalid or does not follow the BCI2000 layout.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The `DataFormat=` header field names a sample type this crate cannot decode.
    #[error("Unsupported data format: {0}. Only int16, int32 and float32 are supported.")]
    UnsupportedDataFormat(String),

    /// A buffer has an unexpected size after an operation.
    #[error("Size mismatch for {context}: expected {expected} bytes, but found {found} bytes")]
    SizeMismatch {
        context: &'static str,
        expected: u64,
        found: u64,
    },

    /// The caller passed an argument that can never be valid (bad seek origin,
    /// zero slice step, mask of the wrong shape or length).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A state name that does not exist in the recording or container.
    #[error("State not found: {0}")]
    KeyNotFound(String),

    /// `shape` was requested on a container without any state.
    #[error("State container is empty; it has no sample count")]
    EmptyStates,

    /// The decoder returned fewer samples than a contiguous run required.
    #[error("Short read: expected {expected} samples, but decoder returned {found}")]
    ShortRead { expected: usize, found: usize },

    /// The decoder's file handle was released and the request cannot be
    /// served from the cache.
    #[error("Stream is closed")]
    Closed,
}

/// A convenience `Result` type alias using the crate's `Bci2kError` type.
pub type Result<T> = std::result::Result<T, Bci2kError>;
