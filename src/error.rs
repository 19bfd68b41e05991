//! Error types for the alert registry.

use thiserror::Error;

/// Errors returned by registry operations.
///
/// Snapshot failures during ordinary mutations are logged, not returned;
/// the `Snapshot` variant only comes back from `AlertRegistry::save_now`.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Caller supplied a malformed record or argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Snapshot read or write failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors from reading or writing the snapshot file.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// File contents are not a valid snapshot.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
    /// Alerts could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Stored checksum does not match the alert payload.
    #[error("checksum mismatch: stored={expected}, computed={actual}")]
    ChecksumMismatch {
        /// Checksum recorded in the file.
        expected: String,
        /// Checksum computed from the decoded alerts.
        actual: String,
    },
    /// Snapshot was written by an incompatible schema version.
    #[error("unsupported snapshot schema version: {0}")]
    UnsupportedSchema(String),
}
