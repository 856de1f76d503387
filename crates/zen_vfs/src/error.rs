//! Error types for overlay operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. External error types (`std::io::Error`, ZIP errors) are
//! automatically converted via `From` impls.
//!
//! The mount, lookup and integrity variants are the contract surface a front
//! end has to render; the rest come from path parsing, archive loading and I/O.

use crate::archive::ArchiveId;
use crate::mount_table::MountHandle;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mounting, resolving or extracting.
#[derive(Error, Debug)]
pub enum Error {
    /// An archive with the same id is already mounted. The table is unchanged.
    #[error("Archive '{archive}' is already mounted")]
    DuplicateMount { archive: ArchiveId },

    /// The mount handle was never issued by this table or was already unmounted.
    #[error("Unknown mount handle: {0}")]
    UnknownMount(MountHandle),

    /// No archive with this id is mounted.
    #[error("Archive '{0}' is not mounted")]
    NotMounted(ArchiveId),

    /// No mounted archive contains the path.
    #[error("File not present in any mounted data: {0}")]
    NotFound(String),

    /// The path exists only as a file, so it cannot be listed.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// The streamed byte count disagrees with the size recorded in the index.
    #[error(
        "Corrupt entry '{path}' in archive '{archive}': expected {expected} bytes, read {actual}"
    )]
    CorruptEntry {
        path: String,
        archive: ArchiveId,
        expected: u64,
        actual: u64,
    },

    /// The content digest disagrees with the checksum recorded in the index.
    #[error(
        "Checksum mismatch for '{path}' in archive '{archive}': expected {expected:016x}, computed {actual:016x}"
    )]
    ChecksumMismatch {
        path: String,
        archive: ArchiveId,
        expected: u64,
        actual: u64,
    },

    /// The container's own integrity check (the ZIP CRC-32) failed after the
    /// full entry was read. The byte count matched the index.
    #[error("Container checksum mismatch for '{path}' in archive '{archive}'")]
    ContainerChecksumMismatch { path: String, archive: ArchiveId },

    /// A logical path could not be normalized.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Two entries of one archive normalize to the same path.
    #[error("Duplicate entry '{path}' in archive '{archive}'")]
    DuplicateEntry { archive: ArchiveId, path: String },

    /// A content handle does not belong to the archive it was used with.
    #[error("Invalid content handle for archive '{0}'")]
    InvalidHandle(ArchiveId),

    /// No reader exists for this kind of archive file.
    #[error("Unsupported archive: {0}")]
    UnsupportedArchive(Utf8PathBuf),

    /// Extraction was stopped through a [`CancelToken`](crate::extract::CancelToken).
    #[error("Extraction cancelled")]
    Cancelled,

    /// Filesystem I/O failed (reading archives, writing to a sink, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the `zip` crate while indexing or reading a ZIP container.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    /// Whether this error reports damaged archive content.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Error::CorruptEntry { .. }
                | Error::ChecksumMismatch { .. }
                | Error::ContainerChecksumMismatch { .. }
        )
    }
}
