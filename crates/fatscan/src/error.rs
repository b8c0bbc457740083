//! Errors and diagnostics produced while decoding a directory tree.
//!
//! [`ScanError`] aborts a build: the image itself cannot be read. [`EntryWarning`] never aborts;
//! it is attached to the entry it describes so the rest of the tree stays visible.

use fatscan_io::ReadError;

/// Errors that abort a directory tree build
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The image is empty, or cannot supply a whole record
    #[error("invalid image at offset {offset:#x}: {reason}")]
    InvalidImage { offset: u64, reason: &'static str },
    /// A read went past the end of the image
    #[error("read of {len}b at offset {offset:#x} is past the end of a {image_len}b image")]
    OutOfRange { offset: u64, len: u64, image_len: u64 },
    #[error(transparent)]
    Io(std::io::Error),
    /// The cancellation flag was raised between two subdirectories
    #[error("directory scan was cancelled")]
    Cancelled,
}

impl From<ReadError> for ScanError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::OutOfRange {
                offset,
                len,
                image_len,
            } => Self::OutOfRange {
                offset,
                len,
                image_len,
            },
            ReadError::Io(error) => Self::Io(error),
        }
    }
}

/// Which timestamp of a short entry a warning refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    Created,
    Accessed,
    Modified,
}

impl core::fmt::Display for TimestampField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Created => "creation",
            Self::Accessed => "last access",
            Self::Modified => "last modification",
        })
    }
}

/// Structural problems that are reported without stopping the scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
    /// A directory or volume label claims a nonzero size
    #[error("entry flagged as directory or volume label has size {size}")]
    NonZeroSize { size: u32 },
    /// Subdirectories nest deeper than the configured limit
    #[error("directory nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },
    /// A subdirectory starts at a cluster whose directory is already in the tree
    #[error("subdirectory at cluster {cluster} is already part of the tree")]
    RevisitedCluster { cluster: u32 },
    /// A subdirectory points at a cluster with no chain
    #[error("subdirectory starts at invalid cluster {cluster}")]
    InvalidStartCluster { cluster: u32 },
    /// The long name fragments do not form the sequence 1..N
    #[error("long name fragments are missing or duplicated")]
    IncompleteLongName,
}

/// Non-fatal problems attached to a decoded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EntryWarning {
    #[error("invalid {field} timestamp (date {date:#06x}, time {time:#06x})")]
    InvalidTimestamp {
        field: TimestampField,
        date: u16,
        time: u16,
    },
    #[error("long name checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    ChecksumMismatch { expected: u8, found: u8 },
    #[error("corrupt directory structure: {0}")]
    CorruptDirectoryStructure(#[from] Corruption),
}
