//! Error types for backend operations.

use crate::id::ObjectId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during backend operations.
///
/// Every variant maps onto a negative OS-style error code through
/// [`StorageError::code`]. A code of `-ENOENT` is the backend's signal that an
/// object or block has never been written.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The request was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A buffer or operation object could not be allocated.
    #[error("out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Size of the failed allocation.
        size: usize,
    },

    /// The object does not exist.
    #[error("object {oid} not found")]
    ObjectNotFound {
        /// The missing object.
        oid: ObjectId,
    },

    /// A block within an existing object was never written.
    #[error("block at offset {offset} of object {oid} not found")]
    BlockNotFound {
        /// The object being read.
        oid: ObjectId,
        /// Byte offset of the missing block.
        offset: u64,
    },

    /// An object with the same identifier already exists.
    #[error("object {oid} already exists")]
    AlreadyExists {
        /// The conflicting object.
        oid: ObjectId,
    },

    /// The storage root is held by another process.
    #[error("storage root locked: {}", path.display())]
    Locked {
        /// Root directory of the backend.
        path: PathBuf,
    },

    /// Opaque failure reported by a backend, carried with its native code.
    #[error("backend error {code}: {message}")]
    Backend {
        /// Negative error code as reported by the backend.
        code: i32,
        /// Description of the failure.
        message: String,
    },
}

impl StorageError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an opaque backend error. Positive codes are negated.
    pub fn backend(code: i32, message: impl Into<String>) -> Self {
        Self::Backend {
            code: -code.abs(),
            message: message.into(),
        }
    }

    /// Returns the negative errno-style code for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Io(err) => match err.raw_os_error() {
                Some(errno) => -errno,
                None if err.kind() == io::ErrorKind::NotFound => -libc::ENOENT,
                None if err.kind() == io::ErrorKind::OutOfMemory => -libc::ENOMEM,
                None => -libc::EIO,
            },
            Self::InvalidArgument(_) => -libc::EINVAL,
            Self::OutOfMemory { .. } => -libc::ENOMEM,
            Self::ObjectNotFound { .. } | Self::BlockNotFound { .. } => -libc::ENOENT,
            Self::AlreadyExists { .. } => -libc::EEXIST,
            Self::Locked { .. } => -libc::EWOULDBLOCK,
            Self::Backend { code, .. } => *code,
        }
    }

    /// Returns true if the error means "not written or absent".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code() == -libc::ENOENT
    }
}
