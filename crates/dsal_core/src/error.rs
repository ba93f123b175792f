//! Error types for DSAL core.

use dsal_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in DSAL core operations.
///
/// Every error reduces to a single negative errno through [`CoreError::code`],
/// with backend codes passed through unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The request was malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A staging or zero-fill buffer could not be allocated.
    #[error("out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Size of the failed allocation.
        size: usize,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the negative errno-style code for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Storage(err) => err.code(),
            Self::InvalidArgument { .. } => -libc::EINVAL,
            Self::OutOfMemory { .. } => -libc::ENOMEM,
            Self::InvalidOperation { .. } => -libc::EPERM,
        }
    }

    /// Returns true if the error means "absent".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_codes_pass_through() {
        let err: CoreError = StorageError::backend(-libc::EROFS, "read only").into();
        assert_eq!(err.code(), -libc::EROFS);
    }

    #[test]
    fn layer_codes() {
        assert_eq!(CoreError::invalid_argument("x").code(), -libc::EINVAL);
        assert_eq!(CoreError::OutOfMemory { size: 8 }.code(), -libc::ENOMEM);
        assert_eq!(CoreError::invalid_operation("x").code(), -libc::EPERM);
    }

    #[test]
    fn not_found_only_from_storage() {
        let oid = dsal_storage::ObjectId::new();
        assert!(CoreError::from(StorageError::ObjectNotFound { oid }).is_not_found());
        assert!(!CoreError::invalid_argument("x").is_not_found());
    }
}
