//! Backend plugin interface.

use crate::completion::CompletionCallback;
use crate::error::StorageResult;
use crate::id::ObjectId;
use crate::iovec::{IoOpKind, IoVec};
use std::fmt;

/// Caller context attached to object lifecycle requests.
///
/// The request id is only used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RequestCtx {
    request_id: u64,
}

impl RequestCtx {
    /// Creates a context carrying the given request id.
    #[must_use]
    pub const fn new(request_id: u64) -> Self {
        Self { request_id }
    }

    /// Returns the request id.
    #[must_use]
    pub const fn request_id(&self) -> u64 {
        self.request_id
    }
}

impl fmt::Display for RequestCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.request_id)
    }
}

/// A block-oriented object store.
///
/// Backends only accept **block-aligned** I/O and report never-written blocks
/// as not found (`-ENOENT`) instead of zeros. Translating byte ranges onto this
/// model is the caller's job.
///
/// # Invariants
///
/// - A read fails as a whole with not found if any block in it was never written
/// - Writes and frees cover whole blocks only
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - One file per block on a local filesystem
pub trait ObjectBackend: Send + Sync {
    /// Returns the short name of the backend.
    fn name(&self) -> &'static str;

    /// Generates a fresh object identifier.
    fn new_id(&self) -> ObjectId;

    /// Creates an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::AlreadyExists`] if the object exists.
    fn create(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()>;

    /// Deletes an object and all of its blocks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ObjectNotFound`] if the object does not
    /// exist.
    fn delete(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()>;

    /// Opens an existing object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ObjectNotFound`] if the object does not
    /// exist.
    fn open(&self, oid: ObjectId) -> StorageResult<Box<dyn BackendObject>>;

    /// Returns the block size of an object in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the block size cannot be determined.
    fn block_size(&self, oid: ObjectId) -> StorageResult<usize>;

    /// Releases backend-wide resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down cleanly.
    fn shutdown(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Backend state of one open object.
pub trait BackendObject: Send + Sync {
    /// Returns the identifier of the object.
    fn id(&self) -> ObjectId;

    /// Binds an I/O vector to a new native operation.
    ///
    /// The returned operation borrows both the object and the vector buffers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::InvalidArgument`] if the vector does not
    /// match `kind` or is not block aligned, and
    /// [`crate::StorageError::OutOfMemory`] if the operation cannot be allocated.
    fn init_op<'a>(
        &'a self,
        kind: IoOpKind,
        vec: IoVec<'a>,
        callback: Option<CompletionCallback>,
    ) -> StorageResult<Box<dyn BackendOp + 'a>>;

    /// Closes the object, releasing its backend state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release the object.
    fn close(self: Box<Self>) -> StorageResult<()>;
}

/// A native backend operation.
///
/// The lifecycle is `submit` once, `wait` at most once, then `finalize`.
pub trait BackendOp: Send {
    /// Starts the operation.
    ///
    /// Launch is infallible once `init_op` succeeded; failures of the I/O
    /// itself are reported through the completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation was already submitted.
    fn submit(&mut self) -> StorageResult<()>;

    /// Blocks until the operation is terminal and returns its result.
    ///
    /// # Errors
    ///
    /// Returns the error the operation failed with.
    fn wait(&mut self) -> StorageResult<()>;

    /// Returns true once the operation is terminal.
    fn is_complete(&self) -> bool;

    /// Releases the native operation.
    fn finalize(self: Box<Self>);
}
