//! I/O operation lifecycle.
//!
//! An [`IoOp`] wraps one native backend operation and enforces its state
//! machine:
//!
//! ```text
//! Init ──submit──▶ Submitted ──wait──▶ Completed | Failed
//!   │                                        │
//!   └────────────────finalize────────────────┴──▶ Finalized
//! ```
//!
//! Finalizing an operation that is still in flight is a programming error and
//! panics. Dropping an operation finalizes it.

use crate::error::{CoreError, CoreResult};
use crate::object::ObjectHandle;
use dsal_storage::{BackendOp, CompletionCallback, IoOpKind, IoVec, ObjectId};
use std::fmt;

/// Lifecycle state of an [`IoOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpState {
    /// Bound to a native operation, not yet issued.
    Init,
    /// Handed to the backend.
    Submitted,
    /// Terminal, succeeded.
    Completed,
    /// Terminal, failed.
    Failed,
    /// Native resources released.
    Finalized,
}

impl fmt::Display for OpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Submitted => "submitted",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// One outstanding I/O operation against an open object.
///
/// The operation borrows the object handle and every buffer in its vector for
/// its whole lifetime, so the buffers cannot be touched before it is
/// finalized.
///
/// # Example
///
/// ```rust
/// use dsal_core::{IoOp, Store};
/// use dsal_storage::{IoOpKind, IoVec, RequestCtx};
///
/// let store = Store::open_in_memory().unwrap();
/// let oid = store.create(&RequestCtx::default()).unwrap();
/// let obj = store.open_object(oid).unwrap();
///
/// let data = vec![7u8; 4096];
/// let mut op = IoOp::init(&obj, IoOpKind::Write, IoVec::write(0, &data), None).unwrap();
/// op.submit().unwrap();
/// op.wait().unwrap();
/// op.finalize();
/// ```
pub struct IoOp<'a> {
    oid: ObjectId,
    kind: IoOpKind,
    state: OpState,
    native: Option<Box<dyn BackendOp + 'a>>,
}

impl<'a> IoOp<'a> {
    /// Creates an operation of `kind` over `vec`.
    ///
    /// The callback, if given, is invoked exactly once with the final result
    /// code before [`IoOp::wait`] can observe completion.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if the vector is malformed or does
    /// not match `kind`, and out of memory if the backend cannot allocate the
    /// native operation. No operation exists on failure.
    pub fn init(
        obj: &'a ObjectHandle,
        kind: IoOpKind,
        vec: IoVec<'a>,
        callback: Option<CompletionCallback>,
    ) -> CoreResult<Self> {
        let vec_kind = vec.validate()?;
        if vec_kind != kind {
            return Err(CoreError::invalid_argument(format!(
                "{kind} operation over a {vec_kind} vector"
            )));
        }
        let native = obj.backend_object()?.init_op(kind, vec, callback)?;
        tracing::trace!(oid = %obj.id(), %kind, "initialized operation");
        Ok(Self {
            oid: obj.id(),
            kind,
            state: OpState::Init,
            native: Some(native),
        })
    }

    /// Creates an operation from a raw kind code.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for an unknown kind, otherwise as
    /// [`IoOp::init`].
    pub fn init_raw(
        obj: &'a ObjectHandle,
        raw_kind: u32,
        vec: IoVec<'a>,
        callback: Option<CompletionCallback>,
    ) -> CoreResult<Self> {
        let kind = IoOpKind::try_from(raw_kind)?;
        Self::init(obj, kind, vec, callback)
    }

    /// Initializes and submits a write.
    ///
    /// # Errors
    ///
    /// Returns the init or submit error; partial state is released.
    pub fn write(obj: &'a ObjectHandle, vec: IoVec<'a>) -> CoreResult<Self> {
        Self::start(obj, IoOpKind::Write, vec)
    }

    /// Initializes and submits a read.
    ///
    /// # Errors
    ///
    /// Returns the init or submit error; partial state is released.
    pub fn read(obj: &'a ObjectHandle, vec: IoVec<'a>) -> CoreResult<Self> {
        Self::start(obj, IoOpKind::Read, vec)
    }

    fn start(obj: &'a ObjectHandle, kind: IoOpKind, vec: IoVec<'a>) -> CoreResult<Self> {
        let mut op = Self::init(obj, kind, vec, None)?;
        op.submit()?;
        Ok(op)
    }

    /// Returns the operation kind.
    #[must_use]
    pub fn kind(&self) -> IoOpKind {
        self.kind
    }

    /// Returns the target object.
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.oid
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> OpState {
        self.state
    }

    /// Returns true once the backend reached a terminal state.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self.state {
            OpState::Init => false,
            OpState::Submitted => self.native.as_ref().is_some_and(|op| op.is_complete()),
            OpState::Completed | OpState::Failed | OpState::Finalized => true,
        }
    }

    /// Hands the operation to the backend.
    ///
    /// # Panics
    ///
    /// Panics if the operation was already submitted.
    ///
    /// # Errors
    ///
    /// Returns the backend launch error; the operation is then failed.
    pub fn submit(&mut self) -> CoreResult<()> {
        assert_eq!(
            self.state,
            OpState::Init,
            "submit of an operation in state {}",
            self.state
        );
        let native = self.native_mut();
        match native.submit() {
            Ok(()) => {
                self.state = OpState::Submitted;
                tracing::trace!(oid = %self.oid, kind = %self.kind, "submitted operation");
                Ok(())
            }
            Err(err) => {
                self.state = OpState::Failed;
                Err(err.into())
            }
        }
    }

    /// Blocks until the operation is terminal and returns its result.
    ///
    /// # Panics
    ///
    /// Panics unless the operation is submitted and not yet waited on.
    ///
    /// # Errors
    ///
    /// Returns the error the operation failed with.
    pub fn wait(&mut self) -> CoreResult<()> {
        assert_eq!(
            self.state,
            OpState::Submitted,
            "wait on an operation in state {}",
            self.state
        );
        let result = self.native_mut().wait();
        self.state = if result.is_ok() {
            OpState::Completed
        } else {
            OpState::Failed
        };
        tracing::trace!(oid = %self.oid, kind = %self.kind, state = %self.state, "operation finished");
        result.map_err(Into::into)
    }

    /// Releases the native operation.
    ///
    /// # Panics
    ///
    /// Panics if the operation was submitted and has not completed.
    pub fn finalize(mut self) {
        if self.state == OpState::Submitted {
            assert!(self.is_complete(), "finalize of an in-flight operation");
        }
        self.release();
    }

    fn native_mut(&mut self) -> &mut (dyn BackendOp + 'a) {
        match self.native.as_deref_mut() {
            Some(native) => native,
            None => panic!("operation used after finalize"),
        }
    }

    fn release(&mut self) {
        if let Some(native) = self.native.take() {
            native.finalize();
            self.state = OpState::Finalized;
        }
    }
}

impl Drop for IoOp<'_> {
    fn drop(&mut self) {
        if self.state == OpState::Submitted && !self.is_complete() {
            tracing::warn!(oid = %self.oid, kind = %self.kind, "dropping in-flight operation, waiting");
            if let Some(native) = self.native.as_deref_mut() {
                let _ = native.wait();
            }
        }
        self.release();
    }
}

impl fmt::Debug for IoOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoOp")
            .field("oid", &self.oid)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
