//! Native operation shared by the bundled backends.
//!
//! Both bundled backends keep one entry per block, so a single operation type
//! drives them through the [`BlockStore`] seam. The I/O runs inside `submit`
//! on the submitting thread; the outcome goes through the shared
//! [`OpCompletion`] exactly as an asynchronous backend would report it.

use crate::backend::BackendOp;
use crate::completion::{CompletionCallback, OpCompletion};
use crate::error::{StorageError, StorageResult};
use crate::id::ObjectId;
use crate::iovec::{IoBuf, IoOpKind, IoVec};
use std::sync::Arc;

/// Per-block access to one open object.
pub(crate) trait BlockStore: Send + Sync {
    fn oid(&self) -> ObjectId;

    fn block_size(&self) -> usize;

    fn has_block(&self, index: u64) -> StorageResult<bool>;

    /// Fills `dst` with the block; fails with not found if it was never written.
    fn get_block(&self, index: u64, dst: &mut [u8]) -> StorageResult<()>;

    fn put_block(&self, index: u64, src: &[u8]) -> StorageResult<()>;

    /// Removes the block. Removing a missing block succeeds.
    fn remove_block(&self, index: u64) -> StorageResult<()>;
}

/// Validates `vec` against `kind` and the block size and wraps it in an op.
pub(crate) fn init_block_op<'a, S: BlockStore>(
    store: &'a S,
    kind: IoOpKind,
    vec: IoVec<'a>,
    callback: Option<CompletionCallback>,
) -> StorageResult<Box<dyn BackendOp + 'a>> {
    let vec_kind = vec.validate()?;
    if vec_kind != kind {
        return Err(StorageError::invalid_argument(format!(
            "{kind} operation given {vec_kind} segments"
        )));
    }
    vec.check_aligned(store.block_size())?;

    Ok(Box::new(BlockOp {
        store,
        kind,
        vec,
        completion: OpCompletion::new(callback),
        submitted: false,
    }))
}

struct BlockOp<'a, S> {
    store: &'a S,
    kind: IoOpKind,
    vec: IoVec<'a>,
    completion: Arc<OpCompletion>,
    submitted: bool,
}

impl<S: BlockStore> BlockOp<'_, S> {
    fn execute(&mut self) -> StorageResult<()> {
        let bs = self.store.block_size();
        let bs64 = bs as u64;

        match self.kind {
            IoOpKind::Read => {
                // Object stores fail the whole read when any block is a hole.
                for segment in self.vec.segments() {
                    for (offset, _) in segment.blocks(bs) {
                        if !self.store.has_block(offset / bs64)? {
                            return Err(StorageError::BlockNotFound {
                                oid: self.store.oid(),
                                offset,
                            });
                        }
                    }
                }
                for segment in self.vec.segments_mut() {
                    let base = segment.offset;
                    if let IoBuf::Read(buf) = &mut segment.buf {
                        for (i, chunk) in buf.chunks_mut(bs).enumerate() {
                            let offset = base + (i * bs) as u64;
                            self.store.get_block(offset / bs64, chunk)?;
                        }
                    }
                }
            }
            IoOpKind::Write => {
                for segment in self.vec.segments() {
                    if let IoBuf::Write(buf) = &segment.buf {
                        for (i, chunk) in buf.chunks(bs).enumerate() {
                            let offset = segment.offset + (i * bs) as u64;
                            self.store.put_block(offset / bs64, chunk)?;
                        }
                    }
                }
            }
            IoOpKind::Free => {
                for segment in self.vec.segments() {
                    for (offset, _) in segment.blocks(bs) {
                        self.store.remove_block(offset / bs64)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<S: BlockStore> BackendOp for BlockOp<'_, S> {
    fn submit(&mut self) -> StorageResult<()> {
        if self.submitted {
            return Err(StorageError::invalid_argument("operation already submitted"));
        }
        self.submitted = true;

        tracing::trace!(
            oid = %self.store.oid(),
            kind = %self.kind,
            segments = self.vec.len(),
            bytes = self.vec.total_len(),
            "executing block operation"
        );
        let result = self.execute();
        if let Err(err) = &result {
            tracing::trace!(oid = %self.store.oid(), kind = %self.kind, code = err.code(), "block operation failed");
        }
        self.completion.complete(result);
        Ok(())
    }

    fn wait(&mut self) -> StorageResult<()> {
        if !self.submitted {
            return Err(StorageError::invalid_argument("wait on an unsubmitted operation"));
        }
        self.completion.wait()
    }

    fn is_complete(&self) -> bool {
        self.completion.is_complete()
    }

    fn finalize(self: Box<Self>) {
        tracing::trace!(oid = %self.store.oid(), kind = %self.kind, "finalizing block operation");
    }
}
