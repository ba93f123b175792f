//! In-memory object backend for testing.

use crate::backend::{BackendObject, BackendOp, ObjectBackend, RequestCtx};
use crate::block_op::{init_block_op, BlockStore};
use crate::completion::CompletionCallback;
use crate::error::{StorageError, StorageResult};
use crate::id::ObjectId;
use crate::iovec::{IoOpKind, IoVec};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Default block size of the in-memory backend.
pub const DEFAULT_MEMORY_BLOCK_SIZE: usize = 4096;

type BlockMap = Arc<RwLock<HashMap<u64, Box<[u8]>>>>;

/// An in-memory object backend.
///
/// Objects are maps from block index to block bytes. Like a real object
/// store, a read fails with not found when any block in it was never written.
///
/// # Thread Safety
///
/// The backend is thread-safe and cheap to clone; clones share objects.
///
/// # Example
///
/// ```rust
/// use dsal_storage::{InMemoryBackend, ObjectBackend, RequestCtx};
///
/// let backend = InMemoryBackend::new();
/// let oid = backend.new_id();
/// backend.create(&RequestCtx::default(), oid).unwrap();
/// assert!(backend.contains(oid));
/// assert_eq!(backend.block_size(oid).unwrap(), 4096);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    block_size: usize,
    objects: Arc<RwLock<HashMap<ObjectId, BlockMap>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend with the default block size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_MEMORY_BLOCK_SIZE)
    }

    /// Creates an empty backend with the given block size.
    ///
    /// A zero block size is accepted here and rejected on first I/O.
    #[must_use]
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size,
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns true if the object exists.
    #[must_use]
    pub fn contains(&self, oid: ObjectId) -> bool {
        self.objects.read().contains_key(&oid)
    }

    /// Returns the number of objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns the sorted indexes of the written blocks of an object.
    ///
    /// Useful for checking which blocks an operation touched.
    #[must_use]
    pub fn written_blocks(&self, oid: ObjectId) -> Option<Vec<u64>> {
        let objects = self.objects.read();
        let blocks = objects.get(&oid)?;
        let mut indexes: Vec<u64> = blocks.read().keys().copied().collect();
        indexes.sort_unstable();
        Some(indexes)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn new_id(&self) -> ObjectId {
        ObjectId::new()
    }

    fn create(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()> {
        let mut objects = self.objects.write();
        if objects.contains_key(&oid) {
            return Err(StorageError::AlreadyExists { oid });
        }
        objects.insert(oid, Arc::default());
        tracing::debug!(%ctx, %oid, "created object");
        Ok(())
    }

    fn delete(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()> {
        if self.objects.write().remove(&oid).is_none() {
            tracing::warn!(%ctx, %oid, "delete of missing object");
            return Err(StorageError::ObjectNotFound { oid });
        }
        tracing::debug!(%ctx, %oid, "deleted object");
        Ok(())
    }

    fn open(&self, oid: ObjectId) -> StorageResult<Box<dyn BackendObject>> {
        let blocks = self
            .objects
            .read()
            .get(&oid)
            .cloned()
            .ok_or(StorageError::ObjectNotFound { oid })?;
        Ok(Box::new(MemoryObject {
            oid,
            block_size: self.block_size,
            blocks,
        }))
    }

    fn block_size(&self, oid: ObjectId) -> StorageResult<usize> {
        if !self.contains(oid) {
            return Err(StorageError::ObjectNotFound { oid });
        }
        Ok(self.block_size)
    }
}

#[derive(Debug)]
struct MemoryObject {
    oid: ObjectId,
    block_size: usize,
    blocks: BlockMap,
}

impl BlockStore for MemoryObject {
    fn oid(&self) -> ObjectId {
        self.oid
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn has_block(&self, index: u64) -> StorageResult<bool> {
        Ok(self.blocks.read().contains_key(&index))
    }

    fn get_block(&self, index: u64, dst: &mut [u8]) -> StorageResult<()> {
        let blocks = self.blocks.read();
        let block = blocks.get(&index).ok_or(StorageError::BlockNotFound {
            oid: self.oid,
            offset: index * self.block_size as u64,
        })?;
        dst.copy_from_slice(&block[..dst.len()]);
        Ok(())
    }

    fn put_block(&self, index: u64, src: &[u8]) -> StorageResult<()> {
        self.blocks.write().insert(index, src.into());
        Ok(())
    }

    fn remove_block(&self, index: u64) -> StorageResult<()> {
        self.blocks.write().remove(&index);
        Ok(())
    }
}

impl BackendObject for MemoryObject {
    fn id(&self) -> ObjectId {
        self.oid
    }

    fn init_op<'a>(
        &'a self,
        kind: IoOpKind,
        vec: IoVec<'a>,
        callback: Option<CompletionCallback>,
    ) -> StorageResult<Box<dyn BackendOp + 'a>> {
        init_block_op(self, kind, vec, callback)
    }

    fn close(self: Box<Self>) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_object() -> (InMemoryBackend, ObjectId) {
        let backend = InMemoryBackend::with_block_size(16);
        let oid = backend.new_id();
        backend.create(&RequestCtx::default(), oid).unwrap();
        (backend, oid)
    }

    fn run(obj: &dyn BackendObject, kind: IoOpKind, vec: IoVec<'_>) -> StorageResult<()> {
        let mut op = obj.init_op(kind, vec, None)?;
        op.submit()?;
        let result = op.wait();
        assert!(op.is_complete());
        op.finalize();
        result
    }

    #[test]
    fn memory_create_twice_fails() {
        let (backend, oid) = backend_with_object();
        let err = backend.create(&RequestCtx::default(), oid).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[test]
    fn memory_delete_missing_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend
            .delete(&RequestCtx::new(7), ObjectId::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn memory_open_missing_is_not_found() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.open(ObjectId::new()),
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn memory_write_then_read() {
        let (backend, oid) = backend_with_object();
        let obj = backend.open(oid).unwrap();

        let data: Vec<u8> = (0..32).collect();
        run(obj.as_ref(), IoOpKind::Write, IoVec::write(16, &data)).unwrap();
        assert_eq!(backend.written_blocks(oid).unwrap(), vec![1, 2]);

        let mut out = vec![0u8; 32];
        run(obj.as_ref(), IoOpKind::Read, IoVec::read(16, &mut out)).unwrap();
        assert_eq!(out, data);
        obj.close().unwrap();
    }

    #[test]
    fn memory_read_with_hole_fails_whole_range() {
        let (backend, oid) = backend_with_object();
        let obj = backend.open(oid).unwrap();

        run(obj.as_ref(), IoOpKind::Write, IoVec::write(0, &[9u8; 16])).unwrap();

        let mut out = vec![0xFFu8; 32];
        let err = run(obj.as_ref(), IoOpKind::Read, IoVec::read(0, &mut out)).unwrap_err();
        assert!(matches!(err, StorageError::BlockNotFound { offset: 16, .. }));
        assert!(out.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn memory_free_removes_blocks() {
        let (backend, oid) = backend_with_object();
        let obj = backend.open(oid).unwrap();

        run(obj.as_ref(), IoOpKind::Write, IoVec::write(0, &[1u8; 48])).unwrap();
        run(obj.as_ref(), IoOpKind::Free, IoVec::free(16, 16)).unwrap();
        assert_eq!(backend.written_blocks(oid).unwrap(), vec![0, 2]);
    }

    #[test]
    fn memory_rejects_unaligned_ops() {
        let (backend, oid) = backend_with_object();
        let obj = backend.open(oid).unwrap();
        let data = [0u8; 10];
        let err = obj
            .init_op(IoOpKind::Write, IoVec::write(3, &data), None)
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn memory_rejects_kind_mismatch() {
        let (backend, oid) = backend_with_object();
        let obj = backend.open(oid).unwrap();
        let data = [0u8; 16];
        assert!(obj
            .init_op(IoOpKind::Read, IoVec::write(0, &data), None)
            .is_err());
    }

    #[test]
    fn memory_double_submit_fails() {
        let (backend, oid) = backend_with_object();
        let obj = backend.open(oid).unwrap();
        let data = [0u8; 16];
        let mut op = obj
            .init_op(IoOpKind::Write, IoVec::write(0, &data), None)
            .unwrap();
        op.submit().unwrap();
        assert!(op.submit().is_err());
        op.wait().unwrap();
        op.finalize();
    }

    #[test]
    fn memory_clones_share_objects() {
        let (backend, oid) = backend_with_object();
        let clone = backend.clone();
        assert!(clone.contains(oid));
        clone.delete(&RequestCtx::default(), oid).unwrap();
        assert!(!backend.contains(oid));
        assert_eq!(backend.object_count(), 0);
    }
}
