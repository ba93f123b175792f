//! Fault-injecting backend wrapper.
//!
//! Wraps any backend, counts the operations issued through it, and fails
//! selected operations with a chosen error code. Used to check how errors
//! propagate through the translation layer.

use dsal_storage::{
    BackendObject, BackendOp, CompletionCallback, IoOpKind, IoVec, ObjectBackend, ObjectId,
    OpCompletion, RequestCtx, StorageError, StorageResult,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// Kind of operation to fail.
    pub kind: IoOpKind,
    /// Only fail operations with a segment starting at this byte offset.
    pub offset: Option<u64>,
    /// Error code to complete with (sign is normalized to negative).
    pub code: i32,
}

impl Fault {
    fn matches(&self, kind: IoOpKind, vec: &IoVec<'_>) -> bool {
        if self.kind != kind {
            return false;
        }
        match self.offset {
            None => true,
            Some(offset) => vec.segments().iter().any(|s| s.offset == offset),
        }
    }
}

#[derive(Debug, Default)]
struct FaultState {
    faults: Vec<Fault>,
    issued: HashMap<IoOpKind, usize>,
    injected: usize,
}

/// A backend wrapper that injects failures into I/O operations.
///
/// # Example
///
/// ```rust
/// use dsal_storage::{InMemoryBackend, IoOpKind};
/// use dsal_testkit::FaultyBackend;
/// use std::sync::Arc;
///
/// let backend = FaultyBackend::new(Arc::new(InMemoryBackend::new()));
/// backend.fail(IoOpKind::Write, -5);
/// assert_eq!(backend.issued(IoOpKind::Write), 0);
/// ```
#[derive(Clone)]
pub struct FaultyBackend {
    inner: Arc<dyn ObjectBackend>,
    state: Arc<Mutex<FaultState>>,
}

impl FaultyBackend {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ObjectBackend>) -> Self {
        Self {
            inner,
            state: Arc::default(),
        }
    }

    /// Fails every operation of `kind` with `code`.
    pub fn fail(&self, kind: IoOpKind, code: i32) {
        self.inject(Fault {
            kind,
            offset: None,
            code,
        });
    }

    /// Fails operations of `kind` with a segment starting at `offset`.
    pub fn fail_at(&self, kind: IoOpKind, offset: u64, code: i32) {
        self.inject(Fault {
            kind,
            offset: Some(offset),
            code,
        });
    }

    /// Adds a fault rule.
    pub fn inject(&self, fault: Fault) {
        self.state.lock().faults.push(fault);
    }

    /// Removes all fault rules.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Returns how many operations of `kind` were initialized.
    pub fn issued(&self, kind: IoOpKind) -> usize {
        self.state.lock().issued.get(&kind).copied().unwrap_or(0)
    }

    /// Returns how many operations were failed by injection.
    pub fn injected(&self) -> usize {
        self.state.lock().injected
    }

    /// Resets the operation counters.
    pub fn reset_counts(&self) {
        let mut state = self.state.lock();
        state.issued.clear();
        state.injected = 0;
    }
}

impl ObjectBackend for FaultyBackend {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn new_id(&self) -> ObjectId {
        self.inner.new_id()
    }

    fn create(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()> {
        self.inner.create(ctx, oid)
    }

    fn delete(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()> {
        self.inner.delete(ctx, oid)
    }

    fn open(&self, oid: ObjectId) -> StorageResult<Box<dyn BackendObject>> {
        Ok(Box::new(FaultyObject {
            inner: self.inner.open(oid)?,
            state: Arc::clone(&self.state),
        }))
    }

    fn block_size(&self, oid: ObjectId) -> StorageResult<usize> {
        self.inner.block_size(oid)
    }

    fn shutdown(&self) -> StorageResult<()> {
        self.inner.shutdown()
    }
}

struct FaultyObject {
    inner: Box<dyn BackendObject>,
    state: Arc<Mutex<FaultState>>,
}

impl BackendObject for FaultyObject {
    fn id(&self) -> ObjectId {
        self.inner.id()
    }

    fn init_op<'a>(
        &'a self,
        kind: IoOpKind,
        vec: IoVec<'a>,
        callback: Option<CompletionCallback>,
    ) -> StorageResult<Box<dyn BackendOp + 'a>> {
        let fault = {
            let mut state = self.state.lock();
            *state.issued.entry(kind).or_insert(0) += 1;
            let fault = state.faults.iter().find(|f| f.matches(kind, &vec)).copied();
            if fault.is_some() {
                state.injected += 1;
            }
            fault
        };

        match fault {
            Some(fault) => {
                vec.validate()?;
                Ok(Box::new(InjectedOp {
                    code: fault.code,
                    completion: OpCompletion::new(callback),
                }))
            }
            None => self.inner.init_op(kind, vec, callback),
        }
    }

    fn close(self: Box<Self>) -> StorageResult<()> {
        self.inner.close()
    }
}

struct InjectedOp {
    code: i32,
    completion: Arc<OpCompletion>,
}

impl BackendOp for InjectedOp {
    fn submit(&mut self) -> StorageResult<()> {
        self.completion
            .complete(Err(StorageError::backend(self.code, "injected fault")));
        Ok(())
    }

    fn wait(&mut self) -> StorageResult<()> {
        self.completion.wait()
    }

    fn is_complete(&self) -> bool {
        self.completion.is_complete()
    }

    fn finalize(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsal_storage::InMemoryBackend;

    #[test]
    fn counts_and_fails_by_kind() {
        let backend = FaultyBackend::new(Arc::new(InMemoryBackend::with_block_size(16)));
        let oid = backend.new_id();
        backend.create(&RequestCtx::default(), oid).unwrap();
        let obj = backend.open(oid).unwrap();

        backend.fail(IoOpKind::Write, libc::EIO);
        let data = [0u8; 16];
        let mut op = obj
            .init_op(IoOpKind::Write, IoVec::write(0, &data), None)
            .unwrap();
        op.submit().unwrap();
        assert_eq!(op.wait().unwrap_err().code(), -libc::EIO);
        op.finalize();

        assert_eq!(backend.issued(IoOpKind::Write), 1);
        assert_eq!(backend.injected(), 1);

        backend.clear_faults();
        let mut op = obj
            .init_op(IoOpKind::Write, IoVec::write(0, &data), None)
            .unwrap();
        op.submit().unwrap();
        op.wait().unwrap();
        op.finalize();
        assert_eq!(backend.issued(IoOpKind::Write), 2);
    }

    #[test]
    fn offset_faults_only_hit_matching_ops() {
        let backend = FaultyBackend::new(Arc::new(InMemoryBackend::with_block_size(16)));
        backend.fail_at(IoOpKind::Read, 32, -libc::EIO);
        let fault = Fault {
            kind: IoOpKind::Read,
            offset: Some(32),
            code: -libc::EIO,
        };
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        assert!(fault.matches(IoOpKind::Read, &IoVec::read(32, &mut a)));
        assert!(!fault.matches(IoOpKind::Read, &IoVec::read(0, &mut b)));
        assert!(!fault.matches(IoOpKind::Write, &IoVec::write(32, &[0u8; 16])));
    }
}
