//! Store context.

use crate::config::{BackendConfig, StoreConfig};
use crate::error::{CoreError, CoreResult};
use crate::object::ObjectHandle;
use dsal_storage::{FileBackend, InMemoryBackend, ObjectBackend, ObjectId, RequestCtx};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// An open store.
///
/// The store owns the backend chosen at open time and the layer-wide limits.
/// It is passed explicitly to every call that needs it and is cheap to clone;
/// clones share the same backend.
///
/// # Example
///
/// ```rust
/// use dsal_core::Store;
/// use dsal_storage::RequestCtx;
///
/// let store = Store::open_in_memory().unwrap();
/// let oid = store.create(&RequestCtx::default()).unwrap();
///
/// let obj = store.open_object(oid).unwrap();
/// obj.write(3000, &[b'A'; 100]).unwrap();
///
/// let mut buf = vec![0u8; 4096];
/// obj.read(0, &mut buf).unwrap();
/// assert!(buf[..3000].iter().all(|&b| b == 0));
/// assert!(buf[3000..3100].iter().all(|&b| b == b'A'));
/// obj.close().unwrap();
///
/// store.shutdown().unwrap();
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn ObjectBackend>,
    max_io_size: usize,
    shut_down: Mutex<bool>,
}

impl Store {
    /// Opens a store with the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for a bad configuration, or the
    /// backend error if the backend cannot be opened.
    pub fn open(config: StoreConfig) -> CoreResult<Self> {
        config.validate()?;
        let backend: Arc<dyn ObjectBackend> = match &config.backend {
            BackendConfig::Memory { block_size } => {
                Arc::new(InMemoryBackend::with_block_size(*block_size))
            }
            BackendConfig::File { root, block_size } => {
                Arc::new(FileBackend::open(root, *block_size)?)
            }
        };
        Self::with_backend(backend, config.max_io_size)
    }

    /// Opens a store over a fresh in-memory backend with default settings.
    ///
    /// # Errors
    ///
    /// Does not fail in practice; the signature matches [`Store::open`].
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open(StoreConfig::default())
    }

    /// Opens a store over an existing backend.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if `max_io_size` is zero.
    pub fn with_backend(backend: Arc<dyn ObjectBackend>, max_io_size: usize) -> CoreResult<Self> {
        if max_io_size == 0 {
            return Err(CoreError::invalid_argument("max I/O size must be positive"));
        }
        tracing::info!(backend = backend.name(), max_io_size, "opened store");
        Ok(Self {
            inner: Arc::new(StoreInner {
                backend,
                max_io_size,
                shut_down: Mutex::new(false),
            }),
        })
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn ObjectBackend> {
        &self.inner.backend
    }

    /// Returns the upper bound on bytes moved by one backend call.
    #[must_use]
    pub fn max_io_size(&self) -> usize {
        self.inner.max_io_size
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.inner.shut_down.lock() {
            return Err(CoreError::invalid_operation("store is shut down"));
        }
        Ok(())
    }

    /// Asks the backend for a fresh object identifier.
    #[must_use]
    pub fn new_object_id(&self) -> ObjectId {
        self.inner.backend.new_id()
    }

    /// Creates an object with a backend-generated identifier.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the object cannot be created.
    pub fn create(&self, ctx: &RequestCtx) -> CoreResult<ObjectId> {
        let oid = self.new_object_id();
        self.create_with_id(ctx, oid)?;
        Ok(oid)
    }

    /// Creates an object with a caller-chosen identifier.
    ///
    /// # Errors
    ///
    /// Returns an already-exists error if the identifier is taken.
    pub fn create_with_id(&self, ctx: &RequestCtx, oid: ObjectId) -> CoreResult<()> {
        self.ensure_open()?;
        self.inner.backend.create(ctx, oid)?;
        tracing::debug!(%ctx, %oid, "created object");
        Ok(())
    }

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Returns a not found error if the object does not exist.
    pub fn delete(&self, ctx: &RequestCtx, oid: ObjectId) -> CoreResult<()> {
        self.ensure_open()?;
        self.inner.backend.delete(ctx, oid)?;
        tracing::debug!(%ctx, %oid, "deleted object");
        Ok(())
    }

    /// Opens an object for I/O.
    ///
    /// # Errors
    ///
    /// Returns a not found error if the object does not exist.
    pub fn open_object(&self, oid: ObjectId) -> CoreResult<ObjectHandle> {
        self.ensure_open()?;
        let state = self.inner.backend.open(oid)?;
        tracing::debug!(%oid, "opened object");
        Ok(ObjectHandle::new(oid, self.clone(), state))
    }

    /// Returns the block size of an object.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the size cannot be determined.
    pub fn block_size(&self, oid: ObjectId) -> CoreResult<usize> {
        Ok(self.inner.backend.block_size(oid)?)
    }

    /// Shuts the backend down. Later lifecycle calls fail.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if the store was already shut down,
    /// or the backend error.
    pub fn shutdown(&self) -> CoreResult<()> {
        let mut shut_down = self.inner.shut_down.lock();
        if *shut_down {
            return Err(CoreError::invalid_operation("store is already shut down"));
        }
        self.inner.backend.shutdown()?;
        *shut_down = true;
        tracing::info!(backend = self.inner.backend.name(), "shut down store");
        Ok(())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.inner.backend.name())
            .field("max_io_size", &self.inner.max_io_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_memory_store() {
        let store = Store::open(StoreConfig::new().memory(512).max_io_size(4096)).unwrap();
        assert_eq!(store.backend().name(), "memory");
        assert_eq!(store.max_io_size(), 4096);

        let oid = store.create(&RequestCtx::new(1)).unwrap();
        assert_eq!(store.block_size(oid).unwrap(), 512);
    }

    #[test]
    fn open_file_store() {
        let dir = tempdir().unwrap();
        let store = Store::open(StoreConfig::new().file(dir.path(), 1024)).unwrap();
        assert_eq!(store.backend().name(), "file");

        let oid = store.create(&RequestCtx::default()).unwrap();
        let obj = store.open_object(oid).unwrap();
        obj.write(100, b"file").unwrap();
        obj.close().unwrap();
        store.delete(&RequestCtx::default(), oid).unwrap();
    }

    #[test]
    fn invalid_config_rejected() {
        let err = Store::open(StoreConfig::new().memory(0)).unwrap_err();
        assert_eq!(err.code(), -libc::EINVAL);
    }

    #[test]
    fn create_with_id_conflict() {
        let store = Store::open_in_memory().unwrap();
        let oid = store.new_object_id();
        store.create_with_id(&RequestCtx::default(), oid).unwrap();
        let err = store
            .create_with_id(&RequestCtx::default(), oid)
            .unwrap_err();
        assert_eq!(err.code(), -libc::EEXIST);
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let oid = store.new_object_id();
        assert!(store.open_object(oid).unwrap_err().is_not_found());
        assert!(store
            .delete(&RequestCtx::default(), oid)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn shutdown_once() {
        let store = Store::open_in_memory().unwrap();
        store.shutdown().unwrap();
        assert!(store.shutdown().is_err());
        assert!(matches!(
            store.create(&RequestCtx::default()),
            Err(CoreError::InvalidOperation { .. })
        ));
    }
}
