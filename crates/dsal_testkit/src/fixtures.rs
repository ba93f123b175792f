//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores and objects
//! on either bundled backend.

use dsal_core::{ObjectHandle, Store, StoreConfig, DEFAULT_MAX_IO_SIZE};
use dsal_storage::{InMemoryBackend, RequestCtx};
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Block size used by the fixtures unless told otherwise.
pub const TEST_BLOCK_SIZE: usize = 4096;

/// Which bundled backend a fixture runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// In-memory backend.
    Memory,
    /// File backend in a temporary directory.
    File,
}

impl Flavor {
    /// Both flavors, for tests that run against every backend.
    pub const ALL: [Flavor; 2] = [Flavor::Memory, Flavor::File];
}

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    memory: Option<InMemoryBackend>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory test store with the default block size.
    pub fn memory() -> Self {
        Self::memory_with(TEST_BLOCK_SIZE, DEFAULT_MAX_IO_SIZE)
    }

    /// Creates an in-memory test store with explicit limits.
    pub fn memory_with(block_size: usize, max_io_size: usize) -> Self {
        let backend = InMemoryBackend::with_block_size(block_size);
        let store = Store::with_backend(Arc::new(backend.clone()), max_io_size)
            .expect("Failed to open in-memory store");
        Self {
            store,
            memory: Some(backend),
            _temp_dir: None,
        }
    }

    /// Creates a file-based test store with the default block size.
    pub fn file() -> Self {
        Self::file_with(TEST_BLOCK_SIZE, DEFAULT_MAX_IO_SIZE)
    }

    /// Creates a file-based test store with explicit limits.
    pub fn file_with(block_size: usize, max_io_size: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = StoreConfig::new()
            .file(temp_dir.path().join("store"), block_size)
            .max_io_size(max_io_size);
        let store = Store::open(config).expect("Failed to open file store");
        Self {
            store,
            memory: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Creates a test store of the given flavor.
    pub fn of(flavor: Flavor, block_size: usize, max_io_size: usize) -> Self {
        match flavor {
            Flavor::Memory => Self::memory_with(block_size, max_io_size),
            Flavor::File => Self::file_with(block_size, max_io_size),
        }
    }

    /// Returns the in-memory backend, if this store uses one.
    pub fn memory_backend(&self) -> Option<&InMemoryBackend> {
        self.memory.as_ref()
    }

    /// Returns the backend root directory if file-based.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Creates and opens a fresh object.
    pub fn new_object(&self) -> ObjectHandle {
        let oid = self
            .store
            .create(&RequestCtx::default())
            .expect("Failed to create object");
        self.store.open_object(oid).expect("Failed to open object")
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a fresh object in a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use dsal_testkit::with_temp_object;
///
/// with_temp_object(|obj| {
///     obj.write(3000, &[b'A'; 100]).unwrap();
/// });
/// ```
pub fn with_temp_object<F, R>(f: F) -> R
where
    F: FnOnce(&ObjectHandle) -> R,
{
    let test_store = TestStore::memory();
    let obj = test_store.new_object();
    let result = f(&obj);
    obj.close().expect("Failed to close object");
    result
}

/// Runs a test with a fresh object in a temporary file-based store.
pub fn with_file_object<F, R>(f: F) -> R
where
    F: FnOnce(&ObjectHandle) -> R,
{
    let test_store = TestStore::file();
    let obj = test_store.new_object();
    let result = f(&obj);
    obj.close().expect("Failed to close object");
    result
}

/// Runs a test once per backend flavor with a fresh object each time.
pub fn for_each_flavor<F>(block_size: usize, max_io_size: usize, mut f: F)
where
    F: FnMut(Flavor, &ObjectHandle),
{
    for flavor in Flavor::ALL {
        let test_store = TestStore::of(flavor, block_size, max_io_size);
        let obj = test_store.new_object();
        f(flavor, &obj);
        obj.close().expect("Failed to close object");
    }
}

/// Installs a test-friendly tracing subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
