//! File-based object backend.
//!
//! ## Directory Structure
//!
//! ```text
//! root/
//! ├─ LOCK                   # Advisory lock for single-process access
//! └─ objects/
//!    └─ <oid>/
//!       ├─ 0.blk            # One file per written block, named by index
//!       └─ 7.blk
//! ```
//!
//! A block file that does not exist is a hole.

use crate::backend::{BackendObject, BackendOp, ObjectBackend, RequestCtx};
use crate::block_op::{init_block_op, BlockStore};
use crate::completion::CompletionCallback;
use crate::error::{StorageError, StorageResult};
use crate::id::ObjectId;
use crate::iovec::{IoOpKind, IoVec};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const OBJECTS_DIR: &str = "objects";
const BLOCK_EXT: &str = "blk";

/// A file-based object backend.
///
/// Each object is a directory and each written block is one file, mirroring
/// the key-per-block layout of an object store. The root directory is held
/// under an exclusive advisory lock while the backend is alive.
///
/// # Example
///
/// ```no_run
/// use dsal_storage::{FileBackend, ObjectBackend, RequestCtx};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("store"), 4096).unwrap();
/// let oid = backend.new_id();
/// backend.create(&RequestCtx::default(), oid).unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    block_size: usize,
    lock_file: File,
}

impl FileBackend {
    /// Opens or creates a backend rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] for a zero block size,
    /// [`StorageError::Locked`] if another process holds the root, or an I/O
    /// error if the directories cannot be created.
    pub fn open(root: &Path, block_size: usize) -> StorageResult<Self> {
        if block_size == 0 {
            return Err(StorageError::invalid_argument("block size must be positive"));
        }
        fs::create_dir_all(root.join(OBJECTS_DIR))?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(root.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: root.to_path_buf(),
            });
        }

        tracing::info!(root = %root.display(), block_size, "opened file backend");
        Ok(Self {
            root: root.to_path_buf(),
            block_size,
            lock_file,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_dir(&self, oid: ObjectId) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(oid.to_string())
    }
}

impl ObjectBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn new_id(&self) -> ObjectId {
        ObjectId::new()
    }

    fn create(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()> {
        match fs::create_dir(self.object_dir(oid)) {
            Ok(()) => {
                tracing::debug!(%ctx, %oid, "created object");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists { oid })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, ctx: &RequestCtx, oid: ObjectId) -> StorageResult<()> {
        match fs::remove_dir_all(self.object_dir(oid)) {
            Ok(()) => {
                tracing::debug!(%ctx, %oid, "deleted object");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(%ctx, %oid, "delete of missing object");
                Err(StorageError::ObjectNotFound { oid })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn open(&self, oid: ObjectId) -> StorageResult<Box<dyn BackendObject>> {
        let dir = self.object_dir(oid);
        if !dir.is_dir() {
            return Err(StorageError::ObjectNotFound { oid });
        }
        Ok(Box::new(FileObject {
            oid,
            block_size: self.block_size,
            dir,
        }))
    }

    fn block_size(&self, oid: ObjectId) -> StorageResult<usize> {
        if !self.object_dir(oid).is_dir() {
            return Err(StorageError::ObjectNotFound { oid });
        }
        Ok(self.block_size)
    }

    fn shutdown(&self) -> StorageResult<()> {
        self.lock_file.unlock()?;
        tracing::info!(root = %self.root.display(), "released file backend");
        Ok(())
    }
}

#[derive(Debug)]
struct FileObject {
    oid: ObjectId,
    block_size: usize,
    dir: PathBuf,
}

impl FileObject {
    fn block_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{index}.{BLOCK_EXT}"))
    }
}

impl BlockStore for FileObject {
    fn oid(&self) -> ObjectId {
        self.oid
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn has_block(&self, index: u64) -> StorageResult<bool> {
        Ok(self.block_path(index).try_exists()?)
    }

    fn get_block(&self, index: u64, dst: &mut [u8]) -> StorageResult<()> {
        let mut file = match File::open(self.block_path(index)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::BlockNotFound {
                    oid: self.oid,
                    offset: index * self.block_size as u64,
                });
            }
            Err(err) => return Err(err.into()),
        };
        file.read_exact(dst)?;
        Ok(())
    }

    fn put_block(&self, index: u64, src: &[u8]) -> StorageResult<()> {
        fs::write(self.block_path(index), src)?;
        Ok(())
    }

    fn remove_block(&self, index: u64) -> StorageResult<()> {
        match fs::remove_file(self.block_path(index)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl BackendObject for FileObject {
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
