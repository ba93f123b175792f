//! # DSAL Storage
//!
//! Backend plugin interface and bundled backends for DSAL.
//!
//! This crate is the lowest layer of DSAL. Backends are **block-oriented
//! object stores**: they accept only block-aligned I/O and report blocks that
//! were never written as not found instead of returning zeros.
//!
//! ## Design Principles
//!
//! - Backends know nothing about byte-range semantics or holes
//! - Every error maps onto a negative errno via [`StorageError::code`]
//! - Operations follow `init -> submit -> wait -> finalize`
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - One file per block on a local filesystem
//!
//! ## Example
//!
//! ```rust
//! use dsal_storage::{InMemoryBackend, IoOpKind, IoVec, ObjectBackend, RequestCtx};
//!
//! let backend = InMemoryBackend::new();
//! let oid = backend.new_id();
//! backend.create(&RequestCtx::default(), oid).unwrap();
//!
//! let obj = backend.open(oid).unwrap();
//! let data = vec![42u8; 4096];
//! let mut op = obj.init_op(IoOpKind::Write, IoVec::write(0, &data), None).unwrap();
//! op.submit().unwrap();
//! op.wait().unwrap();
//! op.finalize();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod block_op;
mod completion;
mod error;
mod file;
mod id;
mod iovec;
mod memory;

pub use backend::{BackendObject, BackendOp, ObjectBackend, RequestCtx};
pub use completion::{CompletionCallback, OpCompletion};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use id::ObjectId;
pub use iovec::{IoBuf, IoOpKind, IoSegment, IoVec};
pub use memory::{InMemoryBackend, DEFAULT_MEMORY_BLOCK_SIZE};
