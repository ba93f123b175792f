//! # DSAL Core
//!
//! Byte-range I/O over block-aligned object backends.
//!
//! This crate provides:
//! - [`Store`] and [`ObjectHandle`] for object lifecycle
//! - [`IoOp`], the init/submit/wait/finalize operation lifecycle
//! - Byte-range [`write`] and [`read`] that translate arbitrary offsets and
//!   lengths into whole-block backend operations
//! - Hole handling: never-written ranges read as zeros
//! - [`resize`], which shrinks by zero-filling the discarded tail
//!
//! ## Example
//!
//! ```rust
//! use dsal_core::{Store, StoreConfig};
//! use dsal_storage::RequestCtx;
//!
//! let store = Store::open(StoreConfig::new().memory(4096)).unwrap();
//! let oid = store.create(&RequestCtx::default()).unwrap();
//! let obj = store.open_object(oid).unwrap();
//!
//! obj.write(0, &[b'A'; 3000]).unwrap();
//! obj.resize(3000, 0).unwrap();
//!
//! let mut buf = vec![0xFF; 4096];
//! obj.read(0, &mut buf).unwrap();
//! assert!(buf.iter().all(|&b| b == 0));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod error;
mod holes;
mod io_op;
mod object;
mod resize;
mod store;
mod translate;

pub use config::{BackendConfig, BackendKind, StoreConfig, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_IO_SIZE};
pub use error::{CoreError, CoreResult};
pub use io_op::{IoOp, OpState};
pub use object::ObjectHandle;
pub use resize::resize;
pub use store::Store;
pub use translate::{is_aligned, read, write};
