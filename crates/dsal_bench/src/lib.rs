//! Benchmark helpers for DSAL.
//!
//! The benchmarks themselves live under `benches/`.

#![warn(missing_docs)]

use dsal_core::{ObjectHandle, Store};
use dsal_storage::{InMemoryBackend, RequestCtx};
use rand::Rng;
use std::sync::Arc;

/// Generates random payload bytes.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Opens an in-memory store and a fresh object on it.
///
/// The store is returned alongside the handle so it outlives the object.
pub fn memory_object(block_size: usize, max_io_size: usize) -> (Store, ObjectHandle) {
    let backend = Arc::new(InMemoryBackend::with_block_size(block_size));
    let store = Store::with_backend(backend, max_io_size).expect("open store");
    let oid = store.create(&RequestCtx::default()).expect("create object");
    let obj = store.open_object(oid).expect("open object");
    (store, obj)
}

/// Fills `len` bytes from offset zero so later reads hit written blocks.
pub fn prefill(obj: &ObjectHandle, len: usize) {
    obj.write(0, &random_data(len)).expect("prefill object");
}
