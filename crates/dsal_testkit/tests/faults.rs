//! Error propagation and backend call accounting.

use dsal_core::{CoreError, ObjectHandle, Store};
use dsal_storage::{InMemoryBackend, IoOpKind, RequestCtx};
use dsal_testkit::prelude::*;
use std::sync::Arc;

const BS: usize = 4096;

fn faulty_store(max_io_size: usize) -> (FaultyBackend, Store) {
    let backend = FaultyBackend::new(Arc::new(InMemoryBackend::with_block_size(BS)));
    let store = Store::with_backend(Arc::new(backend.clone()), max_io_size).unwrap();
    (backend, store)
}

fn open(store: &Store) -> ObjectHandle {
    let oid = store.create(&RequestCtx::default()).unwrap();
    store.open_object(oid).unwrap()
}

#[test]
fn failed_edge_read_aborts_write() {
    init_test_logging();
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);

    backend.fail(IoOpKind::Read, libc::EIO);
    let err = obj.write(3000, &filled(b'A', 100)).unwrap_err();
    assert_eq!(err.code(), -libc::EIO);
    assert_eq!(backend.issued(IoOpKind::Write), 0);
}

#[test]
fn failed_right_edge_read_aborts_write() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);

    backend.fail_at(IoOpKind::Read, 8192, libc::EIO);
    let err = obj.write(4096, &filled(b'R', 5000)).unwrap_err();
    assert_eq!(err.code(), -libc::EIO);
    assert_eq!(backend.issued(IoOpKind::Write), 0);
}

#[test]
fn opaque_backend_codes_pass_through() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);

    backend.fail(IoOpKind::Write, libc::EROFS);
    let err = obj.write(0, &filled(1, BS)).unwrap_err();
    assert_eq!(err.code(), -libc::EROFS);
    assert!(matches!(err, CoreError::Storage(_)));
}

#[test]
fn per_block_error_aborts_hole_read() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);
    obj.write(0, &filled(b'X', BS)).unwrap();

    // Block 1 is a hole, so the whole-range read reports not found and the
    // reader falls back to per-block reads; block 2 then fails for real.
    backend.fail_at(IoOpKind::Read, 2 * BS as u64, libc::EIO);
    let mut buf = vec![0u8; 3 * BS];
    let err = obj.read(0, &mut buf).unwrap_err();
    assert_eq!(err.code(), -libc::EIO);
}

#[test]
fn injected_not_found_is_treated_as_hole() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);
    obj.write(0, &filled(b'Y', 2 * BS)).unwrap();

    backend.fail_at(IoOpKind::Read, 0, libc::ENOENT);
    let mut buf = vec![0xFFu8; 2 * BS];
    obj.read(0, &mut buf).unwrap();
    verify_block(&buf, 0..BS, 0);
    verify_block(&buf, BS..2 * BS, b'Y');
}

#[test]
fn failed_shrink_chunk_is_retryable() {
    let (backend, store) = faulty_store(BS);
    let obj = open(&store);
    obj.write(0, &filled(b'Z', 4 * BS)).unwrap();

    backend.fail_at(IoOpKind::Write, 3 * BS as u64, libc::EIO);
    let err = obj.resize(4 * BS as u64, BS as u64).unwrap_err();
    assert_eq!(err.code(), -libc::EIO);

    // The first chunk went through before the failure.
    let mut buf = vec![0u8; 4 * BS];
    obj.read(0, &mut buf).unwrap();
    verify_block(&buf, BS..2 * BS, 0);
    verify_block(&buf, 3 * BS..4 * BS, b'Z');

    backend.clear_faults();
    obj.resize(4 * BS as u64, BS as u64).unwrap();
    obj.read(0, &mut buf).unwrap();
    verify_block(&buf, 0..BS, b'Z');
    verify_block(&buf, BS..4 * BS, 0);
}

#[test]
fn aligned_write_is_one_backend_op() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);

    obj.write(8192, &filled(1, 3 * BS)).unwrap();
    assert_eq!(backend.issued(IoOpKind::Write), 1);
    assert_eq!(backend.issued(IoOpKind::Read), 0);
}

#[test]
fn unaligned_write_in_one_block_reads_once() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);

    obj.write(3000, &filled(b'A', 100)).unwrap();
    assert_eq!(backend.issued(IoOpKind::Read), 1);
    assert_eq!(backend.issued(IoOpKind::Write), 1);
}

#[test]
fn unaligned_read_uses_at_most_three_reads() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);
    obj.write(0, &filled(7, 4 * BS)).unwrap();
    backend.reset_counts();

    let mut buf = vec![0u8; 2 * BS];
    obj.read(100, &mut buf).unwrap();
    assert_eq!(backend.issued(IoOpKind::Read), 3);
    verify_block(&buf, 0..2 * BS, 7);
}

#[test]
fn zero_length_requests_skip_backend() {
    let (backend, store) = faulty_store(1 << 20);
    let obj = open(&store);

    obj.write(12345, &[]).unwrap();
    obj.read(12345, &mut []).unwrap();
    obj.resize(100, 100).unwrap();
    assert_eq!(backend.issued(IoOpKind::Read), 0);
    assert_eq!(backend.issued(IoOpKind::Write), 0);
}
