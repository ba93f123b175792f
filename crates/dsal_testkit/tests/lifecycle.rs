//! Object lifecycle and I/O operation contracts.

use dsal_core::{CoreError, IoOp, OpState};
use dsal_storage::{IoOpKind, IoVec, RequestCtx};
use dsal_testkit::prelude::*;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn create_open_close_delete() {
    for flavor in Flavor::ALL {
        let test_store = TestStore::of(flavor, TEST_BLOCK_SIZE, 1 << 20);
        let ctx = RequestCtx::new(11);

        let oid = test_store.create(&ctx).unwrap();
        let obj = test_store.open_object(oid).unwrap();
        assert_eq!(obj.id(), oid);
        obj.write(0, b"lifecycle").unwrap();
        obj.close().unwrap();

        test_store.delete(&ctx, oid).unwrap();
        assert!(test_store.open_object(oid).unwrap_err().is_not_found());
        assert!(test_store.delete(&ctx, oid).unwrap_err().is_not_found());
    }
}

#[test]
fn reopened_object_keeps_data() {
    for flavor in Flavor::ALL {
        let test_store = TestStore::of(flavor, TEST_BLOCK_SIZE, 1 << 20);
        let oid = test_store.create(&RequestCtx::default()).unwrap();

        let obj = test_store.open_object(oid).unwrap();
        obj.write(5000, b"persisted").unwrap();
        obj.close().unwrap();

        let obj = test_store.open_object(oid).unwrap();
        let mut buf = [0u8; 9];
        obj.read(5000, &mut buf).unwrap();
        assert_eq!(&buf, b"persisted");
        obj.close().unwrap();
    }
}

#[test]
fn create_with_id_uses_given_id() {
    let test_store = TestStore::memory();
    let oid = test_store.new_object_id();
    test_store
        .create_with_id(&RequestCtx::default(), oid)
        .unwrap();
    assert!(test_store.memory_backend().unwrap().contains(oid));

    let err = test_store
        .create_with_id(&RequestCtx::default(), oid)
        .unwrap_err();
    assert_eq!(err.code(), -libc::EEXIST);
}

#[test]
fn callback_sees_result_before_wait_returns() {
    let test_store = TestStore::memory();
    let obj = test_store.new_object();
    let calls = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicI32::new(1));

    let mut missing = vec![0u8; TEST_BLOCK_SIZE];
    let (calls_cb, last_cb) = (Arc::clone(&calls), Arc::clone(&last));
    let mut op = IoOp::init(
        &obj,
        IoOpKind::Read,
        IoVec::read(0, &mut missing),
        Some(Box::new(move |rc| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
            last_cb.store(rc, Ordering::SeqCst);
        })),
    )
    .unwrap();
    op.submit().unwrap();
    let err = op.wait().unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(last.load(Ordering::SeqCst), err.code());
    assert_eq!(err.code(), -libc::ENOENT);
    assert_eq!(op.state(), OpState::Failed);
    op.finalize();
}

#[test]
fn multi_segment_vector() {
    let test_store = TestStore::memory_with(512, 1 << 20);
    let obj = test_store.new_object();
    let a = filled(b'a', 512);
    let b = filled(b'b', 1024);

    let mut vec = IoVec::write(2048, &a);
    vec.push_write(0, &b);
    let mut op = IoOp::write(&obj, vec).unwrap();
    op.wait().unwrap();
    op.finalize();

    let mut buf = vec![0xFFu8; 2560];
    obj.read(0, &mut buf).unwrap();
    verify_block(&buf, 0..1024, b'b');
    verify_block(&buf, 1024..2048, 0);
    verify_block(&buf, 2048..2560, b'a');
}

#[test]
fn overlapping_segments_rejected() {
    let test_store = TestStore::memory_with(512, 1 << 20);
    let obj = test_store.new_object();
    let a = filled(1, 1024);
    let b = filled(2, 512);

    let mut vec = IoVec::write(0, &a);
    vec.push_write(512, &b);
    let err = IoOp::init(&obj, IoOpKind::Write, vec, None).unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert_eq!(err.code(), -libc::EINVAL);
}

#[test]
fn free_turns_blocks_into_holes() {
    for flavor in Flavor::ALL {
        let test_store = TestStore::of(flavor, 512, 1 << 20);
        let obj = test_store.new_object();
        obj.write(0, &filled(b'F', 2048)).unwrap();

        let mut op = IoOp::init(&obj, IoOpKind::Free, IoVec::free(512, 1024), None).unwrap();
        op.submit().unwrap();
        op.wait().unwrap();
        op.finalize();

        let mut buf = vec![0xFFu8; 2048];
        obj.read(0, &mut buf).unwrap();
        verify_block(&buf, 0..512, b'F');
        verify_block(&buf, 512..1536, 0);
        verify_block(&buf, 1536..2048, b'F');
    }
}

#[test]
fn unaligned_free_rejected() {
    let test_store = TestStore::memory_with(512, 1 << 20);
    let obj = test_store.new_object();
    let err = IoOp::init(&obj, IoOpKind::Free, IoVec::free(100, 512), None).unwrap_err();
    assert_eq!(err.code(), -libc::EINVAL);
}

#[test]
fn store_shutdown_blocks_lifecycle_calls() {
    for flavor in Flavor::ALL {
        let test_store = TestStore::of(flavor, TEST_BLOCK_SIZE, 1 << 20);
        let oid = test_store.create(&RequestCtx::default()).unwrap();
        test_store.shutdown().unwrap();
        assert!(matches!(
            test_store.open_object(oid),
            Err(CoreError::InvalidOperation { .. })
        ));
    }
}

#[test]
fn concurrent_objects_are_independent() {
    let test_store = TestStore::memory();
    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let store = test_store.store.clone();
            std::thread::spawn(move || {
                let oid = store.create(&RequestCtx::new(u64::from(i))).unwrap();
                let obj = store.open_object(oid).unwrap();
                obj.write(u64::from(i) * 777, &filled(i + 1, 5000)).unwrap();
                let mut buf = vec![0u8; 5000];
                obj.read(u64::from(i) * 777, &mut buf).unwrap();
                verify_block(&buf, 0..5000, i + 1);
                obj.close().unwrap();
                oid
            })
        })
        .collect();

    let oids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(test_store.memory_backend().unwrap().object_count(), oids.len());
}
