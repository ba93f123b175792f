//! Hole-aware aligned reads.
//!
//! The backend fails an entire multi-block read with not found when any block
//! in it was never written, even if its neighbours hold data. The reader
//! retries such a range one block at a time, keeping the blocks that read back
//! and zero-filling the ones that are holes.

use crate::error::{CoreError, CoreResult};
use crate::object::ObjectHandle;
use crate::translate::read_aligned;
use dsal_storage::StorageError;

/// Reads the aligned range at `offset` into `buf`, zero-filling holes.
///
/// `buf.len()` and `offset` must be multiples of `bs`. A not found error for a
/// missing object is returned as is; holes never surface.
pub(crate) fn read_filling_holes(
    obj: &ObjectHandle,
    buf: &mut [u8],
    offset: u64,
    bs: usize,
) -> CoreResult<()> {
    match read_aligned(obj, offset, buf) {
        Ok(()) => {}
        Err(err) if is_hole(&err) => {
            if buf.len() <= bs {
                buf.fill(0);
            } else {
                tracing::debug!(
                    oid = %obj.id(),
                    offset,
                    size = buf.len(),
                    "range has holes, reading block by block"
                );
                read_per_block(obj, buf, offset, bs)?;
            }
        }
        Err(err) => return Err(err),
    }

    tracing::trace!(oid = %obj.id(), offset, size = buf.len(), "read filling holes");
    Ok(())
}

fn read_per_block(obj: &ObjectHandle, buf: &mut [u8], offset: u64, bs: usize) -> CoreResult<()> {
    for (i, block) in buf.chunks_mut(bs).enumerate() {
        let block_offset = offset + (i * bs) as u64;
        match read_aligned(obj, block_offset, block) {
            Ok(()) => {}
            Err(err) if is_hole(&err) => block.fill(0),
            Err(err) => {
                tracing::error!(
                    oid = %obj.id(),
                    offset = block_offset,
                    block_size = bs,
                    code = err.code(),
                    "unable to read block"
                );
                return Err(err);
            }
        }
    }
    Ok(())
}

fn is_hole(err: &CoreError) -> bool {
    match err {
        CoreError::Storage(StorageError::ObjectNotFound { .. }) => false,
        other => other.is_not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::translate::write_aligned;
    use dsal_storage::{InMemoryBackend, RequestCtx};
    use std::sync::Arc;

    fn open(block_size: usize) -> ObjectHandle {
        let backend = Arc::new(InMemoryBackend::with_block_size(block_size));
        let store = Store::with_backend(backend, 1 << 20).unwrap();
        let oid = store.create(&RequestCtx::default()).unwrap();
        store.open_object(oid).unwrap()
    }

    #[test]
    fn never_written_reads_zero() {
        let obj = open(16);
        let mut buf = vec![0xFFu8; 64];
        read_filling_holes(&obj, &mut buf, 0, 16).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn written_blocks_survive_neighbouring_holes() {
        let obj = open(16);
        write_aligned(&obj, 16, &[1u8; 16]).unwrap();
        write_aligned(&obj, 48, &[3u8; 16]).unwrap();

        let mut buf = vec![0xFFu8; 64];
        read_filling_holes(&obj, &mut buf, 0, 16).unwrap();
        assert!(buf[..16].iter().all(|&b| b == 0));
        assert!(buf[16..32].iter().all(|&b| b == 1));
        assert!(buf[32..48].iter().all(|&b| b == 0));
        assert!(buf[48..].iter().all(|&b| b == 3));
    }

    #[test]
    fn fully_written_range_reads_directly() {
        let obj = open(16);
        let data: Vec<u8> = (0..32).collect();
        write_aligned(&obj, 0, &data).unwrap();

        let mut buf = vec![0u8; 32];
        read_filling_holes(&obj, &mut buf, 0, 16).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn missing_object_is_not_a_hole() {
        let oid = dsal_storage::ObjectId::new();
        assert!(!is_hole(&StorageError::ObjectNotFound { oid }.into()));
        assert!(is_hole(&StorageError::BlockNotFound { oid, offset: 0 }.into()));
        assert!(!is_hole(&StorageError::backend(libc::EIO, "disk").into()));
    }
}
