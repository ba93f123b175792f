//! Resize by zero-filling.
//!
//! The backend has no truncate primitive, so shrinking zero-fills the
//! discarded tail. Otherwise growing back over it later would resurrect stale
//! bytes. Growing needs no work: the extension reads as holes.

use crate::buffer;
use crate::error::{CoreError, CoreResult};
use crate::object::ObjectHandle;
use crate::translate;

/// Changes the logical size of `obj` from `old_size` to `new_size`.
///
/// When shrinking, `[new_size, old_size)` is zero-filled through
/// [`crate::write`] in chunks of at most the store's maximum I/O size.
/// The zero-fill is not transactional: after a failure some chunks may be
/// zeroed and others not. Retrying the same resize is safe.
///
/// # Errors
///
/// Returns out of memory if the zero buffer cannot be allocated, or the first
/// failing chunk's error.
pub fn resize(obj: &ObjectHandle, old_size: u64, new_size: u64) -> CoreResult<()> {
    let result = if old_size <= new_size {
        Ok(())
    } else {
        shrink(obj, old_size, new_size)
    };

    tracing::trace!(
        oid = %obj.id(),
        old_size,
        new_size,
        code = result.as_ref().err().map_or(0, CoreError::code),
        "resize"
    );
    result
}

fn shrink(obj: &ObjectHandle, old_size: u64, new_size: u64) -> CoreResult<()> {
    let bs = obj.block_size()?;
    let max = obj.store().max_io_size();
    let count = old_size - new_size;

    let chunk = usize::try_from(count).map_or(max, |count| count.min(max));
    let zeros = buffer::zeroed(chunk)?;

    let full = count / max as u64;
    let tail = (count % max as u64) as usize;
    let mut offset = new_size;

    for _ in 0..full {
        translate::write(obj, offset, bs, &zeros[..max])?;
        offset += max as u64;
    }
    if tail > 0 {
        translate::write(obj, offset, bs, &zeros[..tail])?;
    }
    Ok(())
}
