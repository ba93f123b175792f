//! Fallible buffer allocation.

use crate::error::{CoreError, CoreResult};

/// Allocates a zero-filled buffer of `size` bytes.
///
/// # Errors
///
/// Returns [`CoreError::OutOfMemory`] instead of aborting when the allocation
/// fails.
pub(crate) fn zeroed(size: usize) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| CoreError::OutOfMemory { size })?;
    buf.resize(size, 0);
    Ok(buf)
}
