//! Byte-range to block translation.
//!
//! A request is **aligned** when both its offset and its length are multiples
//! of the block size. Aligned requests map onto a single backend operation.
//! Unaligned writes read-modify-write the partially covered edge blocks
//! through a staging buffer; unaligned reads go through a one-block staging
//! buffer for the partial blocks at either end and read whole blocks directly
//! into the caller buffer.
//!
//! Unaligned writes that touch more blocks than fit in the store's maximum
//! I/O size are processed as consecutive windows of whole blocks, so the
//! staging buffer never grows past that limit.

use crate::buffer;
use crate::error::{CoreError, CoreResult};
use crate::holes::read_filling_holes;
use crate::io_op::IoOp;
use crate::object::ObjectHandle;
use dsal_storage::{IoOpKind, IoVec};

/// Writes `buf` at byte `offset` of `obj`.
///
/// A zero-length write succeeds without touching the backend.
///
/// # Errors
///
/// Returns an invalid argument error for a zero block size or a range that
/// overflows, out of memory if the staging buffer cannot be allocated, and
/// otherwise the first failing backend step's error. After a failed edge read
/// nothing is written.
pub fn write(obj: &ObjectHandle, offset: u64, block_size: usize, buf: &[u8]) -> CoreResult<()> {
    check_request(offset, buf.len(), block_size)?;
    if buf.is_empty() {
        return Ok(());
    }

    let result = if is_aligned(offset, buf.len(), block_size) {
        write_aligned(obj, offset, buf)
    } else {
        write_unaligned(obj, offset, block_size, buf)
    };
    tracing::trace!(
        oid = %obj.id(),
        offset,
        size = buf.len(),
        code = result_code(&result),
        "write"
    );
    result
}

/// Fills `buf` from byte `offset` of `obj`.
///
/// Never-written ranges read as zeros. A zero-length read succeeds without
/// touching the backend.
///
/// # Errors
///
/// Returns an invalid argument error for a zero block size or a range that
/// overflows, out of memory if the staging buffer cannot be allocated, and
/// otherwise the first failing backend error other than a hole.
pub fn read(obj: &ObjectHandle, offset: u64, block_size: usize, buf: &mut [u8]) -> CoreResult<()> {
    check_request(offset, buf.len(), block_size)?;
    if buf.is_empty() {
        return Ok(());
    }

    let size = buf.len();
    let result = if is_aligned(offset, size, block_size) {
        read_filling_holes(obj, buf, offset, block_size)
    } else {
        read_unaligned(obj, offset, block_size, buf)
    };
    tracing::trace!(oid = %obj.id(), offset, size, code = result_code(&result), "read");
    result
}

/// Returns true if both `offset` and `len` are multiples of `block_size`.
#[must_use]
pub fn is_aligned(offset: u64, len: usize, block_size: usize) -> bool {
    block_size != 0 && offset % block_size as u64 == 0 && len % block_size == 0
}

fn check_request(offset: u64, len: usize, block_size: usize) -> CoreResult<()> {
    if block_size == 0 {
        return Err(CoreError::invalid_argument("block size must be positive"));
    }
    let overflow = || {
        CoreError::invalid_argument(format!("range at offset {offset} with size {len} overflows"))
    };
    let end = offset.checked_add(len as u64).ok_or_else(overflow)?;
    if len > 0 {
        // The last touched block must end inside the offset space.
        let bs = block_size as u64;
        (last_block(end, bs) + 1)
            .checked_mul(bs)
            .ok_or_else(overflow)?;
    }
    Ok(())
}

fn result_code(result: &CoreResult<()>) -> i32 {
    result.as_ref().err().map_or(0, CoreError::code)
}

/// Index of the last block touched by a range ending at `end` (exclusive).
fn last_block(end: u64, bs: u64) -> u64 {
    let block = end / bs;
    if end % bs == 0 {
        block - 1
    } else {
        block
    }
}

/// Issues one block-aligned write.
pub(crate) fn write_aligned(obj: &ObjectHandle, offset: u64, buf: &[u8]) -> CoreResult<()> {
    let mut op = IoOp::init(obj, IoOpKind::Write, IoVec::write(offset, buf), None)?;
    op.submit()?;
    op.wait()?;
    op.finalize();
    Ok(())
}

/// Issues one block-aligned read. Holes surface as not found.
pub(crate) fn read_aligned(obj: &ObjectHandle, offset: u64, buf: &mut [u8]) -> CoreResult<()> {
    let mut op = IoOp::init(obj, IoOpKind::Read, IoVec::read(offset, buf), None)?;
    op.submit()?;
    op.wait()?;
    op.finalize();
    Ok(())
}

fn write_unaligned(obj: &ObjectHandle, offset: u64, bs: usize, buf: &[u8]) -> CoreResult<()> {
    let bs64 = bs as u64;
    let end = offset + buf.len() as u64;
    let left = offset / bs64;
    let right = last_block(end, bs64);
    let window = (obj.store().max_io_size() / bs).max(1) as u64;

    if right - left < window {
        return read_modify_write(obj, offset, bs, buf);
    }

    tracing::debug!(
        oid = %obj.id(),
        offset,
        size = buf.len(),
        window_blocks = window,
        "splitting unaligned write into windows"
    );
    let mut block = left;
    while block <= right {
        let last = (block + window - 1).min(right);
        let start = offset.max(block * bs64);
        let stop = end.min((last + 1) * bs64);
        let piece = &buf[(start - offset) as usize..(stop - offset) as usize];

        if is_aligned(start, piece.len(), bs) {
            write_aligned(obj, start, piece)?;
        } else {
            read_modify_write(obj, start, bs, piece)?;
        }
        block = last + 1;
    }
    Ok(())
}

fn read_modify_write(obj: &ObjectHandle, offset: u64, bs: usize, buf: &[u8]) -> CoreResult<()> {
    let bs64 = bs as u64;
    let end = offset + buf.len() as u64;
    let left = offset / bs64;
    let right = last_block(end, bs64);

    let blocks = usize::try_from(right - left + 1)
        .map_err(|_| CoreError::OutOfMemory { size: usize::MAX })?;
    let size = blocks
        .checked_mul(bs)
        .ok_or(CoreError::OutOfMemory { size: usize::MAX })?;
    let mut staging = buffer::zeroed(size)?;

    if offset % bs64 != 0 {
        read_filling_holes(obj, &mut staging[..bs], left * bs64, bs).inspect_err(|err| {
            tracing::error!(oid = %obj.id(), offset = left * bs64, block_size = bs, code = err.code(), "edge read failed");
        })?;
    }
    if end % bs64 != 0 && left != right {
        read_filling_holes(obj, &mut staging[size - bs..], right * bs64, bs).inspect_err(|err| {
            tracing::error!(oid = %obj.id(), offset = right * bs64, block_size = bs, code = err.code(), "edge read failed");
        })?;
    }

    let pos = (offset - left * bs64) as usize;
    staging[pos..pos + buf.len()].copy_from_slice(buf);

    write_aligned(obj, left * bs64, &staging).inspect_err(|err| {
        tracing::error!(oid = %obj.id(), offset = left * bs64, size, code = err.code(), "staged write failed");
    })
}

fn read_unaligned(obj: &ObjectHandle, mut offset: u64, bs: usize, buf: &mut [u8]) -> CoreResult<()> {
    let bs64 = bs as u64;
    let mut staging = buffer::zeroed(bs)?;
    let mut pos = 0;
    let mut remaining = buf.len();

    // Leading partial block.
    if offset % bs64 != 0 || remaining < bs {
        let block_start = offset - offset % bs64;
        let skip = (offset - block_start) as usize;
        let n = remaining.min(bs - skip);

        read_filling_holes(obj, &mut staging, block_start, bs)?;
        buf[..n].copy_from_slice(&staging[skip..skip + n]);

        pos = n;
        remaining -= n;
        offset += n as u64;
    }

    // Whole blocks straight into the caller buffer.
    let bulk = remaining - remaining % bs;
    if bulk > 0 {
        read_filling_holes(obj, &mut buf[pos..pos + bulk], offset, bs)?;
        pos += bulk;
        remaining -= bulk;
        offset += bulk as u64;
    }

    // Trailing partial block.
    if remaining > 0 {
        read_filling_holes(obj, &mut staging, offset, bs)?;
        buf[pos..].copy_from_slice(&staging[..remaining]);
    }
    Ok(())
}
