//! Scatter/gather I/O vectors and operation kinds.
//!
//! An [`IoVec`] describes one request against an object as an ordered list of
//! segments, each pairing a caller buffer with a target offset. Buffers are
//! borrowed for the lifetime of the vector; the vector never copies or frees
//! them.

use crate::error::{StorageError, StorageResult};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Kind of an I/O operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoOpKind {
    /// Read blocks into caller buffers.
    Read,
    /// Write caller buffers to blocks.
    Write,
    /// Deallocate blocks.
    Free,
}

impl IoOpKind {
    /// Returns the raw wire code of this kind.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Read => 1,
            Self::Write => 2,
            Self::Free => 3,
        }
    }

    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Free => "free",
        }
    }
}

impl fmt::Display for IoOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for IoOpKind {
    type Error = StorageError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::Read),
            2 => Ok(Self::Write),
            3 => Ok(Self::Free),
            other => Err(StorageError::invalid_argument(format!(
                "unsupported I/O operation kind {other}"
            ))),
        }
    }
}

impl FromStr for IoOpKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "free" => Ok(Self::Free),
            other => Err(StorageError::invalid_argument(format!(
                "unsupported I/O operation kind {other:?}"
            ))),
        }
    }
}

/// A borrowed buffer attached to one segment.
#[derive(Debug)]
pub enum IoBuf<'a> {
    /// Destination of a read.
    Read(&'a mut [u8]),
    /// Source of a write.
    Write(&'a [u8]),
    /// Length-only extent, used by free.
    Extent(usize),
}

impl IoBuf<'_> {
    /// Returns the number of bytes covered.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Read(buf) => buf.len(),
            Self::Write(buf) => buf.len(),
            Self::Extent(len) => *len,
        }
    }

    /// Returns true if the buffer covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the operation kind this buffer flavour belongs to.
    #[must_use]
    pub fn kind(&self) -> IoOpKind {
        match self {
            Self::Read(_) => IoOpKind::Read,
            Self::Write(_) => IoOpKind::Write,
            Self::Extent(_) => IoOpKind::Free,
        }
    }
}

/// One `(buffer, size, target offset)` entry of an [`IoVec`].
#[derive(Debug)]
pub struct IoSegment<'a> {
    /// Byte offset in the target object.
    pub offset: u64,
    /// The borrowed buffer; its length is the segment size.
    pub buf: IoBuf<'a>,
}

impl IoSegment<'_> {
    /// Returns the segment size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the segment is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the target byte range, or `None` if it overflows.
    #[must_use]
    pub fn target(&self) -> Option<Range<u64>> {
        let end = self.offset.checked_add(self.len() as u64)?;
        Some(self.offset..end)
    }

    /// Splits an aligned segment into blocks.
    ///
    /// Yields the target offset of each block together with the byte range
    /// it occupies inside the segment buffer. `block_size` must be non-zero.
    pub fn blocks(&self, block_size: usize) -> impl Iterator<Item = (u64, Range<usize>)> {
        let offset = self.offset;
        let len = self.len();
        (0..len).step_by(block_size).map(move |start| {
            let end = (start + block_size).min(len);
            (offset + start as u64, start..end)
        })
    }
}

/// An ordered scatter/gather vector over borrowed buffers.
///
/// # Invariants
///
/// - Every segment has a size (the buffer length) and a target offset
/// - Target ranges do not overlap
/// - All segments share one flavour (read, write or extent)
///
/// The invariants are checked by [`IoVec::validate`].
#[derive(Debug, Default)]
pub struct IoVec<'a> {
    segments: Vec<IoSegment<'a>>,
}

impl<'a> IoVec<'a> {
    /// Creates an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty vector with room for `capacity` segments.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            segments: Vec::with_capacity(capacity),
        }
    }

    /// Creates a single-segment read vector.
    #[must_use]
    pub fn read(offset: u64, buf: &'a mut [u8]) -> Self {
        let mut vec = Self::with_capacity(1);
        vec.push_read(offset, buf);
        vec
    }

    /// Creates a single-segment write vector.
    #[must_use]
    pub fn write(offset: u64, buf: &'a [u8]) -> Self {
        let mut vec = Self::with_capacity(1);
        vec.push_write(offset, buf);
        vec
    }

    /// Creates a single-extent free vector.
    #[must_use]
    pub fn free(offset: u64, len: usize) -> Self {
        let mut vec = Self::with_capacity(1);
        vec.push_extent(offset, len);
        vec
    }

    /// Appends a read segment.
    pub fn push_read(&mut self, offset: u64, buf: &'a mut [u8]) -> &mut Self {
        self.segments.push(IoSegment {
            offset,
            buf: IoBuf::Read(buf),
        });
        self
    }

    /// Appends a write segment.
    pub fn push_write(&mut self, offset: u64, buf: &'a [u8]) -> &mut Self {
        self.segments.push(IoSegment {
            offset,
            buf: IoBuf::Write(buf),
        });
        self
    }

    /// Appends a length-only extent.
    pub fn push_extent(&mut self, offset: u64, len: usize) -> &mut Self {
        self.segments.push(IoSegment {
            offset,
            buf: IoBuf::Extent(len),
        });
        self
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if the vector has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the total number of bytes covered by all segments.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.segments.iter().map(|s| s.len() as u64).sum()
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[IoSegment<'a>] {
        &self.segments
    }

    /// Returns the segments mutably, for backends filling read buffers.
    pub fn segments_mut(&mut self) -> &mut [IoSegment<'a>] {
        &mut self.segments
    }

    /// Checks the vector invariants and returns the flavour of its segments.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] if the vector is empty, holds
    /// an empty segment, mixes flavours, overflows the offset space, or has
    /// overlapping target ranges.
    pub fn validate(&self) -> StorageResult<IoOpKind> {
        let first = self
            .segments
            .first()
            .ok_or_else(|| StorageError::invalid_argument("empty I/O vector"))?;
        let kind = first.buf.kind();

        let mut ranges = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            if segment.is_empty() {
                return Err(StorageError::invalid_argument(format!(
                    "empty segment at offset {}",
                    segment.offset
                )));
            }
            if segment.buf.kind() != kind {
                return Err(StorageError::invalid_argument(format!(
                    "mixed segment kinds in one vector ({kind} and {})",
                    segment.buf.kind()
                )));
            }
            let range = segment.target().ok_or_else(|| {
                StorageError::invalid_argument(format!(
                    "segment at offset {} overflows the object",
                    segment.offset
                ))
            })?;
            ranges.push(range);
        }

        ranges.sort_by_key(|r| r.start);
        if let Some(pair) = ranges.windows(2).find(|w| w[0].end > w[1].start) {
            return Err(StorageError::invalid_argument(format!(
                "overlapping segments {:?} and {:?}",
                pair[0], pair[1]
            )));
        }

        Ok(kind)
    }

    /// Checks that every segment starts and ends on a block boundary.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] for a zero block size or a
    /// misaligned segment.
    pub fn check_aligned(&self, block_size: usize) -> StorageResult<()> {
        if block_size == 0 {
            return Err(StorageError::invalid_argument("block size must be positive"));
        }
        let bs = block_size as u64;
        match self
            .segments
            .iter()
            .find(|s| s.offset % bs != 0 || s.len() as u64 % bs != 0)
        {
            Some(s) => Err(StorageError::invalid_argument(format!(
                "segment at offset {} with size {} is not aligned to block size {block_size}",
                s.offset,
                s.len()
            ))),
            None => Ok(()),
        }
    }
}
