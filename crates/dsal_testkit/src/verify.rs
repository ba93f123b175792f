//! Data patterns and verification helpers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

/// Returns `len` copies of `byte`.
pub fn filled(byte: u8, len: usize) -> Vec<u8> {
    vec![byte; len]
}

/// Returns `len` reproducible pseudo-random bytes.
pub fn pattern(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; len];
    rng.fill(buf.as_mut_slice());
    buf
}

/// Asserts that every byte of `buf[range]` equals `expected`.
///
/// The panic message names the first mismatching offset.
#[track_caller]
pub fn verify_block(buf: &[u8], range: Range<usize>, expected: u8) {
    if let Some(pos) = buf[range.clone()].iter().position(|&b| b != expected) {
        let at = range.start + pos;
        panic!(
            "byte {at} in {range:?} is {:#04x}, expected {expected:#04x}",
            buf[at]
        );
    }
}

/// Reference model of one object's logical contents.
///
/// Applies writes and resizes to a plain byte vector so the store can be
/// compared against it. Bytes never written, and bytes past the end, read as
/// zero.
#[derive(Debug, Clone, Default)]
pub struct ShadowObject {
    data: Vec<u8>,
}

impl ShadowObject {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a write.
    pub fn write(&mut self, offset: u64, buf: &[u8]) {
        let start = offset as usize;
        let end = start + buf.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(buf);
    }

    /// Applies a resize: shrinking zeroes `[new_size, old_size)`.
    pub fn resize(&mut self, old_size: u64, new_size: u64) {
        if old_size <= new_size {
            return;
        }
        let start = (new_size as usize).min(self.data.len());
        let end = (old_size as usize).min(self.data.len());
        self.data[start..end].fill(0);
    }

    /// Returns the expected contents of `[offset, offset + len)`.
    pub fn read(&self, offset: u64, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        let start = offset as usize;
        if start < self.data.len() {
            let end = (start + len).min(self.data.len());
            out[..end - start].copy_from_slice(&self.data[start..end]);
        }
        out
    }

    /// Returns the highest offset ever written.
    pub fn extent(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_reproducible() {
        assert_eq!(pattern(7, 64), pattern(7, 64));
        assert_ne!(pattern(7, 64), pattern(8, 64));
    }

    #[test]
    fn verify_block_accepts_match() {
        let mut buf = filled(0, 16);
        buf[4..8].fill(b'A');
        verify_block(&buf, 0..4, 0);
        verify_block(&buf, 4..8, b'A');
        verify_block(&buf, 8..16, 0);
    }

    #[test]
    #[should_panic(expected = "byte 5")]
    fn verify_block_reports_offset() {
        let mut buf = filled(0, 8);
        buf[5] = 1;
        verify_block(&buf, 2..8, 0);
    }

    #[test]
    fn shadow_tracks_writes_and_shrinks() {
        let mut shadow = ShadowObject::new();
        shadow.write(10, b"abcdef");
        assert_eq!(shadow.read(8, 4), b"\0\0ab");
        shadow.resize(16, 12);
        assert_eq!(shadow.read(10, 6), b"ab\0\0\0\0");
        assert_eq!(shadow.read(100, 2), vec![0, 0]);
        assert_eq!(shadow.extent(), 16);
    }
}
