//! Property-based test generators using proptest.
//!
//! Requests are generated relative to small block sizes so that edges,
//! boundaries and multi-block spans all show up in a few hundred cases.

use dsal_storage::ObjectId;
use proptest::prelude::*;

/// Strategy for object IDs.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform16(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for block sizes, including ones that are not powers of two.
pub fn block_size_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(16usize), Just(64), Just(100), Just(512), Just(4096)]
}

/// A byte-range write request.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// Target offset.
    pub offset: u64,
    /// Bytes to write.
    pub data: Vec<u8>,
}

/// Strategy for `(offset, len)` pairs within `blocks` blocks of `block_size`.
///
/// Offsets and lengths are biased toward block boundaries and their
/// neighbours.
pub fn range_strategy(block_size: usize, blocks: u64) -> impl Strategy<Value = (u64, usize)> {
    let bs = block_size as u64;
    let limit = bs * blocks;
    let near_boundary = (0..blocks, -1i64..=1).prop_map(move |(block, delta)| {
        (block * bs).saturating_add_signed(delta).min(limit - 1)
    });
    let offset = prop_oneof![near_boundary, 0..limit];
    offset.prop_flat_map(move |offset| {
        let max_len = (limit - offset) as usize;
        (Just(offset), 1..=max_len)
    })
}

/// Strategy for a write request within `blocks` blocks of `block_size`.
pub fn write_request_strategy(block_size: usize, blocks: u64) -> impl Strategy<Value = WriteRequest> {
    range_strategy(block_size, blocks).prop_flat_map(|(offset, len)| {
        prop::collection::vec(any::<u8>(), len).prop_map(move |data| WriteRequest { offset, data })
    })
}

/// Strategy for a block size together with a write sequence.
pub fn write_sequence_strategy(max_writes: usize) -> impl Strategy<Value = (usize, Vec<WriteRequest>)> {
    block_size_strategy().prop_flat_map(move |bs| {
        (
            Just(bs),
            prop::collection::vec(write_request_strategy(bs, 6), 1..=max_writes),
        )
    })
}
