//! Fixed, little-endian wire types for the construction collectives.

use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// A global index (u64) carried on the wire.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireIndex {
    pub id_le: u64,
}
impl WireIndex {
    pub fn of(id: u64) -> Self {
        Self { id_le: id.to_le() }
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.id_le)
    }
}

/// Decode a received byte buffer into indices.
///
/// The bytes are copied into an aligned buffer first; received `Vec<u8>`s carry
/// no alignment guarantee.
pub fn decode_indices(data: &[u8], expected: usize) -> Result<Vec<u64>, String> {
    expect_exact_len(data.len(), expected * size_of::<WireIndex>())?;
    let mut recs = vec![WireIndex::zeroed(); expected];
    cast_slice_mut(&mut recs).copy_from_slice(data);
    Ok(recs.iter().map(WireIndex::get).collect())
}

/// Encode indices for sending.
pub fn encode_indices(values: &[u64]) -> Vec<WireIndex> {
    values.iter().copied().map(WireIndex::of).collect()
}
