//! Merkleization primitives for the SimpleSerialize (SSZ) scheme used in
//! Ethereum 2.0.
//!
//! Provides chunk packing, the bottom-up binary tree hash over a declared
//! leaf capacity, and the length mix-in used by variable-length values.
//! Hashing is SHA-256 throughout, routed via the [`hashing`] module.

pub mod hashing;
mod merkleize_padded;

pub use hashing::{hash, hash32_concat, hash_fixed, ZERO_HASHES, ZERO_HASHES_MAX_INDEX};
pub use merkleize_padded::merkleize_padded;

pub const BYTES_PER_CHUNK: usize = 32;

pub type Hash256 = ethereum_types::H256;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// The chunks to be hashed do not fit in a tree with the declared number
    /// of leaves.
    TooManyLeaves { leaves: usize, limit: usize },
}

/// Right-pads `bytes` with zeros to a whole number of chunks.
///
/// The empty input packs to a single zero chunk.
pub fn pack(bytes: &[u8]) -> Vec<u8> {
    let padded_len = std::cmp::max(1, bytes.len().div_ceil(BYTES_PER_CHUNK)) * BYTES_PER_CHUNK;

    let mut packed = Vec::with_capacity(padded_len);
    packed.extend_from_slice(bytes);
    packed.resize(padded_len, 0);
    packed
}

/// Returns the node created by hashing `root` and `length`.
///
/// Used for inserting the length of a list above its root. The length is
/// an unsigned 64-bit count in the low 8 bytes of the chunk, little-endian;
/// the upper 24 bytes are zero.
pub fn mix_in_length(root: &Hash256, length: usize) -> Hash256 {
    let mut length_bytes = [0; BYTES_PER_CHUNK];
    length_bytes[0..8].copy_from_slice(&(length as u64).to_le_bytes());

    Hash256::from_slice(&hashing::hash32_concat(root.as_bytes(), &length_bytes))
}

/// Returns a cached padding node for a given height.
pub(crate) fn get_zero_hash(height: usize) -> &'static [u8] {
    if height <= ZERO_HASHES_MAX_INDEX {
        &ZERO_HASHES[height]
    } else {
        panic!("Tree exceeds MAX_TREE_DEPTH of {}", ZERO_HASHES_MAX_INDEX)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mix_length() {
        let hash = {
            let mut preimage = vec![42; BYTES_PER_CHUNK];
            preimage.append(&mut vec![42]);
            preimage.append(&mut vec![0; BYTES_PER_CHUNK - 1]);
            hashing::hash(&preimage)
        };

        assert_eq!(
            mix_in_length(&Hash256::from_slice(&[42; BYTES_PER_CHUNK]), 42).as_bytes(),
            &hash[..]
        );
    }

    #[test]
    fn mix_length_is_width_exact() {
        // The count occupies only the low 8 bytes of the mixed-in chunk.
        let root = Hash256::zero();
        let mut chunk = [0; BYTES_PER_CHUNK];
        chunk[0..8].copy_from_slice(&u64::MAX.to_le_bytes());

        assert_eq!(
            mix_in_length(&root, u64::MAX as usize).as_bytes(),
            &hashing::hash32_concat(root.as_bytes(), &chunk)[..]
        );
    }

    #[test]
    fn pack_pads_to_chunk_alignment() {
        assert_eq!(pack(&[]), vec![0; 32]);
        assert_eq!(pack(&[1]).len(), 32);
        assert_eq!(pack(&[1])[0], 1);
        assert_eq!(pack(&[7; 32]), vec![7; 32]);
        assert_eq!(pack(&[7; 33]).len(), 64);
    }

    #[test]
    fn pack_is_idempotent_on_aligned_input() {
        for aligned in [vec![], vec![9; 32], vec![9; 64]] {
            let once = pack(&aligned);
            assert_eq!(pack(&once), once);
        }
    }
}
