//! SHA-256 bindings for Merkleization.
//!
//! Every digest the engine computes flows through this module, so a bit-exact
//! accelerated SHA-256 can be substituted here without touching the tree
//! logic.

use lazy_static::lazy_static;
use sha2::{Digest, Sha256};

/// The max index that can be used with `ZERO_HASHES`.
///
/// Covers every tree depth reachable with a `usize` leaf count on 64-bit
/// targets.
pub const ZERO_HASHES_MAX_INDEX: usize = 64;

lazy_static! {
    /// Cached zero-subtree roots: `ZERO_HASHES[d]` is the root of a depth-`d`
    /// tree whose leaves are all zero chunks.
    pub static ref ZERO_HASHES: Vec<[u8; 32]> = {
        let mut hashes = vec![[0; 32]; ZERO_HASHES_MAX_INDEX + 1];

        for i in 0..ZERO_HASHES_MAX_INDEX {
            hashes[i + 1] = hash32_concat(&hashes[i], &hashes[i]);
        }

        hashes
    };
}

/// Returns the SHA-256 digest of `input`.
pub fn hash(input: &[u8]) -> Vec<u8> {
    Sha256::digest(input).to_vec()
}

/// Returns the SHA-256 digest of the 64-byte concatenation `h1 ‖ h2`.
pub fn hash32_concat(h1: &[u8], h2: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(h1);
    hasher.update(h2);
    hasher.finalize().into()
}

/// Digests a fixed-size buffer in one pass.
pub fn hash_fixed(input: &[u8]) -> [u8; 32] {
    Sha256::digest(input).into()
}
