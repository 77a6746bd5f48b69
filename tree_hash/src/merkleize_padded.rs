use crate::hashing::hash32_concat;
use crate::{get_zero_hash, pack, Error, Hash256, BYTES_PER_CHUNK};

/// Merkleize `bytes` against a tree with `leaf_limit` leaves.
///
/// The tree conceptually has `leaf_limit.next_power_of_two()` leaves; leaves
/// beyond the chunks of `bytes` are zero. Whole zero subtrees are substituted
/// from the cached zero-hash table rather than hashed, so the cost is
/// proportional to the data supplied, not to the declared limit.
///
/// A tree with a single leaf returns that chunk unchanged. The empty input
/// hashes as a tree of zero leaves.
///
/// ## Errors
///
/// Returns `Error::TooManyLeaves` when `bytes` spans more chunks than
/// `leaf_limit`.
pub fn merkleize_padded(bytes: &[u8], leaf_limit: usize) -> Result<Hash256, Error> {
    let leaves = bytes.len().div_ceil(BYTES_PER_CHUNK);
    if leaves > leaf_limit {
        return Err(Error::TooManyLeaves {
            leaves,
            limit: leaf_limit,
        });
    }

    let depth = padded_depth(leaf_limit);

    let packed = pack(bytes);
    let mut layer: Vec<[u8; BYTES_PER_CHUNK]> = packed
        .chunks_exact(BYTES_PER_CHUNK)
        .map(|chunk| {
            let mut leaf = [0; BYTES_PER_CHUNK];
            leaf.copy_from_slice(chunk);
            leaf
        })
        .collect();

    for height in 0..depth {
        let mut parents = Vec::with_capacity(layer.len().div_ceil(2));

        for pair in layer.chunks(2) {
            let parent = if let [left, right] = pair {
                hash32_concat(left, right)
            } else {
                // Odd node out: the absent right sibling heads an all-zero
                // subtree at this height.
                hash32_concat(&pair[0], get_zero_hash(height))
            };
            parents.push(parent);
        }

        layer = parents;
    }

    Ok(Hash256::from_slice(&layer[0]))
}

/// The depth of a tree padded out to `leaf_limit` leaves: `ceil(log2(limit))`,
/// where a limit of zero or one yields a zero-depth (single node) tree.
fn padded_depth(leaf_limit: usize) -> usize {
    if leaf_limit <= 1 {
        0
    } else {
        (usize::BITS - (leaf_limit - 1).leading_zeros()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZERO_HASHES;

    /// Reference rendition: materialize every zero leaf and hash the full
    /// padded tree.
    fn merkleize_naive(bytes: &[u8], leaf_limit: usize) -> Hash256 {
        let packed = pack(bytes);
        let mut layer: Vec<Vec<u8>> = packed.chunks(BYTES_PER_CHUNK).map(|c| c.to_vec()).collect();

        layer.resize(
            std::cmp::max(1, leaf_limit.next_power_of_two()),
            vec![0; BYTES_PER_CHUNK],
        );

        while layer.len() > 1 {
            layer = layer
                .chunks(2)
                .map(|pair| hash32_concat(&pair[0], &pair[1]).to_vec())
                .collect();
        }

        Hash256::from_slice(&layer[0])
    }

    #[test]
    fn single_chunk_is_identity() {
        let chunk = [13; 32];

        assert_eq!(
            merkleize_padded(&chunk, 1),
            Ok(Hash256::from_slice(&chunk))
        );
    }

    #[test]
    fn short_input_is_right_padded() {
        let root = merkleize_padded(&[1, 2, 3], 1).unwrap();

        let mut expected = [0; 32];
        expected[0..3].copy_from_slice(&[1, 2, 3]);
        assert_eq!(root, Hash256::from_slice(&expected));
    }

    #[test]
    fn two_leaves() {
        let bytes = [leaf_of(0), leaf_of(1)].concat();

        assert_eq!(
            merkleize_padded(&bytes, 2).unwrap().as_bytes(),
            &hash32_concat(&leaf_of(0), &leaf_of(1))[..]
        );
    }

    #[test]
    fn three_leaves_in_a_four_leaf_tree() {
        let bytes = [leaf_of(0), leaf_of(1), leaf_of(2)].concat();

        let left = hash32_concat(&leaf_of(0), &leaf_of(1));
        let right = hash32_concat(&leaf_of(2), &ZERO_HASHES[0]);

        assert_eq!(
            merkleize_padded(&bytes, 4).unwrap().as_bytes(),
            &hash32_concat(&left, &right)[..]
        );
    }

    #[test]
    fn empty_input_yields_zero_subtree_root() {
        assert_eq!(
            merkleize_padded(&[], 8).unwrap().as_bytes(),
            &ZERO_HASHES[3][..]
        );
        assert_eq!(
            merkleize_padded(&[], 256).unwrap().as_bytes(),
            &ZERO_HASHES[8][..]
        );
    }

    #[test]
    fn appended_zero_chunks_do_not_change_the_root() {
        let bytes = [leaf_of(7), leaf_of(8)].concat();

        let base = merkleize_padded(&bytes, 8).unwrap();

        for extra in 1..=6 {
            let mut padded = bytes.clone();
            padded.extend(vec![0; extra * BYTES_PER_CHUNK]);
            assert_eq!(merkleize_padded(&padded, 8).unwrap(), base);
        }
    }

    #[test]
    fn over_limit_is_rejected() {
        assert_eq!(
            merkleize_padded(&[0; 96], 2),
            Err(Error::TooManyLeaves {
                leaves: 3,
                limit: 2
            })
        );
    }

    #[test]
    fn matches_naive_rendition() {
        for (chunks, limit) in [(0, 4), (1, 1), (1, 16), (2, 2), (3, 8), (5, 8), (8, 8), (9, 32)] {
            let bytes: Vec<u8> = (0..chunks).flat_map(|i| leaf_of(i as u8)).collect();

            assert_eq!(
                merkleize_padded(&bytes, limit).unwrap(),
                merkleize_naive(&bytes, limit),
                "chunks {} limit {}",
                chunks,
                limit
            );
        }
    }

    fn leaf_of(fill: u8) -> [u8; 32] {
        [fill; 32]
    }
}
