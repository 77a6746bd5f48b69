//! Byte-backed bitfield helpers.
//!
//! Bits are indexed least-significant first within each byte. A serialized
//! bitlist carries one extra `true` bit immediately after its data bits (the
//! terminator); the terminator is the highest set bit of the final byte, so a
//! bitlist whose last byte is zero is malformed.

/// Serializes `bits` as a bitlist, appending the terminator bit.
pub fn bitlist_from_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0; bits.len() / 8 + 1];

    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes[bits.len() / 8] |= 1 << (bits.len() % 8);

    bytes
}

/// Serializes `bits` as a bitvector of exactly `bits.len()` bits.
pub fn bitvector_from_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0; bits.len().div_ceil(8)];

    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }

    bytes
}

/// Returns the number of data bits in a serialized bitlist, or `None` when
/// the terminator bit is absent.
pub fn bitlist_len(bytes: &[u8]) -> Option<usize> {
    let last = *bytes.last()?;
    if last == 0 {
        return None;
    }

    Some((bytes.len() - 1) * 8 + highest_set_bit(last))
}

/// Splits a serialized bitlist into its data bytes (terminator cleared and
/// trailing byte dropped if the terminator occupied it alone) and its bit
/// length. `None` when the terminator bit is absent.
pub(crate) fn bitlist_strip_terminator(bytes: &[u8]) -> Option<(Vec<u8>, usize)> {
    let len = bitlist_len(bytes)?;

    let mut data = bytes.to_vec();
    data[len / 8] &= !(1 << (len % 8));
    data.truncate(len.div_ceil(8));

    Some((data, len))
}

/// True when every bit at index `bit_len` or above is clear, i.e. the byte
/// padding of a `bit_len`-bit bitvector is canonical.
pub(crate) fn padding_bits_clear(bytes: &[u8], bit_len: usize) -> bool {
    if bit_len % 8 == 0 {
        return true;
    }

    match bytes.last() {
        Some(last) => last >> (bit_len % 8) == 0,
        None => true,
    }
}

fn highest_set_bit(byte: u8) -> usize {
    7 - byte.leading_zeros() as usize
}
