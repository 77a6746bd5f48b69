//! SSZ decoding.
//!
//! Decoding mirrors the two-phase layout: walk the members of a composite in
//! declared order, consuming fixed-size members directly and collecting the
//! offsets of variable-size members, then split the variable tail into spans
//! `[offset_i, offset_i+1)` (the last span runs to the end of the input) and
//! decode each member over its span.

use crate::bitfield;
use crate::type_info::{Kind, SchemaError, TypeInfo, UintWidth};
use crate::value::Value;
use crate::BYTES_PER_LENGTH_OFFSET;
use smallvec::{smallvec, SmallVec};
use std::cmp::Ordering;

type SmallVec8<T> = SmallVec<[T; 8]>;

/// Returned when SSZ decoding fails.
#[derive(Debug, PartialEq, Clone)]
pub enum DecodeError {
    /// The input ended before the type was complete: `len` bytes were
    /// available where `expected` were required.
    Truncated { len: usize, expected: usize },
    /// The input continues past the statically-known size of the type.
    TrailingBytes { len: usize, expected: usize },
    /// An offset points somewhere its composite does not permit: into the
    /// fixed region, past the end of the input, before a preceding offset,
    /// or skipping bytes after the fixed region.
    BadOffset { offset: usize },
    /// A boolean byte other than 0x00 or 0x01.
    InvalidBool { byte: u8 },
    /// More elements, bytes or bits than the declared capacity.
    OverCapacity { len: usize, max: usize },
    /// `decode_into` was given a nil reference to write through.
    NilTarget,
    /// `decode_into` requires a reference target.
    NotAssignable { target: &'static str },
    /// The bytes were invalid for the kind, e.g. a bitlist without its
    /// terminator bit or a bitvector with stray padding bits.
    BytesInvalid(String),
    /// The schema failed classification.
    Schema(SchemaError),
}

impl From<SchemaError> for DecodeError {
    fn from(e: SchemaError) -> DecodeError {
        DecodeError::Schema(e)
    }
}

/// Reads a `BYTES_PER_LENGTH_OFFSET`-byte little-endian offset from the
/// front of `bytes`.
pub(crate) fn read_offset(bytes: &[u8]) -> Result<usize, DecodeError> {
    let offset_bytes =
        bytes
            .get(0..BYTES_PER_LENGTH_OFFSET)
            .ok_or(DecodeError::Truncated {
                len: bytes.len(),
                expected: BYTES_PER_LENGTH_OFFSET,
            })?;

    let mut array = [0; BYTES_PER_LENGTH_OFFSET];
    array.copy_from_slice(offset_bytes);

    Ok(u32::from_le_bytes(array) as usize)
}

/// Validates `offset` against the composite being decoded.
///
/// - `previous_offset`: the previously-read offset, when there is one;
///   offsets must be non-decreasing.
/// - `num_bytes`: the composite's total length; offsets cannot point past it.
/// - `num_fixed_bytes`: the fixed-region size, when already known; the first
///   offset must land exactly on the first variable byte.
pub(crate) fn sanitize_offset(
    offset: usize,
    previous_offset: Option<usize>,
    num_bytes: usize,
    num_fixed_bytes: Option<usize>,
) -> Result<usize, DecodeError> {
    if num_fixed_bytes.map_or(false, |fixed| offset < fixed) {
        Err(DecodeError::BadOffset { offset })
    } else if previous_offset.is_none()
        && num_fixed_bytes.map_or(false, |fixed| offset != fixed)
    {
        Err(DecodeError::BadOffset { offset })
    } else if offset > num_bytes {
        Err(DecodeError::BadOffset { offset })
    } else if previous_offset.map_or(false, |prev| prev > offset) {
        Err(DecodeError::BadOffset { offset })
    } else {
        Ok(offset)
    }
}

/// Decodes `bytes` as `info`, producing a fresh value.
pub(crate) fn decode_value(info: &TypeInfo, bytes: &[u8]) -> Result<Value, DecodeError> {
    match &info.kind {
        Kind::Bool => {
            expect_len(bytes, 1)?;
            match bytes[0] {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                byte => Err(DecodeError::InvalidBool { byte }),
            }
        }
        Kind::Uint { width } => {
            expect_len(bytes, width.bytes())?;
            Ok(decode_uint(*width, bytes))
        }
        Kind::ByteVector { len } => {
            expect_len(bytes, *len)?;
            Ok(Value::Bytes(bytes.to_vec()))
        }
        Kind::ByteList { max } => {
            if bytes.len() > *max {
                return Err(DecodeError::OverCapacity {
                    len: bytes.len(),
                    max: *max,
                });
            }

            Ok(Value::Bytes(bytes.to_vec()))
        }
        Kind::Bitvector { len } => {
            expect_len(bytes, len.div_ceil(8))?;
            if !bitfield::padding_bits_clear(bytes, *len) {
                return Err(DecodeError::BytesInvalid(format!(
                    "bitvector of {} bits has padding bits set",
                    len
                )));
            }

            Ok(Value::Bytes(bytes.to_vec()))
        }
        Kind::Bitlist { max } => {
            let bit_len = bitfield::bitlist_len(bytes).ok_or_else(|| {
                DecodeError::BytesInvalid("bitlist terminator bit absent".to_string())
            })?;
            if bit_len > *max {
                return Err(DecodeError::OverCapacity {
                    len: bit_len,
                    max: *max,
                });
            }

            Ok(Value::Bytes(bytes.to_vec()))
        }
        Kind::Vector { elem, len } => {
            if elem.is_variable {
                let members: Vec<&TypeInfo> = vec![elem.as_ref(); *len];
                let spans = split_members(bytes, &members)?;

                let values = spans
                    .iter()
                    .map(|span| decode_value(elem, span))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Sequence(values))
            } else {
                expect_len(bytes, elem.fixed_len * len)?;

                let values = bytes
                    .chunks(elem.fixed_len)
                    .map(|chunk| decode_value(elem, chunk))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Sequence(values))
            }
        }
        Kind::List { elem, max } => {
            if bytes.is_empty() {
                Ok(Value::Sequence(Vec::new()))
            } else if elem.is_variable {
                decode_variable_list(elem, bytes, *max)
            } else {
                if bytes.len() % elem.fixed_len != 0 {
                    return Err(DecodeError::Truncated {
                        len: bytes.len() % elem.fixed_len,
                        expected: elem.fixed_len,
                    });
                }

                let count = bytes.len() / elem.fixed_len;
                if count > *max {
                    return Err(DecodeError::OverCapacity {
                        len: count,
                        max: *max,
                    });
                }

                let values = bytes
                    .chunks(elem.fixed_len)
                    .map(|chunk| decode_value(elem, chunk))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Sequence(values))
            }
        }
        Kind::Container { fields } => {
            let members: Vec<&TypeInfo> = fields.iter().map(|f| f.info.as_ref()).collect();
            let spans = split_members(bytes, &members)?;

            let values = members
                .iter()
                .zip(&spans)
                .map(|(member, span)| decode_value(member, span))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Container(values))
        }
        Kind::Reference { elem } => Ok(Value::Reference(Some(Box::new(decode_value(
            elem, bytes,
        )?)))),
    }
}

/// Splits a composite's bytes into one span per member.
///
/// Fixed-size members take their bytes from the fixed region; variable-size
/// members occupy an offset slot there and take the span between their offset
/// and the next. The first offset must land exactly on the byte after the
/// fixed region, and a composite with no variable members must consume its
/// input exactly.
fn split_members<'a>(
    bytes: &'a [u8],
    members: &[&TypeInfo],
) -> Result<SmallVec8<&'a [u8]>, DecodeError> {
    struct Offset {
        position: usize,
        offset: usize,
    }

    let mut spans: SmallVec8<&[u8]> = smallvec![];
    let mut offsets: SmallVec8<Offset> = smallvec![];
    let mut fixed_index = 0;

    for member in members {
        if member.is_variable {
            let offset = sanitize_offset(
                read_offset(&bytes[fixed_index..])?,
                offsets.last().map(|o| o.offset),
                bytes.len(),
                None,
            )?;

            offsets.push(Offset {
                position: spans.len(),
                offset,
            });
            // Placeholder; replaced once the following offset is known.
            spans.push(&[]);
            fixed_index += BYTES_PER_LENGTH_OFFSET;
        } else {
            let end = fixed_index + member.fixed_len;
            let span = bytes.get(fixed_index..end).ok_or(DecodeError::Truncated {
                len: bytes.len(),
                expected: end,
            })?;

            spans.push(span);
            fixed_index = end;
        }
    }

    if let Some(first) = offsets.first() {
        // The first offset must point at the byte immediately after the
        // fixed region, neither into it nor past it.
        if first.offset != fixed_index {
            return Err(DecodeError::BadOffset {
                offset: first.offset,
            });
        }

        for pair in offsets.windows(2) {
            spans[pair[0].position] = &bytes[pair[0].offset..pair[1].offset];
        }
        if let Some(last) = offsets.last() {
            spans[last.position] = &bytes[last.offset..];
        }
    } else if fixed_index != bytes.len() {
        return Err(DecodeError::TrailingBytes {
            len: bytes.len(),
            expected: fixed_index,
        });
    }

    Ok(spans)
}

/// Decodes a list whose elements are themselves variable-size: the element
/// count is the first offset divided by the offset width, the remaining
/// offsets follow, and element spans are derived as for any composite.
fn decode_variable_list(
    elem: &TypeInfo,
    bytes: &[u8],
    max: usize,
) -> Result<Value, DecodeError> {
    let first_offset = read_offset(bytes)?;
    if first_offset == 0 || first_offset % BYTES_PER_LENGTH_OFFSET != 0 {
        return Err(DecodeError::BadOffset {
            offset: first_offset,
        });
    }

    let count = first_offset / BYTES_PER_LENGTH_OFFSET;
    if count > max {
        return Err(DecodeError::OverCapacity { len: count, max });
    }
    sanitize_offset(first_offset, None, bytes.len(), Some(first_offset))?;

    let mut offsets: SmallVec8<usize> = smallvec![first_offset];
    for i in 1..count {
        let offset = sanitize_offset(
            read_offset(&bytes[i * BYTES_PER_LENGTH_OFFSET..])?,
            offsets.last().copied(),
            bytes.len(),
            None,
        )?;
        offsets.push(offset);
    }

    let mut values = Vec::with_capacity(count);
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(bytes.len());
        values.push(decode_value(elem, &bytes[start..end])?);
    }

    Ok(Value::Sequence(values))
}

fn decode_uint(width: UintWidth, bytes: &[u8]) -> Value {
    match width {
        UintWidth::U8 => Value::U8(bytes[0]),
        UintWidth::U16 => {
            let mut array = [0; 2];
            array.copy_from_slice(bytes);
            Value::U16(u16::from_le_bytes(array))
        }
        UintWidth::U32 => {
            let mut array = [0; 4];
            array.copy_from_slice(bytes);
            Value::U32(u32::from_le_bytes(array))
        }
        UintWidth::U64 => {
            let mut array = [0; 8];
            array.copy_from_slice(bytes);
            Value::U64(u64::from_le_bytes(array))
        }
    }
}

/// The supplied bytes must be exactly `expected` long.
fn expect_len(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    match bytes.len().cmp(&expected) {
        Ordering::Less => Err(DecodeError::Truncated {
            len: bytes.len(),
            expected,
        }),
        Ordering::Greater => Err(DecodeError::TrailingBytes {
            len: bytes.len(),
            expected,
        }),
        Ordering::Equal => Ok(()),
    }
}
