//! SSZ encoding.
//!
//! A composite serializes as its fixed region followed by its variable tail:
//! fixed-size members lay their bytes down in declared order, variable-size
//! members contribute a four-byte little-endian offset in the fixed region
//! and append their bytes to the tail. Offsets are relative to the start of
//! the composite and interleave with fixed members at each variable member's
//! position.

use crate::bitfield;
use crate::type_info::{Kind, SchemaError, TypeInfo, UintWidth};
use crate::value::Value;
use crate::{BYTES_PER_LENGTH_OFFSET, MAX_LENGTH_VALUE};

/// Returned when SSZ encoding fails.
#[derive(Debug, PartialEq, Clone)]
pub enum EncodeError {
    /// A list, byte list or bitlist holds more elements than its declared
    /// capacity.
    OverCapacity { len: usize, max: usize },
    /// An offset would not fit in `BYTES_PER_LENGTH_OFFSET` bytes.
    OffsetOverflow { offset: usize },
    /// A nil reference occupies an encoding position. Nil references are not
    /// representable on the wire.
    NilReference,
    /// The value variant does not belong to the schema being encoded.
    WrongValueKind {
        schema: String,
        value: &'static str,
    },
    /// A fixed-length payload or element count does not match the schema.
    InvalidLength { len: usize, expected: usize },
    /// A bitlist value is missing its terminator bit.
    BadBitlist,
    /// The schema failed classification.
    Schema(SchemaError),
}

impl From<SchemaError> for EncodeError {
    fn from(e: SchemaError) -> EncodeError {
        EncodeError::Schema(e)
    }
}

/// Encodes an offset value as it appears in a fixed region.
pub(crate) fn encode_length(len: usize) -> [u8; BYTES_PER_LENGTH_OFFSET] {
    debug_assert!(len <= MAX_LENGTH_VALUE);
    (len as u32).to_le_bytes()
}

/// Builds the two-phase layout of one composite.
///
/// Append members in declared order; `finalize` splices the variable tail
/// onto the fixed region. Offsets are checked against `MAX_LENGTH_VALUE`
/// before they are written, so an oversized tail fails the encode instead of
/// wrapping.
pub(crate) struct SszEncoder<'a> {
    /// Size of the fixed region, which is also the offset of the first
    /// variable byte.
    offset: usize,
    buf: &'a mut Vec<u8>,
    variable_bytes: Vec<u8>,
}

impl<'a> SszEncoder<'a> {
    pub(crate) fn container(buf: &'a mut Vec<u8>, num_fixed_bytes: usize) -> Self {
        buf.reserve(num_fixed_bytes);
        Self {
            offset: num_fixed_bytes,
            buf,
            variable_bytes: Vec::new(),
        }
    }

    pub(crate) fn append(&mut self, info: &TypeInfo, value: &Value) -> Result<(), EncodeError> {
        if info.is_variable {
            let offset = self.offset + self.variable_bytes.len();
            if offset > MAX_LENGTH_VALUE {
                return Err(EncodeError::OffsetOverflow { offset });
            }

            self.buf.extend_from_slice(&encode_length(offset));
            encode_value(info, value, &mut self.variable_bytes)
        } else {
            encode_value(info, value, self.buf)
        }
    }

    pub(crate) fn finalize(&mut self) -> &mut Vec<u8> {
        self.buf.append(&mut self.variable_bytes);
        self.buf
    }
}

/// Serializes `value` as `info` onto the end of `buf`.
pub(crate) fn encode_value(
    info: &TypeInfo,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match &info.kind {
        Kind::Bool => match value {
            Value::Bool(v) => {
                buf.push(*v as u8);
                Ok(())
            }
            _ => Err(wrong_kind(info, value)),
        },
        Kind::Uint { width } => encode_uint(info, *width, value, buf),
        Kind::ByteVector { len } => {
            let bytes = expect_bytes(info, value)?;
            if bytes.len() != *len {
                return Err(EncodeError::InvalidLength {
                    len: bytes.len(),
                    expected: *len,
                });
            }

            buf.extend_from_slice(bytes);
            Ok(())
        }
        Kind::ByteList { max } => {
            let bytes = expect_bytes(info, value)?;
            if bytes.len() > *max {
                return Err(EncodeError::OverCapacity {
                    len: bytes.len(),
                    max: *max,
                });
            }

            buf.extend_from_slice(bytes);
            Ok(())
        }
        Kind::Bitvector { len } => {
            let bytes = expect_bytes(info, value)?;
            if bytes.len() != len.div_ceil(8) {
                return Err(EncodeError::InvalidLength {
                    len: bytes.len(),
                    expected: len.div_ceil(8),
                });
            }

            buf.extend_from_slice(bytes);
            Ok(())
        }
        Kind::Bitlist { max } => {
            let bytes = expect_bytes(info, value)?;
            let bit_len = bitfield::bitlist_len(bytes).ok_or(EncodeError::BadBitlist)?;
            if bit_len > *max {
                return Err(EncodeError::OverCapacity {
                    len: bit_len,
                    max: *max,
                });
            }

            buf.extend_from_slice(bytes);
            Ok(())
        }
        Kind::Vector { elem, len } => {
            let elems = expect_sequence(info, value)?;
            if elems.len() != *len {
                return Err(EncodeError::InvalidLength {
                    len: elems.len(),
                    expected: *len,
                });
            }

            encode_sequence(elem, elems, buf)
        }
        Kind::List { elem, max } => {
            let elems = expect_sequence(info, value)?;
            if elems.len() > *max {
                return Err(EncodeError::OverCapacity {
                    len: elems.len(),
                    max: *max,
                });
            }

            encode_sequence(elem, elems, buf)
        }
        Kind::Container { fields } => {
            let values = expect_container(info, value)?;
            if values.len() != fields.len() {
                return Err(EncodeError::InvalidLength {
                    len: values.len(),
                    expected: fields.len(),
                });
            }

            let num_fixed_bytes = fields.iter().map(|f| f.info.fixed_len).sum();
            let mut encoder = SszEncoder::container(buf, num_fixed_bytes);
            for (field, value) in fields.iter().zip(values) {
                encoder.append(&field.info, value)?;
            }
            encoder.finalize();

            Ok(())
        }
        Kind::Reference { elem } => match value {
            Value::Reference(Some(inner)) => encode_value(elem, inner, buf),
            Value::Reference(None) => Err(EncodeError::NilReference),
            _ => Err(wrong_kind(info, value)),
        },
    }
}

fn encode_sequence(
    elem: &TypeInfo,
    elems: &[Value],
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    if elem.is_variable {
        let mut encoder =
            SszEncoder::container(buf, elems.len() * BYTES_PER_LENGTH_OFFSET);
        for value in elems {
            encoder.append(elem, value)?;
        }
        encoder.finalize();
    } else {
        buf.reserve(elem.fixed_len * elems.len());
        for value in elems {
            encode_value(elem, value, buf)?;
        }
    }

    Ok(())
}

fn encode_uint(
    info: &TypeInfo,
    width: UintWidth,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match (width, value) {
        (UintWidth::U8, Value::U8(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (UintWidth::U16, Value::U16(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (UintWidth::U32, Value::U32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (UintWidth::U64, Value::U64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        _ => return Err(wrong_kind(info, value)),
    }

    Ok(())
}

/// The exact encoded length of `value`, used to pre-size output buffers.
///
/// Shape mismatches contribute zero; the encode itself reports them.
pub(crate) fn encoded_len(info: &TypeInfo, value: &Value) -> usize {
    if !info.is_variable {
        return info.fixed_len;
    }

    match (&info.kind, value) {
        (Kind::ByteList { .. } | Kind::Bitlist { .. }, Value::Bytes(bytes)) => bytes.len(),
        (Kind::Vector { elem, .. } | Kind::List { elem, .. }, Value::Sequence(elems)) => {
            if elem.is_variable {
                elems
                    .iter()
                    .map(|e| BYTES_PER_LENGTH_OFFSET + encoded_len(elem, e))
                    .sum()
            } else {
                elem.fixed_len * elems.len()
            }
        }
        (Kind::Container { fields }, Value::Container(values))
            if fields.len() == values.len() =>
        {
            fields
                .iter()
                .zip(values)
                .map(|(field, value)| {
                    if field.info.is_variable {
                        BYTES_PER_LENGTH_OFFSET + encoded_len(&field.info, value)
                    } else {
                        field.info.fixed_len
                    }
                })
                .sum()
        }
        (Kind::Reference { elem }, Value::Reference(Some(inner))) => encoded_len(elem, inner),
        _ => 0,
    }
}

fn expect_bytes<'v>(info: &TypeInfo, value: &'v Value) -> Result<&'v [u8], EncodeError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        _ => Err(wrong_kind(info, value)),
    }
}

fn expect_sequence<'v>(info: &TypeInfo, value: &'v Value) -> Result<&'v [Value], EncodeError> {
    match value {
        Value::Sequence(elems) => Ok(elems),
        _ => Err(wrong_kind(info, value)),
    }
}

fn expect_container<'v>(info: &TypeInfo, value: &'v Value) -> Result<&'v [Value], EncodeError> {
    match value {
        Value::Container(values) => Ok(values),
        _ => Err(wrong_kind(info, value)),
    }
}

fn wrong_kind(info: &TypeInfo, value: &Value) -> EncodeError {
    EncodeError::WrongValueKind {
        schema: info.schema.to_string(),
        value: value.kind_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache, Schema};

    fn encode(value: &Value, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
        crate::encode(value, schema)
    }

    #[test]
    fn uints_are_little_endian() {
        assert_eq!(encode(&Value::U8(1), &Schema::Uint8).unwrap(), vec![1]);
        assert_eq!(
            encode(&Value::U16(0x0100), &Schema::Uint16).unwrap(),
            vec![0, 1]
        );
        assert_eq!(
            encode(&Value::U32(1), &Schema::Uint32).unwrap(),
            vec![1, 0, 0, 0]
        );
        assert_eq!(
            encode(&Value::U64(!0), &Schema::Uint64).unwrap(),
            vec![255; 8]
        );
    }

    #[test]
    fn bool_is_one_byte() {
        assert_eq!(encode(&Value::Bool(true), &Schema::Bool).unwrap(), vec![1]);
        assert_eq!(encode(&Value::Bool(false), &Schema::Bool).unwrap(), vec![0]);
    }

    #[test]
    fn wrong_variant_is_rejected() {
        assert_eq!(
            encode(&Value::Bool(true), &Schema::Uint64).unwrap_err(),
            EncodeError::WrongValueKind {
                schema: "Uint64".to_string(),
                value: "Bool",
            }
        );
    }

    #[test]
    fn pre_sized_buffer_is_exact() {
        let schema = Schema::list(Schema::list(Schema::Uint16, 4), 4);
        let value = Value::Sequence(vec![
            Value::Sequence(vec![Value::U16(1), Value::U16(2)]),
            Value::Sequence(vec![]),
        ]);

        let info = cache::type_info(&schema).unwrap();
        let bytes = encode(&value, &schema).unwrap();

        assert_eq!(encoded_len(&info, &value), bytes.len());
    }
}
