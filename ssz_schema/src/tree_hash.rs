//! Hash tree roots.
//!
//! Each kind Merkleizes against the capacity its schema declares, not the
//! size of the value at hand: basic sequences pack their serializations into
//! chunks, composite sequences and containers hash one leaf per element or
//! field root, and dynamic collections mix their length into the root.

use crate::bitfield;
use crate::type_info::{Kind, SchemaError, TypeInfo, UintWidth};
use crate::value::Value;
use tree_hash::{merkleize_padded, mix_in_length, Hash256, BYTES_PER_CHUNK};

/// Returned when computing a hash tree root fails.
#[derive(Debug, PartialEq, Clone)]
pub enum HashError {
    /// More elements, bytes or bits than the declared Merkle capacity.
    OverLimit { count: usize, limit: usize },
    /// A bitlist value is missing its terminator bit.
    BadBitlist,
    /// A nil reference cannot be hashed.
    NilReference,
    /// The value variant does not belong to the schema being hashed.
    WrongValueKind {
        schema: String,
        value: &'static str,
    },
    /// A fixed-length payload or element count does not match the schema.
    InvalidLength { len: usize, expected: usize },
    /// The schema failed classification.
    Schema(SchemaError),
}

impl From<SchemaError> for HashError {
    fn from(e: SchemaError) -> HashError {
        HashError::Schema(e)
    }
}

impl From<tree_hash::Error> for HashError {
    fn from(e: tree_hash::Error) -> HashError {
        match e {
            tree_hash::Error::TooManyLeaves { leaves, limit } => HashError::OverLimit {
                count: leaves,
                limit,
            },
        }
    }
}

/// Computes the hash tree root of `value` as `info`.
pub(crate) fn value_tree_hash(info: &TypeInfo, value: &Value) -> Result<Hash256, HashError> {
    match &info.kind {
        Kind::Bool | Kind::Uint { .. } => {
            let mut packed = Vec::with_capacity(info.fixed_len);
            pack_basic(info, value, &mut packed)?;

            Ok(merkleize_padded(&packed, 1)?)
        }
        Kind::ByteVector { len } => {
            let bytes = expect_bytes(info, value)?;
            if bytes.len() != *len {
                return Err(HashError::InvalidLength {
                    len: bytes.len(),
                    expected: *len,
                });
            }

            Ok(merkleize_padded(bytes, info.chunk_limit)?)
        }
        Kind::Bitvector { len } => {
            let bytes = expect_bytes(info, value)?;
            if bytes.len() != len.div_ceil(8) {
                return Err(HashError::InvalidLength {
                    len: bytes.len(),
                    expected: len.div_ceil(8),
                });
            }

            Ok(merkleize_padded(bytes, info.chunk_limit)?)
        }
        Kind::ByteList { max } => {
            let bytes = expect_bytes(info, value)?;
            if bytes.len() > *max {
                return Err(HashError::OverLimit {
                    count: bytes.len(),
                    limit: *max,
                });
            }

            let root = merkleize_padded(bytes, info.chunk_limit)?;
            Ok(mix_in_length(&root, bytes.len()))
        }
        Kind::Bitlist { max } => {
            let bytes = expect_bytes(info, value)?;
            let (data, bit_len) =
                bitfield::bitlist_strip_terminator(bytes).ok_or(HashError::BadBitlist)?;
            if bit_len > *max {
                return Err(HashError::OverLimit {
                    count: bit_len,
                    limit: *max,
                });
            }

            let root = merkleize_padded(&data, info.chunk_limit)?;
            Ok(mix_in_length(&root, bit_len))
        }
        Kind::Vector { elem, len } => {
            let elems = expect_sequence(info, value)?;
            if elems.len() != *len {
                return Err(HashError::InvalidLength {
                    len: elems.len(),
                    expected: *len,
                });
            }

            sequence_tree_hash(elem, elems, info.chunk_limit)
        }
        Kind::List { elem, max } => {
            let elems = expect_sequence(info, value)?;
            if elems.len() > *max {
                return Err(HashError::OverLimit {
                    count: elems.len(),
                    limit: *max,
                });
            }

            let root = sequence_tree_hash(elem, elems, info.chunk_limit)?;
            Ok(mix_in_length(&root, elems.len()))
        }
        Kind::Container { fields } => {
            let values = expect_container(info, value)?;
            if values.len() != fields.len() {
                return Err(HashError::InvalidLength {
                    len: values.len(),
                    expected: fields.len(),
                });
            }

            let mut leaves = Vec::with_capacity(fields.len() * BYTES_PER_CHUNK);
            for (field, value) in fields.iter().zip(values) {
                leaves.extend_from_slice(value_tree_hash(&field.info, value)?.as_bytes());
            }

            Ok(merkleize_padded(&leaves, fields.len())?)
        }
        Kind::Reference { elem } => match value {
            Value::Reference(Some(inner)) => value_tree_hash(elem, inner),
            Value::Reference(None) => Err(HashError::NilReference),
            _ => Err(wrong_kind(info, value)),
        },
    }
}

/// Hashes a homogeneous sequence: basic elements pack densely, composite
/// elements contribute one root-sized leaf each.
fn sequence_tree_hash(
    elem: &TypeInfo,
    elems: &[Value],
    chunk_limit: usize,
) -> Result<Hash256, HashError> {
    if elem.is_basic() {
        let mut packed = Vec::with_capacity(elems.len() * elem.fixed_len);
        for value in elems {
            pack_basic(elem, value, &mut packed)?;
        }

        Ok(merkleize_padded(&packed, chunk_limit)?)
    } else {
        let mut leaves = Vec::with_capacity(elems.len() * BYTES_PER_CHUNK);
        for value in elems {
            leaves.extend_from_slice(value_tree_hash(elem, value)?.as_bytes());
        }

        Ok(merkleize_padded(&leaves, chunk_limit)?)
    }
}

/// The packed encoding of a basic value, identical to its serialization.
fn pack_basic(info: &TypeInfo, value: &Value, buf: &mut Vec<u8>) -> Result<(), HashError> {
    match (&info.kind, value) {
        (Kind::Bool, Value::Bool(v)) => buf.push(*v as u8),
        (Kind::Uint { width: UintWidth::U8 }, Value::U8(v)) => {
            buf.extend_from_slice(&v.to_le_bytes())
        }
        (Kind::Uint { width: UintWidth::U16 }, Value::U16(v)) => {
            buf.extend_from_slice(&v.to_le_bytes())
        }
        (Kind::Uint { width: UintWidth::U32 }, Value::U32(v)) => {
            buf.extend_from_slice(&v.to_le_bytes())
        }
        (Kind::Uint { width: UintWidth::U64 }, Value::U64(v)) => {
            buf.extend_from_slice(&v.to_le_bytes())
        }
        _ => return Err(wrong_kind(info, value)),
    }

    Ok(())
}

fn expect_bytes<'v>(info: &TypeInfo, value: &'v Value) -> Result<&'v [u8], HashError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        _ => Err(wrong_kind(info, value)),
    }
}

fn expect_sequence<'v>(info: &TypeInfo, value: &'v Value) -> Result<&'v [Value], HashError> {
    match value {
        Value::Sequence(elems) => Ok(elems),
        _ => Err(wrong_kind(info, value)),
    }
}

fn expect_container<'v>(info: &TypeInfo, value: &'v Value) -> Result<&'v [Value], HashError> {
    match value {
        Value::Container(values) => Ok(values),
        _ => Err(wrong_kind(info, value)),
    }
}

fn wrong_kind(info: &TypeInfo, value: &Value) -> HashError {
    HashError::WrongValueKind {
        schema: info.schema.to_string(),
        value: value.kind_name(),
    }
}
