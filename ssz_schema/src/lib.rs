//! Schema-driven encoding (serialization), decoding (deserialization) and
//! hash tree roots in the SimpleSerialize (SSZ) format designed for use in
//! Ethereum 2.0.
//!
//! Adheres to the Ethereum 2.0 [SSZ
//! specification](https://github.com/ethereum/eth2.0-specs/blob/dev/ssz/simple-serialize.md)
//! at the Phase 0 release: little-endian integers, four-byte offsets, an
//! offset-interleaved fixed region, and capacity-padded Merkleization.
//!
//! Types are described at run time by a [`Schema`] and carried as dynamic
//! [`Value`]s; the first use of a schema classifies it and caches a
//! descriptor, so repeat encodes and decodes pay only a map lookup.
//!
//! ## Example
//!
//! ```rust
//! use ssz_schema::{decode, encode, hash_tree_root, Field, Schema, Value};
//!
//! let schema = Schema::container(
//!     "Foo",
//!     vec![
//!         Field::new("a", Schema::Uint64),
//!         Field::new("b", Schema::list(Schema::Uint16, 8)),
//!     ],
//! );
//!
//! let foo = Value::Container(vec![
//!     Value::U64(42),
//!     Value::Sequence(vec![Value::U16(1), Value::U16(3), Value::U16(3), Value::U16(7)]),
//! ]);
//!
//! let bytes = encode(&foo, &schema).unwrap();
//! assert_eq!(decode(&bytes, &schema).unwrap(), foo);
//!
//! let root = hash_tree_root(&foo, &schema).unwrap();
//! assert_eq!(root.as_bytes().len(), 32);
//! ```

pub mod bitfield;
mod cache;
mod decode;
mod encode;
mod schema;
mod tree_hash;
mod type_info;
mod value;

pub use crate::decode::DecodeError;
pub use crate::encode::EncodeError;
pub use crate::schema::{ContainerSchema, Field, Schema};
pub use crate::tree_hash::HashError;
pub use crate::type_info::SchemaError;
pub use crate::value::Value;
pub use ::tree_hash::Hash256;

/// The number of bytes used to represent an offset.
pub const BYTES_PER_LENGTH_OFFSET: usize = 4;
/// The maximum value that can be represented using `BYTES_PER_LENGTH_OFFSET`.
#[cfg(target_pointer_width = "32")]
pub const MAX_LENGTH_VALUE: usize = (u32::MAX >> (8 * (4 - BYTES_PER_LENGTH_OFFSET))) as usize;
#[cfg(target_pointer_width = "64")]
pub const MAX_LENGTH_VALUE: usize = (u64::MAX >> (8 * (8 - BYTES_PER_LENGTH_OFFSET))) as usize;

/// Serializes `value` as `schema`.
///
/// The output buffer is pre-sized to the exact encoded length.
pub fn encode(value: &Value, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
    let info = cache::type_info(schema)?;

    let mut buf = Vec::with_capacity(encode::encoded_len(&info, value));
    encode::encode_value(&info, value, &mut buf)?;

    Ok(buf)
}

/// Decodes `bytes` as `schema` into a fresh value.
///
/// The supplied bytes must be the exact encoding of one value; excess bytes
/// are an error.
pub fn decode(bytes: &[u8], schema: &Schema) -> Result<Value, DecodeError> {
    let info = cache::type_info(schema)?;

    decode::decode_value(&info, bytes)
}

/// Decodes `bytes` as `schema` through the reference in `out`.
///
/// The target must be a non-nil [`Value::Reference`]; its pointee is
/// replaced on success and untouched on failure.
pub fn decode_into(bytes: &[u8], schema: &Schema, out: &mut Value) -> Result<(), DecodeError> {
    match out {
        Value::Reference(Some(target)) => {
            **target = decode(bytes, schema)?;
            Ok(())
        }
        Value::Reference(None) => Err(DecodeError::NilTarget),
        other => Err(DecodeError::NotAssignable {
            target: other.kind_name(),
        }),
    }
}

/// Computes the 32-byte Merkle commitment binding `value` under `schema`.
pub fn hash_tree_root(value: &Value, schema: &Schema) -> Result<Hash256, HashError> {
    let info = cache::type_info(schema)?;

    crate::tree_hash::value_tree_hash(&info, value)
}
