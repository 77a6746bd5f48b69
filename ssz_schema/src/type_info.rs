//! Schema classification.
//!
//! A [`TypeInfo`] is the cached descriptor for one schema: whether the type
//! is fixed- or variable-size, how many bytes it occupies in a fixed region,
//! its Merkle leaf capacity, and descriptors for its element or fields. The
//! codec and the hasher dispatch over descriptors and never re-inspect the
//! schema tree.

use crate::cache;
use crate::schema::Schema;
use crate::BYTES_PER_LENGTH_OFFSET;
use std::sync::Arc;
use tree_hash::BYTES_PER_CHUNK;

/// Returned when a schema fails classification.
///
/// Classification failures are never cached; a later lookup of the same
/// schema re-runs the classifier.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SchemaError {
    /// The schema describes a type outside the SSZ universe, e.g. a
    /// zero-length vector or a container with no fields.
    UnsupportedType { schema: String },
    /// A variable-length kind declares no usable capacity.
    MissingLimit { schema: String },
    /// The schema transitively contains itself. SSZ does not admit recursive
    /// containers.
    RecursiveType { schema: String },
}

/// Classifier output for a single schema.
#[derive(Debug)]
pub struct TypeInfo {
    /// The schema this descriptor was built from; error payloads render it.
    pub(crate) schema: Schema,
    pub(crate) kind: Kind,
    /// False only for types whose encoded length is statically known.
    pub(crate) is_variable: bool,
    /// The bytes this type occupies in the fixed region of an enclosing
    /// composite: its full size when fixed, the width of an offset slot when
    /// variable.
    pub(crate) fixed_len: usize,
    /// Merkle tree leaf capacity, from the declared limit rather than any
    /// particular value.
    pub(crate) chunk_limit: usize,
}

#[derive(Debug)]
pub(crate) enum Kind {
    Bool,
    Uint { width: UintWidth },
    ByteVector { len: usize },
    ByteList { max: usize },
    Bitvector { len: usize },
    Bitlist { max: usize },
    Vector { elem: Arc<TypeInfo>, len: usize },
    List { elem: Arc<TypeInfo>, max: usize },
    Container { fields: Vec<FieldInfo> },
    Reference { elem: Arc<TypeInfo> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UintWidth {
    U8,
    U16,
    U32,
    U64,
}

impl UintWidth {
    pub(crate) fn bytes(self) -> usize {
        match self {
            UintWidth::U8 => 1,
            UintWidth::U16 => 2,
            UintWidth::U32 => 4,
            UintWidth::U64 => 8,
        }
    }
}

#[derive(Debug)]
pub(crate) struct FieldInfo {
    /// Diagnostics only; never serialized.
    pub(crate) name: String,
    pub(crate) info: Arc<TypeInfo>,
}

impl TypeInfo {
    /// Classifies `schema`, resolving sub-schemas through the descriptor
    /// cache.
    pub(crate) fn build(schema: &Schema) -> Result<TypeInfo, SchemaError> {
        check_recursion(schema, &mut Vec::new())?;

        let (kind, is_variable, fixed_len, chunk_limit) = match schema {
            Schema::Bool => (Kind::Bool, false, 1, 1),
            Schema::Uint8 => uint(UintWidth::U8),
            Schema::Uint16 => uint(UintWidth::U16),
            Schema::Uint32 => uint(UintWidth::U32),
            Schema::Uint64 => uint(UintWidth::U64),
            Schema::ByteVector(len) => {
                require_len(*len, schema)?;
                (
                    Kind::ByteVector { len: *len },
                    false,
                    *len,
                    len.div_ceil(BYTES_PER_CHUNK),
                )
            }
            Schema::ByteList(max) => {
                require_limit(*max, schema)?;
                (
                    Kind::ByteList { max: *max },
                    true,
                    BYTES_PER_LENGTH_OFFSET,
                    max.div_ceil(BYTES_PER_CHUNK),
                )
            }
            Schema::Bitvector(len) => {
                require_len(*len, schema)?;
                (
                    Kind::Bitvector { len: *len },
                    false,
                    len.div_ceil(8),
                    len.div_ceil(8 * BYTES_PER_CHUNK),
                )
            }
            Schema::Bitlist(max) => {
                require_limit(*max, schema)?;
                (
                    Kind::Bitlist { max: *max },
                    true,
                    BYTES_PER_LENGTH_OFFSET,
                    max.div_ceil(8 * BYTES_PER_CHUNK),
                )
            }
            Schema::Vector(elem_schema, len) => {
                require_len(*len, schema)?;
                let elem = cache::type_info(elem_schema)?;
                let chunk_limit = sequence_chunk_limit(&elem, *len);

                if elem.is_variable {
                    (
                        Kind::Vector {
                            elem,
                            len: *len,
                        },
                        true,
                        BYTES_PER_LENGTH_OFFSET,
                        chunk_limit,
                    )
                } else {
                    let fixed_len = elem.fixed_len * len;
                    (
                        Kind::Vector {
                            elem,
                            len: *len,
                        },
                        false,
                        fixed_len,
                        chunk_limit,
                    )
                }
            }
            Schema::List(elem_schema, max) => {
                require_limit(*max, schema)?;
                let elem = cache::type_info(elem_schema)?;
                let chunk_limit = sequence_chunk_limit(&elem, *max);

                (
                    Kind::List { elem, max: *max },
                    true,
                    BYTES_PER_LENGTH_OFFSET,
                    chunk_limit,
                )
            }
            Schema::Container(container) => {
                if container.fields.is_empty() {
                    return Err(SchemaError::UnsupportedType {
                        schema: schema.to_string(),
                    });
                }

                let mut fields = Vec::with_capacity(container.fields.len());
                for field in &container.fields {
                    fields.push(FieldInfo {
                        name: field.name.clone(),
                        info: cache::type_info(&field.schema)?,
                    });
                }

                let is_variable = fields.iter().any(|f| f.info.is_variable);
                let fixed_len = if is_variable {
                    BYTES_PER_LENGTH_OFFSET
                } else {
                    fields.iter().map(|f| f.info.fixed_len).sum()
                };
                let chunk_limit = fields.len();

                (
                    Kind::Container { fields },
                    is_variable,
                    fixed_len,
                    chunk_limit,
                )
            }
            Schema::Reference(elem_schema) => {
                let elem = cache::type_info(elem_schema)?;
                let (is_variable, fixed_len, chunk_limit) =
                    (elem.is_variable, elem.fixed_len, elem.chunk_limit);

                (
                    Kind::Reference { elem },
                    is_variable,
                    fixed_len,
                    chunk_limit,
                )
            }
        };

        Ok(TypeInfo {
            schema: schema.clone(),
            kind,
            is_variable,
            fixed_len,
            chunk_limit,
        })
    }

    /// True for the kinds whose serializations pack densely into chunks
    /// during Merkleization.
    pub(crate) fn is_basic(&self) -> bool {
        matches!(self.kind, Kind::Bool | Kind::Uint { .. })
    }
}

fn uint(width: UintWidth) -> (Kind, bool, usize, usize) {
    (Kind::Uint { width }, false, width.bytes(), 1)
}

/// Leaf capacity of a homogeneous sequence with `bound` elements: packed
/// chunks for basic elements, one leaf per element root otherwise.
fn sequence_chunk_limit(elem: &TypeInfo, bound: usize) -> usize {
    if elem.is_basic() {
        bound.saturating_mul(elem.fixed_len).div_ceil(BYTES_PER_CHUNK)
    } else {
        bound
    }
}

fn require_len(len: usize, schema: &Schema) -> Result<(), SchemaError> {
    if len == 0 {
        Err(SchemaError::UnsupportedType {
            schema: schema.to_string(),
        })
    } else {
        Ok(())
    }
}

fn require_limit(max: usize, schema: &Schema) -> Result<(), SchemaError> {
    if max == 0 {
        Err(SchemaError::MissingLimit {
            schema: schema.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Rejects schemas that transitively contain themselves.
///
/// A schema tree cannot be cyclic by construction, so recursion is what a
/// schema front-end would express it as: a container whose name recurs on
/// its own path.
fn check_recursion(schema: &Schema, stack: &mut Vec<String>) -> Result<(), SchemaError> {
    match schema {
        Schema::Vector(elem, _) | Schema::List(elem, _) | Schema::Reference(elem) => {
            check_recursion(elem, stack)
        }
        Schema::Container(container) => {
            if stack.iter().any(|name| *name == container.name) {
                return Err(SchemaError::RecursiveType {
                    schema: schema.to_string(),
                });
            }

            stack.push(container.name.clone());
            for field in &container.fields {
                check_recursion(&field.schema, stack)?;
            }
            stack.pop();

            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn info(schema: &Schema) -> Arc<TypeInfo> {
        cache::type_info(schema).unwrap()
    }

    #[test]
    fn fixed_sizes_are_statically_known() {
        assert_eq!(info(&Schema::Bool).fixed_len, 1);
        assert_eq!(info(&Schema::Uint16).fixed_len, 2);
        assert_eq!(info(&Schema::Uint64).fixed_len, 8);
        assert_eq!(info(&Schema::ByteVector(48)).fixed_len, 48);
        assert_eq!(info(&Schema::Bitvector(9)).fixed_len, 2);
        assert_eq!(info(&Schema::vector(Schema::Uint32, 5)).fixed_len, 20);

        let fixed_container = Schema::container(
            "AttestationSlot",
            vec![
                Field::new("slot", Schema::Uint64),
                Field::new("shard", Schema::Uint16),
            ],
        );
        let fixed = info(&fixed_container);
        assert!(!fixed.is_variable);
        assert_eq!(fixed.fixed_len, 10);
    }

    #[test]
    fn variable_types_occupy_an_offset_slot() {
        for schema in [
            Schema::ByteList(64),
            Schema::Bitlist(64),
            Schema::list(Schema::Uint64, 64),
            Schema::vector(Schema::list(Schema::Uint8, 4), 2),
        ] {
            let info = info(&schema);
            assert!(info.is_variable, "{}", schema);
            assert_eq!(info.fixed_len, BYTES_PER_LENGTH_OFFSET, "{}", schema);
        }
    }

    #[test]
    fn container_descriptors_keep_declared_field_order() {
        let schema = Schema::container(
            "Fork",
            vec![
                Field::new("previous_version", Schema::ByteVector(4)),
                Field::new("current_version", Schema::ByteVector(4)),
                Field::new("epoch", Schema::Uint64),
            ],
        );

        match &info(&schema).kind {
            Kind::Container { fields } => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, ["previous_version", "current_version", "epoch"]);
            }
            other => panic!("expected container descriptor, got {:?}", other),
        }
    }

    #[test]
    fn a_variable_field_makes_the_container_variable() {
        let schema = Schema::container(
            "HistoricalSummary",
            vec![
                Field::new("index", Schema::Uint64),
                Field::new("roots", Schema::list(Schema::ByteVector(32), 128)),
            ],
        );

        assert!(info(&schema).is_variable);
    }

    #[test]
    fn chunk_limits_follow_declared_capacity() {
        assert_eq!(info(&Schema::Uint64).chunk_limit, 1);
        assert_eq!(info(&Schema::ByteVector(96)).chunk_limit, 3);
        assert_eq!(info(&Schema::ByteList(1024)).chunk_limit, 32);
        assert_eq!(info(&Schema::Bitvector(256)).chunk_limit, 1);
        assert_eq!(info(&Schema::Bitlist(1024)).chunk_limit, 4);
        // Packed: 1024 elements of 8 bytes.
        assert_eq!(info(&Schema::list(Schema::Uint64, 1024)).chunk_limit, 256);
        // One leaf per composite element root.
        assert_eq!(
            info(&Schema::list(Schema::ByteVector(64), 1024)).chunk_limit,
            1024
        );
        assert_eq!(info(&Schema::vector(Schema::Uint8, 4)).chunk_limit, 1);
    }

    #[test]
    fn references_classify_as_their_element() {
        let transparent = info(&Schema::reference(Schema::Uint64));
        assert!(!transparent.is_variable);
        assert_eq!(transparent.fixed_len, 8);

        let indirect_list = info(&Schema::reference(Schema::list(Schema::Uint8, 16)));
        assert!(indirect_list.is_variable);
        assert_eq!(indirect_list.fixed_len, BYTES_PER_LENGTH_OFFSET);
    }

    #[test]
    fn zero_capacity_is_a_missing_limit() {
        for schema in [
            Schema::ByteList(0),
            Schema::Bitlist(0),
            Schema::list(Schema::Uint8, 0),
        ] {
            assert_eq!(
                cache::type_info(&schema).unwrap_err(),
                SchemaError::MissingLimit {
                    schema: schema.to_string()
                }
            );
        }
    }

    #[test]
    fn degenerate_fixed_shapes_are_unsupported() {
        for schema in [
            Schema::ByteVector(0),
            Schema::Bitvector(0),
            Schema::vector(Schema::Uint8, 0),
            Schema::container("Empty", vec![]),
        ] {
            assert_eq!(
                cache::type_info(&schema).unwrap_err(),
                SchemaError::UnsupportedType {
                    schema: schema.to_string()
                }
            );
        }
    }

    #[test]
    fn self_nested_container_names_are_recursive() {
        let inner = Schema::container("Node", vec![Field::new("leaf", Schema::Uint8)]);
        let outer = Schema::container("Node", vec![Field::new("child", inner)]);

        assert_eq!(
            cache::type_info(&outer).unwrap_err(),
            SchemaError::RecursiveType {
                schema: "Container(Node)".to_string()
            }
        );

        // The same name on disjoint paths is not recursion.
        let sibling_a = Schema::container("Leaf", vec![Field::new("v", Schema::Uint8)]);
        let sibling_b = Schema::container("Leaf", vec![Field::new("v", Schema::Uint8)]);
        let tree = Schema::container(
            "Pair",
            vec![
                Field::new("a", sibling_a),
                Field::new("b", sibling_b),
            ],
        );
        assert!(cache::type_info(&tree).is_ok());
    }
}
