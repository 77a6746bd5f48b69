//! The SSZ type universe as a runtime value.
//!
//! A [`Schema`] plays the role a type parameter plays in trait-directed SSZ
//! libraries: it names one of the closed set of SSZ kinds and carries the
//! declared lengths and capacities the wire and Merkle layouts depend on.
//! Schemas are cheap to clone (composite nodes are reference-counted) and
//! implement `Eq + Hash` so the descriptor cache can key on schema identity.

use std::fmt;
use std::sync::Arc;

/// A description of an SSZ type.
///
/// Field order inside a container is authoritative: it is the wire order and
/// the Merkle field order. Field and container names never reach the wire;
/// they exist for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Schema {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    /// Fixed-length byte sequence of the given length.
    ByteVector(usize),
    /// Variable-length byte sequence with the given element limit.
    ByteList(usize),
    /// Fixed-length bit sequence of the given bit length.
    Bitvector(usize),
    /// Variable-length bit sequence with the given bit limit.
    Bitlist(usize),
    /// Fixed-length homogeneous sequence.
    Vector(Arc<Schema>, usize),
    /// Variable-length homogeneous sequence with the given element limit.
    List(Arc<Schema>, usize),
    /// Ordered tuple of named fields.
    Container(Arc<ContainerSchema>),
    /// One level of indirection. Transparent on the wire; nil is not
    /// representable in an encoding.
    Reference(Arc<Schema>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerSchema {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl Schema {
    pub fn vector(elem: Schema, len: usize) -> Self {
        Schema::Vector(Arc::new(elem), len)
    }

    pub fn list(elem: Schema, max: usize) -> Self {
        Schema::List(Arc::new(elem), max)
    }

    pub fn container(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Schema::Container(Arc::new(ContainerSchema {
            name: name.into(),
            fields,
        }))
    }

    pub fn reference(elem: Schema) -> Self {
        Schema::Reference(Arc::new(elem))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Schema::Bool => write!(f, "Bool"),
            Schema::Uint8 => write!(f, "Uint8"),
            Schema::Uint16 => write!(f, "Uint16"),
            Schema::Uint32 => write!(f, "Uint32"),
            Schema::Uint64 => write!(f, "Uint64"),
            Schema::ByteVector(len) => write!(f, "ByteVector({})", len),
            Schema::ByteList(max) => write!(f, "ByteList({})", max),
            Schema::Bitvector(len) => write!(f, "Bitvector({})", len),
            Schema::Bitlist(max) => write!(f, "Bitlist({})", max),
            Schema::Vector(elem, len) => write!(f, "Vector({}, {})", elem, len),
            Schema::List(elem, max) => write!(f, "List({}, {})", elem, max),
            Schema::Container(container) => write!(f, "Container({})", container.name),
            Schema::Reference(elem) => write!(f, "Reference({})", elem),
        }
    }
}
