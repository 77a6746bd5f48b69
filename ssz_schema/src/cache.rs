//! Process-wide descriptor cache.
//!
//! The first use of a schema pays for a full classification; every later use
//! is a read-locked map hit. The read lock is dropped before a descriptor is
//! built so that recursive lookups for sub-schemas cannot deadlock, and the
//! write lock is taken only to publish. When two threads race to build the
//! same schema the first publication wins and the loser's descriptor is
//! discarded. Published descriptors are immutable for the life of the
//! process; classification failures are never published.

use crate::schema::Schema;
use crate::type_info::{SchemaError, TypeInfo};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    static ref TYPE_INFO_CACHE: RwLock<HashMap<Schema, Arc<TypeInfo>>> =
        RwLock::new(HashMap::new());
}

/// Returns the memoized descriptor for `schema`, building it on first use.
pub(crate) fn type_info(schema: &Schema) -> Result<Arc<TypeInfo>, SchemaError> {
    if let Some(info) = TYPE_INFO_CACHE.read().get(schema) {
        return Ok(info.clone());
    }

    // No lock is held here: `TypeInfo::build` recurses through this function
    // for element and field schemas.
    let built = Arc::new(TypeInfo::build(schema)?);

    let mut cache = TYPE_INFO_CACHE.write();
    Ok(cache.entry(schema.clone()).or_insert(built).clone())
}
