//! Process-local schema cache.
//!
//! Keeps the current schema version for each (project, collection) so the
//! ingest hot path avoids a metastore round-trip. The metastore stays
//! authoritative: the cache may lag a sibling process's update, and the
//! next unknown-field lookup corrects it by re-fetching the merged schema.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::schema::{CollectionKey, SchemaRef};

/// Concurrent (project, collection) → schema map.
///
/// Schema values are immutable [`SchemaRef`]s, so readers observe either
/// the old or the new version, never a torn field list. `put` atomically
/// replaces the published version.
#[derive(Debug, Default)]
pub struct SchemaCache {
    inner: RwLock<HashMap<CollectionKey, SchemaRef>>,
}

impl SchemaCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached schema for a collection, if any.
    #[must_use]
    pub fn get(&self, key: &CollectionKey) -> Option<SchemaRef> {
        self.inner.read().get(key).cloned()
    }

    /// Publishes a schema version, replacing any previous one.
    pub fn put(&self, key: CollectionKey, schema: SchemaRef) {
        self.inner.write().insert(key, schema);
    }

    /// Number of cached collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
