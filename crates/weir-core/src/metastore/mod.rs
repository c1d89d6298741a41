//! Metastore contract and the bundled in-memory implementation.
//!
//! The metastore is the durable authority for collection schemas. The
//! key operation is [`Metastore::create_or_get_collection_fields`], an
//! idempotent set-union merge: concurrent callers extending the same
//! collection with disjoint fields must both succeed, and the returned
//! schema is the canonical post-merge version.

mod memory;

pub use memory::InMemoryMetastore;

use std::collections::HashMap;

use crate::error::SchemaResult;
use crate::schema::{SchemaField, SchemaRef};

/// Callback fired when a merge call brings a collection into existence.
///
/// Receives the project and the canonical collection name, on the thread
/// that triggered the creation.
pub type OnCreateCollection<'a> = &'a (dyn Fn(&str, &str) + Sync);

/// Durable schema authority for all projects and collections.
///
/// Implementations must serialize concurrent merges per collection and
/// must preserve existing field positions when extending a schema.
pub trait Metastore: Send + Sync {
    /// Returns all known project names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Metastore`](crate::error::SchemaError::Metastore)
    /// if the backend fails.
    fn projects(&self) -> SchemaResult<Vec<String>>;

    /// Returns every collection of a project with its current schema.
    ///
    /// # Errors
    ///
    /// Fails with `ProjectNotExists` for unknown projects.
    fn collections(&self, project: &str) -> SchemaResult<HashMap<String, SchemaRef>>;

    /// Returns the collection names of a project.
    ///
    /// # Errors
    ///
    /// Fails with `ProjectNotExists` for unknown projects.
    fn collection_names(&self, project: &str) -> SchemaResult<Vec<String>>;

    /// Returns the schema of one collection, or `None` if the collection
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn collection(&self, project: &str, collection: &str) -> SchemaResult<Option<SchemaRef>>;

    /// Registers a project. Registering an existing project is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the write fails.
    fn create_project(&self, project: &str) -> SchemaResult<()>;

    /// Merges `fields` into the collection's schema by set-union and
    /// returns the canonical post-merge schema.
    ///
    /// If this call caused the collection to come into existence,
    /// `on_create` fires exactly once before the call returns.
    ///
    /// # Errors
    ///
    /// Fails with `ProjectNotExists` for unknown projects and
    /// `TypeConflict` on a same-name, different-type field clash. On
    /// error, no partial schema is stored.
    fn create_or_get_collection_fields(
        &self,
        project: &str,
        collection: &str,
        fields: &[SchemaField],
        on_create: OnCreateCollection<'_>,
    ) -> SchemaResult<SchemaRef>;
}
