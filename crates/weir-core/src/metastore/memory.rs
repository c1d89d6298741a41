//! In-memory metastore.
//!
//! Reference implementation used by tests and embedded deployments. A
//! single write lock serializes merges, which trivially satisfies the
//! per-collection union semantics required of real backends.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{CollectionKey, Schema, SchemaField, SchemaRef};

use super::{Metastore, OnCreateCollection};

/// Process-local metastore keeping every schema on the heap.
#[derive(Debug, Default)]
pub struct InMemoryMetastore {
    projects: RwLock<HashMap<String, HashMap<String, SchemaRef>>>,
}

impl InMemoryMetastore {
    /// Creates an empty metastore with no projects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a metastore with the given projects pre-registered.
    #[must_use]
    pub fn with_projects<I: IntoIterator<Item = S>, S: Into<String>>(projects: I) -> Self {
        let store = Self::new();
        {
            let mut guard = store.projects.write();
            for project in projects {
                guard.entry(project.into()).or_default();
            }
        }
        store
    }
}

impl Metastore for InMemoryMetastore {
    fn projects(&self) -> SchemaResult<Vec<String>> {
        Ok(self.projects.read().keys().cloned().collect())
    }

    fn collections(&self, project: &str) -> SchemaResult<HashMap<String, SchemaRef>> {
        self.projects
            .read()
            .get(project)
            .cloned()
            .ok_or_else(|| SchemaError::ProjectNotExists(project.into()))
    }

    fn collection_names(&self, project: &str) -> SchemaResult<Vec<String>> {
        Ok(self.collections(project)?.into_keys().collect())
    }

    fn collection(&self, project: &str, collection: &str) -> SchemaResult<Option<SchemaRef>> {
        let key = CollectionKey::new(project, collection);
        Ok(self
            .projects
            .read()
            .get(project)
            .and_then(|collections| collections.get(key.collection()))
            .cloned())
    }

    fn create_project(&self, project: &str) -> SchemaResult<()> {
        self.projects.write().entry(project.into()).or_default();
        Ok(())
    }

    fn create_or_get_collection_fields(
        &self,
        project: &str,
        collection: &str,
        fields: &[SchemaField],
        on_create: OnCreateCollection<'_>,
    ) -> SchemaResult<SchemaRef> {
        let key = CollectionKey::new(project, collection);
        let mut created = false;

        let merged = {
            let mut guard = self.projects.write();
            let collections = guard
                .get_mut(project)
                .ok_or_else(|| SchemaError::ProjectNotExists(project.into()))?;

            let current = match collections.get(key.collection()) {
                Some(schema) => schema.clone(),
                None => {
                    created = true;
                    SchemaRef::new(Schema::empty())
                }
            };

            // Merge before touching the map so a conflict stores nothing.
            let merged = SchemaRef::new(current.merged_with(fields)?);
            collections.insert(key.collection().to_string(), merged.clone());
            merged
        };

        if created {
            tracing::debug!(project, collection = key.collection(), "collection created");
            on_create(project, key.collection());
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::FieldType;

    fn field(name: &str, ty: FieldType) -> SchemaField {
        SchemaField::new(name, ty, true)
    }

    fn noop(_: &str, _: &str) {}

    // ── Project handling ──────────────────────────────────────

    #[test]
    fn test_unknown_project_fails() {
        let store = InMemoryMetastore::new();
        let err = store
            .create_or_get_collection_fields("ghost", "c", &[field("x", FieldType::Long)], &noop)
            .unwrap_err();
        assert!(matches!(err, SchemaError::ProjectNotExists(ref p) if p == "ghost"));
        assert!(matches!(
            store.collections("ghost").unwrap_err(),
            SchemaError::ProjectNotExists(_)
        ));
    }

    #[test]
    fn test_create_project_is_idempotent() {
        let store = InMemoryMetastore::new();
        store.create_project("p").unwrap();
        store.create_project("p").unwrap();
        assert_eq!(store.projects().unwrap(), vec!["p".to_string()]);
    }

    // ── Union merge ───────────────────────────────────────────

    #[test]
    fn test_merge_creates_then_extends() {
        let store = InMemoryMetastore::with_projects(["p"]);
        let v1 = store
            .create_or_get_collection_fields("p", "c", &[field("x", FieldType::Long)], &noop)
            .unwrap();
        assert_eq!(v1.position_of("x"), Some(0));

        let v2 = store
            .create_or_get_collection_fields("p", "c", &[field("y", FieldType::String)], &noop)
            .unwrap();
        assert_eq!(v2.position_of("x"), Some(0));
        assert_eq!(v2.position_of("y"), Some(1));

        // Idempotent: resending known fields changes nothing.
        let v3 = store
            .create_or_get_collection_fields("p", "c", &[field("x", FieldType::Long)], &noop)
            .unwrap();
        assert_eq!(v3.fields(), v2.fields());
    }

    #[test]
    fn test_conflict_stores_nothing() {
        let store = InMemoryMetastore::with_projects(["p"]);
        store
            .create_or_get_collection_fields("p", "c", &[field("x", FieldType::Long)], &noop)
            .unwrap();

        let err = store
            .create_or_get_collection_fields(
                "p",
                "c",
                &[field("y", FieldType::String), field("x", FieldType::Double)],
                &noop,
            )
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeConflict { .. }));

        // Neither y nor the re-typed x landed.
        let schema = store.collection("p", "c").unwrap().unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.field(0).unwrap().field_type, FieldType::Long);
    }

    // ── Creation callback ─────────────────────────────────────

    #[test]
    fn test_on_create_fires_exactly_once() {
        let store = InMemoryMetastore::with_projects(["p"]);
        let fired = AtomicUsize::new(0);
        let count = |_: &str, _: &str| {
            fired.fetch_add(1, Ordering::SeqCst);
        };

        store
            .create_or_get_collection_fields("p", "Clicks", &[field("x", FieldType::Long)], &count)
            .unwrap();
        store
            .create_or_get_collection_fields("p", "clicks", &[field("y", FieldType::Long)], &count)
            .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_collection_names_are_canonical() {
        let store = InMemoryMetastore::with_projects(["p"]);
        store
            .create_or_get_collection_fields("p", "PageViews", &[field("x", FieldType::Long)], &noop)
            .unwrap();
        assert_eq!(store.collection_names("p").unwrap(), vec!["pageviews"]);
        assert!(store.collection("p", "PAGEVIEWS").unwrap().is_some());
    }

    // ── Concurrency ───────────────────────────────────────────

    #[test]
    fn test_disjoint_concurrent_extensions_both_survive() {
        let store = std::sync::Arc::new(InMemoryMetastore::with_projects(["p"]));
        store
            .create_or_get_collection_fields("p", "c", &[field("base", FieldType::Long)], &noop)
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let name = format!("f{i}");
                    store
                        .create_or_get_collection_fields(
                            "p",
                            "c",
                            &[field(&name, FieldType::Long)],
                            &noop,
                        )
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let schema = store.collection("p", "c").unwrap().unwrap();
        assert_eq!(schema.position_of("base"), Some(0));
        assert_eq!(schema.len(), 9);
        for i in 0..8 {
            assert!(schema.contains(&format!("f{i}")));
        }
    }
}
