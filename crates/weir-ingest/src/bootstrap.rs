//! Startup reconciliation of module fields.
//!
//! Walks every (project, collection) the metastore knows and makes sure
//! each one already carries every module-mandated field, so steady-state
//! ingestion almost never needs to evolve a schema for module reasons.
//! A module field clashing with an existing field of another type is
//! unrecoverable misconfiguration and aborts startup.

use std::sync::Arc;

use weir_core::{
    notify_collection_created, Metastore, SchemaError, SchemaField, SystemEventListener,
};

use crate::dependency::FieldDependency;
use crate::error::IngestResult;

/// Returns `true` if `existing` satisfies `module_field`.
///
/// # Errors
///
/// Fails with [`SchemaError::TypeConflict`] when the names match but the
/// types do not.
fn satisfies(existing: &SchemaField, module_field: &SchemaField) -> Result<bool, SchemaError> {
    if existing.name != module_field.name {
        return Ok(false);
    }
    if existing.field_type != module_field.field_type {
        return Err(SchemaError::TypeConflict {
            name: existing.name.clone(),
            existing: existing.field_type,
            proposed: module_field.field_type,
        });
    }
    Ok(true)
}

/// Ensures every known collection carries every module-mandated field.
///
/// For each collection: missing constant fields are collected first, then
/// the dependents of every already-existing field. If anything is
/// missing, one merge call per collection brings the schema up to date.
///
/// # Errors
///
/// Propagates metastore failures and [`SchemaError::TypeConflict`]
/// between a module field and an existing schema field.
pub(crate) fn reconcile_existing_collections(
    metastore: &dyn Metastore,
    dependencies: &FieldDependency,
    listeners: &[Arc<dyn SystemEventListener>],
) -> IngestResult<()> {
    let on_create = |project: &str, collection: &str| {
        notify_collection_created(listeners, project, collection);
    };

    let mut reconciled = 0usize;
    for project in metastore.projects()? {
        for (collection, schema) in metastore.collections(&project)? {
            let mut to_add: Vec<SchemaField> = Vec::new();

            for constant in dependencies.constant_fields() {
                let mut present = false;
                for existing in schema.fields() {
                    if satisfies(existing, constant)? {
                        present = true;
                        break;
                    }
                }
                if !present {
                    to_add.push(constant.clone());
                }
            }

            for existing in schema.fields() {
                let Some(extras) = dependencies.dependent_fields().get(&existing.name) else {
                    continue;
                };
                for extra in extras {
                    let mut present = false;
                    for field in schema.fields() {
                        if satisfies(field, extra)? {
                            present = true;
                            break;
                        }
                    }
                    if !present && !to_add.iter().any(|f| f.name == extra.name) {
                        to_add.push(extra.clone());
                    }
                }
            }

            if !to_add.is_empty() {
                tracing::info!(
                    project = %project,
                    collection = %collection,
                    missing = to_add.len(),
                    "adding module fields to existing collection"
                );
                metastore.create_or_get_collection_fields(
                    &project,
                    &collection,
                    &to_add,
                    &on_create,
                )?;
                reconciled += 1;
            }
        }
    }

    if reconciled > 0 {
        tracing::info!(collections = reconciled, "module field reconciliation complete");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_core::{FieldType, InMemoryMetastore};

    use crate::dependency::FieldDependencyBuilder;

    fn field(name: &str, ty: FieldType) -> SchemaField {
        SchemaField::new(name, ty, true)
    }

    fn noop(_: &str, _: &str) {}

    fn seeded_store() -> InMemoryMetastore {
        let store = InMemoryMetastore::with_projects(["p"]);
        store
            .create_or_get_collection_fields(
                "p",
                "clicks",
                &[field("user_id", FieldType::String)],
                &noop,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_adds_missing_constants_and_dependents() {
        let store = seeded_store();
        let mut builder = FieldDependencyBuilder::new();
        builder
            .add_constant(field("server_time", FieldType::Long))
            .add_dependent("user_id", field("country", FieldType::String));
        let registry = builder.build().unwrap();

        reconcile_existing_collections(&store, &registry, &[]).unwrap();

        let schema = store.collection("p", "clicks").unwrap().unwrap();
        assert_eq!(schema.position_of("user_id"), Some(0));
        assert!(schema.contains("server_time"));
        assert!(schema.contains("country"));
    }

    #[test]
    fn test_satisfied_collection_is_untouched() {
        let store = seeded_store();
        let mut builder = FieldDependencyBuilder::new();
        builder.add_constant(field("user_id", FieldType::String));
        let registry = builder.build().unwrap();

        reconcile_existing_collections(&store, &registry, &[]).unwrap();
        let schema = store.collection("p", "clicks").unwrap().unwrap();
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_type_clash_aborts() {
        let store = seeded_store();
        let mut builder = FieldDependencyBuilder::new();
        builder.add_constant(field("user_id", FieldType::Long));
        let registry = builder.build().unwrap();

        let err = reconcile_existing_collections(&store, &registry, &[]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::IngestError::Schema(SchemaError::TypeConflict { .. })
        ));
    }

    #[test]
    fn test_dependent_trigger_absent_is_noop() {
        let store = seeded_store();
        let mut builder = FieldDependencyBuilder::new();
        builder.add_dependent("session_id", field("session_start", FieldType::Long));
        let registry = builder.build().unwrap();

        reconcile_existing_collections(&store, &registry, &[]).unwrap();
        let schema = store.collection("p", "clicks").unwrap().unwrap();
        assert_eq!(schema.len(), 1);
    }
}
