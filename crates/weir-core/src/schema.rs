//! Collection schemas.
//!
//! A [`Schema`] is an ordered, append-only list of named, typed fields.
//! Schema values are immutable once published: evolution produces a new
//! value, and existing field positions never shift, so records written
//! against an older version remain positionally valid under any superset.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::types::FieldType;

/// A single named, typed field of a collection schema.
///
/// Names are unique within a schema; reconciliation compares fields by
/// name. Every field is nullable in the record encoding, since events
/// need not carry every known field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field name.
    pub name: String,

    /// Column type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field may be absent. Always `true` for fields created
    /// from event properties.
    pub nullable: bool,
}

impl SchemaField {
    /// Creates a new schema field.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
        }
    }
}

/// An ordered, append-only collection schema.
///
/// Wrap in [`Arc`] before publishing; readers holding an older `Arc`
/// observe a consistent (if stale) field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Creates a schema from an ordered field list.
    ///
    /// Callers are responsible for name uniqueness; the metastore merge
    /// path enforces it.
    #[must_use]
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Creates an empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Returns the ordered field list.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the position of the named field, if present.
    ///
    /// Linear scan: event schemas rarely exceed a few dozen fields, where
    /// a scan beats a side-table.
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the field at `position`.
    #[must_use]
    pub fn field(&self, position: usize) -> Option<&SchemaField> {
        self.fields.get(position)
    }

    /// Returns `true` if a field with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position_of(name).is_some()
    }

    /// Returns a new schema with `extra` fields appended, skipping any
    /// whose name is already present. Existing positions are preserved.
    #[must_use]
    pub fn extended_with(&self, extra: &[SchemaField]) -> Schema {
        let mut fields = self.fields.clone();
        for field in extra {
            if !fields.iter().any(|f| f.name == field.name) {
                fields.push(field.clone());
            }
        }
        Schema::new(fields)
    }

    /// Merges `incoming` into this schema by set-union on field names.
    ///
    /// Existing fields keep their positions; unseen fields are appended in
    /// the order given. A name clash with a matching type is a no-op; a
    /// clash with a differing type fails the whole merge and leaves no
    /// partial result.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TypeConflict`] on a same-name, different-type
    /// clash.
    pub fn merged_with(&self, incoming: &[SchemaField]) -> SchemaResult<Schema> {
        let mut fields = self.fields.clone();
        for field in incoming {
            match fields.iter().find(|f| f.name == field.name) {
                Some(existing) if existing.field_type == field.field_type => {}
                Some(existing) => {
                    return Err(SchemaError::TypeConflict {
                        name: field.name.clone(),
                        existing: existing.field_type,
                        proposed: field.field_type,
                    });
                }
                None => fields.push(field.clone()),
            }
        }
        Ok(Schema::new(fields))
    }
}

/// Cache and metastore key for one collection within a project.
///
/// Collection names are canonicalized to lower case at construction; the
/// rest of the pipeline only ever sees the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    project: String,
    collection: String,
}

impl CollectionKey {
    /// Creates a key, lower-casing the collection name.
    #[must_use]
    pub fn new(project: impl Into<String>, collection: &str) -> Self {
        Self {
            project: project.into(),
            collection: collection.to_lowercase(),
        }
    }

    /// The project name.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The canonical (lower-case) collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project, self.collection)
    }
}

/// Shared handle to a published schema version.
pub type SchemaRef = Arc<Schema>;

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: FieldType) -> SchemaField {
        SchemaField::new(name, ty, true)
    }

    // ── Lookup ────────────────────────────────────────────────

    #[test]
    fn test_position_lookup() {
        let schema = Schema::new(vec![
            field("x", FieldType::Long),
            field("y", FieldType::String),
        ]);
        assert_eq!(schema.position_of("x"), Some(0));
        assert_eq!(schema.position_of("y"), Some(1));
        assert_eq!(schema.position_of("z"), None);
        assert!(schema.contains("y"));
    }

    // ── Extension ─────────────────────────────────────────────

    #[test]
    fn test_extended_with_preserves_positions() {
        let schema = Schema::new(vec![
            field("x", FieldType::Long),
            field("y", FieldType::String),
        ]);
        let extended = schema.extended_with(&[field("z", FieldType::Double)]);
        assert_eq!(extended.position_of("x"), Some(0));
        assert_eq!(extended.position_of("y"), Some(1));
        assert_eq!(extended.position_of("z"), Some(2));
        // The original is untouched.
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_extended_with_skips_known_names() {
        let schema = Schema::new(vec![field("x", FieldType::Long)]);
        let extended = schema.extended_with(&[field("x", FieldType::Long)]);
        assert_eq!(extended.len(), 1);
    }

    // ── Merge ─────────────────────────────────────────────────

    #[test]
    fn test_merge_unions_by_name() {
        let schema = Schema::new(vec![field("x", FieldType::Long)]);
        let merged = schema
            .merged_with(&[field("x", FieldType::Long), field("y", FieldType::String)])
            .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.position_of("x"), Some(0));
        assert_eq!(merged.position_of("y"), Some(1));
    }

    #[test]
    fn test_merge_type_conflict_fails_whole_merge() {
        let schema = Schema::new(vec![field("x", FieldType::Long)]);
        let err = schema
            .merged_with(&[field("y", FieldType::String), field("x", FieldType::Double)])
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeConflict { ref name, .. } if name == "x"));
    }

    // ── CollectionKey ─────────────────────────────────────────

    #[test]
    fn test_collection_key_canonicalizes() {
        let key = CollectionKey::new("p", "PageViews");
        assert_eq!(key.collection(), "pageviews");
        assert_eq!(key, CollectionKey::new("p", "pageviews"));
        assert_eq!(key.to_string(), "p.pageviews");
    }

    // ── Serde ─────────────────────────────────────────────────

    #[test]
    fn test_schema_serde_round_trip() {
        let schema = Schema::new(vec![
            field("x", FieldType::Long),
            field("tags", FieldType::Array),
        ]);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"type\":\"LONG\""));
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
