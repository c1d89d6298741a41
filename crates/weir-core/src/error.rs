//! Schema error types.
//!
//! Provides [`SchemaError`] for schema lookup, merge, and metastore
//! operations, plus a convenience [`SchemaResult`] alias.

use thiserror::Error;

use crate::types::FieldType;

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur during schema operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The metastore has no project with the given name.
    #[error("project does not exist: {0}")]
    ProjectNotExists(String),

    /// Two producers disagree on a field's type. Reconciliation never
    /// coerces; the merge fails and no partial schema is stored.
    #[error("field '{name}' is registered as {existing} but {proposed} was proposed")]
    TypeConflict {
        /// The contested field name.
        name: String,
        /// The type already registered for the field.
        existing: FieldType,
        /// The type the caller attempted to register.
        proposed: FieldType,
    },

    /// A property value is an object, an array of arrays, or some other
    /// structure the flat type model cannot represent.
    #[error("nested properties are not supported: {0}")]
    NestedNotSupported(String),

    /// The metastore backend failed.
    #[error("metastore error: {0}")]
    Metastore(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_conflict_display() {
        let err = SchemaError::TypeConflict {
            name: "user_id".into(),
            existing: FieldType::Long,
            proposed: FieldType::String,
        };
        let msg = err.to_string();
        assert!(msg.contains("user_id"));
        assert!(msg.contains("LONG"));
        assert!(msg.contains("STRING"));
    }

    #[test]
    fn test_project_not_exists_display() {
        let err = SchemaError::ProjectNotExists("analytics".into());
        assert_eq!(err.to_string(), "project does not exist: analytics");
    }
}
