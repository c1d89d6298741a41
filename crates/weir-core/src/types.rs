//! The field type model.
//!
//! Every event property maps to one of five column types. The model is
//! deliberately flat: arrays always hold strings, and nested objects or
//! arrays of arrays are rejected at ingestion time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

/// The closed set of column types an event field can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point.
    Double,
    /// True/false.
    Boolean,
    /// Array of strings. Element types other than string are rendered
    /// to text on ingestion.
    Array,
}

impl FieldType {
    /// Infers the column type for a parsed JSON value.
    ///
    /// Used on the schemaless path, where the whole properties object is
    /// available as a tree. `null` carries no type information and yields
    /// `Ok(None)`; the field is skipped. Arrays are inspected one level
    /// deep: an array whose first element is itself an array or an object
    /// is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NestedNotSupported`] for objects and for
    /// arrays of arrays/objects.
    pub fn from_json_value(value: &serde_json::Value) -> SchemaResult<Option<FieldType>> {
        match value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Bool(_) => Ok(Some(FieldType::Boolean)),
            serde_json::Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Ok(Some(FieldType::Long))
                } else {
                    Ok(Some(FieldType::Double))
                }
            }
            serde_json::Value::String(_) => Ok(Some(FieldType::String)),
            serde_json::Value::Array(items) => {
                if let Some(first) = items.first() {
                    if first.is_array() || first.is_object() {
                        return Err(SchemaError::NestedNotSupported(
                            "array elements must be scalars".into(),
                        ));
                    }
                }
                Ok(Some(FieldType::Array))
            }
            serde_json::Value::Object(_) => Err(SchemaError::NestedNotSupported(
                "property values must be scalars or arrays of scalars".into(),
            )),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "STRING",
            FieldType::Long => "LONG",
            FieldType::Double => "DOUBLE",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Array => "ARRAY",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Value-based inference ─────────────────────────────────

    #[test]
    fn test_infer_scalars() {
        assert_eq!(
            FieldType::from_json_value(&json!("hi")).unwrap(),
            Some(FieldType::String)
        );
        assert_eq!(
            FieldType::from_json_value(&json!(42)).unwrap(),
            Some(FieldType::Long)
        );
        assert_eq!(
            FieldType::from_json_value(&json!(2.5)).unwrap(),
            Some(FieldType::Double)
        );
        assert_eq!(
            FieldType::from_json_value(&json!(true)).unwrap(),
            Some(FieldType::Boolean)
        );
    }

    #[test]
    fn test_infer_null_is_skipped() {
        assert_eq!(FieldType::from_json_value(&json!(null)).unwrap(), None);
    }

    #[test]
    fn test_infer_array() {
        assert_eq!(
            FieldType::from_json_value(&json!(["a", "b"])).unwrap(),
            Some(FieldType::Array)
        );
        // An empty array still types as an array of strings.
        assert_eq!(
            FieldType::from_json_value(&json!([])).unwrap(),
            Some(FieldType::Array)
        );
    }

    #[test]
    fn test_infer_rejects_nesting() {
        assert!(matches!(
            FieldType::from_json_value(&json!({"a": 1})),
            Err(SchemaError::NestedNotSupported(_))
        ));
        assert!(matches!(
            FieldType::from_json_value(&json!([[1, 2]])),
            Err(SchemaError::NestedNotSupported(_))
        ));
        assert!(matches!(
            FieldType::from_json_value(&json!([{"a": 1}])),
            Err(SchemaError::NestedNotSupported(_))
        ));
    }

    // ── Serde wire format ─────────────────────────────────────

    #[test]
    fn test_serde_uppercase() {
        assert_eq!(serde_json::to_string(&FieldType::Long).unwrap(), "\"LONG\"");
        let parsed: FieldType = serde_json::from_str("\"ARRAY\"").unwrap();
        assert_eq!(parsed, FieldType::Array);
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(FieldType::Double.to_string(), "DOUBLE");
        assert_eq!(FieldType::Boolean.to_string(), "BOOLEAN");
    }
}
