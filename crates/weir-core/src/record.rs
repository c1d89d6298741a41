//! Positional records bound to a schema version.
//!
//! A [`Record`] holds one column slot per field of the schema it was
//! allocated against. Slots start out null and are filled positionally
//! as the deserializer consumes the event; fields the event did not
//! carry stay null.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[cfg(test)]
use crate::schema::Schema;
use crate::schema::SchemaRef;
use crate::types::FieldType;

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// UTF-8 text.
    String(String),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit floating point.
    Double(f64),
    /// True/false.
    Boolean(bool),
    /// Array of strings.
    Array(Vec<String>),
}

impl FieldValue {
    /// The column type this value inhabits.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Array(_) => FieldType::Array,
        }
    }
}

/// A row of column values bound to one specific schema version.
///
/// Positions align with the bound schema's field order, so a record and
/// its schema can be handed to a columnar writer as a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: SchemaRef,
    values: Vec<Option<FieldValue>>,
}

impl Record {
    /// Allocates an all-null record bound to `schema`.
    #[must_use]
    pub fn new(schema: SchemaRef) -> Self {
        let values = vec![None; schema.len()];
        Self { schema, values }
    }

    /// The schema this record is bound to.
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Stores a value at a field position.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of bounds for the bound schema.
    pub fn put(&mut self, position: usize, value: FieldValue) {
        self.values[position] = Some(value);
    }

    /// Returns the value at a field position, or `None` if the slot is
    /// null or the position is out of bounds.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&FieldValue> {
        self.values.get(position).and_then(Option::as_ref)
    }

    /// Stores a value by field name. Returns `false` if the schema has no
    /// such field.
    pub fn put_by_name(&mut self, name: &str, value: FieldValue) -> bool {
        match self.schema.position_of(name) {
            Some(position) => {
                self.values[position] = Some(value);
                true
            }
            None => false,
        }
    }

    /// Returns the value for a field name, or `None` if absent or null.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&FieldValue> {
        self.get(self.schema.position_of(name)?)
    }

    /// Rebinds this record to another schema version, copying values over
    /// by field name. Fields the target schema does not know are dropped;
    /// fields this record never held stay null.
    #[must_use]
    pub fn rebind(&self, schema: SchemaRef) -> Record {
        let values = schema
            .fields()
            .iter()
            .map(|field| self.get_by_name(&field.name).cloned())
            .collect();
        Record { schema, values }
    }

    /// Returns `true` if every slot is null.
    #[must_use]
    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

impl Serialize for Record {
    /// Serializes as a field-name → value map, nulls included, in schema
    /// order. This is the wire shape downstream binary writers consume.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            map.serialize_entry(&field.name, value)?;
        }
        map.end()
    }
}

/// A fully deserialized event: its routing headers plus the typed record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Owning project (tenant).
    pub project: String,
    /// Canonical (lower-case) collection name.
    pub collection: String,
    /// The typed record, bound to the collection's current schema.
    pub record: Record,
}

impl Event {
    /// Creates an event.
    #[must_use]
    pub fn new(project: impl Into<String>, collection: impl Into<String>, record: Record) -> Self {
        Self {
            project: project.into(),
            collection: collection.into(),
            record,
        }
    }
}
