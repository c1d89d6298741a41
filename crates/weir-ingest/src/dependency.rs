//! Module-contributed field dependencies.
//!
//! Installed modules enrich every collection with extra columns: either
//! unconditionally (constant fields, e.g. a server-side timestamp) or
//! conditionally on the presence of a trigger field (e.g. a `country`
//! column whenever `user_id` exists). Each module contributes through a
//! builder at startup; after [`FieldDependencyBuilder::build`] the
//! registry is immutable and lock-free on the hot path.

use std::collections::HashMap;

use weir_core::{SchemaError, SchemaField, SchemaResult};

/// A module that contributes field dependencies at startup.
pub trait EventMapper: Send + Sync {
    /// Registers this module's constant and dependent fields.
    fn field_dependencies(&self, builder: &mut FieldDependencyBuilder);
}

/// Accumulates field contributions from all registered modules.
#[derive(Debug, Default)]
pub struct FieldDependencyBuilder {
    constants: Vec<SchemaField>,
    dependents: HashMap<String, Vec<SchemaField>>,
}

impl FieldDependencyBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field that every collection must carry.
    pub fn add_constant(&mut self, field: SchemaField) -> &mut Self {
        self.constants.push(field);
        self
    }

    /// Adds a field that must exist whenever `trigger` exists in a
    /// collection's schema.
    pub fn add_dependent(&mut self, trigger: impl Into<String>, field: SchemaField) -> &mut Self {
        self.dependents.entry(trigger.into()).or_default().push(field);
        self
    }

    /// Freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TypeConflict`] if two modules registered the
    /// same constant field name with different types; disagreement between
    /// modules cannot be reconciled at runtime.
    pub fn build(self) -> SchemaResult<FieldDependency> {
        for (i, field) in self.constants.iter().enumerate() {
            if let Some(clash) = self.constants[..i]
                .iter()
                .find(|f| f.name == field.name && f.field_type != field.field_type)
            {
                return Err(SchemaError::TypeConflict {
                    name: field.name.clone(),
                    existing: clash.field_type,
                    proposed: field.field_type,
                });
            }
        }
        Ok(FieldDependency {
            constants: self.constants,
            dependents: self.dependents,
        })
    }
}

/// Immutable registry of module-contributed fields.
#[derive(Debug, Clone, Default)]
pub struct FieldDependency {
    constants: Vec<SchemaField>,
    dependents: HashMap<String, Vec<SchemaField>>,
}

impl FieldDependency {
    /// A registry with no contributions.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fields every collection must carry.
    #[must_use]
    pub fn constant_fields(&self) -> &[SchemaField] {
        &self.constants
    }

    /// Fields required by the presence of a trigger field.
    #[must_use]
    pub fn dependent_fields(&self) -> &HashMap<String, Vec<SchemaField>> {
        &self.dependents
    }

    /// Returns `true` if no module contributed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.dependents.is_empty()
    }

    /// Folds every constant field into `fields` in place.
    pub fn apply_constants(&self, fields: &mut Vec<SchemaField>) {
        for constant in &self.constants {
            add_module_field(fields, constant);
        }
    }

    /// For every trigger present in `fields`, folds the trigger's
    /// dependent fields into `fields` in place.
    pub fn apply_dependents(&self, fields: &mut Vec<SchemaField>) {
        for (trigger, extras) in &self.dependents {
            if fields.iter().any(|f| &f.name == trigger) {
                for extra in extras {
                    add_module_field(fields, extra);
                }
            }
        }
    }
}

/// Folds one module field into a field list: a same-name, same-type entry
/// is left alone; a same-name, different-type incumbent is replaced (the
/// module wins); otherwise the field is appended.
fn add_module_field(fields: &mut Vec<SchemaField>, module_field: &SchemaField) {
    if let Some(position) = fields.iter().position(|f| f.name == module_field.name) {
        if fields[position].field_type == module_field.field_type {
            return;
        }
        fields.remove(position);
    }
    fields.push(module_field.clone());
}
