//! The event deserializer.
//!
//! Drives the streaming parser over one event document, resolves the
//! (project, collection) schema through the cache and metastore, extends
//! the schema on the fly when the event carries unseen fields, applies
//! module field dependencies, and emits an [`Event`] whose record is
//! bound to the canonical post-merge schema.
//!
//! Headers may arrive in any order. If `properties` shows up before both
//! headers are known, the parser saves the subtree's offset, skips it,
//! and rewinds once the headers have been read.

use std::sync::Arc;

use weir_core::{
    notify_collection_created, CollectionKey, Event, FieldType, FieldValue, Metastore, Record,
    SchemaCache, SchemaError, SchemaField, SchemaRef, SystemEventListener,
};

use crate::bootstrap::reconcile_existing_collections;
use crate::config::DeserializerConfig;
use crate::dependency::{EventMapper, FieldDependency, FieldDependencyBuilder};
use crate::error::{IngestError, IngestResult};
use crate::json::{JsonToken, RewindableJsonParser};

/// Deserializes self-describing event documents into typed records.
///
/// One instance serves many worker threads: the dependency registry is
/// frozen at construction, the schema cache is concurrent, and each
/// [`deserialize`](Self::deserialize) call is otherwise self-contained.
pub struct EventDeserializer {
    metastore: Arc<dyn Metastore>,
    cache: SchemaCache,
    dependencies: FieldDependency,
    listeners: Vec<Arc<dyn SystemEventListener>>,
    config: DeserializerConfig,
}

impl EventDeserializer {
    /// Creates a deserializer and reconciles module fields into every
    /// collection the metastore already knows.
    ///
    /// # Errors
    ///
    /// Fails if two modules contribute conflicting fields, or if
    /// reconciliation hits a type clash or a metastore error.
    pub fn new(
        metastore: Arc<dyn Metastore>,
        mappers: &[Arc<dyn EventMapper>],
        listeners: Vec<Arc<dyn SystemEventListener>>,
    ) -> IngestResult<Self> {
        Self::with_config(metastore, mappers, listeners, DeserializerConfig::default())
    }

    /// Like [`new`](Self::new), with explicit configuration.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`new`](Self::new).
    pub fn with_config(
        metastore: Arc<dyn Metastore>,
        mappers: &[Arc<dyn EventMapper>],
        listeners: Vec<Arc<dyn SystemEventListener>>,
        config: DeserializerConfig,
    ) -> IngestResult<Self> {
        let mut builder = FieldDependencyBuilder::new();
        for mapper in mappers {
            mapper.field_dependencies(&mut builder);
        }
        let dependencies = builder.build()?;

        reconcile_existing_collections(metastore.as_ref(), &dependencies, &listeners)?;

        Ok(Self {
            metastore,
            cache: SchemaCache::new(),
            dependencies,
            listeners,
            config,
        })
    }

    /// The process-local schema cache.
    #[must_use]
    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Deserializes one event document.
    ///
    /// # Errors
    ///
    /// - [`IngestError::MalformedEvent`] if `project`, `collection`, or
    ///   `properties` is missing, duplicated, or of the wrong shape.
    /// - [`IngestError::NestedNotSupported`] if a property value is an
    ///   object or an array of arrays.
    /// - [`IngestError::Parse`] on invalid JSON.
    /// - [`IngestError::Schema`] if the metastore rejects the project or
    ///   a field merge conflicts.
    pub fn deserialize(&self, input: &[u8]) -> IngestResult<Event> {
        let mut parser = RewindableJsonParser::new(input);

        match parser.next_token()? {
            Some(JsonToken::StartObject) => {}
            _ => {
                return Err(IngestError::MalformedEvent(
                    "event must be a JSON object".into(),
                ))
            }
        }

        let mut project: Option<String> = None;
        let mut collection: Option<String> = None;
        let mut record: Option<Record> = None;
        let mut properties_seen = false;

        loop {
            match parser.next_token()? {
                Some(JsonToken::FieldName(name)) => match name.as_str() {
                    "project" => project = Some(self.read_header(&mut parser, "project")?),
                    "collection" => {
                        collection =
                            Some(self.read_header(&mut parser, "collection")?.to_lowercase());
                    }
                    "properties" => {
                        if properties_seen {
                            return Err(IngestError::MalformedEvent(
                                "properties appears twice".into(),
                            ));
                        }
                        properties_seen = true;
                        match parser.next_token()? {
                            Some(JsonToken::StartObject) => {}
                            _ => {
                                return Err(IngestError::MalformedEvent(
                                    "properties must be an object".into(),
                                ))
                            }
                        }
                        if let (Some(project), Some(collection)) = (&project, &collection) {
                            record =
                                Some(self.parse_properties(project, collection, &mut parser)?);
                        } else {
                            // Headers not known yet: remember where the
                            // block starts and come back after the loop.
                            parser.save();
                            parser.skip_children()?;
                        }
                    }
                    _ => self.skip_member_value(&mut parser)?,
                },
                Some(JsonToken::EndObject) => break,
                None => {
                    return Err(IngestError::MalformedEvent(
                        "unexpected end of event document".into(),
                    ))
                }
                Some(_) => {
                    return Err(IngestError::MalformedEvent(
                        "event must be a JSON object".into(),
                    ))
                }
            }
        }

        let project =
            project.ok_or_else(|| IngestError::MalformedEvent("project is missing".into()))?;
        let collection =
            collection.ok_or_else(|| IngestError::MalformedEvent("collection is missing".into()))?;

        let record = match record {
            Some(record) => record,
            None => {
                if parser.is_saved() {
                    parser.load();
                    self.parse_properties(&project, &collection, &mut parser)?
                } else {
                    return Err(IngestError::MalformedEvent("properties is missing".into()));
                }
            }
        };

        Ok(Event::new(project, collection, record))
    }

    // ── Header handling ────────────────────────────────────────

    fn read_header(
        &self,
        parser: &mut RewindableJsonParser<'_>,
        header: &str,
    ) -> IngestResult<String> {
        match parser.next_token()? {
            Some(JsonToken::String(value)) => Ok(value),
            _ => Err(IngestError::MalformedEvent(format!(
                "{header} must be a string"
            ))),
        }
    }

    /// Consumes and discards the value of an unrecognized top-level field.
    fn skip_member_value(&self, parser: &mut RewindableJsonParser<'_>) -> IngestResult<()> {
        match parser.next_token()? {
            Some(JsonToken::StartObject | JsonToken::StartArray) => parser.skip_children(),
            Some(_) => Ok(()),
            None => Err(IngestError::MalformedEvent(
                "unexpected end of event document".into(),
            )),
        }
    }

    // ── Properties ─────────────────────────────────────────────

    /// Parses the properties object. The parser is positioned inside the
    /// object, right after its opening brace.
    fn parse_properties(
        &self,
        project: &str,
        collection: &str,
        parser: &mut RewindableJsonParser<'_>,
    ) -> IngestResult<Record> {
        let key = CollectionKey::new(project, collection);

        let mut schema = self.cache.get(&key);
        if schema.is_none() {
            if let Some(stored) = self.metastore.collection(project, collection)? {
                self.cache.put(key.clone(), stored.clone());
                schema = Some(stored);
            }
        }

        match schema {
            Some(schema) => self.parse_with_schema(&key, schema, parser),
            None => self.parse_schemaless(&key, parser),
        }
    }

    /// Fast path: the collection already has a schema. Fields are decoded
    /// positionally as they stream by; unseen fields extend the schema in
    /// flight and are registered in one merge call at the end.
    fn parse_with_schema(
        &self,
        key: &CollectionKey,
        schema: SchemaRef,
        parser: &mut RewindableJsonParser<'_>,
    ) -> IngestResult<Record> {
        let mut record = Record::new(schema);
        let mut new_fields: Vec<SchemaField> = Vec::new();

        loop {
            match parser.next_token()? {
                Some(JsonToken::FieldName(name)) => {
                    let token = parser.next_token()?.ok_or_else(|| {
                        IngestError::MalformedEvent("unexpected end of properties".into())
                    })?;

                    let position = match record.schema().position_of(&name) {
                        Some(position) => position,
                        None => match field_type_from_token(&token)? {
                            None => continue, // null: no type information
                            Some(inferred) => {
                                let field = SchemaField::new(&name, inferred, true);
                                new_fields.push(field.clone());
                                // Temporary superset so this record can
                                // already hold the value.
                                let extended = Arc::new(
                                    record.schema().extended_with(std::slice::from_ref(&field)),
                                );
                                record = record.rebind(extended);
                                record
                                    .schema()
                                    .position_of(&name)
                                    .expect("field was just appended")
                            }
                        },
                    };

                    self.put_token_value(token, parser, &mut record, position)?;
                }
                Some(JsonToken::EndObject) => break,
                None => {
                    return Err(IngestError::MalformedEvent(
                        "unexpected end of properties".into(),
                    ))
                }
                Some(_) => {
                    return Err(IngestError::MalformedEvent(
                        "properties must be an object".into(),
                    ))
                }
            }
        }

        if new_fields.is_empty() {
            return Ok(record);
        }

        self.dependencies.apply_dependents(&mut new_fields);
        self.dependencies.apply_constants(&mut new_fields);

        let canonical = self.register_fields(key, &new_fields)?;
        tracing::debug!(
            project = key.project(),
            collection = key.collection(),
            added = new_fields.len(),
            total = canonical.len(),
            "collection schema extended"
        );
        self.cache.put(key.clone(), canonical.clone());

        Ok(record.rebind(canonical))
    }

    /// Cold path: no schema exists yet. The whole properties object is
    /// materialized as a tree, a schema is inferred from it, module fields
    /// are folded in, and the collection is created in one call.
    fn parse_schemaless(
        &self,
        key: &CollectionKey,
        parser: &mut RewindableJsonParser<'_>,
    ) -> IngestResult<Record> {
        let raw = parser.capture_children()?;
        let tree: serde_json::Value = serde_json::from_slice(raw).map_err(|e| {
            IngestError::Parse {
                offset: 0,
                message: format!("properties: {e}"),
            }
        })?;
        let tree = tree.as_object().ok_or_else(|| {
            IngestError::MalformedEvent("properties must be an object".into())
        })?;

        let mut fields: Vec<SchemaField> = Vec::new();
        for (name, value) in tree {
            if let Some(field_type) = FieldType::from_json_value(value)? {
                fields.push(SchemaField::new(name, field_type, true));
            }
        }

        self.dependencies.apply_constants(&mut fields);
        self.dependencies.apply_dependents(&mut fields);

        let schema = self.register_fields(key, &fields)?;
        tracing::debug!(
            project = key.project(),
            collection = key.collection(),
            fields = schema.len(),
            "collection schema created"
        );
        self.cache.put(key.clone(), schema.clone());

        let mut record = Record::new(schema.clone());
        for (position, field) in schema.fields().iter().enumerate() {
            if let Some(value) = tree.get(&field.name) {
                if let Some(decoded) = self.decode_json_value(value, field.field_type) {
                    record.put(position, decoded);
                }
            }
        }
        Ok(record)
    }

    /// Registers fields with the metastore, wiring the creation callback
    /// to the system event listeners.
    fn register_fields(
        &self,
        key: &CollectionKey,
        fields: &[SchemaField],
    ) -> IngestResult<SchemaRef> {
        let on_create = |project: &str, collection: &str| {
            notify_collection_created(&self.listeners, project, collection);
        };
        let result = self.metastore.create_or_get_collection_fields(
            key.project(),
            key.collection(),
            fields,
            &on_create,
        );
        if let Err(SchemaError::TypeConflict {
            name,
            existing,
            proposed,
        }) = &result
        {
            // Only this event is rejected; the stored schema and the
            // cache are untouched.
            tracing::warn!(
                project = key.project(),
                collection = key.collection(),
                field = %name,
                %existing,
                %proposed,
                "field merge rejected by type conflict"
            );
        }
        Ok(result?)
    }

    // ── Value decoding ─────────────────────────────────────────

    /// Decodes a streamed token into a column slot. A token whose type
    /// does not match the declared column is dropped and the slot stays
    /// null; client-side drift must not abort ingestion.
    fn put_token_value(
        &self,
        token: JsonToken,
        parser: &mut RewindableJsonParser<'_>,
        record: &mut Record,
        position: usize,
    ) -> IngestResult<()> {
        if matches!(token, JsonToken::StartObject) {
            return Err(SchemaError::NestedNotSupported(
                "property values must be scalars or arrays of scalars".into(),
            )
            .into());
        }

        let declared = record
            .schema()
            .field(position)
            .expect("position comes from this schema")
            .field_type;

        match (declared, token) {
            (FieldType::String, JsonToken::String(value)) => {
                record.put(position, FieldValue::String(value));
            }
            (FieldType::Long, JsonToken::Long(value)) => {
                record.put(position, FieldValue::Long(value));
            }
            (FieldType::Double, JsonToken::Double(value)) => {
                record.put(position, FieldValue::Double(value));
            }
            (FieldType::Boolean, JsonToken::Bool(value)) => {
                record.put(position, FieldValue::Boolean(value));
            }
            (FieldType::Boolean, JsonToken::String(value)) if self.config.boolean_from_string => {
                match value.as_str() {
                    "true" => record.put(position, FieldValue::Boolean(true)),
                    "false" => record.put(position, FieldValue::Boolean(false)),
                    _ => {}
                }
            }
            (FieldType::Array, JsonToken::StartArray) => {
                let elements = read_string_elements(parser)?;
                record.put(position, FieldValue::Array(elements));
            }
            (_, JsonToken::StartArray) => {
                // Wrong shape for this column: consume and drop.
                parser.skip_children()?;
            }
            _ => {} // type drift: drop, slot stays null
        }
        Ok(())
    }

    /// Tree-based twin of [`put_token_value`] for the cold path.
    fn decode_json_value(
        &self,
        value: &serde_json::Value,
        declared: FieldType,
    ) -> Option<FieldValue> {
        match declared {
            FieldType::String => Some(FieldValue::String(lossy_text(value)?)),
            FieldType::Long => value.as_i64().map(FieldValue::Long),
            FieldType::Double => value.as_f64().map(FieldValue::Double),
            FieldType::Boolean => match value {
                serde_json::Value::Bool(b) => Some(FieldValue::Boolean(*b)),
                serde_json::Value::String(s) if self.config.boolean_from_string => match s.as_str()
                {
                    "true" => Some(FieldValue::Boolean(true)),
                    "false" => Some(FieldValue::Boolean(false)),
                    _ => None,
                },
                _ => None,
            },
            FieldType::Array => match value {
                serde_json::Value::Array(items) => Some(FieldValue::Array(
                    items.iter().filter_map(lossy_text).collect(),
                )),
                _ => None,
            },
        }
    }
}

/// Infers a column type from a streamed value token. `null` carries no
/// type information and yields `None`; objects are rejected.
fn field_type_from_token(token: &JsonToken) -> IngestResult<Option<FieldType>> {
    match token {
        JsonToken::Null => Ok(None),
        JsonToken::String(_) => Ok(Some(FieldType::String)),
        JsonToken::Long(_) => Ok(Some(FieldType::Long)),
        JsonToken::Double(_) => Ok(Some(FieldType::Double)),
        JsonToken::Bool(_) => Ok(Some(FieldType::Boolean)),
        JsonToken::StartArray => Ok(Some(FieldType::Array)),
        JsonToken::StartObject => Err(SchemaError::NestedNotSupported(
            "property values must be scalars or arrays of scalars".into(),
        )
        .into()),
        JsonToken::EndObject | JsonToken::EndArray | JsonToken::FieldName(_) => {
            Err(IngestError::MalformedEvent(
                "unexpected token in properties".into(),
            ))
        }
    }
}

/// Reads the elements of the array whose `StartArray` was just returned,
/// rendering scalars to text. Null elements are skipped; nested
/// containers are rejected.
fn read_string_elements(parser: &mut RewindableJsonParser<'_>) -> IngestResult<Vec<String>> {
    let mut elements = Vec::new();
    loop {
        match parser.next_token()? {
            Some(JsonToken::EndArray) => return Ok(elements),
            Some(JsonToken::String(value)) => elements.push(value),
            Some(JsonToken::Long(value)) => elements.push(value.to_string()),
            Some(JsonToken::Double(value)) => elements.push(value.to_string()),
            Some(JsonToken::Bool(value)) => elements.push(value.to_string()),
            Some(JsonToken::Null) => {}
            Some(JsonToken::StartArray | JsonToken::StartObject) => {
                return Err(SchemaError::NestedNotSupported(
                    "array elements must be scalars".into(),
                )
                .into());
            }
            Some(JsonToken::EndObject | JsonToken::FieldName(_)) | None => {
                return Err(IngestError::MalformedEvent(
                    "unexpected end of array".into(),
                ));
            }
        }
    }
}

/// Jackson-style `asText`: strings pass through, other scalars render to
/// their literal text, containers and nulls yield `None`.
fn lossy_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}
