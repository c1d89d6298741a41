//! # Weir Core
//!
//! Domain model for the weir event pipeline: the flat field type system,
//! ordered append-only schemas, positional records, the process-local
//! schema cache, and the metastore contract that makes schema evolution
//! durable.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod listener;
pub mod metastore;
pub mod record;
pub mod schema;
pub mod types;

pub use cache::SchemaCache;
pub use error::{SchemaError, SchemaResult};
pub use listener::{notify_collection_created, ListenerResult, SystemEventListener};
pub use metastore::{InMemoryMetastore, Metastore, OnCreateCollection};
pub use record::{Event, FieldValue, Record};
pub use schema::{CollectionKey, Schema, SchemaField, SchemaRef};
pub use types::FieldType;
