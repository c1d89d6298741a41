//! # Weir Ingest
//!
//! Streaming event deserialization with adaptive schema evolution.
//!
//! An event document carries its own routing (`project`, `collection`)
//! next to a free-form `properties` object. The
//! [`EventDeserializer`] consumes the document in a single forward pass,
//! rewinding once if `properties` precedes the headers, resolves the
//! collection's schema through a concurrent cache backed by the
//! [`Metastore`](weir_core::Metastore), grows the schema when an event
//! introduces new fields, folds in module-contributed columns, and emits
//! a typed positional record bound to the canonical schema version.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

mod bootstrap;

pub mod config;
pub mod dependency;
pub mod deserializer;
pub mod error;
pub mod json;

pub use config::DeserializerConfig;
pub use dependency::{EventMapper, FieldDependency, FieldDependencyBuilder};
pub use deserializer::EventDeserializer;
pub use error::{IngestError, IngestResult};
pub use json::{JsonToken, RewindableJsonParser};
