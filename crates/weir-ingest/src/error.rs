//! Ingestion error types.
//!
//! Provides [`IngestError`] for the parsing and deserialization pipeline,
//! plus a convenience [`IngestResult`] alias. Structural errors reject a
//! single event; schema errors surface to the caller but never leave a
//! partial schema in the cache.

use thiserror::Error;

use weir_core::SchemaError;

/// Result alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while deserializing an event document.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The document is structurally unusable: `project` or `collection`
    /// missing, `properties` missing or duplicated, or a header of the
    /// wrong shape.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// A property value is an object, an array of arrays, or some other
    /// structure the flat type model cannot represent.
    #[error("nested properties are not supported: {0}")]
    NestedNotSupported(String),

    /// The input is not valid JSON.
    #[error("invalid JSON at byte {offset}: {message}")]
    Parse {
        /// Byte offset of the offending input.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// A schema operation failed (unknown project, type conflict, or a
    /// metastore backend error).
    #[error(transparent)]
    Schema(SchemaError),
}

impl From<SchemaError> for IngestError {
    fn from(err: SchemaError) -> Self {
        match err {
            // Keep a single user-visible kind for nesting violations,
            // whichever layer detected them.
            SchemaError::NestedNotSupported(msg) => IngestError::NestedNotSupported(msg),
            other => IngestError::Schema(other),
        }
    }
}
