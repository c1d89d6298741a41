//! Streaming JSON support for event ingestion.

mod parser;

pub use parser::{JsonToken, RewindableJsonParser};
