//! JSON export of the intermediate representation.
//!
//! This is the way to inspect what the parser understood from a source file
//! before the XML is generated.

use serde::Serialize;
use std::io::Write;
use thiserror::Error;

use crate::ir::Component;

/// Errors that can occur during JSON export operations.
#[derive(Debug, Error)]
pub enum JsonExportError {
    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Options for JSON export.
#[derive(Debug, Clone)]
pub struct JsonExportOptions {
    /// Pretty-print the JSON output
    pub pretty_print: bool,
}

impl Default for JsonExportOptions {
    fn default() -> Self {
        Self { pretty_print: true }
    }
}

#[derive(Serialize)]
struct Document<'a> {
    schema_version: &'static str,
    components: &'a [Component],
}

/// Serializes the components to a JSON string.
pub fn to_json(
    components: &[Component],
    options: &JsonExportOptions,
) -> Result<String, JsonExportError> {
    let document = Document {
        schema_version: "1",
        components,
    };
    let json = if options.pretty_print {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(json)
}

/// Serializes the components to the writer.
pub fn write_json<W: Write>(
    components: &[Component],
    options: &JsonExportOptions,
    writer: &mut W,
) -> Result<(), JsonExportError> {
    let json = to_json(components, options)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}
