//! Schema front-ends.
//!
//! YAML is the canonical IDL format; a JSON front-end producing the same
//! model is accepted for `.json` files.

use crate::error::CodegenError;
use crate::schema::{Schema, SchemaDoc};
use std::path::Path;

/// Parses YAML schema content.
pub fn parse_yaml(content: &str, origin: &Path) -> Result<SchemaDoc, CodegenError> {
    serde_yaml::from_str(content).map_err(|source| CodegenError::Yaml {
        path: origin.to_path_buf(),
        source,
    })
}

/// Parses JSON schema content.
pub fn parse_json(content: &str, origin: &Path) -> Result<SchemaDoc, CodegenError> {
    serde_json::from_str(content).map_err(|source| CodegenError::Json {
        path: origin.to_path_buf(),
        source,
    })
}

/// Reads and parses a schema file, choosing the front-end by extension.
pub fn parse_file(path: &Path) -> Result<SchemaDoc, CodegenError> {
    let content = std::fs::read_to_string(path).map_err(|source| CodegenError::Io {
        context: "reading schema",
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("yaml") | Some("yml") => parse_yaml(&content, path),
        Some("json") => parse_json(&content, path),
        _ => Err(CodegenError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Reads, parses, and validates a schema file into the strict model.
pub fn load_schema(path: &Path) -> Result<Schema, CodegenError> {
    let doc = parse_file(path)?;
    let schema = Schema::from_doc(doc)?;
    tracing::debug!(
        service = %schema.service,
        methods = schema.methods.len(),
        messages = schema.messages.len(),
        "Parsed schema"
    );
    Ok(schema)
}
