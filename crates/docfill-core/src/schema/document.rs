//! Schema document parsing and JSON Schema validation.
//!
//! Field schemas are checked against `schema/fields.schema.json` before
//! deserialization. The schema is embedded at compile time and compiled once.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use super::{Field, FieldList, SchemaError};

/// Embedded field schema (loaded at compile time).
const FIELDS_SCHEMA_JSON: &str = include_str!("../../schema/fields.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(FIELDS_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Validate a schema document against the embedded JSON Schema.
///
/// Returns every violation, each suffixed with its instance path.
pub fn validate_schema_document(document: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check if a schema document is valid. Use `validate_schema_document` for
/// detailed error messages.
pub fn is_valid_schema_document(document: &serde_json::Value) -> bool {
    get_validator()
        .map(|v| v.is_valid(document))
        .unwrap_or(false)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped {
        #[serde(default)]
        name: Option<String>,
        fields: Vec<Field>,
    },
    Bare(Vec<Field>),
}

/// A parsed schema file: an optional display name and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub name: Option<String>,
    pub fields: FieldList,
}

impl SchemaDocument {
    /// Validate and convert an already-parsed document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        validate_schema_document(&value).map_err(SchemaError::InvalidDocument)?;

        let (name, fields) = match serde_json::from_value::<RawDocument>(value)? {
            RawDocument::Wrapped { name, fields } => (name, fields),
            RawDocument::Bare(fields) => (None, fields),
        };

        Ok(Self {
            name,
            fields: FieldList::new(fields)?,
        })
    }

    /// Parse a schema document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a schema document from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Load a schema document, choosing the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        match extension(path).as_deref() {
            Some("json") => Self::from_json(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Err(SchemaError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub(super) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

impl FieldList {
    /// Parse a field list from JSON (bare list or `{ "fields": [...] }`).
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        SchemaDocument::from_json(json).map(|doc| doc.fields)
    }

    /// Parse a field list from YAML (bare list or `fields:` mapping).
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        SchemaDocument::from_yaml(yaml).map(|doc| doc.fields)
    }

    /// Load a field list from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        SchemaDocument::from_file(path).map(|doc| doc.fields)
    }
}
