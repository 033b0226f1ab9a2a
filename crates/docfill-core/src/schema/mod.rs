//! Field schemas: the field model, schema documents and the schema catalog.
//!
//! A schema is an ordered list of fields. Schema documents are structured
//! data validated against an embedded JSON Schema before they are
//! deserialized, so a broken file reports every problem at once.

mod catalog;
mod document;
mod field;

pub use catalog::{SchemaCatalog, SchemaOption};
pub use document::{is_valid_schema_document, validate_schema_document, SchemaDocument};
pub use field::{ComboOption, Field, FieldList, FieldOptions, FieldType, FieldValue};

use thiserror::Error;

/// Errors that can occur when building or loading a field schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema document is invalid: {}", .0.join("; "))]
    InvalidDocument(Vec<String>),

    #[error("Field name must not be empty")]
    EmptyName,

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Field '{0}' requires a non-empty option list")]
    MissingOptions(String),

    #[error("Field '{0}' must not declare options")]
    UnexpectedOptions(String),

    #[error("Options of field '{name}' do not match its type '{field_type}'")]
    OptionKindMismatch { name: String, field_type: String },

    #[error("Unsupported schema file: {0}")]
    UnsupportedFormat(String),

    #[error("Duplicate schema id: {0}")]
    DuplicateSchema(String),
}
