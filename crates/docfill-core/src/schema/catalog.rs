//! Named schemas a user can choose from.

use std::fs;
use std::path::Path;
use tracing::debug;

use super::document::extension;
use super::{FieldList, SchemaDocument, SchemaError};

/// A selectable schema: id, display name and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaOption {
    pub id: String,
    pub name: String,
    pub fields: FieldList,
}

impl SchemaOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>, fields: FieldList) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields,
        }
    }
}

/// Ordered set of schemas, looked up by id. The first entry is the default
/// selection.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: Vec<SchemaOption>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.json`, `.yaml` and `.yml` file in a directory.
    ///
    /// The file stem becomes the schema id; the display name is the
    /// document's `name` key, or the id when absent. Entries are sorted by id.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let mut catalog = Self::new();
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(extension(path).as_deref(), Some("json" | "yaml" | "yml"))
            })
            .collect();
        paths.sort();

        for path in paths {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            let document = SchemaDocument::from_file(&path)?;
            let name = document.name.unwrap_or_else(|| id.clone());
            debug!(schema = %id, fields = document.fields.len(), "loaded schema");
            catalog.insert(SchemaOption::new(id, name, document.fields))?;
        }

        Ok(catalog)
    }

    /// Add a schema. Ids are unique within a catalog.
    pub fn insert(&mut self, schema: SchemaOption) -> Result<(), SchemaError> {
        if self.get(&schema.id).is_some() {
            return Err(SchemaError::DuplicateSchema(schema.id));
        }
        self.schemas.push(schema);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SchemaOption> {
        self.schemas.iter().find(|s| s.id == id)
    }

    /// The schema selected when the user has not picked one.
    pub fn default_schema(&self) -> Option<&SchemaOption> {
        self.schemas.first()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaOption> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
