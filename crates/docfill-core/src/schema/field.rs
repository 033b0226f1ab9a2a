//! Field model: typed slots that a document extraction fills.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use super::SchemaError;

/// The declared type of a field.
///
/// Unrecognised type strings are kept as [`FieldType::Unknown`] so a schema
/// with a misconfigured field still loads; the validator never accepts a
/// value for such a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Number,
    Checkbox,
    Select,
    ComboBox,
    Textarea,
    Date,
    Unknown(String),
}

impl FieldType {
    /// Parse a type name as written in a schema file.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "checkbox" => FieldType::Checkbox,
            "select" => FieldType::Select,
            "combo box" | "combo-box" | "combo_box" | "combobox" => FieldType::ComboBox,
            "textarea" => FieldType::Textarea,
            "date" => FieldType::Date,
            _ => FieldType::Unknown(raw.to_string()),
        }
    }

    /// Canonical type name, as rendered in prompts and compared against
    /// echoed values.
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Checkbox => "checkbox",
            FieldType::Select => "select",
            FieldType::ComboBox => "combo box",
            FieldType::Textarea => "textarea",
            FieldType::Date => "date",
            FieldType::Unknown(raw) => raw,
        }
    }

    /// Whether fields of this type must carry a non-empty option list.
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::ComboBox)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldType::Unknown(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldType::parse(&raw))
    }
}

/// One selectable entry of a combo box: only `id` is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboOption {
    pub id: String,
    pub value: String,
}

impl ComboOption {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Option list of a select or combo box field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldOptions {
    /// `{id, value}` pairs (combo box)
    Combo(Vec<ComboOption>),
    /// Bare strings (select)
    Plain(Vec<String>),
}

impl FieldOptions {
    pub fn len(&self) -> usize {
        match self {
            FieldOptions::Combo(options) => options.len(),
            FieldOptions::Plain(options) => options.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A typed value held by a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// The value a field holds before anything was extracted or typed in.
    pub fn default_for(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Checkbox => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// A named, typed slot to be filled with a value extracted from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Unique identifier within a field list; also the JSON key the model
    /// must answer with
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Display label
    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,

    /// Current value, owned by the form state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            label: label.into(),
            options: None,
            value: None,
        }
    }

    /// Attach select options.
    pub fn with_select_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(FieldOptions::Plain(
            options.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Attach combo box options.
    pub fn with_combo_options(mut self, options: Vec<ComboOption>) -> Self {
        self.options = Some(FieldOptions::Combo(options));
        self
    }

    /// Select options, empty when the field has none or carries combo pairs.
    pub fn select_options(&self) -> &[String] {
        match &self.options {
            Some(FieldOptions::Plain(options)) => options,
            _ => &[],
        }
    }

    /// Combo box options, empty when the field has none or carries strings.
    pub fn combo_options(&self) -> &[ComboOption] {
        match &self.options {
            Some(FieldOptions::Combo(options)) => options,
            _ => &[],
        }
    }

    fn check_options(&self) -> Result<(), SchemaError> {
        match (&self.field_type, &self.options) {
            (FieldType::Unknown(_), _) => Ok(()),
            (ty, None) if ty.requires_options() => {
                Err(SchemaError::MissingOptions(self.name.clone()))
            }
            (ty, Some(options)) if ty.requires_options() => {
                if options.is_empty() {
                    return Err(SchemaError::MissingOptions(self.name.clone()));
                }
                let kind_matches = matches!(
                    (ty, options),
                    (FieldType::Select, FieldOptions::Plain(_))
                        | (FieldType::ComboBox, FieldOptions::Combo(_))
                );
                if !kind_matches {
                    return Err(SchemaError::OptionKindMismatch {
                        name: self.name.clone(),
                        field_type: ty.to_string(),
                    });
                }
                Ok(())
            }
            (_, Some(_)) => Err(SchemaError::UnexpectedOptions(self.name.clone())),
            (_, None) => Ok(()),
        }
    }
}

/// Ordered list of fields with unique names.
///
/// Defines both what the prompt asks for and which keys the validator reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Field>", into = "Vec<Field>")]
pub struct FieldList {
    fields: Vec<Field>,
}

impl FieldList {
    /// Build a field list, enforcing unique non-empty names and the option
    /// invariant for select and combo box fields.
    pub fn new(fields: Vec<Field>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            field.check_options()?;
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Field> {
        self.fields.iter_mut()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Vec<Field>> for FieldList {
    type Error = SchemaError;

    fn try_from(fields: Vec<Field>) -> Result<Self, Self::Error> {
        FieldList::new(fields)
    }
}

impl From<FieldList> for Vec<Field> {
    fn from(list: FieldList) -> Self {
        list.fields
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
