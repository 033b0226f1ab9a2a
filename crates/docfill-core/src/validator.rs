//! Field-value validation and coercion.
//!
//! Turns an untrusted, parsed model reply into a type-safe value map. Only
//! keys matching field names are read. A field is omitted when its value is
//! missing, looks like metadata echoed back by the model, fails the type
//! check, or belongs to a field of unknown type.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::denylist::{normalize, Denylist};
use crate::schema::{Field, FieldList, FieldType, FieldValue};

/// Extracted values keyed by field name.
pub type ValueMap = BTreeMap<String, FieldValue>;

/// Result of validating one model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validation {
    /// Accepted values; omission means "not found"
    pub values: ValueMap,

    /// Fields judged to carry a meaningful value (checkboxes count only
    /// when `true`)
    pub filled_count: usize,
}

impl Validation {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Why a field was left out of the value map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Omission {
    Missing,
    UnknownType,
    LabelEcho,
    TypeEcho,
    Unspecified,
    FalsePlaceholder,
    NotAnOption,
    NotNumeric,
    UnsupportedValue,
}

impl fmt::Display for Omission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Omission::Missing => "missing or empty",
            Omission::UnknownType => "unknown field type",
            Omission::LabelEcho => "value echoes the label",
            Omission::TypeEcho => "value echoes the type name",
            Omission::Unspecified => "value is an unspecified placeholder",
            Omission::FalsePlaceholder => "textual false on a non-checkbox field",
            Omission::NotAnOption => "value is not a declared option",
            Omission::NotNumeric => "value is not numeric",
            Omission::UnsupportedValue => "unsupported value kind",
        };
        f.write_str(reason)
    }
}

/// Validates parsed replies against a field list with a configured denylist.
///
/// Stateless: the same inputs always produce the same [`Validation`].
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    denylist: Denylist,
}

impl FieldValidator {
    pub fn new(denylist: Denylist) -> Self {
        Self { denylist }
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Validate every field of `fields`, in list order.
    pub fn validate(&self, parsed: &Map<String, Value>, fields: &FieldList) -> Validation {
        let mut validation = Validation::default();

        for field in fields {
            match self.check_field(field, parsed.get(&field.name)) {
                Ok(value) => {
                    if counts_as_filled(&value) {
                        validation.filled_count += 1;
                    }
                    validation.values.insert(field.name.clone(), value);
                }
                Err(Omission::Missing) => {}
                Err(reason) => {
                    debug!(field = %field.name, %reason, "field omitted");
                }
            }
        }

        validation
    }

    fn check_field(&self, field: &Field, raw: Option<&Value>) -> Result<FieldValue, Omission> {
        let raw = match raw {
            None | Some(Value::Null) => return Err(Omission::Missing),
            Some(Value::String(s)) if s.is_empty() => return Err(Omission::Missing),
            Some(value) => value,
        };

        if field.field_type.is_unknown() {
            return Err(Omission::UnknownType);
        }

        self.screen_noise(field, raw)?;
        coerce(field, raw)
    }

    /// Reject values that echo metadata or stand in for "not found".
    fn screen_noise(&self, field: &Field, raw: &Value) -> Result<(), Omission> {
        let text = normalize(&string_form(raw));

        if !field.label.trim().is_empty() && text == normalize(&field.label) {
            return Err(Omission::LabelEcho);
        }
        if text == field.field_type.as_str() {
            return Err(Omission::TypeEcho);
        }
        if self.denylist.matches(&text) {
            return Err(Omission::Unspecified);
        }
        if field.field_type != FieldType::Checkbox && text == "false" {
            return Err(Omission::FalsePlaceholder);
        }
        Ok(())
    }
}

/// Validate with the default denylist.
pub fn validate(parsed: &Map<String, Value>, fields: &FieldList) -> Validation {
    FieldValidator::default().validate(parsed, fields)
}

fn coerce(field: &Field, raw: &Value) -> Result<FieldValue, Omission> {
    match &field.field_type {
        FieldType::ComboBox => {
            let id = raw.as_str().ok_or(Omission::NotAnOption)?;
            if field.combo_options().iter().any(|o| o.id == id) {
                Ok(FieldValue::Text(id.to_string()))
            } else {
                Err(Omission::NotAnOption)
            }
        }
        FieldType::Select => {
            let choice = raw.as_str().ok_or(Omission::NotAnOption)?;
            if field.select_options().iter().any(|o| o == choice) {
                Ok(FieldValue::Text(choice.to_string()))
            } else {
                Err(Omission::NotAnOption)
            }
        }
        FieldType::Number => parse_number(raw)
            .map(FieldValue::Number)
            .ok_or(Omission::NotNumeric),
        FieldType::Checkbox => match raw {
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::String(s) => Ok(FieldValue::Bool(s.eq_ignore_ascii_case("true"))),
            _ => Err(Omission::UnsupportedValue),
        },
        FieldType::Text | FieldType::Textarea | FieldType::Date => {
            Ok(FieldValue::Text(string_form(raw)))
        }
        FieldType::Unknown(_) => Err(Omission::UnknownType),
    }
}

fn counts_as_filled(value: &FieldValue) -> bool {
    !matches!(value, FieldValue::Bool(false))
}

/// Numbers pass through; strings are trimmed and parsed. NaN and infinities
/// are rejected.
fn parse_number(raw: &Value) -> Option<f64> {
    let number = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// The text a value would be stored as in a text field.
fn string_form(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        other => other.to_string(),
    }
}

/// Integers keep every digit; floats drop a zero fraction (`3.0` -> `3`).
fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::schema::{ComboOption, Field};
    use proptest::prelude::*;

    fn fields() -> FieldList {
        FieldList::new(vec![
            Field::new("kind", FieldType::Select, "Kind").with_select_options(["a", "b", "c"]),
            Field::new("unit", FieldType::ComboBox, "Unit")
                .with_combo_options(vec![ComboOption::new("01", "One")]),
            Field::new("total", FieldType::Number, "Total"),
            Field::new("paid", FieldType::Checkbox, "Paid"),
            Field::new("city", FieldType::Text, "City"),
        ])
        .unwrap()
    }

    fn json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| Value::from(n)),
            "[a-zA-Z0-9 /.]{0,12}".prop_map(Value::String),
            prop_oneof![Just("a"), Just("01"), Just("true"), Just("false"), Just("42")]
                .prop_map(|s| Value::String(s.to_string())),
        ]
    }

    fn reply() -> impl Strategy<Value = Map<String, Value>> {
        (json_scalar(), json_scalar(), json_scalar(), json_scalar(), json_scalar()).prop_map(
            |(kind, unit, total, paid, city)| {
                let mut map = Map::new();
                map.insert("kind".into(), kind);
                map.insert("unit".into(), unit);
                map.insert("total".into(), total);
                map.insert("paid".into(), paid);
                map.insert("city".into(), city);
                map
            },
        )
    }

    proptest! {
        #[test]
        fn options_never_escape(reply in reply()) {
            let result = validate(&reply, &fields());
            if let Some(value) = result.get("kind") {
                let stored = value.as_str().unwrap_or_default();
                prop_assert!(["a", "b", "c"].contains(&stored));
            }
            if let Some(value) = result.get("unit") {
                prop_assert_eq!(value.as_str(), Some("01"));
            }
        }

        #[test]
        fn numbers_are_numeric(reply in reply()) {
            let result = validate(&reply, &fields());
            if let Some(value) = result.get("total") {
                prop_assert!(value.as_f64().map(f64::is_finite).unwrap_or(false));
            }
        }

        #[test]
        fn filled_count_matches_values(reply in reply()) {
            let result = validate(&reply, &fields());
            let expected = result
                .values
                .values()
                .filter(|v| !matches!(v, FieldValue::Bool(false)))
                .count();
            prop_assert_eq!(result.filled_count, expected);
            prop_assert!(result.filled_count <= result.values.len());
        }

        #[test]
        fn validation_is_idempotent(reply in reply()) {
            let fields = fields();
            prop_assert_eq!(validate(&reply, &fields), validate(&reply, &fields));
        }
    }
}
