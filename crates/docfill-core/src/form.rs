//! Editable form state fed by validated extraction results.

use serde::Serialize;
use thiserror::Error;

use crate::schema::{FieldList, FieldValue};
use crate::validator::Validation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Unknown field: {0}")]
    UnknownField(String),
}

/// Current values of every field of one schema.
///
/// Values live on the fields themselves; a field without an extracted value
/// holds its type default (`false` for checkboxes, empty text otherwise).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormState {
    fields: FieldList,
    filled_count: usize,
}

impl FormState {
    pub fn new(mut fields: FieldList) -> Self {
        reset(&mut fields);
        Self {
            fields,
            filled_count: 0,
        }
    }

    /// Replace every value with the extracted one, or the type default when
    /// the field was omitted.
    pub fn apply(&mut self, validation: &Validation) {
        for field in self.fields.iter_mut() {
            field.value = Some(
                validation
                    .values
                    .get(&field.name)
                    .cloned()
                    .unwrap_or_else(|| FieldValue::default_for(&field.field_type)),
            );
        }
        self.filled_count = validation.filled_count;
    }

    /// Record a user edit. The filled count reflects the last extraction and
    /// is not recomputed.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<(), FormError> {
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        field.value = Some(value);
        Ok(())
    }

    /// Reset every value to its default and zero the filled count.
    pub fn clear(&mut self) {
        reset(&mut self.fields);
        self.filled_count = 0;
    }

    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).and_then(|f| f.value.as_ref())
    }

    /// `(name, value)` pairs in field order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .filter_map(|f| f.value.as_ref().map(|v| (f.name.as_str(), v)))
    }

    pub fn filled_count(&self) -> usize {
        self.filled_count
    }

    pub fn total_fields(&self) -> usize {
        self.fields.len()
    }
}

fn reset(fields: &mut FieldList) {
    for field in fields.iter_mut() {
        field.value = Some(FieldValue::default_for(&field.field_type));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};
    use crate::validator::validate;
    use serde_json::json;

    fn form() -> FormState {
        FormState::new(
            FieldList::new(vec![
                Field::new("city", FieldType::Text, "City"),
                Field::new("paid", FieldType::Checkbox, "Paid"),
                Field::new("total", FieldType::Number, "Total"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_new_holds_defaults() {
        let form = form();
        assert_eq!(form.value("city"), Some(&FieldValue::Text(String::new())));
        assert_eq!(form.value("paid"), Some(&FieldValue::Bool(false)));
        assert_eq!(form.filled_count(), 0);
        assert_eq!(form.total_fields(), 3);
    }

    #[test]
    fn test_apply_merges_with_defaults() {
        let mut form = form();
        form.set_value("total", FieldValue::Number(9.0)).unwrap();

        let reply = json!({"city": "Roma", "paid": "true"});
        let validation = validate(reply.as_object().unwrap(), form.fields());
        form.apply(&validation);

        assert_eq!(form.value("city"), Some(&FieldValue::Text("Roma".into())));
        assert_eq!(form.value("paid"), Some(&FieldValue::Bool(true)));
        assert_eq!(form.value("total"), Some(&FieldValue::Text(String::new())));
        assert_eq!(form.filled_count(), 2);
    }

    #[test]
    fn test_set_value_unknown_field() {
        let mut form = form();
        assert_eq!(
            form.set_value("missing", FieldValue::Bool(true)),
            Err(FormError::UnknownField("missing".into()))
        );
    }

    #[test]
    fn test_clear() {
        let mut form = form();
        let reply = json!({"city": "Roma"});
        let validation = validate(reply.as_object().unwrap(), form.fields());
        form.apply(&validation);
        form.clear();

        assert_eq!(form.value("city"), Some(&FieldValue::Text(String::new())));
        assert_eq!(form.filled_count(), 0);
    }

    #[test]
    fn test_values_follow_field_order() {
        let names: Vec<_> = form().values().map(|(name, _)| name.to_string()).collect();
        assert_eq!(names, vec!["city", "paid", "total"]);
    }
}
