//! Extraction prompts.
//!
//! The prompt is the only contract the model sees: it lists each field with
//! its type and options, the document text, and the rules the validator will
//! enforce anyway. Models that follow the rules waste fewer tokens on values
//! that would be dropped.

use crate::denylist::Denylist;
use crate::schema::{Field, FieldList, FieldOptions};

/// System message sent with every extraction prompt.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a document parser.
You extract values for named fields from document text and answer with a single JSON object.
You never add commentary, explanations or markdown."#;

const EXAMPLE_RESPONSE: &str = r#"{
  "fieldName1": "value1",
  "fieldName2": true,
  "fieldName3": 42,
  "comboBoxField": "01"
}"#;

/// Build the extraction prompt using the default "unspecified" phrases.
pub fn build_prompt(document_text: &str, fields: &FieldList) -> String {
    build_prompt_with(document_text, fields, &Denylist::default())
}

/// Build the extraction prompt, listing `denylist` as phrases to omit.
pub fn build_prompt_with(document_text: &str, fields: &FieldList, denylist: &Denylist) -> String {
    let field_lines = fields
        .iter()
        .map(describe_field)
        .collect::<Vec<_>>()
        .join("\n");

    let mut rules = vec![
        "- Respond with exactly one JSON object and nothing else: no prose, no markdown code fences".to_string(),
        "- Keys must match the field names exactly".to_string(),
        "- For combo box fields, return the ID of the matching option".to_string(),
        "- For select fields, values must be one of the provided options".to_string(),
        "- For checkbox fields, values must be true or false".to_string(),
        "- For number fields, values must be numeric".to_string(),
        "- For text, textarea and date fields, values must be strings".to_string(),
        "- If a value cannot be found or is uncertain, omit the field from the response".to_string(),
        "- Omit a field whose value would be its own label or its type name".to_string(),
        "- Never answer \"false\" for a field that is not a checkbox; omit it instead".to_string(),
    ];
    if !denylist.is_empty() {
        let phrases = denylist
            .phrases()
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", ");
        rules.push(format!(
            "- Omit the field instead of answering with a placeholder such as {}",
            phrases
        ));
    }

    format!(
        "Extract information from the text below and provide values for the specified fields.\n\
         Respond ONLY with a valid JSON object containing the extracted values.\n\
         \n\
         Fields to extract:\n\
         {fields}\n\
         \n\
         Text content:\n\
         {text}\n\
         \n\
         Rules:\n\
         {rules}\n\
         \n\
         Example response format:\n\
         {example}",
        fields = field_lines,
        text = document_text,
        rules = rules.join("\n"),
        example = EXAMPLE_RESPONSE,
    )
}

/// One prompt line: `name (type)` or `name (type, options: [...])`.
pub fn describe_field(field: &Field) -> String {
    match &field.options {
        Some(FieldOptions::Combo(options)) => {
            let options = options
                .iter()
                .map(|o| format!("{}:{}", o.id, o.value))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ({}, options: [{}])", field.name, field.field_type, options)
        }
        Some(FieldOptions::Plain(options)) => format!(
            "{} ({}, options: [{}])",
            field.name,
            field.field_type,
            options.join(", ")
        ),
        None => format!("{} ({})", field.name, field.field_type),
    }
}
