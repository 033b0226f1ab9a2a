//! Isolating the JSON object in a model reply.
//!
//! Even when told to answer with JSON only, models sometimes wrap the object
//! in code fences or open with an acknowledgment. The extractor slices from
//! the first `{` to the last `}` and accepts the slice only if it parses.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from response extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Locate the JSON object inside raw model output.
///
/// A reply that is already a complete JSON object is returned unchanged.
/// Otherwise the substring between the first `{` and the last `}` is
/// returned verbatim, provided it parses as JSON.
pub fn extract_json_object(raw: &str) -> Result<&str, ExtractionError> {
    if raw.starts_with('{') && raw.ends_with('}') && serde_json::from_str::<Value>(raw).is_ok() {
        return Ok(raw);
    }

    let start = raw.find('{').ok_or_else(|| {
        ExtractionError::MalformedResponse("no opening brace in response".to_string())
    })?;
    let end = raw.rfind('}').ok_or_else(|| {
        ExtractionError::MalformedResponse("no closing brace in response".to_string())
    })?;

    if end <= start {
        return Err(ExtractionError::MalformedResponse(
            "closing brace precedes opening brace".to_string(),
        ));
    }

    let candidate = &raw[start..=end];
    serde_json::from_str::<Value>(candidate).map_err(|e| {
        ExtractionError::MalformedResponse(format!("candidate object is not valid JSON: {}", e))
    })?;

    Ok(candidate)
}

/// Extract and parse the JSON object of a model reply.
pub fn parse_json_object(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    let object = extract_json_object(raw)?;

    match serde_json::from_str::<Value>(object) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ExtractionError::MalformedResponse(
            "response is not a JSON object".to_string(),
        )),
        Err(e) => Err(ExtractionError::MalformedResponse(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_prose_is_stripped() {
        let raw = r#"Sure! {"a":1,"b":"x"}"#;
        assert_eq!(extract_json_object(raw).unwrap(), r#"{"a":1,"b":"x"}"#);
    }

    #[test]
    fn test_plain_text_is_malformed() {
        assert!(matches!(
            extract_json_object("not json at all"),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_clean_object_returned_unchanged() {
        let raw = r#"{"a":1}"#;
        let extracted = extract_json_object(raw).unwrap();
        assert_eq!(extracted, raw);
        assert!(std::ptr::eq(extracted, raw));
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let raw = "```json\n{\n  \"city\": \"Roma\"\n}\n```";
        assert_eq!(extract_json_object(raw).unwrap(), "{\n  \"city\": \"Roma\"\n}");
    }

    #[test]
    fn test_formatting_preserved_verbatim() {
        let raw = "Here you go:\n{ \"total\" :  42 }\nThanks";
        assert_eq!(extract_json_object(raw).unwrap(), "{ \"total\" :  42 }");
    }

    #[test]
    fn test_nested_braces_in_strings() {
        let raw = r#"{"note":"use {curly} braces","n":{"x":1}}"#;
        assert_eq!(extract_json_object(raw).unwrap(), raw);
    }

    #[test]
    fn test_reversed_braces_are_malformed() {
        assert!(extract_json_object("} oops {").is_err());
    }

    #[test]
    fn test_missing_closing_brace_is_malformed() {
        assert!(extract_json_object(r#"{"a": 1"#).is_err());
    }

    #[test]
    fn test_invalid_candidate_is_malformed() {
        let err = extract_json_object("prefix {a: 1} suffix").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_two_objects_are_malformed() {
        assert!(extract_json_object(r#"{"a":1} and {"b":2}"#).is_err());
    }

    #[test]
    fn test_parse_json_object() {
        let map = parse_json_object("ok: {\"city\": \"Roma\"}").unwrap();
        assert_eq!(map["city"], "Roma");
    }
}
