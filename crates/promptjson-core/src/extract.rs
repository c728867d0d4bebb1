//! Pull a JSON payload out of raw model output.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::{validate, SchemaError, StructuredResult};

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("fenced block pattern is valid")
});

/// Model output could not be turned into a `StructuredResult`
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid JSON in model output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Inner text of the first fenced code block, or the trimmed text itself.
///
/// Idempotent: applying it to its own output yields the same string.
pub fn extract_json_payload(content: &str) -> &str {
    match FENCED_BLOCK.captures(content).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => content.trim(),
    }
}

/// Extract, parse and validate raw model output
pub fn parse_structured(content: &str) -> Result<StructuredResult, ExtractError> {
    let payload = extract_json_payload(content);
    let value: serde_json::Value = serde_json::from_str(payload)?;
    Ok(validate(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json_block() {
        let content = "Here you go:\n```json\n{\"action\": \"summarize\"}\n```\nAnything else?";
        assert_eq!(extract_json_payload(content), "{\"action\": \"summarize\"}");
    }

    #[test]
    fn test_untagged_fence() {
        let content = "```\n  {\"a\": 1}  \n```";
        assert_eq!(extract_json_payload(content), "{\"a\": 1}");
    }

    #[test]
    fn test_unfenced_is_trimmed() {
        assert_eq!(extract_json_payload("  \n{\"a\": 1}\n "), "{\"a\": 1}");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        for content in [
            "prefix ```json\n{\"x\": [1, 2]}\n``` suffix",
            "   {\"x\": true}   ",
            "no json at all",
        ] {
            let once = extract_json_payload(content);
            assert_eq!(extract_json_payload(once), once);
        }
    }

    #[test]
    fn test_parse_structured_from_fence() {
        let content = "```json\n{\"action\":\"summarize\",\"original_prompt\":\"Summarize this\"}\n```";
        let result = parse_structured(content).unwrap();
        assert_eq!(result.action, "summarize");
    }

    #[test]
    fn test_parse_error() {
        let err = parse_structured("{\"action\": \"summarize\"").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[test]
    fn test_schema_error() {
        let err = parse_structured("{\"action\": \"summarize\"}").unwrap_err();
        assert!(matches!(err, ExtractError::Schema(SchemaError::MissingField(_))));
    }
}
