//! Required output shape of a conversion and its validator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A named entity extracted from the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// Validated conversion result
///
/// `action` and `original_prompt` are always non-empty. Optional fields the
/// model omitted stay absent when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredResult {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    pub original_prompt: String,
}

impl StructuredResult {
    /// Create a result with only the required fields
    pub fn new(action: impl Into<String>, original_prompt: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entities: None,
            constraints: None,
            output_format: None,
            original_prompt: original_prompt.into(),
        }
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    /// Serialize to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Candidate value does not match the required shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("JSON schema mismatch: expected an object, got {0}")]
    NotAnObject(&'static str),

    #[error("JSON schema mismatch: missing required field `{0}`")]
    MissingField(String),

    #[error("JSON schema mismatch: `{0}` must be a non-empty string")]
    EmptyField(String),

    #[error("JSON schema mismatch: `{field}` must be {expected}, got {actual}")]
    InvalidType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Validate an unstructured value against the required output shape.
///
/// Unknown keys are dropped. Pure function.
pub fn validate(candidate: &Value) -> Result<StructuredResult, SchemaError> {
    let object = candidate
        .as_object()
        .ok_or_else(|| SchemaError::NotAnObject(type_name(candidate)))?;

    let action = required_string(object, "action")?;
    let original_prompt = required_string(object, "original_prompt")?;

    let entities = match object.get("entities") {
        None => None,
        Some(value) => {
            let items = expect_array(value, "entities")?;
            let mut entities = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let path = format!("entities[{}]", index);
                let entry = item.as_object().ok_or_else(|| SchemaError::InvalidType {
                    field: path.clone(),
                    expected: "an object",
                    actual: type_name(item),
                })?;
                let name = nested_string(entry, &path, "name")?;
                let entity_type = nested_string(entry, &path, "type")?;
                entities.push(Entity { name, entity_type });
            }
            Some(entities)
        }
    };

    let constraints = match object.get("constraints") {
        None => None,
        Some(value) => {
            let items = expect_array(value, "constraints")?;
            let mut constraints = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let text = item.as_str().ok_or_else(|| SchemaError::InvalidType {
                    field: format!("constraints[{}]", index),
                    expected: "a string",
                    actual: type_name(item),
                })?;
                constraints.push(text.to_string());
            }
            Some(constraints)
        }
    };

    let output_format = match object.get("output_format") {
        None => None,
        Some(value) => Some(
            value
                .as_str()
                .ok_or_else(|| SchemaError::InvalidType {
                    field: "output_format".to_string(),
                    expected: "a string",
                    actual: type_name(value),
                })?
                .to_string(),
        ),
    };

    Ok(StructuredResult {
        action,
        entities,
        constraints,
        output_format,
        original_prompt,
    })
}

fn required_string(object: &Map<String, Value>, field: &str) -> Result<String, SchemaError> {
    let value = object
        .get(field)
        .ok_or_else(|| SchemaError::MissingField(field.to_string()))?;
    let text = value.as_str().ok_or_else(|| SchemaError::InvalidType {
        field: field.to_string(),
        expected: "a string",
        actual: type_name(value),
    })?;
    if text.is_empty() {
        return Err(SchemaError::EmptyField(field.to_string()));
    }
    Ok(text.to_string())
}

fn nested_string(
    object: &Map<String, Value>,
    parent: &str,
    field: &str,
) -> Result<String, SchemaError> {
    let path = format!("{}.{}", parent, field);
    let value = object
        .get(field)
        .ok_or_else(|| SchemaError::MissingField(path.clone()))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::InvalidType {
            field: path,
            expected: "a string",
            actual: type_name(value),
        })
}

fn expect_array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, SchemaError> {
    value.as_array().ok_or_else(|| SchemaError::InvalidType {
        field: field.to_string(),
        expected: "an array",
        actual: type_name(value),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields_only() {
        let value = json!({
            "action": "summarize",
            "original_prompt": "Summarize this article for me"
        });

        let result = validate(&value).unwrap();
        assert_eq!(
            result,
            StructuredResult::new("summarize", "Summarize this article for me")
        );
        assert_eq!(result.to_value(), value);
    }

    #[test]
    fn test_full_shape_round_trips_unchanged() {
        let value = json!({
            "action": "compare",
            "entities": [
                {"name": "A", "type": "entity"},
                {"name": "B", "type": "entity"}
            ],
            "constraints": ["tone: formal", "max_length: 200 words"],
            "output_format": "markdown",
            "original_prompt": "Compare A and B formally"
        });

        let result = validate(&value).unwrap();
        assert_eq!(result.entities.as_ref().map(Vec::len), Some(2));
        assert_eq!(result.entities.as_ref().unwrap()[1], Entity::new("B", "entity"));
        assert_eq!(result.to_value(), value);
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let value = json!({
            "action": "translate",
            "original_prompt": "Translate to French",
            "confidence": 0.9
        });

        let result = validate(&value).unwrap();
        assert!(result.to_value().get("confidence").is_none());
    }

    #[test]
    fn test_missing_action() {
        let err = validate(&json!({"original_prompt": "hi"})).unwrap_err();
        assert_eq!(err, SchemaError::MissingField("action".to_string()));
    }

    #[test]
    fn test_empty_original_prompt() {
        let err = validate(&json!({"action": "x", "original_prompt": ""})).unwrap_err();
        assert_eq!(err, SchemaError::EmptyField("original_prompt".to_string()));
    }

    #[test]
    fn test_whitespace_counts_as_content() {
        let result = validate(&json!({"action": " ", "original_prompt": "  "})).unwrap();
        assert_eq!(result.action, " ");
        assert_eq!(result.original_prompt, "  ");
    }

    #[test]
    fn test_action_wrong_type() {
        let err = validate(&json!({"action": 5, "original_prompt": "p"})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidType { ref field, .. } if field == "action"));
    }

    #[test]
    fn test_entity_missing_type() {
        let value = json!({
            "action": "extract_data",
            "entities": [{"name": "key points"}],
            "original_prompt": "Extract key points"
        });

        let err = validate(&value).unwrap_err();
        assert_eq!(err, SchemaError::MissingField("entities[0].type".to_string()));
    }

    #[test]
    fn test_null_optional_field_is_rejected() {
        let value = json!({
            "action": "explain",
            "output_format": null,
            "original_prompt": "Explain monads"
        });

        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("output_format"));
    }

    #[test]
    fn test_constraint_must_be_string() {
        let value = json!({
            "action": "create",
            "constraints": ["ok", 3],
            "original_prompt": "Create a poem"
        });

        let err = validate(&value).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidType { ref field, .. } if field == "constraints[1]"));
    }

    #[test]
    fn test_not_an_object() {
        let err = validate(&json!(["action"])).unwrap_err();
        assert_eq!(err, SchemaError::NotAnObject("an array"));
    }
}
