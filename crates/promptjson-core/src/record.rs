use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::StructuredResult;

/// Input for persisting a successful conversion
#[derive(Debug, Clone)]
pub struct NewConversion {
    pub original_prompt: String,
    pub generated_json: StructuredResult,
    pub llm_provider: String,
    pub user_id: String,
}

/// Persisted conversion. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    pub id: String,
    pub original_prompt: String,
    pub generated_json: StructuredResult,
    pub llm_provider: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl ConversionRecord {
    /// Assign an id and creation time
    pub fn from_new(new: NewConversion) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_prompt: new.original_prompt,
            generated_json: new.generated_json,
            llm_provider: new.llm_provider,
            user_id: new.user_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ConversionRecord::from_new(NewConversion {
            original_prompt: "Summarize this".to_string(),
            generated_json: StructuredResult::new("summarize", "Summarize this"),
            llm_provider: "gemini".to_string(),
            user_id: "user-1".to_string(),
        });

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["originalPrompt"], "Summarize this");
        assert_eq!(value["llmProvider"], "gemini");
        assert_eq!(value["generatedJson"]["action"], "summarize");
        assert!(value["createdAt"].is_string());
        assert_eq!(Uuid::parse_str(&record.id).map(|u| u.get_version_num()).ok(), Some(4));
    }
}
