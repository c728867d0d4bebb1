//! Fixed instructions sent to every provider.

pub const SYSTEM_PROMPT: &str = r#"You analyze natural-language prompts and convert them into structured JSON that other language models can consume.

Rules:
1. Reply with ONLY one valid JSON object. No markdown, no commentary.
2. Identify the primary action precisely (summarize, generate_code, extract_data, analyze, compare, create, explain, translate, classify, ...).
3. Extract the key entities (people, organizations, products, concepts, data types) with a type for each.
4. List explicit and implicit constraints such as length, tone, style, language or format.
5. Pick the most suitable output format (markdown, json, plain_text, html, csv, ...).

Examples:
- "Write a summary" -> action: "summarize"
- "Generate Python code" -> action: "generate_code", constraints: ["language: python"]
- "Compare A and B" -> action: "compare", entities: [{"name": "A", "type": "entity"}, {"name": "B", "type": "entity"}]

Required structure:
{
  "action": "string (required)",
  "entities": [{"name": "string", "type": "string"}],
  "constraints": ["string"],
  "output_format": "string",
  "original_prompt": "string (required)"
}"#;

pub const CORRECTION_PROMPT: &str = "Your previous reply was not valid JSON for the required structure. Reply with ONLY a valid JSON object that follows the structure exactly.";

/// User message for a prompt
pub fn user_prompt(prompt: &str) -> String {
    format!("Analyze this prompt and convert it to JSON: {}", prompt)
}

/// System message for the correction call after malformed output
pub fn correction_system_prompt() -> String {
    format!("{}\n\n{}", CORRECTION_PROMPT, SYSTEM_PROMPT)
}
