//! Classification oracle client
//!
//! One chat-completion call per record against an OpenAI-compatible endpoint.
//! The response content is decoded into a typed [`OracleProposal`]; anything
//! other than a JSON object of the expected shape is a parse error.

use crate::error::OracleError;
use crate::models::Record;
use crate::services::prompt::build_validation_prompt;
use crate::services::reference_docs::ReferenceDocs;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const USER_AGENT: &str = concat!("gqa-validator/", env!("CARGO_PKG_VERSION"));

/// Model families that reject an explicit temperature
const NON_DETERMINISTIC_PREFIXES: [&str; 4] = ["gpt-5", "o1", "o3", "o4"];

/// Longest error body quoted in a transport error
const MAX_ERROR_BODY: usize = 300;

/// External classification service
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    /// Ask for a corrected classification of one record
    async fn classify(
        &self,
        record: &Record,
        docs: &ReferenceDocs,
    ) -> Result<OracleProposal, OracleError>;

    /// Model identifier the oracle is configured with
    fn model(&self) -> &str;
}

/// Structured answer from the oracle
///
/// Missing keys fall back to `None`, `[]` and `""`. A key present with the
/// wrong type fails decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleProposal {
    #[serde(default)]
    pub l1_validated: Option<String>,
    #[serde(default)]
    pub l2_validated: Option<String>,
    #[serde(default)]
    pub l3_validated: Option<String>,
    #[serde(default)]
    pub gender_validated: Option<String>,
    #[serde(default)]
    pub primary_fop_validated: Option<String>,
    #[serde(default)]
    pub sub_sport_validated: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub corrected_columns: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl OracleProposal {
    /// Decode the text content of an oracle reply
    ///
    /// Tolerates surrounding whitespace and a Markdown code fence.
    pub fn from_content(content: &str) -> Result<Self, OracleError> {
        let body = strip_code_fence(content);
        if body.is_empty() {
            return Err(OracleError::Parse("empty response content".to_string()));
        }

        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| OracleError::Parse(format!("response is not JSON ({}): {}", e, preview(body))))?;
        if !value.is_object() {
            return Err(OracleError::Parse(format!(
                "response is not a JSON object: {}",
                preview(body)
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| OracleError::Parse(format!("unexpected response shape: {}", e)))
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

fn preview(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", head)
    }
}

/// True when the model accepts `temperature = 0`
pub fn supports_deterministic(model: &str) -> bool {
    !NON_DETERMINISTIC_PREFIXES
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

/// Connection settings for [`OpenAiOracle`]
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl OracleSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// Chat-completion reply, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completion oracle
pub struct OpenAiOracle {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    pub fn new(settings: OracleSettings) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            api_key: settings.api_key,
            model: settings.model,
        })
    }

    /// Request body for one record
    pub fn request_body(&self, prompt: &str) -> serde_json::Value {
        build_request_body(&self.model, prompt)
    }
}

fn build_request_body(model: &str, prompt: &str) -> serde_json::Value {
    let mut body = json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "response_format": { "type": "json_object" },
    });
    if supports_deterministic(model) {
        body["temperature"] = json!(0.0);
    }
    body
}

fn extract_content(completion: ChatCompletion) -> Result<String, OracleError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| OracleError::Parse("response has no message content".to_string()))
}

#[async_trait]
impl ClassificationOracle for OpenAiOracle {
    async fn classify(
        &self,
        record: &Record,
        docs: &ReferenceDocs,
    ) -> Result<OracleProposal, OracleError> {
        let prompt = build_validation_prompt(record, docs);
        let body = self.request_body(&prompt);

        tracing::debug!(
            item_key = %record.item_key,
            model = %self.model,
            prompt_bytes = prompt.len(),
            "Calling classification oracle"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OracleError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                preview(text.trim())
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| OracleError::Parse(format!("invalid completion payload: {}", e)))?;

        let content = extract_content(completion)?;
        OracleProposal::from_content(&content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_only_for_deterministic_models() {
        let body = build_request_body("gpt-4o", "hi");
        assert_eq!(body["temperature"], json!(0.0));
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"], "hi");

        for model in ["gpt-5-mini", "o1-preview", "o3", "o4-mini"] {
            let body = build_request_body(model, "hi");
            assert!(body.get("temperature").is_none(), "{} got a temperature", model);
        }
    }

    #[test]
    fn test_full_proposal_decodes() {
        let content = r#"{
            "l1_validated": "Apparel",
            "l2_validated": "Tops",
            "l3_validated": null,
            "gender_validated": "Men's",
            "primary_fop_validated": "golf",
            "sub_sport_validated": "null",
            "corrected_columns": ["l2"],
            "reasoning": "Polo shirt"
        }"#;

        let proposal = OracleProposal::from_content(content).unwrap();
        assert_eq!(proposal.l2_validated.as_deref(), Some("Tops"));
        assert_eq!(proposal.l3_validated, None);
        // Sentinel strings are left for the reconciler
        assert_eq!(proposal.sub_sport_validated.as_deref(), Some("null"));
        assert_eq!(proposal.corrected_columns, vec!["l2"]);
    }

    #[test]
    fn test_missing_keys_take_fallbacks() {
        let proposal = OracleProposal::from_content(r#"{"l1_validated": "Footwear"}"#).unwrap();
        assert_eq!(proposal.l1_validated.as_deref(), Some("Footwear"));
        assert!(proposal.corrected_columns.is_empty());
        assert_eq!(proposal.reasoning, "");

        let nulls =
            OracleProposal::from_content(r#"{"corrected_columns": null, "reasoning": null}"#)
                .unwrap();
        assert!(nulls.corrected_columns.is_empty());
        assert_eq!(nulls.reasoning, "");
    }

    #[test]
    fn test_code_fence_is_tolerated() {
        let content = "```json\n{\"gender_validated\": \"Kids\"}\n```";
        let proposal = OracleProposal::from_content(content).unwrap();
        assert_eq!(proposal.gender_validated.as_deref(), Some("Kids"));
    }

    #[test]
    fn test_non_object_and_wrong_types_are_parse_errors() {
        for content in ["", "Sure! Here you go", "[1, 2]", r#""text""#] {
            assert!(
                matches!(OracleProposal::from_content(content), Err(OracleError::Parse(_))),
                "{:?} should not decode",
                content
            );
        }

        let wrong_type = OracleProposal::from_content(r#"{"corrected_columns": "l1"}"#);
        assert!(matches!(wrong_type, Err(OracleError::Parse(_))));
        let wrong_type = OracleProposal::from_content(r#"{"l1_validated": 3}"#);
        assert!(matches!(wrong_type, Err(OracleError::Parse(_))));
    }

    #[test]
    fn test_completion_without_content() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(extract_content(completion), Err(OracleError::Parse(_))));

        let completion: ChatCompletion =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(matches!(extract_content(completion), Err(OracleError::Parse(_))));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let mut settings = OracleSettings::new("sk-test");
        settings.base_url = "http://localhost:8080/v1/".to_string();
        let oracle = OpenAiOracle::new(settings).unwrap();
        assert_eq!(oracle.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(oracle.model(), DEFAULT_MODEL);
    }
}
