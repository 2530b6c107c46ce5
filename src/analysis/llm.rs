//! Chat model clients used by the analysis pipeline.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{AppError, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One generation call.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub prompt: String,
    /// PDF sent inline with the prompt, for models that accept files.
    pub pdf: Option<Vec<u8>>,
    /// Ask the provider for a JSON-only response.
    pub json_output: bool,
    pub temperature: f32,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier recorded in logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: ModelRequest) -> Result<String>;
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

async fn post_json(request: reqwest::RequestBuilder, provider: &str) -> Result<ProviderResponse> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::Model(format!("{} request failed: {}", provider, e)))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AppError::Model(format!("{} response unreadable: {}", provider, e)))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ProviderResponse>(&text)
            .ok()
            .and_then(|r| r.error)
            .map(|e| e.message)
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(AppError::Model(format!("{} returned {}: {}", provider, status, detail)));
    }

    let parsed: ProviderResponse = serde_json::from_str(&text)
        .map_err(|e| AppError::Model(format!("Failed to parse {} response: {}", provider, e)))?;
    if let Some(error) = parsed.error {
        return Err(AppError::Model(format!("{} error: {}", provider, error.message)));
    }
    Ok(parsed)
}

// ============================================================================
// Response shapes (Gemini and OpenAI share one lenient struct)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    candidates: Option<Vec<Candidate>>,
    choices: Option<Vec<Choice>>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

// ============================================================================
// Gemini
// ============================================================================

pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint root (a proxy or a stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(request: &ModelRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(ref pdf) = request.pdf {
            parts.push(json!({
                "inline_data": {
                    "mime_type": "application/pdf",
                    "data": STANDARD.encode(pdf),
                }
            }));
        }
        let mut config = json!({ "temperature": request.temperature });
        if request.json_output {
            config["responseMimeType"] = json!("application/json");
        }
        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": config,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ModelRequest) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let builder = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::build_body(&request));
        let response = post_json(builder, "Gemini").await?;

        response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Model("Gemini returned an empty response".into()))
    }
}

// ============================================================================
// OpenAI
// ============================================================================

pub struct OpenAiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint root (a proxy or a stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
        });
        if request.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ModelRequest) -> Result<String> {
        if request.pdf.is_some() {
            return Err(AppError::Model("OpenAI client does not accept inline PDFs".into()));
        }
        let url = format!("{}/chat/completions", self.base_url);
        let builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_body(&request));
        let response = post_json(builder, "OpenAI").await?;

        response
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Model("OpenAI returned an empty response".into()))
    }
}

// ============================================================================
// JSON extraction
// ============================================================================

/// Pull a JSON value out of model output: the whole text, a fenced code
/// block, or the outermost `{...}` / `[...]` span.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            if let Ok(value) = serde_json::from_str(body[..end].trim()) {
                return Some(value);
            }
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                    return Some(value);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_body_inlines_pdf() {
        let request = ModelRequest {
            prompt: "analyze".into(),
            pdf: Some(b"%PDF-1.7".to_vec()),
            json_output: true,
            temperature: 0.1,
        };
        let body = GeminiModel::build_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "analyze");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "application/pdf");
        assert_eq!(parts[1]["inline_data"]["data"], STANDARD.encode(b"%PDF-1.7"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_gemini_text_body() {
        let body = GeminiModel::build_body(&ModelRequest::text("summarize", 0.3));
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 1);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_openai_body_json_mode() {
        let model = OpenAiModel::new("k", "gpt-4o-mini").unwrap();
        let body = model.build_body(&ModelRequest {
            prompt: "verify".into(),
            json_output: true,
            temperature: 0.1,
            pdf: None,
        });
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], "verify");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_parse_provider_shapes() {
        let gemini: ProviderResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"title\":\"X\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(gemini.candidates.unwrap()[0].content.parts[0].text, "{\"title\":\"X\"}");

        let openai: ProviderResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#).unwrap();
        assert_eq!(openai.choices.unwrap()[0].message.content.as_deref(), Some("hi"));

        let error: ProviderResponse =
            serde_json::from_str(r#"{"error":{"message":"API key not valid"}}"#).unwrap();
        assert_eq!(error.error.unwrap().message, "API key not valid");
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a":1}"#).unwrap()["a"], 1);
        assert_eq!(
            extract_json("Here you go:\n```json\n{\"a\": 2}\n```\nDone").unwrap()["a"],
            2
        );
        assert_eq!(extract_json("prefix {\"a\": 3} suffix").unwrap()["a"], 3);
        assert!(extract_json("[{\"a\":4}]").unwrap().is_array());
        assert!(extract_json("no json here").is_none());
    }
}
