use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::ReelReplyError;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Safety categories relaxed for reply drafting; the bot writes banter about
/// other people's comments and the default thresholds reject most of it.
const SAFETY_CATEGORIES: [&str; 3] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Single-turn generation. An empty string means the model produced no
    /// text.
    async fn send_message(&self, prompt: &str) -> Result<String, ReelReplyError>;
}

pub fn create_provider(config: &Config) -> Result<Box<dyn LlmProvider>, ReelReplyError> {
    Ok(Box::new(GeminiProvider::new(config)?))
}

// ---------------------------------------------------------------------------
// Gemini provider
// ---------------------------------------------------------------------------

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiProvider {
    pub fn new(config: &Config) -> Result<Self, ReelReplyError> {
        if config.google_api_key.trim().is_empty() {
            return Err(ReelReplyError::Config("google_api_key is required".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        let base = config
            .llm_base_url
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_BASE_URL);
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base.trim_end_matches('/'),
            config.llm_model.trim_start_matches("models/")
        );
        Ok(GeminiProvider {
            http,
            api_key: config.google_api_key.clone(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn build_request(prompt: &str) -> serde_json::Value {
    let safety: Vec<serde_json::Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
        .collect();
    json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        "safetySettings": safety,
    })
}

fn extract_text(response: GeminiResponse) -> Result<String, ReelReplyError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .filter(|r| !r.is_empty())
    {
        return Err(ReelReplyError::LlmApi(format!("prompt blocked: {reason}")));
    }
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn send_message(&self, prompt: &str) -> Result<String, ReelReplyError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
                ReelReplyError::LlmApi(format!("Failed to parse response: {e}\nBody: {body}"))
            })?;
            return extract_text(parsed);
        }

        if status.as_u16() == 429 {
            return Err(ReelReplyError::RateLimited);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(api_err) = serde_json::from_str::<GeminiErrorResponse>(&body) {
            return Err(ReelReplyError::LlmApi(api_err.error.message));
        }
        Err(ReelReplyError::LlmApi(format!("HTTP {status}: {body}")))
    }
}
