use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MODEL: &str = "anthropic/claude-3.5-sonnet";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Malformed response from provider")]
    MalformedResponse,
}

/// Something that can turn a prompt into generated text
#[async_trait]
pub trait GenerationProvider: Send + Sync + 'static {
    /// A short name used in logs
    fn describe(&self) -> &'static str;
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Talks to the OpenRouter chat completions API
pub struct OpenRouterProvider {
    client: reqwest::Client,
    key: String,
    referer: String,
}

impl OpenRouterProvider {
    pub fn new(key: String, referer: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            key,
            referer,
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenRouterProvider {
    fn describe(&self) -> &'static str {
        "openrouter"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: 4000,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(OPENROUTER_URL)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", "Tracklab")
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|_| ProviderError::MalformedResponse)?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ProviderError::MalformedResponse)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Serves deterministic responses keyed off the prompt. Used when no
/// provider key is configured, and in tests.
pub struct CannedProvider;

#[async_trait]
impl GenerationProvider for CannedProvider {
    fn describe(&self) -> &'static str {
        "canned"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        if prompt.contains("mastering") {
            return Ok(serde_json::json!({
                "eq_settings": {
                    "low_shelf": { "frequency": 100, "gain": 0.5 },
                    "mid_peak": { "frequency": 1000, "gain": -0.3, "q": 2 },
                    "high_shelf": { "frequency": 10000, "gain": 0.8 }
                },
                "compression": {
                    "ratio": 3.5,
                    "attack": 10,
                    "release": 50,
                    "threshold": -12
                },
                "limiting": {
                    "threshold": -1,
                    "release": 30
                }
            })
            .to_string());
        }

        if prompt.contains("melody") {
            return Ok(serde_json::json!({
                "notes": [
                    { "note": "C4", "start": 0, "duration": 0.5, "velocity": 80 },
                    { "note": "E4", "start": 0.5, "duration": 0.5, "velocity": 75 },
                    { "note": "G4", "start": 1.0, "duration": 1.0, "velocity": 85 },
                    { "note": "F4", "start": 2.0, "duration": 0.5, "velocity": 70 }
                ]
            })
            .to_string());
        }

        Ok("Response simulated due to missing provider key".to_string())
    }
}
