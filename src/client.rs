//! Vision model transport.
//!
//! `VisionClient` is the seam between the retry/fallback policy and the
//! network: one call sends one structured-output request to one model and
//! returns the raw message content. `OpenAiClient` implements it against
//! the OpenAI chat completions endpoint:
//!   POST {api_base}/chat/completions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::model::ModelError;
use crate::prompt::ChatMessage;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One structured-output request. Serializes directly as the request body.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_completion_tokens: u32,
    pub response_format: &'a Value,
}

/// Sends a completion request to a vision-capable model.
///
/// `Ok(None)` means the call succeeded but carried no content.
pub trait VisionClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<Option<String>, ModelError>;
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Pulls `choices[0].message.content` out of a chat completions body.
/// Null or blank content is `None`.
pub fn extract_content(body: &str) -> Result<Option<String>, ModelError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::Envelope(format!("JSON deserialization failed: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::Envelope("no choices in response".to_string()))?;

    Ok(choice.message.content.filter(|c| !c.trim().is_empty()))
}

// ---------------------------------------------------------------------------
// OpenAI client
// ---------------------------------------------------------------------------

pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, api_base: &str, timeout: Duration) -> Result<Self, ModelError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

impl VisionClient for OpenAiClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<Option<String>, ModelError> {
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        extract_content(&body)
    }
}
