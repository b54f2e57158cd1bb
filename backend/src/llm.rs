//! LLM provider client (OpenAI-compatible chat completions).
//!
//! The LLM is strictly advisory: calls run under a short timeout with zero
//! retries, and every caller has a deterministic fallback. An unconfigured
//! API key disables the client entirely.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::configuration::LlmSettings;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct LlmClient {
    settings: LlmSettings,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// One chat-completion round trip. Any failure is a `Dependency` error;
    /// callers route it to their fallback.
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ServiceResult<String> {
        let Some(api_key) = &self.settings.api_key else {
            warn!("LLM API key not configured");
            return Err(ServiceError::Dependency("LLM not configured".to_string()));
        };

        let request = ChatRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: 1.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(Duration::from_secs(self.settings.timeout_seconds))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("LLM call failed: {}", e);
                ServiceError::Dependency(format!("LLM call failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::Dependency(format!(
                "LLM returned {}",
                response.status()
            )));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Dependency(format!("LLM payload unparseable: {}", e)))?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ServiceError::Dependency("LLM returned empty reply".to_string()))?;

        info!("LLM narrative generated ({} chars)", content.len());
        Ok(content)
    }
}
