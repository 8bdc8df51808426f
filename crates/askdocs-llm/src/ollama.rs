//! Ollama chat client.
//!
//! Talks to `/api/chat` with streaming off. Structured calls pass the JSON
//! schema as `format`, which Ollama uses to constrain decoding.

use std::time::Duration;

use anyhow::{anyhow, Result};
use askdocs_core::config::LlmConfig;
use askdocs_core::traits::{CompletionRequest, LanguageModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a serde_json::Value>,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// The JSON body sent for `request`.
    pub fn request_body(&self, request: &CompletionRequest) -> Result<serde_json::Value> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage { role: "system", content: &request.system });
        }
        messages.push(ChatMessage { role: "user", content: &request.user });
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: request.schema.as_ref(),
            options: ChatOptions { temperature: self.temperature },
        };
        Ok(serde_json::to_value(body)?)
    }
}

impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = self.chat_url();
        let body = self.request_body(request)?;
        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            warn!(error = %e, model = %self.model, "Ollama unreachable");
            anyhow!("Ollama HTTP error: {e}")
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(anyhow!("Ollama returned {status}: {text}"));
        }
        let parsed: ChatResponse = response.json().map_err(|e| anyhow!("Ollama JSON parse error: {e}"))?;
        debug!(model = %self.model, chars = parsed.message.content.len(), "completion");
        Ok(parsed.message.content)
    }
}
