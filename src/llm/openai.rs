//! OpenAI-compatible chat-completion client
//!
//! One typed conduit to the endpoint: per-call timeout, exponential-backoff
//! retry on transient failures, JSON-mode handling, and token-usage events.
//! Works against both plain OpenAI-style endpoints and Azure deployments
//! (selected by the presence of an API version).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChatMessage, ChatRequest, LlmClient, LlmError, RetryPolicy};
use crate::config::LlmConfig;
use crate::events::EventEmitter;

/// Chat-completion client over HTTP
pub struct OpenAiClient {
    model: String,
    api_key: String,
    endpoint: String,
    api_version: Option<String>,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
    events: EventEmitter,
}

impl OpenAiClient {
    /// Create a client from configuration
    ///
    /// The API key is read from `API_KEY` or `AZURE_API_KEY`; it never lives
    /// in a config file.
    pub fn from_config(config: &LlmConfig, events: EventEmitter) -> Result<Self, LlmError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| LlmError::InvalidResponse("API_KEY or AZURE_API_KEY not set".to_string()))?;
        let endpoint = config
            .endpoint()
            .ok_or_else(|| LlmError::InvalidResponse("ENDPOINT or AZURE_ENDPOINT_URL not set".to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model(),
            api_key,
            endpoint,
            api_version: config.api_version(),
            http,
            max_tokens: config.max_tokens,
            timeout,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.backoff_base_ms),
                Duration::from_millis(config.backoff_cap_ms),
            ),
            events,
        })
    }

    /// The request URL; Azure deployments carry the model in the path
    fn request_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        match &self.api_version {
            Some(version) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base, self.model, version
            ),
            None => format!("{}/v1/chat/completions", base),
        }
    }

    /// Build the request body; the input message list is used as-is
    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": request.messages.iter().map(convert_message).collect::<Vec<_>>(),
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens).min(self.max_tokens),
        });

        if self.api_version.is_none() {
            body["model"] = serde_json::json!(self.model);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if request.force_json {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        } else if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(
                request
                    .tools
                    .iter()
                    .map(|schema| {
                        serde_json::json!({
                            "type": "function",
                            "function": {
                                "name": schema.name,
                                "description": schema.description,
                                "parameters": schema.to_json_schema(),
                            }
                        })
                    })
                    .collect::<Vec<_>>()
            );
        }

        body
    }

    /// Apply auth headers for the configured flavor
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_version {
            Some(_) => request.header("api-key", self.api_key.clone()),
            None => request.header("Authorization", format!("Bearer {}", self.api_key)),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let url = self.request_url();
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..self.retry.attempts {
            if attempt > 0 {
                let backoff = self.retry.delay_for(attempt);
                self.events.retry("llm", attempt, self.retry.attempts);
                warn!(attempt, backoff_ms = backoff.as_millis() as u64, "chat: retrying after transient error");
                tokio::time::sleep(backoff).await;
            }

            let send = self.authorize(self.http.post(url.clone())).header("content-type", "application/json").json(&body).send();

            // reqwest carries its own timeout; the outer timeout also covers
            // connection setup stalls the client timeout does not
            let response = match tokio::time::timeout(self.timeout, send).await {
                Err(_) => {
                    self.events.timeout("llm", self.timeout.as_millis() as u64);
                    last_error = Some(LlmError::Timeout(self.timeout));
                    continue;
                }
                Ok(Err(e)) if e.is_timeout() => {
                    self.events.timeout("llm", self.timeout.as_millis() as u64);
                    last_error = Some(LlmError::Timeout(self.timeout));
                    continue;
                }
                Ok(Err(e)) => {
                    debug!(attempt, error = %e, "chat: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
                Ok(Ok(response)) => response,
            };

            let status = response.status().as_u16();

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                debug!(attempt, retry_after, "chat: rate limited");
                last_error = Some(LlmError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                });
                continue;
            }

            if status >= 500 {
                let message = response.text().await.unwrap_or_default();
                debug!(attempt, status, "chat: retryable server error");
                last_error = Some(LlmError::ApiError { status, message });
                continue;
            }

            if !(200..300).contains(&status) {
                // Permanent client error: no retry
                let message = response.text().await.unwrap_or_default();
                let err = LlmError::ApiError { status, message };
                self.events.client_error(&err.to_string(), true);
                return Err(err);
            }

            let api_response: CompletionResponse = response.json().await?;

            if let Some(usage) = &api_response.usage {
                self.events.token_usage(usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
            }

            let content = api_response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| LlmError::InvalidResponse("response carried no message content".to_string()))?;

            return Ok(if request.force_json { strip_json_framing(&content) } else { content });
        }

        let err = last_error.unwrap_or_else(|| LlmError::InvalidResponse("no attempts were made".to_string()));
        self.events.client_error(&err.to_string(), true);
        Err(err)
    }
}

/// Convert a message to the chat-completion wire format
fn convert_message(message: &ChatMessage) -> serde_json::Value {
    let mut value = serde_json::json!({
        "role": message.role,
        "content": message.content,
    });
    if let Some(name) = &message.name {
        value["name"] = serde_json::json!(name);
    }
    if let Some(id) = &message.tool_call_id {
        value["tool_call_id"] = serde_json::json!(id);
    }
    value
}

/// Strip non-JSON framing from a JSON-mode response
///
/// Removes outer whitespace, markdown code fences, and any prose before the
/// first `{`/`[`. Nothing inside the JSON body is touched; structural
/// validity stays with the caller.
pub fn strip_json_framing(raw: &str) -> String {
    let mut s = raw.trim();

    if s.starts_with("```") {
        s = s.trim_start_matches('`');
        if let Some(rest) = s.strip_prefix("json") {
            s = rest;
        }
        if let Some(idx) = s.rfind("```") {
            s = &s[..idx];
        }
        s = s.trim();
    }

    if s.starts_with('{') || s.starts_with('[') {
        return s.to_string();
    }

    match s.find(['{', '[']) {
        Some(start) => {
            let tail = &s[start..];
            let end = tail.rfind(['}', ']']).map(|i| i + 1).unwrap_or(tail.len());
            tail[..end].to_string()
        }
        None => s.to_string(),
    }
}

// Chat-completion API response types

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
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
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}
