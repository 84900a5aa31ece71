// src/client.rs - HTTP test client for the server's OpenAI-compatible API

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Value};

use crate::constants::*;
use crate::utils::{validate_base_url, ClientError};

/// One chat turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Builder for JSON request payloads with required and optional fields
pub struct PayloadBuilder {
    body: serde_json::Map<String, Value>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self {
            body: serde_json::Map::new(),
        }
    }

    pub fn add_required<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    pub fn add_optional<T: Into<Value>>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.body.insert(key.to_string(), v.into());
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.body)
    }
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Request against `/v1/completions`
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl CompletionRequest {
    pub fn new(prompt: &str, max_tokens: u32) -> Self {
        Self {
            model: DEFAULT_MODEL_NAME.to_string(),
            prompt: prompt.to_string(),
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }

    pub fn payload(&self) -> Value {
        PayloadBuilder::new()
            .add_required("model", self.model.as_str())
            .add_required("prompt", self.prompt.as_str())
            .add_required("max_tokens", self.max_tokens)
            .add_required("temperature", self.temperature)
            .add_required("top_p", self.top_p)
            .add_required("stream", false)
            .build()
    }
}

/// Request against `/v1/chat/completions`.
///
/// `enable_thinking` is the server-side chat-template switch for emitting
/// intermediate reasoning; `None` leaves the server default in place.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: Option<f64>,
    pub top_k: Option<u32>,
    pub enable_thinking: Option<bool>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            model: DEFAULT_MODEL_NAME.to_string(),
            messages,
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            presence_penalty: None,
            top_k: None,
            enable_thinking: None,
        }
    }

    /// The recommended clean-output parameter set with thinking disabled
    pub fn clean(messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            top_p: RECOMMENDED_TOP_P,
            presence_penalty: Some(RECOMMENDED_PRESENCE_PENALTY),
            top_k: Some(RECOMMENDED_TOP_K),
            enable_thinking: Some(false),
            ..Self::new(messages, max_tokens)
        }
    }

    pub fn payload(&self) -> Value {
        let mut builder = PayloadBuilder::new()
            .add_required("model", self.model.as_str())
            .add_required(
                "messages",
                serde_json::to_value(&self.messages).unwrap_or(Value::Null),
            )
            .add_required("max_tokens", self.max_tokens)
            .add_required("temperature", self.temperature)
            .add_required("top_p", self.top_p)
            .add_required("stream", false)
            .add_optional("presence_penalty", self.presence_penalty)
            .add_optional("top_k", self.top_k);

        if let Some(enable) = self.enable_thinking {
            builder = builder.add_required(
                "chat_template_kwargs",
                json!({ "enable_thinking": enable }),
            );
        }

        builder.build()
    }
}

/// Generated text plus the request round-trip time
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub content: String,
    pub latency: Duration,
}

/// Synchronous-style test client: one blocking request at a time against a
/// fixed base URL, bounded by a per-request timeout.
pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TestClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, ClientError> {
        validate_base_url(base_url).map_err(|e| ClientError::request(&e))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds + 5))
            .build()
            .map_err(|e| ClientError::request(&format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_seconds),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /health with a short timeout. Unreachable or unhealthy servers
    /// yield `false`, never an error.
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);

        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECONDS))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub async fn completions(
        &self,
        request: &CompletionRequest,
    ) -> Result<GenerationOutcome, ClientError> {
        let (body, latency) = self.post_json("/v1/completions", &request.payload()).await?;
        let content = extract_completion_text(&body)?;
        Ok(GenerationOutcome { content, latency })
    }

    pub async fn chat_completions(
        &self,
        request: &ChatRequest,
    ) -> Result<GenerationOutcome, ClientError> {
        let (body, latency) = self
            .post_json("/v1/chat/completions", &request.payload())
            .await?;
        let content = extract_chat_content(&body)?;
        Ok(GenerationOutcome { content, latency })
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<(Value, Duration), ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::http_status(status.as_u16(), &body));
        }

        let body = response.json::<Value>().await.map_err(|e| {
            ClientError::malformed_body(&format!("invalid JSON from server: {}", e))
        })?;

        Ok((body, start.elapsed()))
    }
}

/// `choices[0].text` from a completions response
fn extract_completion_text(body: &Value) -> Result<String, ClientError> {
    let text = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .ok_or_else(|| ClientError::malformed_body(ERROR_MALFORMED_RESPONSE))?;

    Ok(value_to_content(text))
}

/// `choices[0].message.content` from a chat response
fn extract_chat_content(body: &Value) -> Result<String, ClientError> {
    let content = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .ok_or_else(|| ClientError::malformed_body(ERROR_MALFORMED_RESPONSE))?;

    Ok(value_to_content(content))
}

/// The server may emit an explicit null content; treat it as empty text
fn value_to_content(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
