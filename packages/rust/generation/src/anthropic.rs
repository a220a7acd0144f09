//! Anthropic Messages API client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use coursebuilder_shared::{AnthropicConfig, CourseBuilderError, Result, TokenUsage};

use crate::{Completion, GenerateRequest, Generator};

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("CourseBuilder/", env!("CARGO_PKG_VERSION"));

/// How much of an error body to keep in error messages.
const ERROR_BODY_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Settings for [`AnthropicClient`].
#[derive(Debug, Clone)]
pub struct AnthropicOptions {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl AnthropicOptions {
    /// Build options from the `[anthropic]` config section and a resolved key.
    pub fn from_config(config: &AnthropicConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.base_url.clone(),
            model: config.default_model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// [`Generator`] backed by the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
    requests: AtomicU64,
    tokens_in: AtomicU64,
    tokens_out: AtomicU64,
}

impl AnthropicClient {
    pub fn new(options: AnthropicOptions) -> Result<Self> {
        let base = format!("{}/", options.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|u| u.join("v1/messages"))
            .map_err(|e| {
                CourseBuilderError::config(format!("invalid API base URL '{}': {e}", options.base_url))
            })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| CourseBuilderError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: options.api_key,
            model: options.model,
            max_tokens: options.max_tokens,
            requests: AtomicU64::new(0),
            tokens_in: AtomicU64::new(0),
            tokens_out: AtomicU64::new(0),
        })
    }

    /// Default model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Token usage accumulated over all successful requests.
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            requests: self.requests.load(Ordering::Relaxed),
            input_tokens: self.tokens_in.load(Ordering::Relaxed),
            output_tokens: self.tokens_out.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl Generator for AnthropicClient {
    #[instrument(skip_all, fields(model))]
    async fn generate(&self, request: GenerateRequest) -> Result<Completion> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        tracing::Span::current().record("model", model);

        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            system: request.system.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| CourseBuilderError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) => format!("{}: {}", env.error.kind, env.error.message),
                Err(_) => text.chars().take(ERROR_BODY_LIMIT).collect(),
            };
            return Err(CourseBuilderError::Generation(format!(
                "HTTP {status}: {detail}"
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            CourseBuilderError::Generation(format!("invalid response body: {e}"))
        })?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(CourseBuilderError::Generation(
                "model returned no text content".into(),
            ));
        }

        if parsed.stop_reason.as_deref() == Some("max_tokens") {
            warn!(model, "completion truncated at max_tokens");
        }

        self.requests.fetch_add(1, Ordering::Relaxed);
        self.tokens_in.fetch_add(parsed.usage.input_tokens, Ordering::Relaxed);
        self.tokens_out.fetch_add(parsed.usage.output_tokens, Ordering::Relaxed);

        debug!(
            tokens_in = parsed.usage.input_tokens,
            tokens_out = parsed.usage.output_tokens,
            latency_ms = start.elapsed().as_millis() as u64,
            "completion received"
        );

        Ok(Completion {
            text,
            model: if parsed.model.is_empty() {
                model.to_string()
            } else {
                parsed.model
            },
            tokens_in: parsed.usage.input_tokens,
            tokens_out: parsed.usage.output_tokens,
        })
    }
}
