//! Text-generation boundary for CourseBuilder.
//!
//! Stages depend only on the [`Generator`] trait. [`AnthropicClient`] is the
//! production implementation; tests substitute their own. [`generate_parallel`]
//! fans a batch of requests out with a concurrency bound and returns the
//! completions in request order.

mod anthropic;
mod parallel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use coursebuilder_shared::Result;

pub use anthropic::{AnthropicClient, AnthropicOptions};
pub use parallel::generate_parallel;

/// One prompt to send to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Overrides the generator's default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Overrides the generator's default `max_tokens`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Generated text plus accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

impl Completion {
    /// A completion with only text, for stub generators.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a single completion.
    async fn generate(&self, request: GenerateRequest) -> Result<Completion>;
}
