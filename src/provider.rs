//! Model backends that turn a prompt into reply text.

mod gemini;
mod openai;

pub use gemini::{DEFAULT_MODEL as DEFAULT_GEMINI_MODEL, GeminiProvider};
pub use openai::{DEFAULT_MODEL as DEFAULT_OPENAI_MODEL, OpenAiProvider};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{Config, ProviderKind};
use crate::error::ProviderError;

/// A text-completion backend.
///
/// One prompt in, one complete reply out. Timeouts are applied by the
/// caller, not the provider.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate_content(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Sampling knobs shared by both backends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.9,
            max_output_tokens: 1024,
        }
    }
}

/// Build the backend selected in `config`.
pub fn provider_from_config(config: &Config) -> Arc<dyn ContentProvider> {
    let settings = &config.settings;
    match settings.provider {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            config.secrets.google_api_key.clone(),
            settings.gemini_model.clone(),
            settings.sampling(),
        )),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
            config.secrets.openai_api_key.clone(),
            settings.openai_model.clone(),
            settings.sampling(),
        )),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Both APIs wrap failures as `{"error": {"message": ...}}`; fall back to
/// the raw body when they don't.
async fn api_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Api {
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_string(),
    }
}

fn network_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Network(err.to_string())
}

fn invalid_response(err: reqwest::Error) -> ProviderError {
    ProviderError::InvalidResponse(err.to_string())
}
