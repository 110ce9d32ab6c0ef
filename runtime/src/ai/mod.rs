use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error [{status}]: {message}")]
    Api { status: u16, message: String },
    #[error("empty completion from model")]
    EmptyCompletion,
    #[error("retries exhausted")]
    RetriesExhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub max_output_tokens: Option<u32>,
}

/// Uniform text-generation interface over the two supported providers.
/// The provider is selected once, in [`build_llm_client`]; nothing
/// downstream of this trait may branch on provider identity.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        history: &[Message],
        prompt: &str,
        system_instruction: &str,
        options: &GenerateOptions,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl LlmProvider {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(anyhow!("unknown llm provider: {other}")),
        }
    }

    /// Environment variable the credential is read from.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Snapshot of the language-model configuration a job runs with. Plain data,
/// safe to hand to a spawned worker.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub max_output_tokens: u32,
    pub artifact_timeout: Duration,
}

impl LlmSettings {
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

pub fn build_llm_client(settings: &LlmSettings) -> Arc<dyn LlmClient> {
    let api_key = settings.api_key.clone().unwrap_or_default();
    match settings.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(api_key, settings.model.clone(), None)),
        LlmProvider::Gemini => Arc::new(GeminiClient::new(api_key, settings.model.clone(), None)),
    }
}
