//! `ChatModel` — the completion seam used by chains.

use async_trait::async_trait;
use ragchain_core::{Error, Result};
use reqwest::Client;
use tracing::debug;

use crate::providers::{collect_completion, stream_llm};
use crate::types::{ChatMessage, ModelConfig};

/// A model that turns a message list into one completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Handle to a hosted chat model (Groq, OpenAI, Anthropic).
///
/// Configuration is fixed at construction. Each `generate` call issues one
/// streaming request and concatenates the tokens; transport and API
/// failures are returned unchanged, with no retry.
#[derive(Clone)]
pub struct HostedChatModel {
    client: Client,
    config: ModelConfig,
    api_key: String,
}

impl HostedChatModel {
    pub fn new(config: ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!("No API key for provider {}", config.provider)));
        }
        if config.model.trim().is_empty() {
            return Err(Error::Config("Model identifier is empty".into()));
        }
        Ok(Self {
            client: Client::new(),
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl std::fmt::Debug for HostedChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedChatModel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatModel for HostedChatModel {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let stream = stream_llm(&self.client, &self.config, messages, &self.api_key);
        let (text, tokens_used) = collect_completion(stream).await?;
        debug!(
            "Completion from {}/{}: {} tokens",
            self.config.provider, self.config.model, tokens_used
        );
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
