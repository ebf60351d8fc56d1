//! LLM configuration persistence and provider selection.

use std::path::{Path, PathBuf};

use ragchain_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{LLMProvider, ModelConfig};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_MAX_TOKENS: usize = 2048;

/// Stored LLM configuration (persisted as JSON).
#[derive(Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// `groq`, `openai`, `anthropic`, or `auto`.
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "groq".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}
fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            groq_model: DEFAULT_GROQ_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            config_path: PathBuf::new(),
        }
    }
}

// API keys stay out of logs.
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("preferred_provider", &self.preferred_provider)
            .field("openai_configured", &self.openai_api_key.is_some())
            .field("anthropic_configured", &self.anthropic_api_key.is_some())
            .field("groq_configured", &self.groq_api_key.is_some())
            .field("groq_model", &self.groq_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LLMConfig {
    /// Load config from file. A missing file yields defaults; unset API keys
    /// fall back to env vars. A malformed file is an error.
    pub fn load(config_path: &Path) -> Result<Self> {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LLMConfig::default(),
            Err(e) => return Err(e.into()),
        };

        config.config_path = config_path.to_path_buf();
        config.fill_keys_from_env();
        Ok(config)
    }

    /// Defaults overridden by environment variables.
    ///
    /// Reads `LLM_PROVIDER`, `GROQ_MODEL`, `GROQ_TEMPERATURE` and the
    /// `*_API_KEY` variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`LLMConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(p) = lookup("LLM_PROVIDER") {
            config.preferred_provider = p.to_ascii_lowercase();
        }
        if let Some(m) = lookup("GROQ_MODEL") {
            config.groq_model = m;
        }
        if let Some(t) = lookup("GROQ_TEMPERATURE") {
            config.temperature = t
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("GROQ_TEMPERATURE is not a number: {}", t)))?;
        }
        config.fill_keys_from(&lookup);
        Ok(config)
    }

    /// Fill unset API keys from `*_API_KEY` environment variables.
    pub fn fill_keys_from_env(&mut self) {
        self.fill_keys_from(|name| std::env::var(name).ok());
    }

    fn fill_keys_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.openai_api_key.is_none() {
            self.openai_api_key = lookup("OPENAI_API_KEY");
        }
        if self.anthropic_api_key.is_none() {
            self.anthropic_api_key = lookup("ANTHROPIC_API_KEY");
        }
        if self.groq_api_key.is_none() {
            self.groq_api_key = lookup("GROQ_API_KEY");
        }
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    fn model_config(&self, provider: LLMProvider) -> ModelConfig {
        let model = match provider {
            LLMProvider::OpenAI => &self.openai_model,
            LLMProvider::Anthropic => &self.anthropic_model,
            LLMProvider::Groq => &self.groq_model,
        };
        ModelConfig {
            provider,
            model: model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn api_key(&self, provider: LLMProvider) -> Option<&String> {
        match provider {
            LLMProvider::OpenAI => self.openai_api_key.as_ref(),
            LLMProvider::Anthropic => self.anthropic_api_key.as_ref(),
            LLMProvider::Groq => self.groq_api_key.as_ref(),
        }
    }

    /// Resolve which provider, model and key to use.
    pub fn resolve_provider(&self) -> Option<(ModelConfig, String)> {
        // Explicit preference
        if self.preferred_provider != "auto" {
            let provider: LLMProvider = self.preferred_provider.parse().ok()?;
            return self
                .api_key(provider)
                .map(|k| (self.model_config(provider), k.clone()));
        }

        // Auto mode: Groq > Anthropic > OpenAI
        [LLMProvider::Groq, LLMProvider::Anthropic, LLMProvider::OpenAI]
            .into_iter()
            .find_map(|p| self.api_key(p).map(|k| (self.model_config(p), k.clone())))
    }
}
