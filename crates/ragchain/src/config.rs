//! Chain settings: which model to call and how many documents to retrieve.

use std::path::Path;

use ragchain_chat::LLMConfig;
use ragchain_core::{Error, Result};
use ragchain_store::retriever::{DEFAULT_FETCH_K, DEFAULT_K, DEFAULT_LAMBDA_MULT};
use ragchain_store::{RetrieverConfig, SearchType};
use serde::{Deserialize, Serialize};

/// Retrieval knobs. The chain always searches with MMR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    #[serde(default = "default_lambda_mult")]
    pub lambda_mult: f32,
}

fn default_k() -> usize {
    DEFAULT_K
}
fn default_fetch_k() -> usize {
    DEFAULT_FETCH_K
}
fn default_lambda_mult() -> f32 {
    DEFAULT_LAMBDA_MULT
}

impl RetrievalSettings {
    /// Keep the MMR pool at least as large as `k`.
    fn normalize(&mut self) {
        self.fetch_k = self.fetch_k.max(self.k);
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            fetch_k: DEFAULT_FETCH_K,
            lambda_mult: DEFAULT_LAMBDA_MULT,
        }
    }
}

/// Everything `create_rag_chain` reads, passed explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagSettings {
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
}

impl RagSettings {
    /// Settings from environment variables over defaults.
    ///
    /// Reads `RETRIEVAL_K` plus everything [`LLMConfig::from_env`] reads.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`RagSettings::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = LLMConfig::from_lookup(&lookup)?;
        let mut retrieval = RetrievalSettings::default();
        if let Some(k) = lookup("RETRIEVAL_K") {
            retrieval.k = k
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("RETRIEVAL_K is not an integer: {}", k)))?;
        }
        retrieval.normalize();
        Ok(Self { llm, retrieval })
    }

    /// Load settings from a JSON file. A missing file yields defaults;
    /// unset API keys fall back to environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings: RagSettings = match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RagSettings::default(),
            Err(e) => return Err(e.into()),
        };
        settings.retrieval.normalize();
        settings.llm.config_path = path.to_path_buf();
        settings.llm.fill_keys_from_env();
        Ok(settings)
    }

    /// The retriever request the chain assembler makes.
    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            search_type: SearchType::Mmr,
            k: self.retrieval.k,
            fetch_k: self.retrieval.fetch_k,
            lambda_mult: self.retrieval.lambda_mult,
        }
    }
}
