//! Retriever contract — the query side of a vector store.

use async_trait::async_trait;
use ragchain_core::{Document, Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_K: usize = 4;
pub const DEFAULT_FETCH_K: usize = 20;
pub const DEFAULT_LAMBDA_MULT: f32 = 0.5;

/// How a retriever ranks documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Top-k by cosine similarity.
    Similarity,
    /// Maximal marginal relevance over the top `fetch_k` candidates.
    Mmr,
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchType::Similarity => write!(f, "similarity"),
            SearchType::Mmr => write!(f, "mmr"),
        }
    }
}

/// Search configuration handed to `VectorStore::as_retriever`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    #[serde(default = "default_search_type")]
    pub search_type: SearchType,
    /// Number of documents returned.
    #[serde(default = "default_k")]
    pub k: usize,
    /// MMR candidate pool size.
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    /// MMR balance: 0.0 = pure diversity, 1.0 = pure relevance.
    #[serde(default = "default_lambda_mult")]
    pub lambda_mult: f32,
}

fn default_search_type() -> SearchType {
    SearchType::Similarity
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

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            search_type: SearchType::Similarity,
            k: DEFAULT_K,
            fetch_k: DEFAULT_FETCH_K,
            lambda_mult: DEFAULT_LAMBDA_MULT,
        }
    }
}

impl RetrieverConfig {
    /// MMR search returning `k` documents, default pool and balance.
    pub fn mmr(k: usize) -> Self {
        Self {
            search_type: SearchType::Mmr,
            k,
            ..Self::default()
        }
    }

    /// Plain similarity search returning `k` documents.
    pub fn similarity(k: usize) -> Self {
        Self {
            search_type: SearchType::Similarity,
            k,
            ..Self::default()
        }
    }

    /// Reject configurations no store can serve.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::Config("retriever k must be > 0".into()));
        }
        if self.search_type == SearchType::Mmr && self.fetch_k < self.k {
            return Err(Error::Config(format!(
                "mmr fetch_k ({}) must be >= k ({})",
                self.fetch_k, self.k
            )));
        }
        Ok(())
    }
}

/// Stage one of a RAG chain: query in, documents out.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>>;
}

/// A store that can hand out retriever views of itself.
pub trait VectorStore {
    type Retriever: Retriever;

    /// Build a retriever for the given search configuration.
    fn as_retriever(&self, config: RetrieverConfig) -> Result<Self::Retriever>;
}
