//! In-memory vector store with similarity and MMR search.

use std::sync::Arc;

use async_trait::async_trait;
use ndarray::Array1;
use parking_lot::RwLock;
use ragchain_core::{Document, Error, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::embedder::EmbedderBackend;
use crate::mmr::{cosine_similarity, mmr_rerank, MmrCandidate};
use crate::retriever::{Retriever, RetrieverConfig, SearchType, VectorStore};

/// A stored document with its embedding.
struct Row {
    document: Document,
    content_hash: String,
    embedding: Array1<f32>,
}

/// Shared-handle vector store. Clones see the same rows.
#[derive(Clone)]
pub struct InMemoryVectorStore {
    embedder: Arc<dyn EmbedderBackend>,
    rows: Arc<RwLock<Vec<Row>>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn EmbedderBackend>) -> Self {
        Self {
            embedder,
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Embed and store one document. Returns its id.
    ///
    /// Fails with `DuplicateContent` if identical text is already stored.
    pub fn add_document(&self, mut document: Document) -> Result<String> {
        let hash = content_hash(&document.page_content);
        if self.rows.read().iter().any(|r| r.content_hash == hash) {
            return Err(Error::DuplicateContent(hash));
        }

        let embedding = self.embedder.embed(&document.page_content)?;
        let id = document
            .id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();

        let mut rows = self.rows.write();
        // Re-check under the write lock; another handle may have inserted meanwhile.
        if rows.iter().any(|r| r.content_hash == hash) {
            return Err(Error::DuplicateContent(hash));
        }
        rows.push(Row {
            document,
            content_hash: hash,
            embedding,
        });
        Ok(id)
    }

    /// Add many documents, skipping duplicate content.
    ///
    /// Returns the ids of the documents actually stored.
    pub fn add_documents(&self, documents: Vec<Document>) -> Result<Vec<String>> {
        let total = documents.len();
        let mut ids = Vec::with_capacity(total);
        for document in documents {
            match self.add_document(document) {
                Ok(id) => ids.push(id),
                Err(Error::DuplicateContent(hash)) => {
                    warn!("Skipping duplicate document (hash={})", hash);
                }
                Err(e) => return Err(e),
            }
        }
        info!("Stored {}/{} documents ({} total)", ids.len(), total, self.len());
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Top-`k` documents by cosine similarity, with scores.
    pub fn similarity_search_with_score(&self, query: &str, k: usize) -> Result<Vec<(Document, f32)>> {
        let query_embedding = self.embedder.embed(query)?;
        let rows = self.rows.read();
        let ranked = rank_by_similarity(&rows, &query_embedding);
        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| (rows[idx].document.clone(), score))
            .collect())
    }

    /// Top-`k` documents by cosine similarity.
    pub fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self
            .similarity_search_with_score(query, k)?
            .into_iter()
            .map(|(doc, _)| doc)
            .collect())
    }

    /// `k` documents chosen by maximal marginal relevance from the
    /// `fetch_k` most similar candidates.
    pub fn max_marginal_relevance_search(
        &self,
        query: &str,
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<Document>> {
        let query_embedding = self.embedder.embed(query)?;
        let rows = self.rows.read();

        let candidates: Vec<MmrCandidate<'_>> = rank_by_similarity(&rows, &query_embedding)
            .into_iter()
            .take(fetch_k)
            .map(|(index, score)| MmrCandidate {
                index,
                score,
                embedding: &rows[index].embedding,
            })
            .collect();

        debug!(
            "MMR over {} candidates (k={}, fetch_k={}, lambda={})",
            candidates.len(),
            k,
            fetch_k,
            lambda_mult
        );

        Ok(mmr_rerank(candidates, k, lambda_mult)
            .into_iter()
            .map(|(idx, _)| rows[idx].document.clone())
            .collect())
    }
}

impl VectorStore for InMemoryVectorStore {
    type Retriever = StoreRetriever;

    fn as_retriever(&self, config: RetrieverConfig) -> Result<StoreRetriever> {
        config.validate()?;
        debug!("Retriever created: search_type={}, k={}", config.search_type, config.k);
        Ok(StoreRetriever {
            store: self.clone(),
            config,
        })
    }
}

/// Retriever view over an `InMemoryVectorStore`.
#[derive(Clone)]
pub struct StoreRetriever {
    store: InMemoryVectorStore,
    config: RetrieverConfig,
}

impl StoreRetriever {
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }
}

#[async_trait]
impl Retriever for StoreRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        match self.config.search_type {
            SearchType::Similarity => self.store.similarity_search(query, self.config.k),
            SearchType::Mmr => self.store.max_marginal_relevance_search(
                query,
                self.config.k,
                self.config.fetch_k,
                self.config.lambda_mult,
            ),
        }
    }
}

/// Row indices sorted by similarity descending; ties keep insertion order.
fn rank_by_similarity(rows: &[Row], query: &Array1<f32>) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (idx, cosine_similarity(query, &row.embedding)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Compute SHA-256 content hash.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
