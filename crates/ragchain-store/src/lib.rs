//! Ragchain Store — retriever contract, embedders, in-memory vector store.
//!
//! `VectorStore::as_retriever` turns a store into a `Retriever` configured
//! for similarity or maximal-marginal-relevance search. `InMemoryVectorStore`
//! backed by `HashEmbedder` is the bundled implementation.

pub mod embedder;
pub mod memory;
pub mod mmr;
pub mod retriever;

pub use embedder::{EmbedderBackend, HashEmbedder};
pub use memory::{InMemoryVectorStore, StoreRetriever};
pub use retriever::{Retriever, RetrieverConfig, SearchType, VectorStore};
