//! Ragchain — retrieval-augmented question answering over a vector store.
//!
//! `create_rag_chain` asks the store for an MMR retriever, binds a hosted
//! chat model to the fixed RAG prompt, and returns a two-stage chain:
//! retrieve documents, then stuff them into one prompt and ask the model.
//! Invoking the chain yields the question, the documents used and the answer.

pub mod builder;
pub mod combine;
pub mod config;
pub mod prompt;
pub mod retrieval;

pub use builder::{create_rag_chain, create_rag_chain_with_llm, get_llm, CHAIN_CREATED_MESSAGE};
pub use combine::{create_stuff_documents_chain, CombineDocuments, StuffDocumentsChain};
pub use config::{RagSettings, RetrievalSettings};
pub use prompt::{get_prompt, PromptTemplate, RAG_TEMPLATE};
pub use retrieval::{create_retrieval_chain, ChainInput, RagChain, RagOutput, RetrievalChain};
