//! Retrieve-then-answer pipeline.

use ragchain_core::{Document, Result};
use ragchain_store::Retriever;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combine::{CombineDocuments, StuffDocumentsChain};

/// Invocation payload: `{"input": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainInput {
    pub input: String,
}

impl From<&str> for ChainInput {
    fn from(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

/// What an invocation returns: the question, the documents the answer
/// was grounded on (retriever order), and the model's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagOutput {
    pub input: String,
    pub context: Vec<Document>,
    pub answer: String,
}

/// Retriever feeding a combine-documents step.
pub struct RetrievalChain<R, C> {
    retriever: R,
    combine_docs_chain: C,
}

/// The chain `create_rag_chain` builds.
pub type RagChain<R, L> = RetrievalChain<R, StuffDocumentsChain<L>>;

impl<R: Retriever, C: CombineDocuments> RetrievalChain<R, C> {
    pub fn new(retriever: R, combine_docs_chain: C) -> Self {
        Self {
            retriever,
            combine_docs_chain,
        }
    }

    /// Answer one question. Retriever and model errors propagate unchanged.
    pub async fn invoke(&self, input: &str) -> Result<RagOutput> {
        let context = self.retriever.retrieve(input).await?;
        debug!("Retrieved {} documents for question", context.len());

        let answer = self.combine_docs_chain.combine(&context, input).await?;

        Ok(RagOutput {
            input: input.to_string(),
            context,
            answer,
        })
    }

    pub async fn invoke_with(&self, input: ChainInput) -> Result<RagOutput> {
        self.invoke(&input.input).await
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    pub fn combine_docs_chain(&self) -> &C {
        &self.combine_docs_chain
    }
}

/// Compose a retriever and a combine-documents step.
pub fn create_retrieval_chain<R, C>(retriever: R, combine_docs_chain: C) -> RetrievalChain<R, C>
where
    R: Retriever,
    C: CombineDocuments,
{
    RetrievalChain::new(retriever, combine_docs_chain)
}
