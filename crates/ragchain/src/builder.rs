//! Chain assembly: LLM client, prompt, MMR retriever, composition.

use ragchain_chat::{ChatModel, HostedChatModel, ModelConfig};
use ragchain_core::{Error, Result};
use ragchain_store::{Retriever, VectorStore};
use tracing::info;

use crate::combine::create_stuff_documents_chain;
use crate::config::RagSettings;
use crate::prompt::get_prompt;
use crate::retrieval::{create_retrieval_chain, RagChain};

/// Emitted exactly once per successful assembly.
pub const CHAIN_CREATED_MESSAGE: &str = "RAG chain created successfully";

/// Chat model client for the configured provider, model and temperature.
pub fn get_llm(config: &ModelConfig, api_key: &str) -> Result<HostedChatModel> {
    HostedChatModel::new(config.clone(), api_key)
}

/// Build the full RAG chain over `store` using the hosted model `settings`
/// resolve to.
///
/// The store is asked for an MMR retriever with `settings.retrieval.k`
/// before any model client is created. No network traffic happens here.
pub fn create_rag_chain<V: VectorStore>(
    store: &V,
    settings: &RagSettings,
) -> Result<RagChain<V::Retriever, HostedChatModel>> {
    let retriever = store.as_retriever(settings.retriever_config())?;

    let (model_config, api_key) = settings.llm.resolve_provider().ok_or_else(|| {
        Error::Config(format!(
            "No LLM provider configured (preferred: {}); set GROQ_API_KEY or another *_API_KEY",
            settings.llm.preferred_provider
        ))
    })?;
    let llm = get_llm(&model_config, &api_key)?;

    assemble(retriever, llm, settings)
}

/// Same as [`create_rag_chain`] with a caller-supplied model.
pub fn create_rag_chain_with_llm<V, L>(
    store: &V,
    settings: &RagSettings,
    llm: L,
) -> Result<RagChain<V::Retriever, L>>
where
    V: VectorStore,
    L: ChatModel,
{
    let retriever = store.as_retriever(settings.retriever_config())?;
    assemble(retriever, llm, settings)
}

fn assemble<R, L>(retriever: R, llm: L, settings: &RagSettings) -> Result<RagChain<R, L>>
where
    R: Retriever,
    L: ChatModel,
{
    let model = llm.model().to_string();
    let combine = create_stuff_documents_chain(llm, get_prompt())?;
    let chain = create_retrieval_chain(retriever, combine);

    let retriever_config = settings.retriever_config();
    info!(
        "{} (model={}, search_type={}, k={})",
        CHAIN_CREATED_MESSAGE, model, retriever_config.search_type, retriever_config.k
    );
    Ok(chain)
}
