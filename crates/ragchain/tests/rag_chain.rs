//! End-to-end behaviour of assembled RAG chains against stub stores and models.

mod common;

use std::sync::Arc;

use common::{RecordingStore, StubModel};
use ragchain::{
    create_rag_chain, create_rag_chain_with_llm, ChainInput, RagSettings, RetrievalSettings,
};
use ragchain_chat::{ChatModel, LLMConfig, LLMProvider};
use ragchain_core::{Document, Error};
use ragchain_store::{HashEmbedder, InMemoryVectorStore, SearchType};

fn settings_with_k(k: usize) -> RagSettings {
    RagSettings {
        retrieval: RetrievalSettings {
            k,
            ..RetrievalSettings::default()
        },
        ..RagSettings::default()
    }
}

#[test]
fn test_store_asked_once_for_mmr_with_k() {
    let store = RecordingStore::with_documents(&["doc1"]);
    let _chain = create_rag_chain_with_llm(&store, &settings_with_k(3), StubModel::answering("x"))
        .unwrap();

    let requests = store.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].search_type, SearchType::Mmr);
    assert_eq!(requests[0].k, 3);
}

#[tokio::test]
async fn test_invoke_answers_from_retrieved_documents() {
    let store = RecordingStore::with_documents(&["doc1", "doc2", "doc3"]);
    let model = StubModel::answering("42");
    let chain = create_rag_chain_with_llm(&store, &settings_with_k(3), model.clone()).unwrap();

    let out = chain.invoke("What is the answer?").await.unwrap();
    assert_eq!(out.input, "What is the answer?");
    assert_eq!(out.answer, "42");
    let texts: Vec<&str> = out.context.iter().map(|d| d.page_content.as_str()).collect();
    assert_eq!(texts, ["doc1", "doc2", "doc3"]);

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0][0].content;
    assert!(prompt.contains("doc1\n\ndoc2\n\ndoc3"));
    assert!(prompt.contains("Question: What is the answer?"));
    assert!(prompt.contains("based only on the provided context"));
}

#[tokio::test]
async fn test_invoke_with_chain_input() {
    let store = RecordingStore::with_documents(&["only"]);
    let chain =
        create_rag_chain_with_llm(&store, &RagSettings::default(), StubModel::answering("ok"))
            .unwrap();

    let input: ChainInput = serde_json::from_str(r#"{"input":"anything?"}"#).unwrap();
    let out = chain.invoke_with(input).await.unwrap();
    assert_eq!(out.input, "anything?");
    assert_eq!(out.context, vec![Document::new("only")]);
}

#[tokio::test]
async fn test_no_documents_still_reaches_model() {
    let store = RecordingStore::default();
    let model = StubModel::answering("I don't know.");
    let chain = create_rag_chain_with_llm(&store, &RagSettings::default(), model.clone()).unwrap();

    let out = chain.invoke("Anything?").await.unwrap();
    assert!(out.context.is_empty());
    assert_eq!(out.answer, "I don't know.");
    assert!(model.prompts()[0][0].content.contains("<context>\n\n</context>"));
}

#[tokio::test]
async fn test_model_error_propagates() {
    let store = RecordingStore::with_documents(&["doc1"]);
    let chain = create_rag_chain_with_llm(
        &store,
        &RagSettings::default(),
        StubModel::failing("rate limited"),
    )
    .unwrap();

    let err = chain.invoke("q").await.unwrap_err();
    assert!(matches!(err, Error::Provider(msg) if msg == "rate limited"));
}

#[test]
fn test_store_refusal_propagates() {
    let store = RecordingStore::refusing();
    let result = create_rag_chain_with_llm(&store, &RagSettings::default(), StubModel::answering("x"));
    assert!(matches!(result, Err(Error::Retrieval(_))));
}

#[test]
fn test_hosted_chain_requires_a_key() {
    let store = RecordingStore::with_documents(&["doc1"]);
    let err = create_rag_chain(&store, &RagSettings::default()).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
    // The retriever is requested before the model is resolved.
    assert_eq!(store.requests().len(), 1);
}

#[test]
fn test_hosted_chain_uses_configured_model() {
    let store = RecordingStore::with_documents(&["doc1"]);
    let settings = RagSettings {
        llm: LLMConfig {
            groq_api_key: Some("gsk-test".into()),
            groq_model: "llama-3.1-8b-instant".into(),
            temperature: 0.2,
            ..LLMConfig::default()
        },
        ..RagSettings::default()
    };

    let chain = create_rag_chain(&store, &settings).unwrap();
    let llm = chain.combine_docs_chain().llm();
    assert_eq!(llm.config().provider, LLMProvider::Groq);
    assert_eq!(llm.model(), "llama-3.1-8b-instant");
    assert!((llm.config().temperature - 0.2).abs() < 1e-9);
}

#[tokio::test]
async fn test_in_memory_store_end_to_end() {
    let store = InMemoryVectorStore::new(Arc::new(HashEmbedder::new(1024)));
    store
        .add_documents(vec![
            Document::new("Rust ownership rules prevent data races at compile time"),
            Document::new("Rust borrow checker enforces ownership rules"),
            Document::new("Sourdough bread needs a mature starter and a long proof"),
            Document::new("Tide pools host anemones and hermit crabs"),
        ])
        .unwrap();

    let model = StubModel::answering("Ownership.");
    let chain = create_rag_chain_with_llm(&store, &settings_with_k(2), model.clone()).unwrap();
    assert_eq!(chain.retriever().config().search_type, SearchType::Mmr);

    let out = chain.invoke("How does Rust prevent data races?").await.unwrap();
    assert_eq!(out.answer, "Ownership.");
    assert_eq!(out.context.len(), 2);
    assert!(out.context[0].page_content.contains("data races"));
    assert!(out.context.iter().all(|d| d.id.is_some()));

    let prompt = &model.prompts()[0][0].content;
    for doc in &out.context {
        assert!(prompt.contains(&doc.page_content));
    }
}

#[test]
fn test_large_k_from_settings_file_builds_over_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{ "retrieval": { "k": 25 } }"#).unwrap();
    let settings = RagSettings::load(&path).unwrap();

    let store = InMemoryVectorStore::new(Arc::new(HashEmbedder::new(64)));
    let chain = create_rag_chain_with_llm(&store, &settings, StubModel::answering("x")).unwrap();
    assert_eq!(chain.retriever().config().k, 25);
    assert_eq!(chain.retriever().config().fetch_k, 25);
}
