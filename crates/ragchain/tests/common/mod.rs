//! Stub stores and models shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragchain_chat::{ChatMessage, ChatModel};
use ragchain_core::{Document, Error, Result};
use ragchain_store::{Retriever, RetrieverConfig, VectorStore};

/// Returns the same documents for every query.
pub struct FixedRetriever {
    pub documents: Vec<Document>,
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

/// Records every `as_retriever` request; optionally refuses all of them.
#[derive(Default)]
pub struct RecordingStore {
    pub documents: Vec<Document>,
    pub requests: Mutex<Vec<RetrieverConfig>>,
    pub refuse: bool,
}

impl RecordingStore {
    pub fn with_documents(texts: &[&str]) -> Self {
        Self {
            documents: texts.iter().map(|t| Document::new(*t)).collect(),
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RetrieverConfig> {
        self.requests.lock().unwrap().clone()
    }
}

impl VectorStore for RecordingStore {
    type Retriever = FixedRetriever;

    fn as_retriever(&self, config: RetrieverConfig) -> Result<FixedRetriever> {
        self.requests.lock().unwrap().push(config);
        if self.refuse {
            return Err(Error::Retrieval("store does not support mmr".into()));
        }
        Ok(FixedRetriever {
            documents: self.documents.clone(),
        })
    }
}

/// Replies with a fixed answer (or error) and keeps every prompt it saw.
#[derive(Clone)]
pub struct StubModel {
    pub reply: std::result::Result<String, String>,
    pub prompts: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl StubModel {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for StubModel {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.prompts.lock().unwrap().push(messages);
        self.reply.clone().map_err(Error::Provider)
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}
