//! Hosted LLM access for RAG chains (Groq/OpenAI/Anthropic).
//!
//! `HostedChatModel` streams one chat completion per call from an external
//! API and returns the joined text. No local model required.

pub mod config;
pub mod model;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use model::{ChatModel, HostedChatModel};
pub use types::*;
