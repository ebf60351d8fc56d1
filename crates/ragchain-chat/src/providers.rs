//! Hosted LLM provider streaming implementations.
//!
//! Each provider streams tokens via SSE from its chat API.
//! OpenAI and Groq use the same format. Anthropic uses a different one.

use std::pin::Pin;

use futures::Stream;
use ragchain_core::{Error, Result};
use reqwest::Client;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::types::{ChatMessage, LLMProvider, ModelConfig};

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token, completion marker, or error.
#[derive(Debug)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(Error),
}

/// Stream tokens from the provider named in `config`.
pub fn stream_llm(
    client: &Client,
    config: &ModelConfig,
    messages: Vec<ChatMessage>,
    api_key: &str,
) -> BoxedStream {
    match config.provider {
        LLMProvider::OpenAI | LLMProvider::Groq => Box::pin(stream_openai_compat(
            client.clone(),
            config.provider.endpoint(),
            messages,
            config.clone(),
            api_key.to_string(),
        )),
        LLMProvider::Anthropic => Box::pin(stream_anthropic(
            client.clone(),
            messages,
            config.clone(),
            api_key.to_string(),
        )),
    }
}

/// Drain a stream into the full completion text.
///
/// The first error chunk aborts collection and is returned as-is.
pub async fn collect_completion(mut stream: BoxedStream) -> Result<(String, usize)> {
    let mut text = String::new();
    let mut tokens_used = 0;

    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(t) => text.push_str(&t),
            StreamChunk::Done { tokens_used: t } => {
                tokens_used = t;
                break;
            }
            StreamChunk::Error(e) => return Err(e),
        }
    }

    Ok((text, tokens_used))
}

/// Request body for OpenAI-compatible chat completions.
pub fn openai_compat_body(config: &ModelConfig, messages: &[ChatMessage]) -> serde_json::Value {
    let msgs: Vec<serde_json::Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    json!({
        "model": config.model,
        "messages": msgs,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
        "stream": true,
    })
}

/// Request body for the Anthropic Messages API; system messages move to `system`.
pub fn anthropic_body(config: &ModelConfig, messages: &[ChatMessage]) -> serde_json::Value {
    let system_msg: Option<&str> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str());

    let conv_msgs: Vec<serde_json::Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": config.model,
        "messages": conv_msgs,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
        "stream": true,
    });

    if let Some(sys) = system_msg {
        body["system"] = json!(sys);
    }
    body
}

/// Pop complete, non-empty, non-comment SSE lines off the front of `buffer`.
///
/// Bytes are only decoded once a whole line has arrived, so a character split
/// across network chunks stays intact.
fn drain_sse_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        lines.push(line);
    }
    lines
}

/// Parsed OpenAI-compatible SSE payload.
#[derive(Debug, PartialEq)]
enum OpenAiEvent {
    Delta(String),
    Done,
    Error(String),
    Ignore,
}

fn parse_openai_data(data: &str) -> OpenAiEvent {
    if data.trim() == "[DONE]" {
        return OpenAiEvent::Done;
    }
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(parsed) if parsed.get("error").is_some_and(|e| !e.is_null()) => OpenAiEvent::Error(
            parsed["error"]["message"]
                .as_str()
                .or_else(|| parsed["error"].as_str())
                .unwrap_or("Unknown error")
                .to_string(),
        ),
        Ok(parsed) => match parsed["choices"][0]["delta"]["content"].as_str() {
            Some(content) if !content.is_empty() => OpenAiEvent::Delta(content.to_string()),
            _ => OpenAiEvent::Ignore,
        },
        Err(_) => OpenAiEvent::Ignore,
    }
}

/// Parsed Anthropic SSE payload.
#[derive(Debug, PartialEq)]
enum AnthropicEvent {
    Delta(String),
    Stop,
    Error(String),
    Ignore,
}

fn parse_anthropic_data(data: &str) -> AnthropicEvent {
    let parsed = match serde_json::from_str::<serde_json::Value>(data) {
        Ok(p) => p,
        Err(_) => return AnthropicEvent::Ignore,
    };
    match parsed["type"].as_str() {
        Some("content_block_delta") => match parsed["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => AnthropicEvent::Delta(text.to_string()),
            _ => AnthropicEvent::Ignore,
        },
        Some("message_stop") => AnthropicEvent::Stop,
        Some("error") => AnthropicEvent::Error(
            parsed["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string(),
        ),
        _ => AnthropicEvent::Ignore,
    }
}

/// Stream from OpenAI-compatible APIs (OpenAI, Groq).
fn stream_openai_compat(
    client: Client,
    url: &'static str,
    messages: Vec<ChatMessage>,
    config: ModelConfig,
    api_key: String,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    let body = openai_compat_body(&config, &messages);

    async_stream::stream! {
        debug!("Streaming from {} with model {}", url, config.model);

        let response = match client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(Error::Http(format!("Request failed: {}", e)));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(Error::Provider(format!("API error {}: {}", status, body)));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(Error::Http(format!("Stream read error: {}", e)));
                    return;
                }
            };

            buffer.extend_from_slice(&bytes);

            for line in drain_sse_lines(&mut buffer) {
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                match parse_openai_data(data) {
                    OpenAiEvent::Delta(content) => {
                        token_count += 1;
                        yield StreamChunk::Token(content);
                    }
                    OpenAiEvent::Done => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    OpenAiEvent::Error(msg) => {
                        error!("{} error: {}", config.provider, msg);
                        yield StreamChunk::Error(Error::Provider(msg));
                        return;
                    }
                    OpenAiEvent::Ignore => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

/// Stream from Anthropic's Messages API.
fn stream_anthropic(
    client: Client,
    messages: Vec<ChatMessage>,
    config: ModelConfig,
    api_key: String,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    let body = anthropic_body(&config, &messages);

    async_stream::stream! {
        debug!("Streaming from Anthropic with model {}", config.model);

        let response = match client
            .post(LLMProvider::Anthropic.endpoint())
            .header("x-api-key", &api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(Error::Http(format!("Request failed: {}", e)));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(Error::Provider(format!("API error {}: {}", status, body)));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(Error::Http(format!("Stream read error: {}", e)));
                    return;
                }
            };

            buffer.extend_from_slice(&bytes);

            // Anthropic uses "event: " lines followed by "data: " lines
            for line in drain_sse_lines(&mut buffer) {
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                match parse_anthropic_data(data) {
                    AnthropicEvent::Delta(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    AnthropicEvent::Stop => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    AnthropicEvent::Error(msg) => {
                        error!("Anthropic error: {}", msg);
                        yield StreamChunk::Error(Error::Provider(msg));
                        return;
                    }
                    AnthropicEvent::Ignore => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}
