//! Ollama chat client
//!
//! Talks to `POST /api/chat` either in one shot or as a token stream.
//! Streamed bodies are newline-delimited JSON; [`ChatChunkDecoder`] turns
//! arbitrary byte chunks back into message fragments.

use crate::errors::{NovaError, Result};
use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "openchat";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Something that can answer a conversation
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Full reply to `messages`
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Reply to `messages`, handing each fragment to `on_fragment` as it
    /// arrives. Returns the concatenated reply.
    async fn chat_streaming(
        &self,
        messages: &[ChatMessage],
        on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String> {
        let reply = self.chat(messages).await?;
        on_fragment(&reply);
        Ok(reply)
    }

    /// Model name used for replies
    fn model(&self) -> &str;
}

/// Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaChatClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaChatClient {
    /// Create client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT)
    }

    /// Create client with custom configuration
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        info!(base_url, model, "Initialized Ollama chat client");
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Send a conversation and wait for the whole reply
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        debug!(messages = messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NovaError::OllamaApi(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NovaError::OllamaApi(format!("HTTP {}: {}", status, error_text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| NovaError::OllamaApi(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(NovaError::OllamaApi(error));
        }
        let content = body.message.map(|m| m.content).unwrap_or_default();
        debug!(chars = content.len(), "Received chat reply");
        Ok(content)
    }

    /// Send a conversation and stream the reply fragment by fragment
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<impl Stream<Item = Result<String>>> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NovaError::OllamaApi(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NovaError::OllamaApi(format!("HTTP {}: {}", status, error_text)));
        }

        let state = StreamState {
            body: response.bytes_stream().boxed(),
            decoder: ChatChunkDecoder::default(),
            pending: VecDeque::new(),
            finished: false,
        };

        Ok(futures_util::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.finished {
                    return None;
                }
                match state.body.next().await {
                    Some(Ok(bytes)) => state.pending.extend(state.decoder.push(&bytes)),
                    Some(Err(e)) => {
                        state.finished = true;
                        state.pending.push_back(Err(NovaError::Streaming(e.to_string())));
                    }
                    None => {
                        state.finished = true;
                        state.pending.extend(state.decoder.finish());
                    }
                }
            }
        }))
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// List installed models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NovaError::OllamaApi(format!("Failed to list models: {}", e)))?;

        if !response.status().is_success() {
            return Err(NovaError::OllamaApi(format!(
                "Failed to retrieve model list: HTTP {}",
                response.status()
            )));
        }

        let models: TagsResponse = response
            .json()
            .await
            .map_err(|e| NovaError::OllamaApi(format!("Failed to parse models: {}", e)))?;

        Ok(models.models.into_iter().map(|m| m.name).collect())
    }

    /// True when an installed model name contains the configured one
    pub async fn model_available(&self) -> Result<bool> {
        let available = self
            .list_models()
            .await?
            .iter()
            .any(|name| name.contains(&self.model));
        if !available {
            warn!(
                model = %self.model,
                "Model is not installed; pull it with 'ollama pull {}'",
                self.model
            );
        }
        Ok(available)
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for OllamaChatClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        OllamaChatClient::chat(self, messages).await
    }

    async fn chat_streaming(
        &self,
        messages: &[ChatMessage],
        on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String> {
        let stream = self.chat_stream(messages).await?;
        futures_util::pin_mut!(stream);

        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            on_fragment(&fragment);
            reply.push_str(&fragment);
        }
        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

struct StreamState {
    body: futures_util::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    decoder: ChatChunkDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

/// Reassembles newline-delimited chat responses from byte chunks
#[derive(Debug, Default)]
pub struct ChatChunkDecoder {
    buf: BytesMut,
}

impl ChatChunkDecoder {
    /// Feed a chunk; returns the fragments of every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String>> {
        self.buf.extend_from_slice(chunk);
        let mut fragments = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if let Some(fragment) = decode_line(&line[..pos]) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    /// Decode whatever is left once the body ends
    pub fn finish(&mut self) -> Vec<Result<String>> {
        let rest = self.buf.split();
        decode_line(&rest).into_iter().collect()
    }
}

fn decode_line(line: &[u8]) -> Option<Result<String>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => {
            warn!(error = %e, "Skipping non UTF-8 stream line");
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<ChatResponse>(text) {
        Ok(ChatResponse { error: Some(error), .. }) => Some(Err(NovaError::OllamaApi(error))),
        Ok(response) => response
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty())
            .map(Ok),
        Err(e) => {
            warn!(error = %e, line = text, "Skipping undecodable stream line");
            None
        }
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// Ollama chat response (whole or one streamed line)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}
