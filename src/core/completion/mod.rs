use crate::core::config::CompletionConfig;
use crate::core::error::AppError;
use crate::core::prompt::{PromptMessage, PromptPayload};
use crate::core::types::ErrorCategory;
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio::time::{timeout, Instant};
use tracing::debug;

/// Ordered, append-only chunks of a streamed completion.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

/// Error types for completion service calls.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Completion API returned status {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Completion exceeded the request budget")]
    Budget,
}

impl From<CompletionError> for AppError {
    fn from(e: CompletionError) -> Self {
        let category = match e {
            CompletionError::Budget => ErrorCategory::TimeoutError,
            _ => ErrorCategory::UpstreamError,
        };
        AppError::new(category, e.to_string())
    }
}

/// Client for an OpenAI-style chat-completion service.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: &'a [PromptMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> Self {
        CompletionClient {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Submit a built prompt and stream the completion text back.
    ///
    /// A failure before the first chunk surfaces as an error from this call;
    /// a failure mid-stream terminates the returned stream abnormally.
    /// Chunks arriving after `deadline` abort the stream with a budget error.
    pub async fn stream_chat(
        &self,
        payload: &PromptPayload,
        deadline: Instant,
    ) -> Result<ChunkStream, CompletionError> {
        let request = ChatRequest {
            model: &payload.model,
            temperature: payload.temperature,
            stream: true,
            max_tokens: payload.max_tokens,
            messages: &payload.messages,
        };

        debug!("streaming completion with model {}", payload.model);
        let response = self
            .builder()
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                detail: body.chars().take(200).collect(),
            });
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buffer = String::new();
            'receive: loop {
                let remaining = deadline.duration_since(Instant::now());
                let next = timeout(remaining, bytes.next())
                    .await
                    .map_err(|_| AppError::from(CompletionError::Budget))?;
                let Some(chunk) = next else { break 'receive };
                let chunk = chunk.map_err(|e| {
                    AppError::from(CompletionError::Network(e.to_string()))
                })?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end_matches('\r').trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        break 'receive;
                    }

                    let parsed: StreamChunk = serde_json::from_str(data).map_err(|e| {
                        AppError::from(CompletionError::Protocol(format!(
                            "unparseable stream event: {}",
                            e
                        )))
                    })?;
                    if let Some(text) = parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                    {
                        if !text.is_empty() {
                            yield text;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    /// Submit messages and wait for the full completion text (no streaming).
    /// Used by the evaluation harness and the LLM-judge scorers.
    pub async fn complete(
        &self,
        model: &str,
        temperature: f32,
        max_tokens: Option<u32>,
        messages: &[PromptMessage],
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model,
            temperature,
            stream: false,
            max_tokens,
            messages,
        };

        let response = self
            .builder()
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                detail: body.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Protocol(format!("unparseable completion: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Protocol("completion had no content".to_string()))
    }

    fn builder(&self) -> reqwest::RequestBuilder {
        let url = format!("{}/chat/completions", self.api_url);
        let mut builder = self.http.post(url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}
