/// LLM Client — the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the Groq API directly.
/// Handlers reach the model through the `CompletionModel` trait carried in `AppState`.
///
/// Model: llama-3.1-8b-instant (hardcoded — do not make configurable to prevent drift)
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Config;

pub mod sse;

use sse::{SseDecoder, StreamFrame};

/// The model used for every analysis.
pub const MODEL: &str = "llama-3.1-8b-instant";
pub const TEMPERATURE: f32 = 0.3;
const FRAGMENT_BUFFER: usize = 100;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// Ordered, finite sequence of text fragments. Closes when the model signals completion.
pub type FragmentStream = mpsc::Receiver<Result<String, LlmError>>;

/// Anything that can turn a prompt into a streamed completion.
///
/// Carried in `AppState` as `Arc<dyn CompletionModel>`.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Name reported to clients alongside results.
    fn model_name(&self) -> &str;

    /// Resolves once the remote stream is established. Errors before that point are
    /// returned here; errors after it arrive as `Err` items on the stream.
    async fn stream_completion(&self, prompt: &str) -> Result<FragmentStream, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Backoff applied while establishing a stream. Delay doubles per attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

impl RetryPolicy {
    /// `base_delay * 2^(attempt - 1)`, saturating and capped at `MAX_BACKOFF`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Client for Groq's OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(
        api_url: String,
        api_key: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url,
            api_key,
            retry,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            config.groq_api_url.clone(),
            config.groq_api_key.clone(),
            Duration::from_secs(config.llm_timeout_secs),
            RetryPolicy {
                max_attempts: config.llm_max_retries.max(1),
                ..RetryPolicy::default()
            },
        )
    }

    /// Sends the streaming request, retrying on 429, 5xx and transport errors with
    /// exponential backoff. Nothing is retried once a success status has been received.
    async fn open_stream(&self, prompt: &str) -> Result<reqwest::Response, LlmError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            stream: true,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                warn!(
                    "LLM stream attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .header("accept", "text/event-stream")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.retry.max_attempts,
        }))
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    fn model_name(&self) -> &str {
        MODEL
    }

    async fn stream_completion(&self, prompt: &str) -> Result<FragmentStream, LlmError> {
        let response = self.open_stream(prompt).await?;
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut fragments = 0u32;

            while let Some(item) = body.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::Http(e))).await;
                        return;
                    }
                };

                for frame in decoder.push(&bytes) {
                    if !forward_frame(&tx, frame, &mut fragments).await {
                        return;
                    }
                }
            }

            if let Some(frame) = decoder.finish() {
                if !forward_frame(&tx, frame, &mut fragments).await {
                    return;
                }
            }

            debug!("LLM stream ended without completion marker after {fragments} fragments");
        });

        Ok(rx)
    }
}

/// Sends one frame downstream. Returns `false` when the stream should stop.
async fn forward_frame(
    tx: &mpsc::Sender<Result<String, LlmError>>,
    frame: StreamFrame,
    fragments: &mut u32,
) -> bool {
    match frame {
        StreamFrame::Content(text) => {
            *fragments += 1;
            tx.send(Ok(text)).await.is_ok()
        }
        StreamFrame::Error(message) => {
            let _ = tx.send(Err(LlmError::Stream(message))).await;
            false
        }
        StreamFrame::Done => {
            debug!("LLM stream completed: fragments={}", fragments);
            false
        }
    }
}
