//! Boundary to the remote chat-completion service.
//!
//! [`InferenceClient`] is the raw transport: it opens a stream of text
//! deltas and may fail. [`Inference`] layers retries, delta de-duplication
//! and a length ceiling on top, and never fails: after the last attempt it
//! yields an in-band `Error:` response instead.

mod llama_stack;
pub mod mock;
mod retry;

pub use llama_stack::{LlamaStackClient, decode_line};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::config::{InferenceConfig, SamplingParams};

/// Prefix marking a response that carries a failure instead of model output.
pub const ERROR_PREFIX: &str = "Error:";

/// Appended to every user prompt.
pub const CONCISE_SUFFIX: &str = "\n\nIMPORTANT: Keep responses concise. No repetition.";

/// Transport-level failures. These never escape [`Inference::complete`].
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Normalized stream of text deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, InferenceError>> + Send>>;

/// One chat turn sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub sampling: SamplingParams,
}

/// Raw streaming chat-completion transport.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Open a completion stream for `request`.
    async fn stream_completion(&self, request: &ChatRequest)
    -> Result<DeltaStream, InferenceError>;
}

/// Full text produced for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            text: format!("{ERROR_PREFIX} {reason}"),
        }
    }

    /// True for empty output or an in-band error.
    pub fn is_error(&self) -> bool {
        self.text.is_empty() || self.text.starts_with(ERROR_PREFIX)
    }
}

/// Concatenate `stream`, skipping deltas already seen and stopping at
/// `max_chars`. A mid-stream failure keeps what arrived so far.
pub async fn collect_deltas(mut stream: DeltaStream, max_chars: usize) -> String {
    let mut seen = HashSet::new();
    let mut out = String::new();
    let mut len = 0usize;
    while let Some(delta) = stream.next().await {
        let delta = match delta {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "stream interrupted; keeping partial response");
                break;
            }
        };
        if !seen.insert(delta.clone()) {
            trace!(%delta, "dropping repeated delta");
            continue;
        }
        let room = max_chars.saturating_sub(len);
        let delta_len = delta.chars().count();
        if delta_len >= room {
            out.extend(delta.chars().take(room));
            debug!(max_chars, "response ceiling reached");
            break;
        }
        out.push_str(&delta);
        len += delta_len;
    }
    out.trim().to_string()
}

/// Retrying, never-failing completion adapter.
#[derive(Clone)]
pub struct Inference {
    client: Arc<dyn InferenceClient>,
    policy: RetryPolicy,
    system_message: String,
    sampling: SamplingParams,
    max_response_chars: usize,
    error_message: String,
}

impl Inference {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        config: &InferenceConfig,
        max_response_chars: usize,
    ) -> Self {
        Self {
            client,
            policy: RetryPolicy::new(config.retry_attempts, config.retry_delay()),
            system_message: config.system_message.clone(),
            sampling: config.sampling.clone(),
            max_response_chars,
            error_message: config.error_message.clone(),
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run `prompt` against the model and return the collected text.
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// use std::sync::Arc;
    /// use llama_pile::config::InferenceConfig;
    /// use llama_pile::inference::{Inference, mock::StaticInference};
    ///
    /// let client = Arc::new(StaticInference::new("topic: rust"));
    /// let inference = Inference::new(client, &InferenceConfig::default(), 1000);
    /// assert_eq!(inference.complete("hi").await.text, "topic: rust");
    /// # });
    /// ```
    pub async fn complete(&self, prompt: &str) -> Completion {
        let request = ChatRequest {
            system: self.system_message.clone(),
            user: format!("{prompt}{CONCISE_SUFFIX}"),
            sampling: self.sampling.clone(),
        };
        trace!(prompt = %request.user, "inference prompt");
        match self
            .policy
            .retry(|| self.client.stream_completion(&request))
            .await
        {
            Ok(stream) => {
                let text = collect_deltas(stream, self.max_response_chars).await;
                debug!(response = %text, "inference response");
                Completion { text }
            }
            Err(e) => {
                error!(error = %e, "{}", self.error_message);
                Completion::failed("inference server unavailable")
            }
        }
    }
}
