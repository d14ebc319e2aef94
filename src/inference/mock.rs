//! In-process [`InferenceClient`]s for tests and offline runs.

use async_trait::async_trait;
use futures_util::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{ChatRequest, DeltaStream, InferenceClient, InferenceError};

fn line_deltas(reply: &str) -> DeltaStream {
    let parts: Vec<Result<String, InferenceError>> = reply
        .split_inclusive('\n')
        .map(|l| Ok(l.to_string()))
        .collect();
    Box::pin(stream::iter(parts))
}

/// Mock client returning a fixed response.
#[derive(Default)]
pub struct MockInference;

#[async_trait]
impl InferenceClient for MockInference {
    async fn stream_completion(
        &self,
        request: &ChatRequest,
    ) -> Result<DeltaStream, InferenceError> {
        let reply = format!(
            "source: mock\nprompt_chars: {}",
            request.user.chars().count()
        );
        Ok(line_deltas(&reply))
    }
}

/// Replies with the same text every time and records each request.
pub struct StaticInference {
    reply: String,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StaticInference {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl InferenceClient for StaticInference {
    async fn stream_completion(
        &self,
        request: &ChatRequest,
    ) -> Result<DeltaStream, InferenceError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        Ok(line_deltas(&self.reply))
    }
}

/// Fails the first `failures` calls, then replies with `reply`.
pub struct FlakyInference {
    failures: AtomicUsize,
    calls: AtomicUsize,
    reply: String,
}

impl FlakyInference {
    pub fn new(failures: usize, reply: impl Into<String>) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            reply: reply.into(),
        }
    }

    /// Never succeeds.
    pub fn always_failing() -> Self {
        Self::new(usize::MAX, "")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for FlakyInference {
    async fn stream_completion(
        &self,
        _request: &ChatRequest,
    ) -> Result<DeltaStream, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failures.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(InferenceError::Unavailable("connection refused".into()));
        }
        Ok(line_deltas(&self.reply))
    }
}
