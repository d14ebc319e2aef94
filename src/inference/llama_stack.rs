use async_stream::stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, trace};

use super::{ChatRequest, DeltaStream, InferenceClient, InferenceError};

/// Chat client that calls a Llama Stack server via HTTP.
#[derive(Clone, Debug)]
pub struct LlamaStackClient {
    http: reqwest::Client,
    /// Base URL for the server, e.g. `http://localhost:5001`.
    base_url: String,
    model_id: String,
}

impl LlamaStackClient {
    pub fn new(base_url: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model_id: model_id.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/inference/chat-completion",
            self.base_url.trim_end_matches('/')
        )
    }
}

// Servers answer with either event deltas or OpenAI-style choices. Both are
// folded into plain text here, once.
#[derive(Deserialize)]
#[serde(untagged)]
enum StreamChunk {
    Event { event: StreamEvent },
    Choices { choices: Vec<Choice> },
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    delta: Option<EventDelta>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventDelta {
    Text(String),
    Typed {
        #[serde(default)]
        text: Option<String>,
    },
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<ChoiceContent>,
    #[serde(default)]
    message: Option<ChoiceContent>,
}

#[derive(Deserialize)]
struct ChoiceContent {
    #[serde(default)]
    content: Option<String>,
}

impl StreamChunk {
    fn into_text(self) -> Option<String> {
        match self {
            StreamChunk::Event { event } => match event.delta? {
                EventDelta::Text(t) => Some(t),
                EventDelta::Typed { text } => text,
            },
            StreamChunk::Choices { choices } => {
                let first = choices.into_iter().next()?;
                first.delta.or(first.message)?.content
            }
        }
    }
}

/// Decode one line of a streamed response into its text delta.
///
/// Accepts raw JSON lines and `data:`-prefixed server-sent events. Blank
/// lines, SSE control lines, unknown shapes and empty deltas yield `None`.
///
/// ```
/// use llama_pile::inference::decode_line;
///
/// assert_eq!(decode_line(r#"data: {"event":{"delta":"hi"}}"#), Some("hi".into()));
/// assert_eq!(
///     decode_line(r#"{"choices":[{"message":{"content":"yo"}}]}"#),
///     Some("yo".into())
/// );
/// assert_eq!(decode_line("data: [DONE]"), None);
/// ```
pub fn decode_line(line: &str) -> Option<String> {
    let line = line.trim();
    let payload = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if payload.is_empty() || payload == "[DONE]" || !payload.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk.into_text().filter(|t| !t.is_empty()),
        Err(e) => {
            trace!(error = %e, %payload, "skipping undecodable chunk");
            None
        }
    }
}

#[async_trait]
impl InferenceClient for LlamaStackClient {
    async fn stream_completion(
        &self,
        request: &ChatRequest,
    ) -> Result<DeltaStream, InferenceError> {
        let url = self.endpoint();
        let body = serde_json::json!({
            "model_id": self.model_id,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
            "sampling_params": request.sampling,
            "stream": true
        });
        trace!(%url, body = %body, "chat completion request");
        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut bytes = resp.bytes_stream();
        let out = stream! {
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(b) => buf.extend_from_slice(&b),
                    Err(e) => {
                        debug!(error = %e, "stream error");
                        yield Err(InferenceError::Http(e));
                        break;
                    }
                }
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    if let Some(delta) = decode_line(&String::from_utf8_lossy(&line)) {
                        trace!(%delta, "stream delta");
                        yield Ok(delta);
                    }
                }
            }
            if let Some(delta) = decode_line(&String::from_utf8_lossy(&buf)) {
                yield Ok(delta);
            }
        };
        Ok(Box::pin(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_event_delta_is_decoded() {
        let line = r#"data: {"event":{"event_type":"progress","delta":{"type":"text","text":"abc"}}}"#;
        assert_eq!(decode_line(line), Some("abc".into()));
    }

    #[test]
    fn choice_delta_is_preferred_over_message() {
        let line = r#"{"choices":[{"delta":{"content":"d"},"message":{"content":"m"}}]}"#;
        assert_eq!(decode_line(line), Some("d".into()));
    }

    #[test]
    fn empty_choices_and_unknown_shapes_are_skipped() {
        assert_eq!(decode_line(r#"{"choices":[]}"#), None);
        assert_eq!(decode_line(r#"{"something":"else"}"#), None);
        assert_eq!(decode_line(r#"{"event":{"event_type":"start"}}"#), None);
        assert_eq!(decode_line("event: progress"), None);
        assert_eq!(decode_line("not json"), None);
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let client = LlamaStackClient::new("http://h:1/", "m");
        assert_eq!(client.endpoint(), "http://h:1/v1/inference/chat-completion");
    }
}
