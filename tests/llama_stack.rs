use futures_util::StreamExt;
use httpmock::prelude::*;
use llama_pile::config::{InferenceConfig, SamplingParams};
use llama_pile::inference::{ChatRequest, InferenceError, RetryPolicy, collect_deltas};
use llama_pile::{Inference, InferenceClient, LlamaStackClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn request() -> ChatRequest {
    ChatRequest {
        system: "sys".into(),
        user: "hi".into(),
        sampling: SamplingParams::default(),
    }
}

#[tokio::test]
async fn event_deltas_are_streamed() {
    let server = MockServer::start_async().await;
    let body = concat!(
        "data: {\"event\":{\"event_type\":\"start\",\"delta\":\"\"}}\n\n",
        "data: {\"event\":{\"event_type\":\"progress\",\"delta\":\"topic: \"}}\n\n",
        "data: {\"event\":{\"event_type\":\"progress\",\"delta\":{\"type\":\"text\",\"text\":\"space\"}}}\n\n",
        "data: [DONE]\n"
    );
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/inference/chat-completion")
                .json_body_partial(r#"{"model_id":"m","stream":true}"#);
            then.status(200).body(body);
        })
        .await;

    let client = LlamaStackClient::new(server.base_url(), "m");
    let mut stream = client.stream_completion(&request()).await.unwrap();
    let mut deltas = Vec::new();
    while let Some(d) = stream.next().await {
        deltas.push(d.unwrap());
    }
    mock.assert_async().await;
    assert_eq!(deltas, ["topic: ", "space"]);
}

#[tokio::test]
async fn choice_chunks_are_streamed() {
    let server = MockServer::start_async().await;
    let body = concat!(
        "{\"choices\":[{\"delta\":{\"content\":\"he\"}}]}\n",
        "{\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}"
    );
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/inference/chat-completion");
            then.status(200).body(body);
        })
        .await;

    let client = LlamaStackClient::new(server.base_url(), "m");
    let stream = client.stream_completion(&request()).await.unwrap();
    assert_eq!(collect_deltas(stream, 1000).await, "hello");
}

#[tokio::test]
async fn request_carries_messages_and_sampling() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/inference/chat-completion")
                .json_body_partial(
                    json!({
                        "messages": [
                            {"role": "system", "content": "sys"},
                            {"role": "user", "content": "hi"}
                        ],
                        "sampling_params": {"strategy": "greedy", "max_tokens": 512}
                    })
                    .to_string(),
                );
            then.status(200).body("");
        })
        .await;

    let client = LlamaStackClient::new(server.base_url(), "m");
    let stream = client.stream_completion(&request()).await.unwrap();
    assert_eq!(collect_deltas(stream, 1000).await, "");
    mock.assert_async().await;
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/inference/chat-completion");
            then.status(503).body("overloaded");
        })
        .await;

    let client = LlamaStackClient::new(server.base_url(), "m");
    match client.stream_completion(&request()).await {
        Err(InferenceError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn unreachable_server_becomes_error_sentinel() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/inference/chat-completion");
            then.status(500);
        })
        .await;

    let client = Arc::new(LlamaStackClient::new(server.base_url(), "m"));
    let inference = Inference::new(client, &InferenceConfig::default(), 1000)
        .with_policy(RetryPolicy::new(3, Duration::from_millis(1)));
    let completion = inference.complete("hello").await;
    assert!(completion.is_error());
    assert!(completion.text.starts_with("Error:"));
    failing.assert_hits_async(3).await;
}
