//! Reply proxy integration tests.
//!
//! Run the server against a wiremock completion endpoint and check that every
//! upstream outcome is normalized into `200 {reply}`, and that bad input gets
//! a 400.

mod common;

use std::time::Duration;

use anyhow::Result;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use huddle_llm::Fallback;

async fn upstream(template: ResponseTemplate) -> MockServer {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(template)
        .mount(&mock)
        .await;
    mock
}

async fn ask(server: &common::TestServer, body: Value) -> Result<(u16, Value)> {
    let resp = server.post("/api/reply").json(&body).send().await?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await?))
}

async fn server_for(mock: &MockServer, reply_timeout: Duration) -> Result<common::TestServer> {
    common::TestServer::start_with_endpoint(
        &format!("{}/v1/chat/completions", mock.uri()),
        reply_timeout,
    )
    .await
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream shapes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_choices_shape() -> Result<()> {
    let mock = upstream(
        ResponseTemplate::new(200).set_body_json(json!({"choices":[{"message":{"content":"hello"}}]})),
    )
    .await;
    let server = server_for(&mock, Duration::from_secs(30)).await?;

    let (status, body) = ask(&server, json!({"message": "hi"})).await?;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"reply": "hello"}));
    Ok(())
}

#[tokio::test]
async fn test_plain_text_body() -> Result<()> {
    let mock = upstream(ResponseTemplate::new(200).set_body_string("plain text")).await;
    let server = server_for(&mock, Duration::from_secs(30)).await?;

    let (status, body) = ask(&server, json!({"message": "hi"})).await?;
    assert_eq!(status, 200);
    assert_eq!(body["reply"], "plain text");
    Ok(())
}

#[tokio::test]
async fn test_scripted_backend_wrapper_shape() -> Result<()> {
    let server =
        common::TestServer::start_with_bodies(vec![r#"{"data": {"answer": "wrapped"}}"#]).await?;
    let (_, body) = ask(&server, json!({"message": "hi"})).await?;
    assert_eq!(body["reply"], "wrapped");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upstream_statuses_map_to_fallbacks() -> Result<()> {
    for (code, fallback) in [
        (401, Fallback::Unauthorized),
        (403, Fallback::Unauthorized),
        (429, Fallback::RateLimited),
        (500, Fallback::ServerError),
        (503, Fallback::ServerError),
        (404, Fallback::Failed),
    ] {
        let mock = upstream(ResponseTemplate::new(code).set_body_string("nope")).await;
        let server = server_for(&mock, Duration::from_secs(30)).await?;

        let (status, body) = ask(&server, json!({"message": "hi"})).await?;
        assert_eq!(status, 200, "upstream {code}");
        assert_eq!(body["reply"], fallback.text(), "upstream {code}");
    }
    Ok(())
}

#[tokio::test]
async fn test_slow_upstream_times_out() -> Result<()> {
    let mock = upstream(
        ResponseTemplate::new(200)
            .set_body_string("too late")
            .set_delay(Duration::from_secs(5)),
    )
    .await;
    let server = server_for(&mock, Duration::from_millis(200)).await?;

    let (status, body) = ask(&server, json!({"message": "hi"})).await?;
    assert_eq!(status, 200);
    assert_eq!(body["reply"], Fallback::Timeout.text());
    Ok(())
}

#[tokio::test]
async fn test_empty_object_is_unavailable() -> Result<()> {
    let mock = upstream(ResponseTemplate::new(200).set_body_json(json!({}))).await;
    let server = server_for(&mock, Duration::from_secs(30)).await?;

    let (_, body) = ask(&server, json!({"message": "hi"})).await?;
    assert_eq!(body["reply"], Fallback::Unavailable.text());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Input validation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_messages_are_400() -> Result<()> {
    let server = common::TestServer::start().await?;

    for input in [json!({}), json!({"message": 42}), json!({"message": "   "})] {
        let (status, body) = ask(&server, input.clone()).await?;
        assert_eq!(status, 400, "{input}");
        assert!(body["error"].is_string());
    }
    Ok(())
}

#[tokio::test]
async fn test_non_json_body_is_400() -> Result<()> {
    let server = common::TestServer::start().await?;
    let resp = server
        .post("/api/reply")
        .header("content-type", "application/json")
        .body("{{{")
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);
    Ok(())
}
