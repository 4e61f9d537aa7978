//! Server integration tests.
//!
//! Boot a real server on a free port and exercise health and token issuance
//! over HTTP.

mod common;

use anyhow::Result;
use huddle_llm::ReplyService;

#[tokio::test]
async fn test_server_starts_and_responds_to_health() -> Result<()> {
    let server = common::TestServer::start().await?;
    assert!(server.health().await?, "Server should be healthy");
    Ok(())
}

#[tokio::test]
async fn test_server_health_returns_version() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/health").send().await?;
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some());

    Ok(())
}

#[tokio::test]
async fn test_token_is_scoped_to_channel() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/api/token?clientId=Guest-4821").send().await?;
    assert_eq!(resp.status().as_u16(), 200);

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["keyName"], "test.key");
    assert_eq!(body["clientId"], "Guest-4821");

    let capability: serde_json::Value =
        serde_json::from_str(body["capability"].as_str().unwrap_or("{}"))?;
    let ops = capability[common::TEST_CHANNEL]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(ops.len(), 4);
    assert!(ops.contains(&serde_json::json!("presence")));

    Ok(())
}

#[tokio::test]
async fn test_token_never_leaks_secret() -> Result<()> {
    let server = common::TestServer::start().await?;
    let text = server.get("/api/token?clientId=a").send().await?.text().await?;
    assert!(!text.contains("test-secret"));
    Ok(())
}

#[tokio::test]
async fn test_token_without_key_fails_closed() -> Result<()> {
    let server = common::TestServer::start_with(None, ReplyService::mock()).await?;

    let resp = server.get("/api/token?clientId=alice").send().await?;
    assert_eq!(resp.status().as_u16(), 500);

    let body: serde_json::Value = resp.json().await?;
    assert!(body["error"].is_string());
    assert!(body["details"].is_string());

    // Replies keep working without a messaging key
    let resp = server
        .post("/api/reply")
        .json(&serde_json::json!({"message": "still there?"}))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);

    Ok(())
}
