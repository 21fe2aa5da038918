//! Integration tests for the chat REST surface.
//!
//! Each test spins up an Axum server on a random port and exercises the real
//! HTTP contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use career_assist::chat::responses::{ERROR_FALLBACK, GREETING, generate};
use career_assist::chat::{
    ChatRouteState, IntentCategory, LocalReplyService, ReplyContext, ReplyService,
    SequentialIds, SessionRegistry, chat_routes,
};
use career_assist::config::AssistantConfig;
use career_assist::error::ReplyError;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend that always fails.
struct FailingReply;

#[async_trait]
impl ReplyService for FailingReply {
    fn name(&self) -> &str {
        "failing"
    }
    async fn get_reply(&self, _: &str, _: &ReplyContext) -> Result<String, ReplyError> {
        Err(ReplyError::Failed {
            backend: "failing".into(),
            reason: "backend unavailable".into(),
        })
    }
}

/// Start an Axum server on a random port with the given backend, return the port.
async fn start_server_with(reply: Arc<dyn ReplyService>) -> u16 {
    let registry = SessionRegistry::new(
        AssistantConfig::default(),
        reply,
        Arc::new(SequentialIds::new()),
    );
    let app = chat_routes(ChatRouteState { registry });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    port
}

/// Local backend with the given simulated latency.
async fn start_server(latency: Duration) -> u16 {
    start_server_with(Arc::new(LocalReplyService::default().with_latency(latency))).await
}

/// Open a session, return its id.
async fn open_session(client: &reqwest::Client, port: u16) -> String {
    let resp = client
        .post(format!("http://127.0.0.1:{port}/api/chat/sessions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn submit(client: &reqwest::Client, port: u16, id: &str, text: &str) -> reqwest::Response {
    client
        .post(format!(
            "http://127.0.0.1:{port}/api/chat/sessions/{id}/messages"
        ))
        .json(&serde_json::json!({ "message": text }))
        .send()
        .await
        .unwrap()
}

async fn history(client: &reqwest::Client, port: u16, id: &str) -> Value {
    let resp = client
        .get(format!(
            "http://127.0.0.1:{port}/api/chat/sessions/{id}/messages"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "career-assist-chat");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn new_session_starts_with_greeting() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/chat/sessions"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        let messages = body["data"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "assistant");
        assert_eq!(messages[0]["content"], GREETING);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn submit_returns_user_and_reply() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let resp = submit(&client, port, &id, "What skills am I missing?").await;
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["outcome"], "replied");
        let appended = body["data"]["messages"].as_array().unwrap();
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0]["role"], "user");
        assert_eq!(appended[0]["content"], "What skills am I missing?");
        assert_eq!(appended[1]["role"], "assistant");
        assert_eq!(appended[1]["content"], generate(IntentCategory::SkillGap));

        let log = history(&client, port, &id).await;
        assert_eq!(log["total"], 3);
        assert_eq!(log["busy"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn empty_message_is_rejected_without_changes() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let resp = submit(&client, port, &id, "   ").await;
        assert_eq!(resp.status(), 422);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["reason"], "empty");

        let log = history(&client, port, &id).await;
        assert_eq!(log["total"], 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn length_boundary_over_http() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let resp = submit(&client, port, &id, &"a".repeat(1001)).await;
        assert_eq!(resp.status(), 422);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["reason"], "too_long");

        let resp = submit(&client, port, &id, &"a".repeat(1000)).await;
        assert_eq!(resp.status(), 200);

        let log = history(&client, port, &id).await;
        assert_eq!(log["total"], 3);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn second_submit_while_pending_is_busy() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::from_millis(400)).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let first = {
            let client = client.clone();
            let id = id.clone();
            tokio::spawn(async move { submit(&client, port, &id, "resume tips").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let log = history(&client, port, &id).await;
        assert_eq!(log["busy"], true);

        let resp = submit(&client, port, &id, "interview tips").await;
        assert_eq!(resp.status(), 409);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["reason"], "busy");

        let resp = first.await.unwrap();
        assert_eq!(resp.status(), 200);

        let log = history(&client, port, &id).await;
        let messages = log["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"], "resume tips");
        assert_eq!(messages[2]["content"], generate(IntentCategory::Resume));
        assert_eq!(log["busy"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn backend_failure_appends_fallback() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server_with(Arc::new(FailingReply)).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let resp = submit(&client, port, &id, "help").await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["outcome"], "failed");
        assert_eq!(body["data"]["failed"], true);
        let appended = body["data"]["messages"].as_array().unwrap();
        assert_eq!(appended[1]["content"], ERROR_FALLBACK);

        // Session is usable again.
        let resp = submit(&client, port, &id, "help again").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(history(&client, port, &id).await["busy"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn closed_session_is_gone() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let resp = client
            .delete(format!("http://127.0.0.1:{port}/api/chat/sessions/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = submit(&client, port, &id, "hello").await;
        assert_eq!(resp.status(), 404);

        let resp = client
            .delete(format!("http://127.0.0.1:{port}/api/chat/sessions/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn closing_while_pending_discards_reply() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::from_millis(400)).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let pending = {
            let client = client.clone();
            let id = id.clone();
            tokio::spawn(async move { submit(&client, port, &id, "career advice").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let resp = client
            .delete(format!("http://127.0.0.1:{port}/api/chat/sessions/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = pending.await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["outcome"], "discarded");
        assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_and_invalid_session_ids() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;
        let client = reqwest::Client::new();

        let resp = submit(&client, port, "not-a-uuid", "hello").await;
        assert_eq!(resp.status(), 400);

        let missing = uuid::Uuid::new_v4();
        let resp = client
            .get(format!(
                "http://127.0.0.1:{port}/api/chat/sessions/{missing}/messages"
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn feedback_is_accepted() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(Duration::ZERO).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, port).await;

        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/chat/feedback"))
            .json(&serde_json::json!({
                "session_id": id,
                "message_id": "msg-1",
                "rating": 5,
                "comment": "useful",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
    })
    .await
    .expect("test timed out");
}
