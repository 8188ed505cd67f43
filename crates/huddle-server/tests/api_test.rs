use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use huddle_bot::{BotHandle, BotSettings, CallStateMachine, Platform, PlatformError};
use huddle_server::{app, AppState};
use huddle_types::{AudioLevel, CallId, CallState, ConversationId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Platform that accepts every command.
struct AcceptAll;

#[async_trait]
impl Platform for AcceptAll {
    async fn join(&self, _call_id: &CallId) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn leave(&self, _call_id: &CallId) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn audio_level(&self, _call_id: &CallId) -> Result<Option<AudioLevel>, PlatformError> {
        Ok(None)
    }

    async fn attach_remote_audio(&self, _call_id: &CallId) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn send_text(
        &self,
        _conversation_id: &ConversationId,
        _text: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }
}

fn machine() -> (CallStateMachine, BotHandle) {
    let (announce_tx, _announce_rx) = mpsc::unbounded_channel();
    CallStateMachine::new(BotSettings::new("bot-1"), Arc::new(AcceptAll), announce_tx)
}

async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

const CALL_STARTED: &str = r#"{
    "type": "callStatus",
    "reason": "callStateChanged",
    "call": {"callId": "c1", "state": "Started", "participants": []}
}"#;

#[tokio::test]
async fn health_check_returns_ok() {
    let (_machine, bot) = machine();
    let (status, json) = get_json(app(AppState { bot }), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], "0.0.1");
}

#[tokio::test]
async fn call_started_notification_joins_call() {
    let (machine, bot) = machine();
    let mut transitions = bot.subscribe_transitions();
    tokio::spawn(machine.run());
    let router = app(AppState { bot: bot.clone() });

    let (status, json) = post_json(router.clone(), "/api/notifications", CALL_STARTED).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["routed"], true);
    assert_eq!(json["transition"], "call_started");

    loop {
        let t = transitions.recv().await.unwrap();
        if t.to == CallState::Active {
            break;
        }
    }

    let (status, json) = get_json(router, "/api/calls").await;
    assert_eq!(status, StatusCode::OK);
    let calls = json.as_array().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["callId"], "c1");
    assert_eq!(calls[0]["state"], "ACTIVE");
    assert_eq!(calls[0]["silenceCounter"], 0);
}

#[tokio::test]
async fn ignored_notification_is_still_accepted() {
    let (machine, bot) = machine();
    tokio::spawn(machine.run());

    let (status, json) = post_json(
        app(AppState { bot }),
        "/api/notifications",
        r#"{"type": "presenceChanged", "user": "u1"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["routed"], false);
    assert!(json.get("transition").is_none());
}

#[tokio::test]
async fn malformed_notification_is_rejected() {
    let (_machine, bot) = machine();

    let (status, json) = post_json(
        app(AppState { bot }),
        "/api/notifications",
        r#"{"type": "callStatus", "reason": 7}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!json["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn stopped_machine_returns_unavailable() {
    let (machine, bot) = machine();
    drop(machine);
    assert!(!bot.is_running());
    let router = app(AppState { bot });

    let (status, json) = post_json(router.clone(), "/api/notifications", CALL_STARTED).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].is_string());

    let (status, _) = get_json(router, "/api/calls").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
