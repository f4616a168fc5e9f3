//! Session client lifecycle against a scripted transport
//!
//! Time is paused, so reconnect delays elapse as soon as the runtime idles.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use signage_agent::session::client::{Options, SessionClient};
use signage_agent::session::greeting::Greeting;
use signage_agent::session::stomp::{Command, Frame};
use signage_agent::session::topics::Topics;

use crate::fakes::{CountingTokens, LinkPlan, RecordingSink, ScriptedTransport, SERIAL};

struct Fixture {
    tokens: Arc<CountingTokens>,
    transport: Arc<ScriptedTransport>,
    sink: Arc<RecordingSink>,
    client: SessionClient,
}

fn fixture_with(plans: &[LinkPlan], token_failures: usize) -> Fixture {
    let tokens = Arc::new(CountingTokens::new(token_failures));
    let transport = Arc::new(ScriptedTransport::new(plans));
    let sink = Arc::new(RecordingSink::default());
    let client = SessionClient::new(
        Options::default(),
        tokens.clone(),
        transport.clone(),
        sink.clone(),
        Greeting::new(SERIAL.to_string(), "0.1.0".to_string()),
    );
    Fixture {
        tokens,
        transport,
        sink,
        client,
    }
}

fn fixture(plans: &[LinkPlan]) -> Fixture {
    fixture_with(plans, 0)
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn room_topics() -> Vec<String> {
    vec![
        Topics::attendance("ROOM-1"),
        Topics::attendance("ROOM-2"),
        Topics::STATUS.to_string(),
        Topics::PUBLIC.to_string(),
        Topics::HEARTBEAT.to_string(),
    ]
}

// ================================== CONNECT ====================================== //

#[tokio::test(start_paused = true)]
async fn test_connect_subscribes_and_greets() {
    let f = fixture(&[LinkPlan::Accept]);
    f.client.connect("ROOM-1", Some("ROOM-2")).await;

    let status = f.client.status().await;
    assert!(status.active);
    assert!(status.connected);
    assert_eq!(status.attempt, 0);
    assert_eq!(status.subscriptions, room_topics());
    assert!(!f.client.reconnect_pending().await);

    let link = f.transport.last_link();
    assert_eq!(link.token, "token-0");
    assert_eq!(link.subscriptions(), room_topics());

    let sent = link.sent();
    assert_eq!(sent[0].command, Command::Connect);
    assert_eq!(sent[0].header("Authorization"), Some("Bearer token-0"));
    assert_eq!(sent[0].header("host"), Some("gateway.test"));

    let hello = sent.last().unwrap();
    assert_eq!(hello.command, Command::Send);
    assert_eq!(hello.header("destination"), Some(Topics::HELLO));
    let body: Value = serde_json::from_str(&hello.body).unwrap();
    assert_eq!(body["type"], "hello");
    assert_eq!(body["primaryId"], "ROOM-1");
    assert_eq!(body["secondaryId"], "ROOM-2");
    assert_eq!(body["serialNumber"], SERIAL);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_identifier_is_subscribed_once() {
    let f = fixture(&[LinkPlan::Accept]);
    f.client.connect("ROOM-1", Some("ROOM-1")).await;

    let subscriptions = f.transport.last_link().subscriptions();
    assert_eq!(subscriptions.len(), 4);
    assert_eq!(subscriptions[0], Topics::attendance("ROOM-1"));
}

#[tokio::test(start_paused = true)]
async fn test_connect_while_active_is_ignored() {
    let f = fixture(&[LinkPlan::Accept, LinkPlan::Accept]);
    f.client.connect("ROOM-1", None).await;
    f.client.connect("ROOM-9", None).await;

    assert_eq!(f.transport.attempts(), 1);
    assert_eq!(f.tokens.minted(), 1);
    assert_eq!(f.client.status().await.subscriptions[0], Topics::attendance("ROOM-1"));
}

// ================================= RECONNECT ===================================== //

#[tokio::test(start_paused = true)]
async fn test_refused_connect_retries_with_fresh_token() {
    let f = fixture(&[LinkPlan::Refuse, LinkPlan::Accept]);
    f.client.connect("ROOM-1", None).await;

    let status = f.client.status().await;
    assert!(status.active);
    assert!(!status.connected);
    assert_eq!(status.attempt, 1);
    assert!(status.subscriptions.is_empty());
    assert!(f.client.reconnect_pending().await);

    advance(2001).await;

    let status = f.client.status().await;
    assert!(status.connected);
    assert_eq!(status.attempt, 0);
    assert_eq!(f.tokens.minted(), 2);
    assert_eq!(f.transport.last_link().token, "token-1");
    assert!(!f.client.reconnect_pending().await);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_handshake_closes_link_and_retries() {
    let f = fixture(&[LinkPlan::Reject, LinkPlan::Accept]);
    f.client.connect("ROOM-1", None).await;

    let rejected = f.transport.last_link();
    assert!(rejected.is_closed());
    assert_eq!(rejected.sent_commands(), vec![Command::Connect]);
    assert!(!f.client.status().await.connected);

    advance(2001).await;
    assert!(f.client.status().await.connected);
    assert_eq!(f.transport.links().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_token_failure_schedules_reconnect() {
    let f = fixture_with(&[LinkPlan::Accept], 1);
    f.client.connect("ROOM-1", None).await;

    assert_eq!(f.transport.attempts(), 0);
    assert!(f.client.reconnect_pending().await);

    advance(2001).await;
    assert!(f.client.status().await.connected);
    assert_eq!(f.transport.last_link().token, "token-1");
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_between_attempts() {
    let f = fixture(&[
        LinkPlan::Refuse,
        LinkPlan::Refuse,
        LinkPlan::Refuse,
        LinkPlan::Accept,
    ]);
    f.client.connect("ROOM-1", None).await;
    assert_eq!(f.transport.attempts(), 1);

    advance(1999).await;
    assert_eq!(f.transport.attempts(), 1);
    advance(2).await;
    assert_eq!(f.transport.attempts(), 2);
    assert_eq!(f.client.status().await.attempt, 2);

    advance(3998).await;
    assert_eq!(f.transport.attempts(), 2);
    advance(2).await;
    assert_eq!(f.transport.attempts(), 3);

    advance(8001).await;
    assert_eq!(f.transport.attempts(), 4);
    let status = f.client.status().await;
    assert!(status.connected);
    assert_eq!(status.attempt, 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_connection_resubscribes() {
    let f = fixture(&[LinkPlan::Accept, LinkPlan::Accept]);
    f.client.connect("ROOM-1", Some("ROOM-2")).await;
    let first = f.transport.last_link();

    first.drop_connection();
    advance(1).await;

    let status = f.client.status().await;
    assert!(status.active);
    assert!(!status.connected);
    assert!(status.subscriptions.is_empty());
    assert!(first.is_closed());

    advance(2000).await;

    let second = f.transport.last_link();
    assert_eq!(f.transport.links().len(), 2);
    assert_eq!(second.subscriptions(), room_topics());
    assert_eq!(second.token, "token-1");
    assert!(f.client.status().await.connected);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_frame_drops_the_session() {
    let f = fixture(&[LinkPlan::Accept, LinkPlan::Accept]);
    f.client.connect("ROOM-1", None).await;

    f.transport
        .last_link()
        .push(Frame::new(Command::Error).with_header("message", "token expired"));
    advance(1).await;
    assert!(!f.client.status().await.connected);
    assert!(f.client.reconnect_pending().await);

    advance(2000).await;
    assert!(f.client.status().await.connected);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_restarts_after_a_successful_connect() {
    let f = fixture(&[
        LinkPlan::Refuse,
        LinkPlan::Refuse,
        LinkPlan::Accept,
        LinkPlan::Accept,
    ]);
    f.client.connect("ROOM-1", None).await;
    advance(2001).await;
    advance(4001).await;
    assert!(f.client.status().await.connected);

    f.transport.last_link().drop_connection();
    advance(2001).await;

    assert_eq!(f.transport.attempts(), 4);
    assert!(f.client.status().await.connected);
}

// ================================ DISCONNECT ===================================== //

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_reconnect() {
    let f = fixture(&[LinkPlan::Refuse, LinkPlan::Accept]);
    f.client.connect("ROOM-1", None).await;
    assert!(f.client.reconnect_pending().await);

    f.client.disconnect().await;
    assert!(!f.client.reconnect_pending().await);

    advance(60_000).await;
    assert_eq!(f.transport.attempts(), 1);

    let status = f.client.status().await;
    assert!(!status.active);
    assert!(!status.connected);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_closes_the_link() {
    let f = fixture(&[LinkPlan::Accept]);
    f.client.connect("ROOM-1", None).await;
    let link = f.transport.last_link();

    f.client.disconnect().await;

    assert!(link.is_closed());
    assert_eq!(link.sent_commands().last(), Some(&Command::Disconnect));
    assert!(f.client.status().await.subscriptions.is_empty());

    advance(60_000).await;
    assert_eq!(f.transport.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_after_disconnect_starts_over() {
    let f = fixture(&[LinkPlan::Accept, LinkPlan::Accept]);
    f.client.connect("ROOM-1", None).await;
    f.client.disconnect().await;

    f.client.connect("ROOM-3", None).await;
    let status = f.client.status().await;
    assert!(status.connected);
    assert_eq!(status.subscriptions[0], Topics::attendance("ROOM-3"));
    assert_eq!(f.transport.links().len(), 2);
}

// ================================= MESSAGES ====================================== //

#[tokio::test(start_paused = true)]
async fn test_heartbeat_requires_a_connection() {
    let f = fixture(&[LinkPlan::Accept]);
    assert!(!f.client.heartbeat().await);

    f.client.connect("ROOM-1", None).await;
    assert!(f.client.heartbeat().await);
    advance(1).await;

    let ping = f.transport.last_link().sent().pop().unwrap();
    assert_eq!(ping.command, Command::Send);
    assert_eq!(ping.header("destination"), Some(Topics::PING));
    let body: Value = serde_json::from_str(&ping.body).unwrap();
    assert_eq!(body["type"], "ping");
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_skipped_while_reconnecting() {
    let f = fixture(&[LinkPlan::Refuse]);
    f.client.connect("ROOM-1", None).await;
    assert!(!f.client.heartbeat().await);
}

#[tokio::test(start_paused = true)]
async fn test_attendance_messages_reach_the_sink() {
    let f = fixture(&[LinkPlan::Accept]);
    f.client.connect("ROOM-1", Some("ROOM-2")).await;
    let link = f.transport.last_link();

    link.push(
        Frame::new(Command::Message)
            .with_header("destination", Topics::attendance("ROOM-2"))
            .with_body(r#"{"present":12}"#),
    );
    link.push(
        Frame::new(Command::Message)
            .with_header("destination", Topics::PUBLIC)
            .with_body("notice"),
    );
    link.push(
        Frame::new(Command::Message)
            .with_header("destination", Topics::attendance("ROOM-1"))
            .with_body("plain text"),
    );
    advance(1).await;

    assert_eq!(
        f.sink.records(),
        vec![
            ("ROOM-2".to_string(), json!({"present": 12})),
            ("ROOM-1".to_string(), json!("plain text")),
        ]
    );
    assert!(f.client.status().await.connected);
}
