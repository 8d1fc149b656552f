use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures_util::{stream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use support_chat::conversation::{DEFAULT_GREETING, ERROR_REPLY};
use support_chat::handler::handle_event;
use support_chat::tui::AppEvent;
use support_chat::{App, ChatClient, ChatError, Message, SendState};

/// Requests seen by the test server
#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    content_types: Arc<Mutex<Vec<String>>>,
}

impl Captured {
    fn record(&self, headers: &HeaderMap, body: Value) {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.content_types.lock().unwrap().push(content_type);
        self.bodies.lock().unwrap().push(body);
    }

    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/chat")
}

/// Body that yields each item after a short pause, so chunks travel separately.
fn paced_body(items: Vec<Result<&'static [u8], std::io::Error>>) -> Body {
    let paced = stream::iter(items).then(|item| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        item
    });
    Body::from_stream(paced)
}

fn ok(bytes: &'static [u8]) -> Result<&'static [u8], std::io::Error> {
    Ok(bytes)
}

fn app_for(endpoint: &str) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = App::new(ChatClient::new(endpoint), DEFAULT_GREETING, tx);
    (app, rx)
}

/// Feed worker events into the app until the send settles.
async fn drive(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
    while app.is_sending() {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for reply events")
            .expect("event channel closed");
        handle_event(app, event);
    }
}

fn type_and_send(app: &mut App, text: &str) {
    app.input = text.to_string();
    app.cursor = text.chars().count();
    app.send_message();
}

#[tokio::test]
async fn test_streamed_reply_fills_placeholder() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/api/chat",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    captured.record(&headers, body);
                    Response::new(paced_body(vec![ok(b"Hi"), ok(b" there")]))
                },
            ),
        )
        .with_state(captured.clone());
    let endpoint = spawn_server(router).await;
    let (mut app, mut rx) = app_for(&endpoint);

    type_and_send(&mut app, "Hello");

    assert_eq!(
        app.conversation.messages(),
        &[
            Message::assistant(DEFAULT_GREETING),
            Message::user("Hello"),
            Message::assistant(""),
        ]
    );
    assert!(app.input.is_empty());
    assert_eq!(app.state, SendState::Sending);

    drive(&mut app, &mut rx).await;

    assert_eq!(app.conversation.len(), 3);
    assert_eq!(app.conversation.last(), Some(&Message::assistant("Hi there")));
    assert_eq!(app.state, SendState::Idle);

    assert_eq!(
        captured.bodies(),
        vec![json!([
            { "role": "assistant", "content": DEFAULT_GREETING },
            { "role": "user", "content": "Hello" },
        ])]
    );
    let content_types = captured.content_types.lock().unwrap().clone();
    assert!(content_types[0].starts_with("application/json"));
}

#[tokio::test]
async fn test_error_status_appends_error_reply() {
    let router = Router::new().route(
        "/api/chat",
        post(|| async {
            (StatusCode::INTERNAL_SERVER_ERROR, "this body must not be shown").into_response()
        }),
    );
    let endpoint = spawn_server(router).await;
    let (mut app, mut rx) = app_for(&endpoint);

    type_and_send(&mut app, "Hello");
    drive(&mut app, &mut rx).await;

    assert_eq!(
        app.conversation.messages(),
        &[
            Message::assistant(DEFAULT_GREETING),
            Message::user("Hello"),
            Message::assistant(""),
            Message::assistant(ERROR_REPLY),
        ]
    );
    assert_eq!(app.state, SendState::Idle);
}

#[tokio::test]
async fn test_broken_stream_keeps_partial_reply() {
    let router = Router::new().route(
        "/api/chat",
        post(|| async {
            Response::new(paced_body(vec![
                ok(b"Partial"),
                Err(std::io::Error::other("model crashed")),
            ]))
        }),
    );
    let endpoint = spawn_server(router).await;
    let (mut app, mut rx) = app_for(&endpoint);

    type_and_send(&mut app, "Hello");
    drive(&mut app, &mut rx).await;

    let messages = app.conversation.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2], Message::assistant("Partial"));
    assert_eq!(messages[3], Message::assistant(ERROR_REPLY));
    assert_eq!(app.state, SendState::Idle);
}

#[tokio::test]
async fn test_character_split_across_chunks() {
    // "é" is C3 A9, sent in two separate chunks
    let router = Router::new().route(
        "/api/chat",
        post(|| async {
            Response::new(paced_body(vec![ok(b"caf"), ok(&[0xC3]), ok(&[0xA9, b'!'])]))
        }),
    );
    let endpoint = spawn_server(router).await;
    let (mut app, mut rx) = app_for(&endpoint);

    type_and_send(&mut app, "Order?");
    drive(&mut app, &mut rx).await;

    assert_eq!(app.conversation.last(), Some(&Message::assistant("café!")));
}

#[tokio::test]
async fn test_second_send_while_streaming_issues_no_request() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/api/chat",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    captured.record(&headers, body);
                    Response::new(paced_body(vec![ok(b"one"), ok(b" two"), ok(b" three")]))
                },
            ),
        )
        .with_state(captured.clone());
    let endpoint = spawn_server(router).await;
    let (mut app, mut rx) = app_for(&endpoint);

    type_and_send(&mut app, "first");
    type_and_send(&mut app, "second");

    assert_eq!(app.conversation.len(), 3);
    drive(&mut app, &mut rx).await;

    assert_eq!(captured.bodies().len(), 1);
    assert_eq!(app.conversation.last(), Some(&Message::assistant("one two three")));
}

#[tokio::test]
async fn test_follow_up_carries_full_history() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/api/chat",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    captured.record(&headers, body);
                    Response::new(paced_body(vec![ok(b"ok")]))
                },
            ),
        )
        .with_state(captured.clone());
    let endpoint = spawn_server(router).await;
    let (mut app, mut rx) = app_for(&endpoint);

    type_and_send(&mut app, "Hello");
    drive(&mut app, &mut rx).await;
    type_and_send(&mut app, "Thanks");
    drive(&mut app, &mut rx).await;

    let bodies = captured.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(
        bodies[1],
        json!([
            { "role": "assistant", "content": DEFAULT_GREETING },
            { "role": "user", "content": "Hello" },
            { "role": "assistant", "content": "ok" },
            { "role": "user", "content": "Thanks" },
        ])
    );
}

#[tokio::test]
async fn test_reply_stream_reports_status() {
    // No route for /api/chat, so the server answers 404
    let endpoint = spawn_server(Router::new()).await;
    let client = ChatClient::new(&endpoint);

    let result = client.send(&[Message::user("Hello")]).await;

    match result {
        Err(ChatError::Status(status)) => assert_eq!(status.as_u16(), 404),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a status error"),
    }
}

#[tokio::test]
async fn test_reply_stream_yields_chunks_then_none() {
    let router = Router::new().route(
        "/api/chat",
        post(|| async { Response::new(paced_body(vec![ok(b"a"), ok(b"b"), ok(b"c")])) }),
    );
    let endpoint = spawn_server(router).await;
    let client = ChatClient::new(&endpoint);

    let mut reply = client.send(&[Message::user("Hello")]).await.unwrap();
    let mut text = String::new();
    while let Some(chunk) = reply.next_chunk().await.unwrap() {
        assert!(!chunk.is_empty());
        text.push_str(&chunk);
    }

    assert_eq!(text, "abc");
    assert!(reply.next_chunk().await.unwrap().is_none());
}
