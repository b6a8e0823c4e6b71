use axum::{ http::StatusCode, routing::post, Json, Router };
use serde_json::{ json, Value };
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use studentlytics_assistant::assistant::{ AssistantClient, AssistantError, RemoteAssistant };
use studentlytics_assistant::conversation::{ ChatSession, SubmitOutcome };
use studentlytics_assistant::models::chat::Role;

async fn lambda_reply(Json(body): Json<Value>) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default();
    let inner = json!({ "response": format!("You asked: {}", message), "timestamp": "2024-01-01T00:00:00" });
    Json(json!({ "statusCode": 200, "body": inner.to_string() }))
}

async fn server_error() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

async fn not_json() -> &'static str {
    "<html>gateway page</html>"
}

async fn unknown_shape() -> Json<Value> {
    Json(json!({ "result": 42 }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "response": "too late" }))
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/chat", post(lambda_reply))
        .route("/broken", post(server_error))
        .route("/html", post(not_json))
        .route("/unknown", post(unknown_shape))
        .route("/slow", post(slow));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, path: &str, timeout: Duration) -> RemoteAssistant {
    RemoteAssistant::new(&format!("http://{}{}", addr, path), timeout).unwrap()
}

#[tokio::test]
async fn decodes_lambda_proxy_envelope() {
    let addr = spawn_backend().await;
    let assistant = client(addr, "/chat", Duration::from_secs(5));
    assert_eq!(assistant.ask("How is attendance tracked?").await.unwrap(), "You asked: How is attendance tracked?");
}

#[tokio::test]
async fn unknown_shape_is_shown_as_raw_json() {
    let addr = spawn_backend().await;
    let assistant = client(addr, "/unknown", Duration::from_secs(5));
    assert_eq!(assistant.ask("hi").await.unwrap(), r#"{"result":42}"#);
}

#[tokio::test]
async fn server_error_reaches_history_as_diagnostic() {
    let addr = spawn_backend().await;
    let assistant: Arc<dyn AssistantClient> = Arc::new(client(addr, "/broken", Duration::from_secs(5)));
    let session = ChatSession::new(assistant);

    let outcome = session.submit("hello?").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));

    let history = session.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history[2].role, Role::Assistant);
    assert!(history[2].content.contains("HTTP error! status: 500"));
    assert!(history[2].content.contains("/broken"));
}

#[tokio::test]
async fn invalid_json_is_a_parse_error_with_snippet() {
    let addr = spawn_backend().await;
    let assistant = client(addr, "/html", Duration::from_secs(5));
    match assistant.ask("hi").await {
        Err(AssistantError::Parse { snippet, .. }) => assert!(snippet.contains("<html>")),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_backend_times_out() {
    let addr = spawn_backend().await;
    let assistant: Arc<dyn AssistantClient> = Arc::new(client(addr, "/slow", Duration::from_secs(1)));

    let err = assistant.ask("anyone?").await.unwrap_err();
    assert!(matches!(err, AssistantError::Timeout(_)));

    let session = ChatSession::new(assistant);
    match session.submit("anyone?").await.unwrap() {
        SubmitOutcome::Failed(msg) => assert!(msg.content.contains("timed out")),
        other => panic!("expected a diagnostic, got {:?}", other),
    }
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let assistant = client(addr, "/chat", Duration::from_secs(2));
    assert!(matches!(assistant.ask("hi").await, Err(AssistantError::Transport(_))));
}
