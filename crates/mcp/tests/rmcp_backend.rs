//! The rmcp-backed clients against real peers: a scripted stdio server and a
//! local SSE server.

mod support;

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use mcp_client_manager::{ClientsManager, ManagerOptions, NotificationKind, RmcpClient};
use serde_json::{Value, json};
use support::{Recorder, eventually};
use tokio::sync::{mpsc, oneshot};

fn quiet() -> ManagerOptions {
    ManagerOptions::default().with_logging(false)
}

/// Answers initialize, waits for `initialized`, announces a tool list change, then exits.
#[cfg(unix)]
const SCRIPTED_SERVER: &str = r#"
read -r request
id=$(printf '%s\n' "$request" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2025-03-26","capabilities":{},"serverInfo":{"name":"scripted","version":"0.1.0"}}}\n' "$id"
read -r initialized
printf '{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}\n'
"#;

struct Handlers {
    tools: Recorder,
    errors: Recorder,
    closes: Recorder,
}

fn watch(manager: &ClientsManager) -> Handlers {
    let handlers = Handlers {
        tools: Recorder::new(),
        errors: Recorder::new(),
        closes: Recorder::new(),
    };
    manager.set_notification_handler(NotificationKind::ToolListChanged, handlers.tools.handler());
    manager.set_error_handler(handlers.errors.handler());
    manager.set_transport_close_handler(handlers.closes.handler());
    handlers
}

fn rmcp_client<'a>(manager: &'a ClientsManager, name: &str) -> &'a RmcpClient {
    manager
        .connection(name)
        .and_then(|connection| connection.client_as::<RmcpClient>())
        .expect("rmcp client")
}

#[cfg(unix)]
#[tokio::test]
async fn stdio_server_exit_reaches_close_and_error_handlers() {
    let mut manager = ClientsManager::new(
        json!({
            "mcpServers": {
                "scripted": {"transport": "stdio", "command": "sh", "args": ["-c", SCRIPTED_SERVER]}
            }
        }),
        quiet(),
    )
    .expect("build manager");
    let handlers = watch(&manager);

    manager.connect().await.expect("handshake succeeds");
    let info = rmcp_client(&manager, "scripted").peer_info().expect("initialize result");
    assert_eq!(info.server_info.name, "scripted");

    assert!(eventually(|| handlers.tools.count() == 1 && handlers.closes.count() == 1).await);
    assert_eq!(handlers.tools.servers(), ["scripted"]);
    assert_eq!(handlers.closes.servers(), ["scripted"]);
    assert_eq!(handlers.errors.servers(), ["scripted"]);
    assert!(handlers.errors.payloads()[0].contains("Disconnected"));
    assert!(!rmcp_client(&manager, "scripted").is_connected());

    manager.disconnect().await;
    assert_eq!(handlers.closes.count(), 1);
}

/// Minimal push-stream MCP server: one event stream, one POST endpoint.
struct PushServer {
    outbox: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    released: Mutex<Option<oneshot::Sender<()>>>,
    hang_up_after_init: bool,
}

fn message_event(message: Value) -> Event {
    Event::default().event("message").data(message.to_string())
}

async fn open_stream(State(server): State<Arc<PushServer>>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = tx.send(Event::default().event("endpoint").data("/messages"));
    *server.outbox.lock().unwrap() = Some(tx);
    // Dropped together with the response body once the client goes away.
    let released = server.released.lock().unwrap().take();
    let events = stream::unfold((rx, released), |(mut rx, released)| async move {
        rx.recv().await.map(|event| (Ok(event), (rx, released)))
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_millis(50)))
}

async fn accept_message(State(server): State<Arc<PushServer>>, Json(message): Json<Value>) -> StatusCode {
    let Some(outbox) = server.outbox.lock().unwrap().clone() else {
        return StatusCode::GONE;
    };
    match message.get("method").and_then(Value::as_str) {
        Some("initialize") => {
            let _ = outbox.send(message_event(json!({
                "jsonrpc": "2.0",
                "id": message["id"],
                "result": {
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "serverInfo": {"name": "push", "version": "0.1.0"}
                }
            })));
        }
        Some("notifications/initialized") => {
            let _ = outbox.send(message_event(json!({
                "jsonrpc": "2.0",
                "method": "notifications/tools/list_changed"
            })));
            if server.hang_up_after_init {
                server.outbox.lock().unwrap().take();
            }
        }
        _ => {}
    }
    StatusCode::ACCEPTED
}

/// Start a push server; the receiver resolves once its event stream is released.
async fn spawn_push_server(hang_up_after_init: bool) -> (String, oneshot::Receiver<()>) {
    let (released_tx, released_rx) = oneshot::channel();
    let state = Arc::new(PushServer {
        outbox: Mutex::new(None),
        released: Mutex::new(Some(released_tx)),
        hang_up_after_init,
    });
    let app = Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(accept_message))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/sse"), released_rx)
}

#[tokio::test]
async fn sse_messages_are_forwarded_and_stream_end_is_reported() {
    let (url, _released) = spawn_push_server(true).await;
    let mut manager =
        ClientsManager::new(json!({"mcpServers": {"feed": {"transport": "sse", "url": url}}}), quiet()).unwrap();
    let handlers = watch(&manager);

    manager.connect().await.expect("handshake succeeds");
    let info = rmcp_client(&manager, "feed").peer_info().expect("initialize result");
    assert_eq!(info.server_info.name, "push");

    assert!(eventually(|| handlers.tools.count() == 1 && handlers.closes.count() == 1).await);
    assert_eq!(handlers.tools.servers(), ["feed"]);
    assert!(handlers.errors.payloads().iter().any(|payload| payload.contains("Disconnected")));

    manager.disconnect().await;
    assert_eq!(handlers.closes.count(), 1);
}

#[tokio::test]
async fn disconnect_releases_an_idle_event_stream() {
    let (url, released) = spawn_push_server(false).await;
    let mut manager =
        ClientsManager::new(json!({"mcpServers": {"feed": {"transport": "sse", "url": url}}}), quiet()).unwrap();
    let handlers = watch(&manager);

    manager.connect().await.expect("handshake succeeds");
    assert!(rmcp_client(&manager, "feed").is_connected());
    assert!(eventually(|| handlers.tools.count() == 1).await);

    manager.disconnect().await;
    assert!(
        tokio::time::timeout(Duration::from_secs(5), released).await.is_ok(),
        "event stream still held after disconnect"
    );
    assert_eq!(handlers.closes.count(), 1);
    assert!(handlers.errors.payloads().is_empty());
}
