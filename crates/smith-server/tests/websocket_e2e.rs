//! End-to-end test of the handshake -> register -> task round trip over a
//! real TCP socket, driven by a real WebSocket client.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use smith_tools::builtins::browser::BrowserSingleton;
use smith_tools::{register_all, AgentConfig, CategoryEnables};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_server(auth_token: &str) -> SocketAddr {
    let config = Arc::new(AgentConfig {
        name: "smith-e2e".into(),
        port: 0,
        auth_token: auth_token.to_string(),
        sandbox_dir: std::env::temp_dir(),
        readonly_mode: false,
        allowed_shell_commands: vec![],
        categories: CategoryEnables::default(),
        timeout_ms: 5_000,
        max_concurrent_tasks: 4,
        idle_timeout_ms: None,
        tls_cert: None,
        tls_key: None,
        log_level: "info".into(),
    });
    let registry = register_all(Arc::new(BrowserSingleton::with_null_driver()));
    let enabled = Arc::new(registry.build(&config.categories));
    let state = smith_server::ServerState::new(config, enabled, Arc::new(BrowserSingleton::with_null_driver()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let make_service = smith_server::build_router(state)
        .into_make_service_with_connect_info::<SocketAddr>();

    tokio::spawn(async move {
        axum::serve(listener, make_service).await.unwrap();
    });

    addr
}

fn client_request(addr: SocketAddr, auth_token: &str) -> tokio_tungstenite::tungstenite::http::Request<()> {
    let mut request = format!("ws://{addr}/").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("x-smith-auth", auth_token.parse().unwrap());
    request
        .headers_mut()
        .insert("x-smith-protocol-version", "1".parse().unwrap());
    request
}

#[tokio::test]
async fn handshake_register_and_task_round_trip() {
    let addr = spawn_server("e2e-token").await;
    let (mut ws, _response) = tokio_tungstenite::connect_async(client_request(addr, "e2e-token"))
        .await
        .expect("handshake should succeed with the correct token");

    let first = ws.next().await.unwrap().unwrap();
    let register: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(register["type"], "register");
    assert_eq!(register["name"], "smith-e2e");
    assert!(register["capabilities"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c == "list_processes"));

    let task = json!({
        "type": "task",
        "id": "t1",
        "payload": { "tool": "list_processes", "args": {} },
    });
    ws.send(Message::Text(task.to_string().into())).await.unwrap();

    loop {
        let frame = ws.next().await.unwrap().unwrap();
        let parsed: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        if parsed["type"] == "task_result" {
            assert_eq!(parsed["id"], "t1");
            assert_eq!(parsed["result"]["success"], true);
            break;
        }
    }

    ws.close(None).await.ok();
}

#[tokio::test]
async fn wrong_token_is_refused_before_upgrade() {
    let addr = spawn_server("real-token").await;
    let err = tokio_tungstenite::connect_async(client_request(addr, "wrong-token"))
        .await
        .expect_err("handshake with a bad token must not upgrade");
    assert!(matches!(
        err,
        tokio_tungstenite::tungstenite::Error::Http(_)
    ));
}

/// Regression test for a shutdown deadlock: `serve()` must ask every open
/// connection to close as part of its graceful-shutdown future, not after
/// awaiting it — `axum::serve(...).with_graceful_shutdown(...)` does not
/// resolve until every tracked connection (including each upgraded
/// websocket) finishes on its own, so a client that is still connected when
/// shutdown is requested would otherwise hang `serve()` forever.
#[tokio::test]
async fn serve_closes_open_connections_and_returns_on_shutdown() {
    let config = Arc::new(AgentConfig {
        name: "smith-shutdown-test".into(),
        port: 0,
        auth_token: "shutdown-token".into(),
        sandbox_dir: std::env::temp_dir(),
        readonly_mode: false,
        allowed_shell_commands: vec![],
        categories: CategoryEnables::default(),
        timeout_ms: 5_000,
        max_concurrent_tasks: 4,
        idle_timeout_ms: None,
        tls_cert: None,
        tls_key: None,
        log_level: "info".into(),
    });
    let registry = register_all(Arc::new(BrowserSingleton::with_null_driver()));
    let enabled = Arc::new(registry.build(&config.categories));
    let state = smith_server::ServerState::new(config, enabled, Arc::new(BrowserSingleton::with_null_driver()));

    // Briefly bind an ephemeral port to learn a free address, then release
    // it so `serve()` (which does its own binding) can take it.
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let serve_task = tokio::spawn(async move {
        smith_server::serve(state, addr, async move {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    // Wait for the listener to come up before connecting.
    let mut ws = loop {
        match tokio_tungstenite::connect_async(client_request(addr, "shutdown-token")).await {
            Ok((ws, _response)) => break ws,
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
        }
    };
    let _register = ws.next().await.unwrap().unwrap();

    // Leave the connection open (no close()) and trigger shutdown; `serve()`
    // must still resolve promptly rather than waiting forever on this
    // still-open socket.
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(2), serve_task)
        .await
        .expect("serve() must not deadlock while a client is still connected")
        .unwrap();

    let close_or_eof = tokio::time::timeout(std::time::Duration::from_secs(2), ws.next())
        .await
        .expect("client should observe the connection close promptly");
    match close_or_eof {
        Some(Ok(Message::Close(_))) | None => {}
        other => panic!("expected a close frame or stream end, got {other:?}"),
    }
}
