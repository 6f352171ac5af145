//! Router construction and the accept/serve/shutdown lifecycle (spec.md
//! §4.6 "Shutdown", §4.8 runtime glue). TLS wrapping when both
//! `tls_cert`/`tls_key` are configured is left to the `smith` binary, which
//! owns certificate loading; this module serves plain or behind whatever
//! listener it is handed.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::check_handshake;
use crate::connection::handle_socket;
use crate::idle::{spawn_browser_reaper, spawn_idle_sweeper};
use crate::state::{CloseReason, ServerState};

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) = check_handshake(&headers, &state.config.auth_token) {
        tracing::warn!(remote_addr = %addr, error = %e, "handshake rejected");
        return (StatusCode::UNAUTHORIZED, "").into_response();
    }

    let remote_addr = addr.to_string();
    ws.on_upgrade(move |socket| handle_socket(socket, state, remote_addr))
}

/// Binds, serves, and blocks until `shutdown` resolves. As soon as `shutdown`
/// resolves, every open connection is sent a "going away" frame from inside
/// the graceful-shutdown future itself (axum's outer await would otherwise
/// never return, since it waits for those same connections to finish); once
/// the listener future completes, the idle sweeper and browser reaper are
/// cancelled. Teardown is idempotent: calling it twice (e.g. ctrl_c racing
/// SIGTERM) is harmless since both just await the same listener future.
pub async fn serve(
    state: ServerState,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let idle_handle = state
        .config
        .idle_timeout_ms
        .map(|ms| spawn_idle_sweeper(state.clone(), ms));
    let browser_reaper_handle = spawn_browser_reaper(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "smith protocol server listening");

    let router = build_router(state.clone())
        .into_make_service_with_connect_info::<SocketAddr>();

    let shutdown_state = state.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            shutdown_state.shutting_down.store(true, Ordering::SeqCst);
            // Ask every open connection to close here, not after this future
            // resolves: `with_graceful_shutdown`'s outer await does not return
            // until hyper/axum considers every connection (including each
            // upgraded websocket) finished, so waiting for it first would
            // deadlock shutdown on any client that is still connected.
            close_all_connections(&shutdown_state).await;
        })
        .await?;

    if let Some(handle) = idle_handle {
        handle.abort();
    }
    browser_reaper_handle.abort();

    Ok(())
}

async fn close_all_connections(state: &ServerState) {
    let handles: Vec<_> = state.connections.lock().unwrap().values().cloned().collect();
    for handle in handles {
        let _ = handle.close_tx.send(CloseReason::GoingAway).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smith_tools::builtins::browser::BrowserSingleton;
    use smith_tools::{AgentConfig, CategoryEnables};
    use std::sync::Arc;

    fn sample_config(port: u16) -> AgentConfig {
        AgentConfig {
            name: "smith-test".into(),
            port,
            auth_token: "secret".into(),
            sandbox_dir: std::env::temp_dir(),
            readonly_mode: false,
            allowed_shell_commands: vec![],
            categories: CategoryEnables::default(),
            timeout_ms: 5_000,
            max_concurrent_tasks: 2,
            idle_timeout_ms: None,
            tls_cert: None,
            tls_key: None,
            log_level: "info".into(),
        }
    }

    #[test]
    fn router_builds_without_panicking() {
        let config = Arc::new(sample_config(0));
        let registry = smith_tools::register_all(Arc::new(BrowserSingleton::with_null_driver()));
        let enabled = Arc::new(registry.build(&config.categories));
        let state = ServerState::new(config, enabled, Arc::new(BrowserSingleton::with_null_driver()));
        let _router = build_router(state);
    }
}
