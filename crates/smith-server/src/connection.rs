//! Per-connection message loop (spec.md §4.6): split sender/receiver,
//! an outbound mpsc channel drained by a dedicated send task, and a
//! `tokio::select!` receive loop — the shape the teacher's own
//! `ui::connection::handle_websocket_connection` uses.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use smith_tools::executor::Executor;

use crate::messages::{ConfigSnapshot, Inbound, Outbound, TaskProgress, PROTOCOL_VERSION};
use crate::state::{CloseReason, ConnectionHandle, ServerState};

pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

pub async fn handle_socket(socket: WebSocket, state: ServerState, remote_addr: String) {
    let conn_id = Uuid::new_v4().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(64);
    let (close_tx, mut close_rx) = mpsc::channel::<CloseReason>(1);

    let handle = Arc::new(ConnectionHandle {
        remote_addr: remote_addr.clone(),
        last_activity: std::sync::Mutex::new(Instant::now()),
        close_tx,
    });
    state.register_connection(conn_id.clone(), handle.clone());

    send_frame(
        &out_tx,
        &Outbound::Register {
            name: state.config.name.clone(),
            capabilities: state.enabled.names(),
            protocol_version: PROTOCOL_VERSION,
        },
    )
    .await;

    let send_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            reason = close_rx.recv() => {
                let reason = reason.unwrap_or(CloseReason::GoingAway);
                let _ = out_tx
                    .send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: match reason {
                            CloseReason::GoingAway => "going away".into(),
                            CloseReason::Idle => "idle timeout".into(),
                        },
                    })))
                    .await;
                break;
            }
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_FRAME_BYTES {
                            tracing::warn!(conn_id, bytes = text.len(), "dropping oversized inbound frame");
                            continue;
                        }
                        handle.touch();
                        dispatch(&text, &state, &conn_id, &remote_addr, &out_tx).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(conn_id, error = %e, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }

    send_task.abort();
    state.remove_connection(&conn_id);
}

async fn dispatch(
    text: &str,
    state: &ServerState,
    conn_id: &str,
    remote_addr: &str,
    out_tx: &mpsc::Sender<Message>,
) {
    let inbound: Inbound = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(conn_id, error = %e, "unparseable or unrecognized frame type");
            return;
        }
    };

    match inbound {
        Inbound::Task { id, payload } => {
            // Spawned rather than awaited inline: a long-running task must not
            // block the next `ping`/`config_query` on this same connection.
            let state = state.clone();
            let conn_id = conn_id.to_string();
            let remote_addr = remote_addr.to_string();
            let out_tx = out_tx.clone();
            tokio::spawn(async move {
                handle_task(id, payload, &state, &conn_id, &remote_addr, &out_tx).await;
            });
        }
        Inbound::Ping { .. } => {
            let stats = state.stats.lock().await.sample().await;
            send_frame(out_tx, &Outbound::Pong { stats }).await;
        }
        Inbound::ConfigQuery => {
            send_frame(
                out_tx,
                &Outbound::ConfigReport {
                    devkit: ConfigSnapshot {
                        sandbox_dir: state.config.sandbox_dir.display().to_string(),
                        readonly_mode: state.config.readonly_mode,
                        enabled_categories: state.enabled_category_names(),
                    },
                },
            )
            .await;
        }
    }
}

async fn handle_task(
    id: String,
    payload: crate::messages::TaskPayload,
    state: &ServerState,
    conn_id: &str,
    remote_addr: &str,
    out_tx: &mpsc::Sender<Message>,
) {
    if !state.try_begin_task() {
        tracing::info!(conn_id, id, tool = %payload.tool, remote_addr, "task rejected: busy");
        send_frame(
            out_tx,
            &Outbound::TaskResult {
                id,
                result: smith_tools::ToolResult::fail("agent is busy: max_concurrent_tasks reached", 0),
            },
        )
        .await;
        return;
    }

    tracing::info!(conn_id, id, tool = %payload.tool, remote_addr, "task started");

    send_frame(
        out_tx,
        &Outbound::TaskProgress {
            id: id.clone(),
            progress: TaskProgress { message: "running".to_string(), percent: 0 },
        },
    )
    .await;

    let executor = Executor::new(&state.enabled, &state.tool_ctx);
    let result = executor.execute(&payload.tool, payload.args).await;

    tracing::info!(
        conn_id,
        id,
        tool = %payload.tool,
        remote_addr,
        success = result.success,
        duration_ms = result.duration_ms,
        "task finished"
    );

    send_frame(out_tx, &Outbound::TaskResult { id, result }).await;
    state.end_task();
}

async fn send_frame(tx: &mpsc::Sender<Message>, frame: &Outbound) {
    match serde_json::to_string(frame) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text.into())).await;
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize outbound frame"),
    }
}

