//! Idle sweeper (spec.md §4.6): one periodic task, not one timer per
//! connection (spec.md §9 "Heartbeat and idle sweep timers").

use std::time::Duration;

use crate::state::{CloseReason, ServerState};

/// Spawns the sweeper; the returned handle is aborted on shutdown.
pub fn spawn_idle_sweeper(state: ServerState, idle_timeout_ms: u64) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_millis(idle_timeout_ms.min(60_000));
    let threshold = Duration::from_millis(idle_timeout_ms);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let expired: Vec<_> = {
                let connections = state.connections.lock().unwrap();
                connections
                    .iter()
                    .filter(|(_, handle)| handle.idle_for() >= threshold)
                    .map(|(id, handle)| (id.clone(), handle.clone()))
                    .collect()
            };
            for (id, handle) in expired {
                tracing::info!(conn_id = %id, "closing idle connection");
                let _ = handle.close_tx.send(CloseReason::Idle).await;
            }
        }
    })
}

/// Polls the shared browser singleton and closes it once it has sat idle
/// past its own `BROWSER_IDLE_TIMEOUT`; one task for the whole server,
/// mirroring [`spawn_idle_sweeper`] rather than tying browser eviction to
/// any single connection's lifetime. The returned handle is aborted on
/// shutdown.
pub fn spawn_browser_reaper(state: ServerState) -> tokio::task::JoinHandle<()> {
    const SWEEP_PERIOD: Duration = Duration::from_secs(30);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_PERIOD);
        loop {
            interval.tick().await;
            if state.browser.reap_if_idle().await {
                tracing::info!("closed idle browser session");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionHandle;
    use std::sync::Mutex;
    use std::time::Instant;
    use tokio::sync::mpsc;

    #[test]
    fn idle_for_reflects_elapsed_time() {
        let (close_tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle {
            remote_addr: "127.0.0.1:1".into(),
            last_activity: Mutex::new(Instant::now() - Duration::from_secs(10)),
            close_tx,
        };
        assert!(handle.idle_for() >= Duration::from_secs(10));
    }

    #[test]
    fn touch_resets_idle_clock() {
        let (close_tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle {
            remote_addr: "127.0.0.1:1".into(),
            last_activity: Mutex::new(Instant::now() - Duration::from_secs(10)),
            close_tx,
        };
        handle.touch();
        assert!(handle.idle_for() < Duration::from_secs(1));
    }
}
