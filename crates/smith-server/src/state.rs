//! Shared server state: registry/executor context, in-flight task counter,
//! and the live connection table the idle sweeper and shutdown routine walk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use smith_tools::builtins::browser::BrowserSingleton;
use smith_tools::{AgentConfig, EnabledTools, ToolContext};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::stats::CpuSampler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    GoingAway,
    Idle,
}

pub struct ConnectionHandle {
    pub remote_addr: String,
    pub last_activity: Mutex<Instant>,
    pub close_tx: mpsc::Sender<CloseReason>,
}

impl ConnectionHandle {
    pub fn touch(&self) {
        *self.last_activity.lock().unwrap() = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.lock().unwrap().elapsed()
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<AgentConfig>,
    pub enabled: Arc<EnabledTools>,
    pub tool_ctx: Arc<ToolContext>,
    pub browser: Arc<BrowserSingleton>,
    pub in_flight: Arc<AtomicUsize>,
    pub connections: Arc<Mutex<HashMap<String, Arc<ConnectionHandle>>>>,
    pub shutting_down: Arc<AtomicBool>,
    /// One `System` shared across every `ping`, so CPU usage is a real delta
    /// between calls instead of a single, meaningless first sample.
    pub stats: Arc<AsyncMutex<CpuSampler>>,
}

impl ServerState {
    pub fn new(
        config: Arc<AgentConfig>,
        enabled: Arc<EnabledTools>,
        browser: Arc<BrowserSingleton>,
    ) -> Self {
        let tool_ctx = Arc::new(config.to_tool_context());
        Self {
            config,
            enabled,
            tool_ctx,
            browser,
            in_flight: Arc::new(AtomicUsize::new(0)),
            connections: Arc::new(Mutex::new(HashMap::new())),
            shutting_down: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(AsyncMutex::new(CpuSampler::default())),
        }
    }

    /// Atomically checks the in-flight count against `max_concurrent_tasks`
    /// and, if there's room, reserves a slot. Returns `false` (no slot taken)
    /// when the agent is busy. `is_busy`+`begin_task` as two separate steps
    /// would let two tasks racing through `dispatch`'s `tokio::spawn` both
    /// observe room and overshoot the cap.
    pub fn try_begin_task(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.config.max_concurrent_tasks).then_some(n + 1)
            })
            .is_ok()
    }

    pub fn end_task(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn register_connection(&self, id: String, handle: Arc<ConnectionHandle>) {
        self.connections.lock().unwrap().insert(id, handle);
    }

    pub fn remove_connection(&self, id: &str) {
        self.connections.lock().unwrap().remove(id);
    }

    pub fn enabled_category_names(&self) -> Vec<String> {
        let categories = &self.config.categories;
        let mut names = vec!["processes".to_string(), "packages".to_string(), "system".to_string(), "browser".to_string()];
        if categories.filesystem {
            names.push("filesystem".to_string());
        }
        if categories.shell {
            names.push("shell".to_string());
        }
        if categories.git {
            names.push("git".to_string());
        }
        if categories.network {
            names.push("network".to_string());
        }
        names.sort();
        names
    }
}
