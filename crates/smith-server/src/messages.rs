//! Wire envelope: a `type`-tagged JSON object in each direction (spec.md
//! §6), modeled the way the teacher tags its own UI protocol enums
//! (`UiClientMessage`/`UiServerMessage`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smith_tools::ToolResult;

use crate::stats::SystemStats;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Task { id: String, payload: TaskPayload },
    Ping {
        #[serde(default)]
        timestamp: Option<f64>,
    },
    ConfigQuery,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskPayload {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Register {
        name: String,
        capabilities: Vec<String>,
        protocol_version: u32,
    },
    TaskProgress {
        id: String,
        progress: TaskProgress,
    },
    TaskResult {
        id: String,
        result: ToolResult,
    },
    Pong {
        stats: SystemStats,
    },
    ConfigReport {
        devkit: ConfigSnapshot,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskProgress {
    pub message: String,
    pub percent: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub sandbox_dir: String,
    pub readonly_mode: bool,
    pub enabled_categories: Vec<String>,
}

pub const PROTOCOL_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_frame_parses_with_defaulted_args() {
        let raw = r#"{"type":"task","id":"a","payload":{"tool":"read_file"}}"#;
        let msg: Inbound = serde_json::from_str(raw).unwrap();
        match msg {
            Inbound::Task { id, payload } => {
                assert_eq!(id, "a");
                assert_eq!(payload.tool, "read_file");
                assert_eq!(payload.args, Value::Null);
            }
            _ => panic!("expected task"),
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = r#"{"type":"ping","timestamp":1.0,"extra":"ignored"}"#;
        let msg: Inbound = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg, Inbound::Ping { .. }));
    }

    #[test]
    fn register_serializes_snake_case_tag() {
        let frame = Outbound::Register {
            name: "smith-01".into(),
            capabilities: vec!["read_file".into()],
            protocol_version: PROTOCOL_VERSION,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "register");
        assert_eq!(json["protocol_version"], 1);
    }
}
