//! The `Tool` trait and the result envelope every invocation normalizes to.

use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::ArgSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Filesystem,
    Shell,
    Git,
    Network,
    Processes,
    Packages,
    System,
    Browser,
}

impl ToolCategory {
    /// Categories gated by [`crate::config::CategoryEnables`]. The rest
    /// always load.
    pub fn is_toggleable(self) -> bool {
        matches!(
            self,
            ToolCategory::Filesystem | ToolCategory::Shell | ToolCategory::Git | ToolCategory::Network
        )
    }
}

/// `{success, data, error?, duration_ms}` — mandatory for every tool
/// outcome (spec.md §3).
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ToolResult {
    pub fn ok(data: Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            data,
            error: None,
            duration_ms,
        }
    }

    pub fn fail(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// A named, schema-checked, category-tagged action executed on the agent
/// host. Handlers return typed `serde_json::Value` payloads; the executor
/// owns envelope conversion (spec.md §9 — "return a JSON string" is a
/// source implementation detail, not reproduced here).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> ToolCategory;
    fn args_schema(&self) -> &'static [ArgSpec];

    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}
