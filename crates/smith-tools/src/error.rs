//! Unified error taxonomy for tool execution (spec.md §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("bad arguments: {0}")]
    BadArguments(String),
    #[error("{0}")]
    SandboxViolation(String),
    #[error("{0}")]
    ReadOnlyDenied(String),
    #[error("{0}")]
    NotAllowed(String),
    #[error("execution timed out")]
    Timeout,
    #[error("{0}")]
    ToolFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ToolError {
    fn from(e: anyhow::Error) -> Self {
        ToolError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        ToolError::ToolFailure(e.to_string())
    }
}
