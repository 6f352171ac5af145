//! The derived, per-connection [`ToolContext`] handed to every tool.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::CategoryEnables;
use crate::error::ToolError;

/// Read-only value object derived from [`crate::config::AgentConfig`].
/// Never mutated once built.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub sandbox_dir: PathBuf,
    pub allowed_shell_commands: Vec<String>,
    pub timeout_ms: u64,
    pub readonly_mode: bool,
    pub categories: CategoryEnables,
}

impl ToolContext {
    /// Working directory for tools that don't otherwise specify one: the
    /// sandbox root itself.
    pub fn working_dir(&self) -> &Path {
        &self.sandbox_dir
    }

    /// Resolve a (possibly relative) path argument against the sandbox root
    /// and verify it stays inside it. Absolute arguments are kept absolute
    /// and still checked. This is the single consolidated path-guard wrapper
    /// every filesystem/git/shell/network tool routes through.
    pub fn guarded_path(&self, raw: &str, destructive: bool) -> Result<PathBuf, ToolError> {
        if destructive && self.readonly_mode {
            return Err(ToolError::ReadOnlyDenied(format!(
                "refusing destructive operation on '{raw}': agent is running in read-only mode"
            )));
        }

        let candidate = Path::new(raw);
        let resolved = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.sandbox_dir.join(candidate)
        };

        if !smith_sandbox::is_within_dir(&resolved, &self.sandbox_dir) {
            return Err(ToolError::SandboxViolation(format!(
                "path '{raw}' resolves outside the sandbox root ({})",
                self.sandbox_dir.display()
            )));
        }

        Ok(resolved)
    }

    /// Check a shell command's binary against the allowlist, returning
    /// [`ToolError::NotAllowed`] on failure.
    pub fn check_command_allowed(&self, cmd: &str) -> Result<(), ToolError> {
        if smith_sandbox::is_command_allowed(cmd, &self.allowed_shell_commands) {
            Ok(())
        } else {
            Err(ToolError::NotAllowed(format!(
                "'{cmd}' is not in allowed_commands"
            )))
        }
    }

    /// Refuse a destructive action outright when not path-based (e.g.
    /// clipboard write, git push) under read-only mode.
    pub fn check_not_readonly(&self, action: &str) -> Result<(), ToolError> {
        if self.readonly_mode {
            Err(ToolError::ReadOnlyDenied(format!(
                "'{action}' is refused: agent is running in read-only mode"
            )))
        } else {
            Ok(())
        }
    }

    /// `min(arg.timeout_ms, self.timeout_ms)` — an explicit per-call
    /// `timeout_ms` argument can only tighten the effective timeout, never
    /// relax it. Shell-backed tools must use this for their own
    /// `RunOptions.timeout` so it never outlives the executor's outer
    /// `tokio::time::timeout`, which would otherwise drop the `tool.call()`
    /// future while the adapter's subprocess kept running.
    pub fn effective_timeout_ms(&self, args: &Value) -> u64 {
        match args.get("timeout_ms").and_then(Value::as_u64) {
            Some(requested) => requested.min(self.timeout_ms),
            None => self.timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx(root: &Path) -> ToolContext {
        ToolContext {
            sandbox_dir: root.to_path_buf(),
            allowed_shell_commands: vec![],
            timeout_ms: 1000,
            readonly_mode: false,
            categories: CategoryEnables::default(),
        }
    }

    #[test]
    fn guarded_path_keeps_relative_inside_sandbox() {
        let dir = TempDir::new().unwrap();
        let c = ctx(dir.path());
        let p = c.guarded_path("hello.txt", false).unwrap();
        assert_eq!(p, dir.path().join("hello.txt"));
    }

    #[test]
    fn guarded_path_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let c = ctx(dir.path());
        let err = c.guarded_path("../escape.txt", false).unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
    }

    #[test]
    fn guarded_path_destructive_blocked_readonly() {
        let dir = TempDir::new().unwrap();
        let mut c = ctx(dir.path());
        c.readonly_mode = true;
        let err = c.guarded_path("x.txt", true).unwrap_err();
        assert!(matches!(err, ToolError::ReadOnlyDenied(_)));
    }

    #[test]
    fn effective_timeout_only_tightens() {
        let dir = TempDir::new().unwrap();
        let c = ctx(dir.path()); // timeout_ms: 1000
        assert_eq!(c.effective_timeout_ms(&serde_json::json!({})), 1000);
        assert_eq!(
            c.effective_timeout_ms(&serde_json::json!({"timeout_ms": 100})),
            100
        );
        assert_eq!(
            c.effective_timeout_ms(&serde_json::json!({"timeout_ms": 5000})),
            1000
        );
    }
}
