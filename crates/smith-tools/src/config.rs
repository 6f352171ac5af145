//! `AgentConfig` — the immutable, load-once configuration record described
//! in spec.md §3, and [`ToolContext`] derivation from it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-category enable flags. `filesystem`/`shell`/`git`/`network` are
/// toggleable; `processes`/`packages`/`system`/`browser` always load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryEnables {
    pub filesystem: bool,
    pub shell: bool,
    pub git: bool,
    pub network: bool,
}

impl Default for CategoryEnables {
    fn default() -> Self {
        Self {
            filesystem: true,
            shell: true,
            git: true,
            network: true,
        }
    }
}

/// Immutable-after-load agent configuration (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub port: u16,
    pub auth_token: String,
    pub sandbox_dir: PathBuf,
    #[serde(default)]
    pub readonly_mode: bool,
    #[serde(default)]
    pub allowed_shell_commands: Vec<String>,
    #[serde(default)]
    pub categories: CategoryEnables,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,
    #[serde(default)]
    pub tls_key: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent_tasks() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Name-validation regex is expressed by hand (no `regex` dependency needed
/// for this single check): `^[a-z0-9][a-z0-9_-]*$`.
pub fn is_valid_instance_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl AgentConfig {
    /// Whether both TLS fields are present, i.e. the listener should be
    /// TLS-wrapped.
    pub fn tls_enabled(&self) -> bool {
        self.tls_cert.is_some() && self.tls_key.is_some()
    }

    /// Derive the read-only, per-connection [`ToolContext`] handed to tool
    /// handlers.
    pub fn to_tool_context(&self) -> crate::context::ToolContext {
        crate::context::ToolContext {
            sandbox_dir: self.sandbox_dir.clone(),
            allowed_shell_commands: self.allowed_shell_commands.clone(),
            timeout_ms: self.timeout_ms,
            readonly_mode: self.readonly_mode,
            categories: self.categories.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_instance_name("smith-01"));
        assert!(is_valid_instance_name("a"));
        assert!(is_valid_instance_name("9agent_2"));
    }

    #[test]
    fn invalid_names() {
        assert!(!is_valid_instance_name(""));
        assert!(!is_valid_instance_name("-smith"));
        assert!(!is_valid_instance_name("Smith"));
        assert!(!is_valid_instance_name("smith agent"));
    }

    #[test]
    fn tls_requires_both_fields() {
        let mut cfg = sample_config();
        assert!(!cfg.tls_enabled());
        cfg.tls_cert = Some(PathBuf::from("/tmp/cert.pem"));
        assert!(!cfg.tls_enabled());
        cfg.tls_key = Some(PathBuf::from("/tmp/key.pem"));
        assert!(cfg.tls_enabled());
    }

    fn sample_config() -> AgentConfig {
        AgentConfig {
            name: "smith".into(),
            port: 7900,
            auth_token: "t".into(),
            sandbox_dir: PathBuf::from("/tmp"),
            readonly_mode: false,
            allowed_shell_commands: vec![],
            categories: CategoryEnables::default(),
            timeout_ms: default_timeout_ms(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            idle_timeout_ms: None,
            tls_cert: None,
            tls_key: None,
            log_level: default_log_level(),
        }
    }
}
