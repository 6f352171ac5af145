//! `AgentConfig` resolution (spec.md §4.8, §6): an optional TOML file,
//! `SMITH_*` environment variable overrides, then auth-token resolution
//! per the explicit-config → persisted-file → generated rule.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use smith_tools::{AgentConfig, CategoryEnables};
use thiserror::Error;

use crate::home::Home;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: Box<toml::de::Error> },
    #[error("invalid instance name: {0}")]
    InvalidName(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Home(#[from] anyhow::Error),
}

/// Mirrors [`AgentConfig`] field-for-field but with everything optional, so
/// a TOML file can specify a subset and defaults/env fill the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    name: Option<String>,
    port: Option<u16>,
    auth_token: Option<String>,
    sandbox_dir: Option<PathBuf>,
    readonly_mode: Option<bool>,
    allowed_shell_commands: Option<Vec<String>>,
    filesystem: Option<bool>,
    shell: Option<bool>,
    git: Option<bool>,
    network: Option<bool>,
    timeout_ms: Option<u64>,
    max_concurrent_tasks: Option<usize>,
    idle_timeout_ms: Option<u64>,
    tls_cert: Option<PathBuf>,
    tls_key: Option<PathBuf>,
    log_level: Option<String>,
}

const DEFAULT_PORT: u16 = 7900;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_CONCURRENT_TASKS: usize = 4;
const DEFAULT_LOG_LEVEL: &str = "info";

fn load_raw_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn env_override(raw: &mut RawConfig) {
    if let Ok(v) = std::env::var("SMITH_NAME") {
        raw.name = Some(v);
    }
    if let Ok(v) = std::env::var("SMITH_PORT") {
        if let Ok(port) = v.parse() {
            raw.port = Some(port);
        }
    }
    if let Ok(v) = std::env::var("SMITH_AUTH_TOKEN") {
        raw.auth_token = Some(v);
    }
    if let Ok(v) = std::env::var("SMITH_SANDBOX_DIR") {
        raw.sandbox_dir = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("SMITH_READONLY_MODE") {
        raw.readonly_mode = Some(v == "1" || v.eq_ignore_ascii_case("true"));
    }
    if let Ok(v) = std::env::var("SMITH_ALLOWED_SHELL_COMMANDS") {
        raw.allowed_shell_commands = Some(
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        );
    }
    if let Ok(v) = std::env::var("SMITH_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            raw.timeout_ms = Some(ms);
        }
    }
    if let Ok(v) = std::env::var("SMITH_MAX_CONCURRENT_TASKS") {
        if let Ok(n) = v.parse() {
            raw.max_concurrent_tasks = Some(n);
        }
    }
    if let Ok(v) = std::env::var("SMITH_IDLE_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            raw.idle_timeout_ms = Some(ms);
        }
    }
    if let Ok(v) = std::env::var("SMITH_LOG_LEVEL") {
        raw.log_level = Some(v);
    }
}

/// Load `AgentConfig` from an optional TOML file, apply `SMITH_*`
/// environment overrides, then resolve `auth_token` via `home`.
pub fn load(config_path: Option<&Path>, home: &Home) -> Result<AgentConfig, ConfigError> {
    let mut raw = match config_path {
        Some(path) => load_raw_file(path)?,
        None => RawConfig::default(),
    };
    env_override(&mut raw);

    let name = raw.name.unwrap_or_else(|| "smith".to_string());
    if !smith_tools::config::is_valid_instance_name(&name) {
        return Err(ConfigError::InvalidName(name));
    }

    let sandbox_dir = raw.sandbox_dir.ok_or(ConfigError::MissingField("sandbox_dir"))?;

    let auth_token = match raw.auth_token {
        Some(token) if !token.is_empty() => token,
        _ => home.read_or_create_auth_token().map_err(|e| ConfigError::Home(e.into()))?,
    };

    Ok(AgentConfig {
        name,
        port: raw.port.unwrap_or(DEFAULT_PORT),
        auth_token,
        sandbox_dir,
        readonly_mode: raw.readonly_mode.unwrap_or(false),
        allowed_shell_commands: raw.allowed_shell_commands.unwrap_or_default(),
        categories: CategoryEnables {
            filesystem: raw.filesystem.unwrap_or(true),
            shell: raw.shell.unwrap_or(true),
            git: raw.git.unwrap_or(true),
            network: raw.network.unwrap_or(true),
        },
        timeout_ms: raw.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        max_concurrent_tasks: raw.max_concurrent_tasks.unwrap_or(DEFAULT_MAX_CONCURRENT_TASKS),
        idle_timeout_ms: raw.idle_timeout_ms,
        tls_cert: raw.tls_cert,
        tls_key: raw.tls_key,
        log_level: raw.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn home(dir: &TempDir) -> Home {
        let home = Home::resolve(Some(dir.path().join("home"))).unwrap();
        home.ensure_exists().unwrap();
        home
    }

    #[test]
    fn missing_sandbox_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let h = home(&dir);
        let err = load(None, &h).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("sandbox_dir")));
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let h = home(&dir);
        let config_path = dir.path().join("smith.toml");
        std::fs::write(
            &config_path,
            format!(
                "name = \"agent-1\"\nsandbox_dir = \"{}\"\nport = 7901\n",
                dir.path().display()
            ),
        )
        .unwrap();

        let config = load(Some(&config_path), &h).unwrap();
        assert_eq!(config.name, "agent-1");
        assert_eq!(config.port, 7901);
        assert!(!config.auth_token.is_empty());
    }

    #[test]
    fn generates_and_persists_token_when_absent() {
        let dir = TempDir::new().unwrap();
        let h = home(&dir);
        let config_path = dir.path().join("smith.toml");
        std::fs::write(
            &config_path,
            format!("sandbox_dir = \"{}\"\n", dir.path().display()),
        )
        .unwrap();

        let first = load(Some(&config_path), &h).unwrap();
        let second = load(Some(&config_path), &h).unwrap();
        assert_eq!(first.auth_token, second.auth_token);
    }

    #[test]
    fn env_override_wins_over_file() {
        let dir = TempDir::new().unwrap();
        let h = home(&dir);
        let config_path = dir.path().join("smith.toml");
        std::fs::write(
            &config_path,
            format!("sandbox_dir = \"{}\"\nport = 1\n", dir.path().display()),
        )
        .unwrap();

        unsafe {
            std::env::set_var("SMITH_PORT", "9999");
        }
        let config = load(Some(&config_path), &h).unwrap();
        unsafe {
            std::env::remove_var("SMITH_PORT");
        }
        assert_eq!(config.port, 9999);
    }

    #[test]
    fn invalid_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let h = home(&dir);
        let config_path = dir.path().join("smith.toml");
        std::fs::write(
            &config_path,
            format!(
                "name = \"Bad Name\"\nsandbox_dir = \"{}\"\n",
                dir.path().display()
            ),
        )
        .unwrap();
        let err = load(Some(&config_path), &h).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidName(_)));
    }
}
