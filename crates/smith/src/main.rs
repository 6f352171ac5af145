//! Smith binary: CLI dispatch, config/home resolution, and the runtime
//! glue that wires the tool registry into the protocol server (spec.md
//! §4.8). Follows the teacher's `service/src/main.rs` shape: parse CLI
//! args, install a `tracing_subscriber` filter, build shared state, serve,
//! and wait on shutdown signals.

mod cli;
mod config;
mod home;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use smith_tools::builtins::browser::BrowserSingleton;
use smith_tools::{register_all, AgentConfig};
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Command};
use home::Home;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = Home::resolve(cli.home_dir.clone())?;
    home.ensure_exists()?;

    match cli.command {
        Command::Init { name, sandbox_dir, config_path } => run_init(&home, name, sandbox_dir, config_path),
        Command::Start { config_path } => run_start(&home, config_path).await,
        Command::Stop => run_stop(&home),
        Command::Status => run_status(&home),
    }
}

fn run_init(home: &Home, name: String, sandbox_dir: std::path::PathBuf, config_path: Option<std::path::PathBuf>) -> Result<()> {
    if !smith_tools::config::is_valid_instance_name(&name) {
        anyhow::bail!("invalid instance name: {name}");
    }
    home.read_or_create_auth_token().context("failed to persist auth token")?;

    let path = config_path.unwrap_or_else(|| home.root().join("smith.toml"));
    let contents = format!(
        "name = \"{name}\"\nsandbox_dir = \"{}\"\nport = 7900\n",
        sandbox_dir.display()
    );
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;

    println!("wrote config to {}", path.display());
    println!("home directory: {}", home.root().display());
    Ok(())
}

async fn run_start(home: &Home, config_path: Option<std::path::PathBuf>) -> Result<()> {
    let default_config = home.root().join("smith.toml");
    let path = config_path.or_else(|| default_config.exists().then_some(default_config));
    let config = config::load(path.as_deref(), home)?;

    init_logging(&config);
    home.write_pid(std::process::id())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let browser = Arc::new(BrowserSingleton::with_null_driver());
    let registry = register_all(browser.clone());
    let enabled = Arc::new(registry.build(&config.categories));
    let state = smith_server::ServerState::new(Arc::new(config), enabled, browser);

    let result = smith_server::serve(state, addr, shutdown_signal()).await;
    home.remove_pid().ok();
    result
}

fn run_stop(home: &Home) -> Result<()> {
    let Some(pid) = home.read_pid() else {
        println!("no pid file found; nothing to stop");
        return Ok(());
    };

    if cfg!(target_os = "windows") {
        std::process::Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .status()
            .context("failed to invoke taskkill")?;
    } else {
        std::process::Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .context("failed to invoke kill")?;
    }
    println!("sent stop signal to pid {pid}");
    Ok(())
}

fn run_status(home: &Home) -> Result<()> {
    let Some(pid) = home.read_pid() else {
        println!("status: stopped (no pid file)");
        return Ok(());
    };

    let mut sys = sysinfo::System::new();
    sys.refresh_processes(
        sysinfo::ProcessesToUpdate::Some(&[sysinfo::Pid::from_u32(pid)]),
        true,
    );
    if sys.process(sysinfo::Pid::from_u32(pid)).is_some() {
        println!("status: running (pid {pid})");
    } else {
        println!("status: stopped (stale pid {pid})");
    }
    Ok(())
}

fn init_logging(config: &AgentConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl_c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl_c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
