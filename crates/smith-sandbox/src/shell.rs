//! OS-abstracting process spawner. Flattened into a single [`ShellAdapter`]
//! constructed from a [`Platform`] tag, matched on inside each method,
//! instead of a class hierarchy per OS.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Options accepted by [`ShellAdapter::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub env: HashMap<String, String>,
}

/// Outcome of a single subprocess invocation. Always produced, even on spawn
/// failure (exit code defaults to 1, the spawn error text is appended to
/// stderr).
#[derive(Debug, Clone)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Which OS family this adapter targets. Selected once at construction,
/// never mixed at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShellAdapter {
    platform: Platform,
}

impl Default for ShellAdapter {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl ShellAdapter {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Spawn `cmd` with `args`, apply `opts`, and wait up to `opts.timeout`.
    ///
    /// POSIX: argv is passed directly, no intermediate shell. Windows: argv
    /// goes through `cmd.exe /C`, window hidden.
    pub async fn run(&self, cmd: &str, args: &[String], opts: RunOptions) -> RunResult {
        let mut command = match self.platform {
            Platform::Posix => {
                let mut c = Command::new(cmd);
                c.args(args);
                c
            }
            Platform::Windows => {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(cmd).args(args);
                #[cfg(windows)]
                {
                    use std::os::windows::process::CommandExt;
                    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
                    c.creation_flags(CREATE_NO_WINDOW);
                }
                c
            }
        };
        // If the future driving this child is ever dropped before `wait()`
        // observes an exit (e.g. an outer timeout elsewhere racing this
        // one), the child must not be left running as an orphan.
        command.kill_on_drop(true);

        if let Some(cwd) = &opts.cwd {
            command.current_dir(cwd);
        }
        for (k, v) in &opts.env {
            command.env(k, v);
        }
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RunResult {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: format!("failed to spawn `{cmd}`: {e}"),
                    timed_out: false,
                };
            }
        };

        let wait = async {
            let mut stdout_buf = Vec::new();
            let mut stderr_buf = Vec::new();
            let mut stdout = child.stdout.take();
            let mut stderr = child.stderr.take();
            let (_, _) = tokio::join!(
                async {
                    if let Some(s) = stdout.as_mut() {
                        let _ = s.read_to_end(&mut stdout_buf).await;
                    }
                },
                async {
                    if let Some(s) = stderr.as_mut() {
                        let _ = s.read_to_end(&mut stderr_buf).await;
                    }
                },
            );
            let status = child.wait().await;
            (status, stdout_buf, stderr_buf)
        };

        match opts.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, wait).await {
                Ok((status, out, err)) => finish(status, out, err, false),
                Err(_) => {
                    force_kill(&mut child).await;
                    let _ = child.wait().await;
                    RunResult {
                        exit_code: 1,
                        stdout: String::new(),
                        stderr: "timed out".to_string(),
                        timed_out: true,
                    }
                }
            },
            None => {
                let (status, out, err) = wait.await;
                finish(status, out, err, false)
            }
        }
    }

    /// Resolve `bin` via the platform's native lookup (`which`/`where.exe`),
    /// returning the first trimmed match line.
    pub async fn which(&self, bin: &str) -> Option<String> {
        let (lookup, args): (&str, &[&str]) = match self.platform {
            Platform::Posix => ("which", &[]),
            Platform::Windows => ("where", &[]),
        };
        let output = Command::new(lookup).arg(bin).args(args).output().await.ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().next().map(|l| l.trim().to_string())
    }
}

fn finish(
    status: std::io::Result<std::process::ExitStatus>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    timed_out: bool,
) -> RunResult {
    match status {
        Ok(status) => RunResult {
            exit_code: status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            timed_out,
        },
        Err(e) => RunResult {
            exit_code: 1,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: format!("{}\nwait failed: {e}", String::from_utf8_lossy(&stderr)),
            timed_out,
        },
    }
}

/// Forcefully terminate the whole child process on timeout: `SIGKILL` on
/// POSIX (after tokio's default graceful `start_kill`), the `taskkill /F`
/// equivalent on Windows (`Child::start_kill` already maps to
/// `TerminateProcess`, which is forceful on that platform).
async fn force_kill(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_succeeds() {
        let adapter = ShellAdapter::new(Platform::Posix);
        let result = adapter
            .run("echo", &["hello".to_string()], RunOptions::default())
            .await;
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn spawn_failure_defaults_exit_code_to_one() {
        let adapter = ShellAdapter::new(Platform::Posix);
        let result = adapter
            .run(
                "definitely-not-a-real-binary-xyz",
                &[],
                RunOptions::default(),
            )
            .await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("failed to spawn"));
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let adapter = ShellAdapter::new(Platform::Posix);
        let opts = RunOptions {
            timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let result = adapter.run("sleep", &["5".to_string()], opts).await;
        assert!(result.timed_out);
    }

    #[tokio::test]
    async fn which_finds_a_known_binary() {
        let adapter = ShellAdapter::new(Platform::Posix);
        let found = adapter.which("sh").await;
        assert!(found.is_some());
    }
}
