//! "Home" directory layout (spec.md §6 "Persisted state"): a PID file, an
//! auth-token file, a logs directory, and a browser cache directory, all
//! rooted under one directory resolved via `dirs::data_dir()` (matching
//! the teacher's own `dirs = "6"` dependency) or an explicit override.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct Home {
    root: PathBuf,
}

impl Home {
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        let root = match override_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .context("could not resolve a platform data directory")?
                .join("smith"),
        };
        Ok(Self { root })
    }

    pub fn ensure_exists(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.browser_cache_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pid_file(&self) -> PathBuf {
        self.root.join("smith.pid")
    }

    pub fn auth_token_file(&self) -> PathBuf {
        self.root.join("auth_token")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn browser_cache_dir(&self) -> PathBuf {
        self.root.join("browser-cache")
    }

    pub fn write_pid(&self, pid: u32) -> io::Result<()> {
        std::fs::write(self.pid_file(), pid.to_string())
    }

    pub fn read_pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    pub fn remove_pid(&self) -> io::Result<()> {
        match std::fs::remove_file(self.pid_file()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Auth-token resolution, persisted-file step (spec.md §6): read the
    /// token file if present, otherwise generate and persist a fresh UUID.
    pub fn read_or_create_auth_token(&self) -> io::Result<String> {
        if let Ok(existing) = std::fs::read_to_string(self.auth_token_file()) {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
        let generated = uuid::Uuid::new_v4().to_string();
        std::fs::write(self.auth_token_file(), &generated)?;
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ensure_exists_creates_subdirectories() {
        let dir = TempDir::new().unwrap();
        let home = Home::resolve(Some(dir.path().join("smith"))).unwrap();
        home.ensure_exists().unwrap();
        assert!(home.logs_dir().is_dir());
        assert!(home.browser_cache_dir().is_dir());
    }

    #[test]
    fn pid_round_trip() {
        let dir = TempDir::new().unwrap();
        let home = Home::resolve(Some(dir.path().to_path_buf())).unwrap();
        home.ensure_exists().unwrap();
        assert!(home.read_pid().is_none());
        home.write_pid(4242).unwrap();
        assert_eq!(home.read_pid(), Some(4242));
        home.remove_pid().unwrap();
        assert!(home.read_pid().is_none());
    }

    #[test]
    fn auth_token_persists_across_calls() {
        let dir = TempDir::new().unwrap();
        let home = Home::resolve(Some(dir.path().to_path_buf())).unwrap();
        home.ensure_exists().unwrap();
        let first = home.read_or_create_auth_token().unwrap();
        let second = home.read_or_create_auth_token().unwrap();
        assert_eq!(first, second);
    }
}
