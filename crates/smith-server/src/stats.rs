//! Heartbeat/Stats (spec.md §4.7): a single, instantaneous sample of CPU,
//! memory, OS, hostname, and uptime.

use serde::Serialize;
use sysinfo::System;

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub cpu_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub os: String,
    pub hostname: String,
    pub uptime_seconds: u64,
}

/// Long-lived CPU sampler. `sysinfo`'s per-core usage is a delta between
/// two refreshes taken at least `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`
/// apart; a brand-new `System` refreshed exactly once has no prior sample
/// to diff against and reads ~0% regardless of actual load. `CpuSampler`
/// keeps one `System` alive for the server's whole lifetime: the first
/// `sample()` call bootstraps it with two refreshes a minimum interval
/// apart, and every later call reuses the previous call's refresh as its
/// baseline, so a single refresh per call is enough from then on.
pub struct CpuSampler {
    sys: System,
    bootstrapped: bool,
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self {
            sys: System::new(),
            bootstrapped: false,
        }
    }
}

impl CpuSampler {
    pub async fn sample(&mut self) -> SystemStats {
        if !self.bootstrapped {
            self.sys.refresh_cpu_usage();
            tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
            self.bootstrapped = true;
        }
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let cpu_percent = if self.sys.cpus().is_empty() {
            0.0
        } else {
            self.sys.cpus().iter().map(|c| c.cpu_usage()).sum::<f32>() / self.sys.cpus().len() as f32
        };

        SystemStats {
            cpu_percent: cpu_percent.round(),
            memory_used_mb: self.sys.used_memory() / (1024 * 1024),
            memory_total_mb: self.sys.total_memory() / (1024 * 1024),
            os: System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            uptime_seconds: System::uptime(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_non_negative_stats() {
        let mut sampler = CpuSampler::default();
        let stats = sampler.sample().await;
        assert!(stats.cpu_percent >= 0.0);
        assert!(!stats.os.is_empty() || stats.os == "unknown");
    }

    #[tokio::test]
    async fn second_sample_does_not_rebootstrap() {
        let mut sampler = CpuSampler::default();
        let _first = sampler.sample().await;
        assert!(sampler.bootstrapped);
        // A later call must not pay the bootstrap sleep again; it reuses
        // the previous refresh as its baseline.
        let start = std::time::Instant::now();
        let _second = sampler.sample().await;
        assert!(start.elapsed() < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    }
}
