use crate::range::RangeConfig;
use crate::retry::{CircuitBreaker, RetryLimitAction, RetryPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry and circuit-breaker settings (`[retry]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Failures allowed per page before `retry_limit_action` applies (1..=10).
    pub max_retry_count: u32,
    /// First backoff step in seconds; doubles each attempt.
    pub base_wait_secs: f64,
    /// Seconds added per attempt on top of the exponential backoff.
    pub retry_delay_increment_secs: u64,
    /// Cap on any single backoff, in seconds.
    pub max_retry_delay_secs: u64,
    /// "skip" (give up on the image) or "abort" (end the gallery in error).
    pub retry_limit_action: RetryLimitAction,
    /// Consecutive network failures that open the circuit breaker (0 = off).
    pub circuit_breaker_threshold: u32,
    /// Seconds an open breaker waits before letting a trial request through.
    pub circuit_recovery_secs: u64,
    /// Retry once without certificate verification after an SSL failure.
    pub lower_security_mode: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            base_wait_secs: 3.0,
            retry_delay_increment_secs: 10,
            max_retry_delay_secs: 60,
            retry_limit_action: RetryLimitAction::Skip,
            circuit_breaker_threshold: 5,
            circuit_recovery_secs: 60,
            lower_security_mode: false,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retry_count: self.max_retry_count.clamp(1, 10),
            base_wait: Duration::try_from_secs_f64(self.base_wait_secs.max(0.0))
                .unwrap_or(RetryPolicy::default().base_wait),
            retry_delay_increment: Duration::from_secs(self.retry_delay_increment_secs),
            max_retry_delay: Duration::from_secs(self.max_retry_delay_secs),
            retry_limit_action: self.retry_limit_action,
            lower_security_mode: self.lower_security_mode,
        }
    }

    pub fn breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            self.circuit_breaker_threshold,
            Duration::from_secs(self.circuit_recovery_secs),
        )
    }
}

/// Queue scheduling settings (`[scheduler]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Resume the queue automatically this many seconds after an
    /// error-induced pause. None = wait for the user.
    pub auto_resume_delay_secs: Option<u64>,
    /// Upper bound on waiting for a worker to finish after a stop request.
    pub worker_join_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_resume_delay_secs: None,
            worker_join_timeout_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/gdm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GdmConfig {
    /// Galleries are saved under `<download_dir>/<title>/`. None = XDG download dir.
    pub download_dir: Option<PathBuf>,
    /// Pause between pages, in milliseconds.
    pub page_wait_ms: u64,
    /// How often a held pause gate re-checks for interrupts, in milliseconds.
    pub pause_poll_ms: u64,
    /// Minimum interval between progress lines per job, in milliseconds.
    pub progress_throttle_ms: u64,
    /// Give up on a gallery once this many of its images were skipped. None = never.
    pub skip_url_after_skipped_images: Option<usize>,
    pub retry: RetryConfig,
    pub range: RangeConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for GdmConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            page_wait_ms: 0,
            pause_poll_ms: 100,
            progress_throttle_ms: 500,
            skip_url_after_skipped_images: None,
            retry: RetryConfig::default(),
            range: RangeConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl GdmConfig {
    /// Configured download dir, else `$HOME/Downloads/gdm`, else `./gdm`.
    pub fn resolved_download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Downloads").join("gdm"))
            .unwrap_or_else(|| PathBuf::from("gdm"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GdmConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<GdmConfig> {
    if !path.exists() {
        let default_cfg = GdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: GdmConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeMode;

    #[test]
    fn default_config_values() {
        let cfg = GdmConfig::default();
        assert_eq!(cfg.retry.max_retry_count, 3);
        assert_eq!(cfg.retry.retry_delay_increment_secs, 10);
        assert_eq!(cfg.retry.max_retry_delay_secs, 60);
        assert_eq!(cfg.retry.circuit_breaker_threshold, 5);
        assert_eq!(cfg.retry.retry_limit_action, RetryLimitAction::Skip);
        assert!(!cfg.range.enabled);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = GdmConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: GdmConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.retry.max_retry_count, cfg.retry.max_retry_count);
        assert_eq!(parsed.pause_poll_ms, cfg.pause_poll_ms);
        assert_eq!(parsed.range, cfg.range);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let toml = r#"
            page_wait_ms = 250

            [retry]
            max_retry_count = 5
            retry_limit_action = "abort"

            [range]
            enabled = true
            start = 3
            end = 7
            mode = "first_url_only"
        "#;
        let cfg: GdmConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.page_wait_ms, 250);
        assert_eq!(cfg.retry.max_retry_count, 5);
        assert_eq!(cfg.retry.retry_limit_action, RetryLimitAction::Abort);
        assert_eq!(cfg.retry.max_retry_delay_secs, 60);
        assert_eq!(cfg.range.start, Some(3));
        assert_eq!(cfg.range.mode, RangeMode::FirstUrlOnly);
        assert_eq!(cfg.scheduler.worker_join_timeout_secs, 30);
    }

    #[test]
    fn policy_clamps_retry_count() {
        let mut r = RetryConfig::default();
        r.max_retry_count = 0;
        assert_eq!(r.policy().max_retry_count, 1);
        r.max_retry_count = 50;
        assert_eq!(r.policy().max_retry_count, 10);
    }

    #[test]
    fn infinite_base_wait_falls_back_to_default() {
        let cfg: GdmConfig = toml::from_str("[retry]\nbase_wait_secs = inf\n").unwrap();
        assert!(cfg.retry.base_wait_secs.is_infinite());
        assert_eq!(cfg.retry.policy().base_wait, RetryPolicy::default().base_wait);

        let cfg: GdmConfig = toml::from_str("[retry]\nbase_wait_secs = 0.25\n").unwrap();
        assert_eq!(cfg.retry.policy().base_wait, Duration::from_millis(250));
    }

    #[test]
    fn load_or_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gdm").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.retry.max_retry_count, 3);
        let again = load_or_init_at(&path).unwrap();
        assert_eq!(again.pause_poll_ms, cfg.pause_poll_ms);
    }
}
