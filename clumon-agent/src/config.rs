//! Configuration management
//!
//! Handles:
//! - Status command and sampling cadence
//! - Match mode for repeated status lines
//! - Staleness warnings
//! - Log level
//!
//! Every field has a default; a missing file means "behave like plain
//! `crm status` every 30 seconds".

use crate::parser::MatchMode;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "CLUMON_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClumonConfig {
    pub sampler: SamplerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Program followed by its arguments
    pub command: Vec<String>,
    pub interval_secs: u64,
    /// 0 disables the timeout
    pub timeout_secs: u64,
    pub match_mode: MatchMode,
    /// 0 disables staleness warnings
    pub stale_after_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set: a level (`debug`) or a directive
    /// list (`clumon_agent=trace,warn`)
    pub level: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            command: vec!["crm".to_string(), "status".to_string()],
            interval_secs: 30,
            timeout_secs: 25,
            match_mode: MatchMode::FirstMatch,
            stale_after_secs: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
        }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn stale_after(&self) -> Option<chrono::Duration> {
        if self.stale_after_secs == 0 {
            return None;
        }
        i64::try_from(self.stale_after_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

impl LoggingConfig {
    /// A bare word that is not a level would silently become a target name
    pub fn validate(&self) -> Result<()> {
        let level = self.level.trim();
        if level.parse::<LevelFilter>().is_ok() {
            return Ok(());
        }
        if level.contains('=') && EnvFilter::try_new(level).is_ok() {
            return Ok(());
        }
        bail!(
            "logging.level `{}` is not a level (off, error, warn, info, debug, trace) or a filter directive list",
            self.level
        );
    }
}

impl ClumonConfig {
    /// Load config from `$CLUMON_CONFIG` or the OS-specific location
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if config_path.exists() {
            Self::load_from(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate a specific config file
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ClumonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampler.command.is_empty() || self.sampler.command[0].trim().is_empty() {
            bail!("sampler.command must name a program");
        }
        if self.sampler.interval_secs == 0 {
            bail!("sampler.interval_secs must be greater than 0");
        }
        self.logging.validate()?;
        Ok(())
    }

    /// `$CLUMON_CONFIG` if set, else `<config dir>/clumon/config.toml`
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(explicit));
        }

        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        path.push("clumon");
        path.push("config.toml");
        Ok(path)
    }
}
