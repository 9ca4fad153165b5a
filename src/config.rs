use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::PollPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hosts: HostsConfig,
    #[serde(default)]
    pub command: CommandConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Hosts of the two supported pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostsConfig {
    pub issue_tracker: String,
    pub console: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub tool: String,
    /// Only accept this area map name in the "Area Map" panel; any name when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_map_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            issue_tracker: "tier4.atlassian.net".to_string(),
            console: "console.mob.tier4.jp".to_string(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self { tool: "webauto".to_string(), area_map_name: None }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 100, timeout_ms: 5000 }
    }
}

impl CaptureConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            ..PollPolicy::default()
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            log::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Config::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("jp", "tier4", "rosbag-linker")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
