//! Configuration loading from TOML files

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for crawline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub batch: BatchConfig,
    pub split: SplitConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub compression_level: i32,
    pub threads: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            threads: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: crawline_batch::config::DEFAULT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub size: u64,
    pub threshold: f64,
    pub mapping: Option<PathBuf>,
    pub compression_level: i32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            size: crawline_split::config::DEFAULT_SIZE,
            threshold: crawline_core::DEFAULT_THRESHOLD,
            mapping: None,
            compression_level: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    pub blocklist: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./crawline.toml (current directory)
    /// 2. ~/.config/crawline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("crawline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "crawline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
