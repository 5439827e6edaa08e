//! Configuration management for chemlab.
//!
//! Loads settings from a TOML file or uses defaults. Every field has a serde
//! default so partial files are fine.

use crate::catalog::ReagentCatalog;
use crate::error::ConfigError;
use crate::llm_client::LlmConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// System-wide config file path
pub const SYSTEM_CONFIG_PATH: &str = "/etc/chemlab/config.toml";

/// Environment variable overriding `llm.api_key`
pub const API_KEY_ENV: &str = "CHEMLAB_API_KEY";

/// Session timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiet period after the last flask change before analysis fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Heating tick interval
    #[serde(default = "default_heat_tick_ms")]
    pub heat_tick_ms: u64,

    /// Smallest per-tick temperature rise
    #[serde(default = "default_heat_step_min")]
    pub heat_step_min: u32,

    /// Largest per-tick temperature rise
    #[serde(default = "default_heat_step_max")]
    pub heat_step_max: u32,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_heat_tick_ms() -> u64 {
    300
}

fn default_heat_step_min() -> u32 {
    2
}

fn default_heat_step_max() -> u32 {
    6
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            heat_tick_ms: default_heat_tick_ms(),
            heat_step_min: default_heat_step_min(),
            heat_step_max: default_heat_step_max(),
        }
    }
}

impl SessionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn heat_tick(&self) -> Duration {
        Duration::from_millis(self.heat_tick_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::ZeroDuration("debounce_ms"));
        }
        if self.heat_tick_ms == 0 {
            return Err(ConfigError::ZeroDuration("heat_tick_ms"));
        }
        if self.heat_step_min > self.heat_step_max {
            return Err(ConfigError::InvertedHeatStep {
                min: self.heat_step_min,
                max: self.heat_step_max,
            });
        }
        Ok(())
    }
}

/// Reagent catalog source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// TOML catalog file; built-in bench set when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Config {
    /// Per-user config path (`$XDG_CONFIG_HOME/chemlab/config.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("chemlab").join("config.toml"))
    }

    /// Load config: explicit path if given, else user then system file, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            // An explicitly requested file must exist
            Some(path) => Self::load_from_path(path)?,
            None => {
                let mut candidates: Vec<PathBuf> = Self::user_config_path().into_iter().collect();
                candidates.push(PathBuf::from(SYSTEM_CONFIG_PATH));
                Self::load_first(&candidates)
            }
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                config.llm.api_key = Some(key);
            }
        }

        config.session.validate()?;
        Ok(config)
    }

    /// First candidate that exists and parses. A file that exists but fails
    /// to load is reported and skipped.
    fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(path) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring config {}: {:#}", path.display(), e),
            }
        }
        warn!("No usable config file, using defaults");
        Config::default()
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save default config to path (for init)
    pub fn save_default(path: &Path) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }

    /// Resolve the reagent catalog this config points at
    pub fn catalog(&self) -> Result<ReagentCatalog> {
        match &self.catalog.path {
            Some(path) => ReagentCatalog::from_toml_file(path)
                .with_context(|| format!("Failed to load catalog {}", path.display())),
            None => Ok(ReagentCatalog::standard()),
        }
    }
}
