use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::bands::BandMethod;
use crate::compare::AddRequest;
use crate::filters::FilterSpec;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BandConfig {
    pub method: BandMethod,
    pub level: u8,
    pub smooth: bool,
}

impl Default for BandConfig {
    fn default() -> Self {
        BandConfig {
            method: BandMethod::HistoricalQuantiles,
            level: 80,
            smooth: true,
        }
    }
}

/// A comparison curve pinned in the config file. Entries without a label
/// get the generated one.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ComparisonConfig {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub filters: FilterSpec,
}

impl From<&ComparisonConfig> for AddRequest {
    fn from(comparison: &ComparisonConfig) -> Self {
        AddRequest {
            filters: comparison.filters.clone(),
            label: comparison.label.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub bands: BandConfig,
    pub filters: FilterSpec,
    pub comparisons: Vec<ComparisonConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "curvas", "curvas")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
