//! CLI configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Inventory snapshot (JSON or YAML) to resolve against
    pub inventory_path: Option<PathBuf>,

    /// Server metadata with config options and entitlements
    pub metadata_path: Option<PathBuf>,

    /// Documentation base URL for rendered option descriptions
    pub docs_url: String,

    /// Project shown when the inventory does not name one
    pub project: String,

    /// Default output format
    pub format: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            inventory_path: None,
            metadata_path: None,
            docs_url: "https://documentation.ubuntu.com/lxd/en/latest".to_string(),
            project: "default".to_string(),
            format: OutputFormat::Table,
        }
    }
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Inventory path, preferring the command line
    pub fn inventory_path(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.inventory_path.clone())
    }
}
