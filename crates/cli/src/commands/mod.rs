//! CLI Commands

pub mod instance;
pub mod network;
pub mod options;
pub mod permission;
pub mod profile;

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use lxconsole_common::config_options::ServerMetadata;
use lxconsole_common::Inventory;

use crate::config::CliConfig;
use crate::output::{OutputFormat, TableDisplay};

/// Shared state for command execution
pub struct Context {
    pub config: CliConfig,
    pub inventory_path: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Context {
    /// Load the inventory snapshot; fresh on every call
    pub fn inventory(&self) -> Result<Inventory> {
        let path = self
            .inventory_path
            .as_deref()
            .context("no inventory given; pass --inventory or set inventory_path in the config file")?;
        debug!(path = %path.display(), "Loading inventory");
        Inventory::load(path).with_context(|| format!("failed to load inventory {}", path.display()))
    }

    /// Load server metadata from `path` or the configured default
    pub fn metadata(&self, path: Option<&std::path::Path>) -> Result<Option<ServerMetadata>> {
        let Some(path) = path.or(self.config.metadata_path.as_deref()) else {
            return Ok(None);
        };
        debug!(path = %path.display(), "Loading server metadata");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read metadata {}", path.display()))?;
        let metadata = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Ok(Some(metadata))
    }

    pub fn project<'a>(&'a self, inventory: &'a Inventory) -> &'a str {
        inventory.project.as_deref().unwrap_or(&self.config.project)
    }
}

/// Version display wrapper
#[derive(Serialize)]
pub struct VersionDisplay {
    pub name: &'static str,
    pub version: &'static str,
    pub form_fields: usize,
}

impl VersionDisplay {
    pub fn current() -> Self {
        Self {
            name: "lxconsole",
            version: lxconsole_common::VERSION,
            form_fields: lxconsole_common::form_fields::FORM_FIELDS.len(),
        }
    }
}

impl TableDisplay for VersionDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Version", "Form fields"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.to_string(), self.version.to_string(), self.form_fields.to_string()]
    }
}
