//! Configuration Option Commands

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Subcommand;

use lxconsole_common::config_options::{config_description_to_html, to_config_fields, ConfigField};
use lxconsole_common::{Device, DeviceKind};

use super::Context;
use crate::output::{print_list, print_message, TableDisplay};

#[derive(Subcommand)]
pub enum OptionsCommands {
    /// List configuration keys documented for an entity
    Fields {
        /// Entity the keys belong to (e.g. instance, project, device-disk)
        #[arg(short, long, default_value = "instance")]
        entity: String,

        /// Server metadata file
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// List editable keys of a device type
    Device {
        /// Device type
        kind: DeviceKind,

        /// Server metadata file
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Render an option description as HTML
    Describe {
        /// Description text with backquoted code and {ref}`anchor` references
        text: String,
    },
}

impl TableDisplay for ConfigField {
    fn headers() -> Vec<&'static str> {
        vec!["Key", "Category", "Type", "Default", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            self.category.clone(),
            self.option_type.clone(),
            self.default.clone(),
            self.shortdesc.clone(),
        ]
    }
}

pub fn execute(cmd: OptionsCommands, ctx: &Context) -> Result<()> {
    match cmd {
        OptionsCommands::Fields { entity, metadata } => {
            let metadata = ctx
                .metadata(metadata.as_deref())?
                .context("no server metadata; pass --metadata or set metadata_path in the config file")?;
            let categories = metadata
                .configs
                .get(&entity)
                .with_context(|| format!("no configuration options documented for {}", entity))?;
            print_list(&to_config_fields(categories), ctx.format);
        }

        OptionsCommands::Device { kind, metadata } => {
            let metadata = ctx
                .metadata(metadata.as_deref())?
                .context("no server metadata; pass --metadata or set metadata_path in the config file")?;
            print_list(&metadata.device_config_fields(&Device::empty(kind)), ctx.format);
        }

        OptionsCommands::Describe { text } => {
            print_message(&config_description_to_html(&text, &ctx.config.docs_url), ctx.format);
        }
    }

    Ok(())
}
