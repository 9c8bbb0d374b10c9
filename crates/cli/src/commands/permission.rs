//! Permission Commands

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use lxconsole_common::permissions::{
    generate_entitlement_options, generate_resource_options, pluralize, resource_label, sort_permissions,
    FormPermission, SelectOption,
};

use super::Context;
use crate::output::{print_heading, print_list, TableDisplay};

#[derive(Subcommand)]
pub enum PermissionCommands {
    /// List permissions in form order
    List {
        /// Only this entity type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,
    },

    /// Resource choices for an entity type
    Resources {
        /// Entity type (e.g. instance, project)
        entity_type: String,
    },

    /// Entitlement choices for an entity type
    Entitlements {
        /// Entity type (e.g. instance, project)
        entity_type: String,

        /// Server metadata file with entitlement descriptions
        #[arg(long)]
        metadata: Option<PathBuf>,
    },
}

/// Permission display wrapper for serialization
#[derive(Serialize)]
pub struct PermissionDisplay {
    #[serde(flatten)]
    pub permission: FormPermission,
}

impl TableDisplay for PermissionDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Entity type", "Resource", "Entitlement"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.permission.entity_type.clone(),
            self.permission.resource_label.clone(),
            self.permission.entitlement.clone(),
        ]
    }
}

impl TableDisplay for SelectOption {
    fn headers() -> Vec<&'static str> {
        vec!["Label", "Value", "Description"]
    }

    fn row(&self) -> Vec<String> {
        let label = if self.disabled == Some(true) {
            format!("[{}]", self.label)
        } else {
            self.label.clone()
        };
        vec![label, self.value.clone(), self.title.clone().unwrap_or_default()]
    }
}

pub fn execute(cmd: PermissionCommands, ctx: &Context) -> Result<()> {
    let inventory = ctx.inventory()?;
    let permissions = &inventory.permissions;
    let no_names: HashMap<String, String> = HashMap::new();

    match cmd {
        PermissionCommands::List { entity_type } => {
            let mut rows: Vec<FormPermission> = permissions
                .iter()
                .filter(|p| entity_type.as_deref().map_or(true, |t| p.entity_type == t))
                .map(|p| FormPermission::new(p, resource_label(&p.entity_type, &p.url, &no_names, &no_names)))
                .collect();
            sort_permissions(&mut rows);

            print_heading(
                &format!("{} {}", rows.len(), pluralize("permission", rows.len())),
                ctx.format,
            );
            let displays: Vec<PermissionDisplay> = rows
                .into_iter()
                .map(|permission| PermissionDisplay { permission })
                .collect();
            print_list(&displays, ctx.format);
        }

        PermissionCommands::Resources { entity_type } => {
            let options = generate_resource_options(&entity_type, permissions, &no_names, &no_names);
            print_list(&options, ctx.format);
        }

        PermissionCommands::Entitlements { entity_type, metadata } => {
            let metadata = ctx.metadata(metadata.as_deref())?;
            let options = generate_entitlement_options(&entity_type, permissions, metadata.as_ref());
            print_list(&options, ctx.format);
        }
    }

    Ok(())
}
