//! Profile Commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use lxconsole_common::device::device_key_to_label;
use lxconsole_common::Profile;

use super::Context;
use crate::output::{print_heading, print_list, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List all profiles
    List,

    /// Show a profile's own configuration and devices
    Show {
        /// Profile name
        name: String,
    },
}

/// Profile display wrapper for serialization
#[derive(Serialize)]
pub struct ProfileDisplay {
    pub name: String,
    pub description: String,
    pub config_keys: usize,
    pub devices: Vec<String>,
    pub used_by: usize,
}

impl From<&Profile> for ProfileDisplay {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            description: profile.description.clone(),
            config_keys: profile.config.len(),
            devices: profile.devices.keys().cloned().collect(),
            used_by: profile.used_by.len(),
        }
    }
}

impl TableDisplay for ProfileDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Description", "Config keys", "Devices", "Used by"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.description.clone(),
            self.config_keys.to_string(),
            self.devices.join(", "),
            self.used_by.to_string(),
        ]
    }
}

/// Configuration entry display wrapper
#[derive(Serialize)]
pub struct ConfigEntryDisplay {
    pub key: String,
    pub value: String,
}

impl TableDisplay for ConfigEntryDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Key", "Value"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.key.clone(), self.value.clone()]
    }
}

/// Device attribute display wrapper
#[derive(Serialize)]
pub struct DeviceAttributeDisplay {
    pub device: String,
    pub device_type: String,
    pub attribute: String,
    pub value: String,
}

impl TableDisplay for DeviceAttributeDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Device", "Type", "Attribute", "Value"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.device.clone(),
            self.device_type.clone(),
            device_key_to_label(&self.attribute),
            self.value.clone(),
        ]
    }
}

fn device_attributes(profile: &Profile) -> Vec<DeviceAttributeDisplay> {
    profile
        .devices
        .iter()
        .flat_map(|(name, device)| {
            let kind = device.kind().to_string();
            device
                .attributes()
                .into_iter()
                .map(move |(attribute, value)| DeviceAttributeDisplay {
                    device: name.clone(),
                    device_type: kind.clone(),
                    attribute: attribute.to_string(),
                    value: value.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn show(profile: &Profile, format: OutputFormat) {
    let config: Vec<ConfigEntryDisplay> = profile
        .config
        .iter()
        .map(|(key, value)| ConfigEntryDisplay {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();

    print_heading(&format!("Profile {}", profile.name), format);
    print_list(&config, format);
    print_heading("Devices", format);
    print_list(&device_attributes(profile), format);
}

pub fn execute(cmd: ProfileCommands, ctx: &Context) -> Result<()> {
    let inventory = ctx.inventory()?;

    match cmd {
        ProfileCommands::List => {
            let displays: Vec<ProfileDisplay> = inventory.profiles.iter().map(ProfileDisplay::from).collect();
            print_list(&displays, ctx.format);
        }

        ProfileCommands::Show { name } => {
            show(inventory.profile(&name)?, ctx.format);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lxconsole_common::device::{DiskDevice, NicDevice};
    use lxconsole_common::Device;

    #[test]
    fn test_device_attribute_rows() {
        let profile = Profile::new("default")
            .with_device(
                "eth0",
                Device::Nic(NicDevice {
                    network: Some("lxdbr0".to_string()),
                    ..Default::default()
                }),
            )
            .with_device(
                "root",
                Device::Disk(DiskDevice {
                    path: Some("/".to_string()),
                    pool: Some("default".to_string()),
                    ..Default::default()
                }),
            );

        let rows = device_attributes(&profile);
        let cells: Vec<_> = rows.iter().map(|r| (r.device.as_str(), r.attribute.as_str())).collect();
        assert_eq!(cells, vec![("eth0", "network"), ("root", "path"), ("root", "pool")]);
        assert_eq!(rows[1].device_type, "disk");
    }
}
