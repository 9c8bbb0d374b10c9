//! Instance Commands

use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde::Serialize;

use lxconsole_common::device::{device_key_to_label, DeviceAttributes};
use lxconsole_common::form_devices::{
    add_custom_device, detach_device, inherited_device_rows, other_device_type_options,
    reattach_device, remove_device, DeviceTypeOption, InheritedDeviceRow,
};
use lxconsole_common::form_fields::{form_field, payload_key};
use lxconsole_common::inheritance::{existing_device_names, resolve_disks, resolve_field, resolve_fields, InheritedField};
use lxconsole_common::permissions::pluralize;
use lxconsole_common::{Device, DeviceCategory, DeviceKind, Entity, Instance, StartAction};

use super::Context;
use crate::output::{muted, print_heading, print_item, print_list, print_status, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum InstanceCommands {
    /// List all instances
    List,

    /// Show inherited configuration values
    Fields {
        /// Instance name
        name: String,

        /// Only this form field or configuration key (e.g. limits_cpu, limits.cpu)
        #[arg(long)]
        field: Option<String>,
    },

    /// Show inherited devices
    Devices {
        /// Instance name
        name: String,

        /// Device category (disk, nic, gpu, proxy, other)
        #[arg(short, long, default_value = "other")]
        category: DeviceCategory,
    },

    /// List device names in use, own and inherited
    DeviceNames {
        /// Instance name
        name: String,
    },

    /// Hide an inherited device with a local override
    Detach {
        /// Instance name
        name: String,

        /// Device name
        device: String,
    },

    /// Remove the local override hiding an inherited device
    Reattach {
        /// Instance name
        name: String,

        /// Device name
        device: String,
    },

    /// Remove one of the instance's own devices
    RemoveDevice {
        /// Instance name
        name: String,

        /// Device name
        device: String,
    },

    /// Add an empty custom device with a fresh name
    AddDevice {
        /// Instance name
        name: String,

        /// Device type
        #[arg(short = 't', long = "type", default_value = "usb")]
        kind: DeviceKind,
    },

    /// Show device types available for custom devices
    DeviceTypes {
        /// Instance name
        name: String,
    },
}

/// Instance display wrapper for serialization
#[derive(Serialize)]
pub struct InstanceDisplay {
    pub name: String,
    pub status: String,
    pub instance_type: String,
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
    pub profiles: Vec<String>,
    pub snapshots: usize,
    pub start: Option<StartAction>,
}

impl From<&Instance> for InstanceDisplay {
    fn from(instance: &Instance) -> Self {
        let addresses = |family: &str| -> Vec<String> {
            instance
                .addresses("eth0", family)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self {
            name: instance.name.clone(),
            status: instance.status.to_string(),
            instance_type: instance.instance_type.to_string(),
            ipv4: addresses("inet"),
            ipv6: addresses("inet6"),
            profiles: instance.profiles.clone(),
            snapshots: instance.snapshot_count(),
            start: instance.start_action(),
        }
    }
}

impl TableDisplay for InstanceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "State", "IPv4", "IPv6", "Type", "Profiles", "Snapshots", "Start"]
    }

    fn row(&self) -> Vec<String> {
        let start = match self.start {
            Some(StartAction::Start) => "start",
            Some(StartAction::Unfreeze) => "unfreeze",
            None => "-",
        };
        vec![
            self.name.clone(),
            self.status.clone(),
            self.ipv4.join(" "),
            self.ipv6.join(" "),
            self.instance_type.clone(),
            self.profiles.join(", "),
            self.snapshots.to_string(),
            start.to_string(),
        ]
    }
}

/// Inherited field display wrapper
#[derive(Serialize)]
pub struct FieldDisplay {
    pub field: String,
    pub key: String,
    pub value: String,
    pub source: String,
}

impl From<InheritedField> for FieldDisplay {
    fn from(field: InheritedField) -> Self {
        Self {
            field: field.key,
            key: field.config_key,
            value: field.value,
            source: field.source,
        }
    }
}

impl TableDisplay for FieldDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Field", "Key", "Inherited value", "From"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.field.clone(), self.key.clone(), self.value.clone(), self.source.clone()]
    }
}

fn attribute_summary(attributes: &DeviceAttributes) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!("{}: {}", device_key_to_label(key), value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_attributes(device: &Device) -> DeviceAttributes {
    device
        .attributes()
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Inherited device display wrapper
#[derive(Serialize)]
pub struct InheritedDeviceDisplay {
    pub name: String,
    pub device_type: String,
    pub source: String,
    pub detached: bool,
    pub attributes: DeviceAttributes,
}

impl From<InheritedDeviceRow> for InheritedDeviceDisplay {
    fn from(row: InheritedDeviceRow) -> Self {
        Self {
            name: row.inherited.key,
            device_type: row.inherited.device.kind().to_string(),
            attributes: collect_attributes(&row.inherited.device),
            source: row.inherited.source,
            detached: row.detached,
        }
    }
}

impl TableDisplay for InheritedDeviceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Device", "Type", "From", "State", "Attributes"]
    }

    fn row(&self) -> Vec<String> {
        let cells = vec![
            self.name.clone(),
            self.device_type.clone(),
            self.source.clone(),
            if self.detached { "detached" } else { "attached" }.to_string(),
            attribute_summary(&self.attributes),
        ];
        if self.detached {
            cells.iter().map(|cell| muted(cell)).collect()
        } else {
            cells
        }
    }
}

/// Root storage display wrapper
#[derive(Serialize)]
pub struct RootStorageDisplay {
    pub pool: String,
    pub source: String,
    pub device: Option<String>,
}

impl TableDisplay for RootStorageDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Root storage pool", "From", "Device"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            if self.pool.is_empty() { "-".to_string() } else { self.pool.clone() },
            self.source.clone(),
            self.device.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

/// Own device display wrapper
#[derive(Serialize)]
pub struct OwnDeviceDisplay {
    pub name: String,
    pub device_type: String,
    pub attributes: DeviceAttributes,
}

impl TableDisplay for OwnDeviceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Device", "Type", "Attributes"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.device_type.clone(),
            attribute_summary(&self.attributes),
        ]
    }
}

fn own_devices(entity: &Entity) -> Vec<OwnDeviceDisplay> {
    entity
        .devices
        .iter()
        .map(|(name, device)| OwnDeviceDisplay {
            name: name.clone(),
            device_type: device.kind().to_string(),
            attributes: collect_attributes(device),
        })
        .collect()
}

/// Device name display wrapper
#[derive(Serialize)]
pub struct DeviceNameDisplay {
    pub name: String,
}

impl TableDisplay for DeviceNameDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Device name"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

impl TableDisplay for DeviceTypeOption {
    fn headers() -> Vec<&'static str> {
        vec!["Type", "Label", "Available"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.value.to_string(),
            self.label.to_string(),
            if self.disabled { "no" } else { "yes" }.to_string(),
        ]
    }
}

/// Accept either a form field name or the configuration key it edits
fn resolve_form_field(name: &str) -> Result<String> {
    if payload_key(name).is_some() {
        return Ok(name.to_string());
    }
    form_field(name)
        .map(str::to_string)
        .with_context(|| format!("unknown form field or configuration key {}", name))
}

fn print_own_devices(entity: &Entity, format: OutputFormat) {
    print_heading(&format!("Devices of {}", entity.name), format);
    print_list(&own_devices(entity), format);
}

pub fn execute(cmd: InstanceCommands, ctx: &Context) -> Result<()> {
    let inventory = ctx.inventory()?;
    let profiles = &inventory.profiles;
    let format = ctx.format;

    match cmd {
        InstanceCommands::List => {
            let displays: Vec<InstanceDisplay> = inventory.instances.iter().map(InstanceDisplay::from).collect();
            print_heading(&format!("Instances in project {}", ctx.project(&inventory)), format);
            print_list(&displays, format);
        }

        InstanceCommands::Fields { name, field } => {
            let entity = Entity::from_instance(inventory.instance(&name)?);
            match field {
                Some(field) => {
                    let field = resolve_form_field(&field)?;
                    let inherited = resolve_field(&entity, &field, profiles);
                    let display = FieldDisplay {
                        key: payload_key(&field).unwrap_or_default().to_string(),
                        field,
                        value: inherited.value,
                        source: inherited.source,
                    };
                    print_item(&display, format);
                }
                None => {
                    let displays: Vec<FieldDisplay> = resolve_fields(&entity, profiles)
                        .into_iter()
                        .map(FieldDisplay::from)
                        .collect();
                    print_list(&displays, format);
                }
            }
        }

        InstanceCommands::Devices { name, category } => {
            let entity = Entity::from_instance(inventory.instance(&name)?);
            let mut root_device = None;
            if category == DeviceCategory::Disk {
                let disks = resolve_disks(&entity, profiles);
                root_device = disks.root_device.clone();
                print_heading("Root storage", format);
                print_item(
                    &RootStorageDisplay {
                        pool: disks.root_storage.value,
                        source: disks.root_storage.source,
                        device: disks.root_device,
                    },
                    format,
                );
            }

            let rows: Vec<InheritedDeviceDisplay> = inherited_device_rows(&entity, profiles, category)
                .into_iter()
                .filter(|row| root_device.as_deref() != Some(row.inherited.key.as_str()))
                .map(InheritedDeviceDisplay::from)
                .collect();
            print_heading(
                &format!("{} inherited {}", rows.len(), pluralize("device", rows.len())),
                format,
            );
            print_list(&rows, format);
        }

        InstanceCommands::DeviceNames { name } => {
            let entity = Entity::from_instance(inventory.instance(&name)?);
            let names: Vec<DeviceNameDisplay> = existing_device_names(&entity, profiles)
                .into_iter()
                .map(|name| DeviceNameDisplay { name })
                .collect();
            print_list(&names, format);
        }

        InstanceCommands::Detach { name, device } => {
            let mut entity = Entity::from_instance(inventory.instance(&name)?);
            detach_device(&mut entity, profiles, &device)?;
            print_status(&format!("Device {} detached from {}", device, name), format);
            print_own_devices(&entity, format);
        }

        InstanceCommands::Reattach { name, device } => {
            let mut entity = Entity::from_instance(inventory.instance(&name)?);
            reattach_device(&mut entity, &device)?;
            print_status(&format!("Device {} reattached to {}", device, name), format);
            print_own_devices(&entity, format);
        }

        InstanceCommands::RemoveDevice { name, device } => {
            let mut entity = Entity::from_instance(inventory.instance(&name)?);
            let removed = remove_device(&mut entity, &device)?;
            print_status(&format!("Removed {} device {} from {}", removed.kind(), device, name), format);
            print_own_devices(&entity, format);
        }

        InstanceCommands::AddDevice { name, kind } => {
            if kind == DeviceKind::None {
                anyhow::bail!("use detach to add a none device");
            }
            let mut entity = Entity::from_instance(inventory.instance(&name)?);
            let device = add_custom_device(&mut entity, profiles, kind);
            print_status(&format!("Added {} device {} to {}", kind, device, name), format);
            print_own_devices(&entity, format);
        }

        InstanceCommands::DeviceTypes { name } => {
            let instance = inventory.instance(&name)?;
            print_list(&other_device_type_options(Some(instance.instance_type)), format);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_form_field_accepts_both_names() {
        assert_eq!(resolve_form_field("limits_cpu").unwrap(), "limits_cpu");
        assert_eq!(resolve_form_field("limits.cpu").unwrap(), "limits_cpu");
        assert!(resolve_form_field("rootStorage").is_err());
        assert!(resolve_form_field("no.such.key").is_err());
    }
}
