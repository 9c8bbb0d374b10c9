//! Device override edits on an entity's own device list
//!
//! Detaching an inherited device never touches the profile it comes from; it
//! only adds a `none` stub of the same name to the entity. Reattaching removes
//! the stub again.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::device::{is_none_device, Device, DeviceCategory, DeviceKind};
use crate::inheritance::{existing_device_names, resolve_category, resolve_devices, InheritedDevice};
use crate::types::{Entity, InstanceType, Profile};
use crate::{Error, Result};

/// An inherited device as shown in a device editor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritedDeviceRow {
    #[serde(flatten)]
    pub inherited: InheritedDevice,
    /// A local `none` stub hides this device
    pub detached: bool,
}

/// Position of the `none` stub for `name` in the entity's own devices
pub fn find_none_device(entity: &Entity, name: &str) -> Option<usize> {
    entity
        .devices
        .get_full(name)
        .filter(|(_, _, device)| is_none_device(device))
        .map(|(index, _, _)| index)
}

pub fn is_detached(entity: &Entity, name: &str) -> bool {
    find_none_device(entity, name).is_some()
}

/// Inherited devices of a category annotated with their detach state
pub fn inherited_device_rows(
    entity: &Entity,
    profiles: &[Profile],
    category: DeviceCategory,
) -> Vec<InheritedDeviceRow> {
    resolve_category(entity, profiles, category)
        .into_iter()
        .map(|inherited| {
            let detached = is_detached(entity, &inherited.key);
            InheritedDeviceRow { inherited, detached }
        })
        .collect()
}

/// Hide an inherited device by adding a `none` stub
///
/// Only inherited devices can be detached; an own device of the same name is
/// never replaced. Detaching twice is a no-op.
pub fn detach_device(entity: &mut Entity, profiles: &[Profile], name: &str) -> Result<()> {
    if is_detached(entity, name) {
        return Ok(());
    }
    if entity.devices.contains_key(name) {
        return Err(Error::already_exists("device", name));
    }
    if !resolve_devices(entity, profiles, |_| true)
        .iter()
        .any(|inherited| inherited.key == name)
    {
        return Err(Error::not_found("inherited device", name));
    }
    debug!(entity = %entity.name, device = name, "Detaching device");
    entity.devices.insert(name.to_string(), Device::None);
    Ok(())
}

/// Remove the `none` stub for `name`
pub fn reattach_device(entity: &mut Entity, name: &str) -> Result<Device> {
    if !is_detached(entity, name) {
        return Err(Error::not_found("detached device", name));
    }
    debug!(entity = %entity.name, device = name, "Reattaching device");
    entity
        .devices
        .shift_remove(name)
        .ok_or_else(|| Error::not_found("detached device", name))
}

/// Remove one of the entity's own devices
pub fn remove_device(entity: &mut Entity, name: &str) -> Result<Device> {
    entity
        .devices
        .shift_remove(name)
        .ok_or_else(|| Error::not_found("device", name))
}

/// First `<prefix>-<n>` not in `existing`, counting up from `start`
pub fn deduplicate_name(prefix: &str, start: usize, existing: &BTreeSet<String>) -> String {
    (start..)
        .map(|index| format!("{}-{}", prefix, index))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| prefix.to_string())
}

/// Add an empty device of `kind` under a fresh name and return the name
pub fn add_custom_device(entity: &mut Entity, profiles: &[Profile], kind: DeviceKind) -> String {
    let existing = existing_device_names(entity, profiles);
    let name = deduplicate_name(kind.name_prefix(), 1, &existing);
    debug!(entity = %entity.name, device = %name, kind = %kind, "Adding custom device");
    entity.devices.insert(name.clone(), Device::empty(kind));
    name
}

/// Switch a device to another type, dropping its attributes
pub fn change_device_type(entity: &mut Entity, name: &str, kind: DeviceKind) -> Result<()> {
    let device = entity
        .devices
        .get_mut(name)
        .ok_or_else(|| Error::not_found("device", name))?;
    *device = Device::empty(kind);
    Ok(())
}

/// Rename an own device in place
pub fn rename_device(entity: &mut Entity, from: &str, to: &str) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if entity.devices.contains_key(to) {
        return Err(Error::already_exists("device", to));
    }
    let index = entity
        .devices
        .get_index_of(from)
        .ok_or_else(|| Error::not_found("device", from))?;
    let device = entity
        .devices
        .shift_remove(from)
        .ok_or_else(|| Error::not_found("device", from))?;
    let (new_index, _) = entity.devices.insert_full(to.to_string(), device);
    entity.devices.move_index(new_index, index);
    Ok(())
}

/// Entry of the "other device" type selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceTypeOption {
    pub label: &'static str,
    pub value: DeviceKind,
    pub disabled: bool,
}

/// Types offered for custom devices, disabling those the instance type cannot use
pub fn other_device_type_options(instance_type: Option<InstanceType>) -> Vec<DeviceTypeOption> {
    let is_vm = instance_type == Some(InstanceType::VirtualMachine);
    let is_container = instance_type == Some(InstanceType::Container);

    vec![
        DeviceTypeOption {
            label: "Infiniband (container only)",
            value: DeviceKind::Infiniband,
            disabled: is_vm,
        },
        DeviceTypeOption {
            label: "PCI (VM only)",
            value: DeviceKind::Pci,
            disabled: is_container,
        },
        DeviceTypeOption {
            label: "TPM",
            value: DeviceKind::Tpm,
            disabled: false,
        },
        DeviceTypeOption {
            label: "Unix Block (container only)",
            value: DeviceKind::UnixBlock,
            disabled: is_vm,
        },
        DeviceTypeOption {
            label: "Unix Char (container only)",
            value: DeviceKind::UnixChar,
            disabled: is_vm,
        },
        DeviceTypeOption {
            label: "Unix Hotplug (container only)",
            value: DeviceKind::UnixHotplug,
            disabled: is_vm,
        },
        DeviceTypeOption {
            label: "USB",
            value: DeviceKind::Usb,
            disabled: false,
        },
    ]
}
