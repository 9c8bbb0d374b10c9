//! Configuration inheritance resolution
//!
//! Instances inherit configuration keys and devices from an ordered list of
//! profiles, the last applied profile taking precedence. Every function here
//! is a pure computation over the snapshots passed in; callers re-run them
//! whenever their inputs change and nothing is cached between calls.
//!
//! Profiles that are referenced but absent from the collection (for example
//! deleted concurrently) contribute nothing.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

use crate::device::{is_disk_device, Device, DeviceCategory};
use crate::form_fields::{payload_key, FORM_FIELDS};
use crate::types::{Entity, Profile};

/// Source label used when no profile contributes a value
pub const DEFAULT_SOURCE: &str = "LXD";

/// Value shown for a field no profile sets
pub const NO_VALUE: &str = "-";

/// A resolved value and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InheritedValue {
    pub value: String,
    /// "LXD" or "`<name>` profile"
    pub source: String,
}

impl InheritedValue {
    fn from_profile(value: &str, profile: &str) -> Self {
        Self {
            value: value.to_string(),
            source: source_label(profile),
        }
    }

    fn lxd_default(value: &str) -> Self {
        Self {
            value: value.to_string(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// True when no profile contributed this value
    pub fn is_default(&self) -> bool {
        self.source == DEFAULT_SOURCE
    }
}

/// A form field with its inherited value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InheritedField {
    pub key: String,
    pub config_key: String,
    pub value: String,
    pub source: String,
}

/// A device contributed by a profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritedDevice {
    pub key: String,
    pub device: Device,
    pub profile: String,
    pub source: String,
}

/// Inherited disks, with the root disk lifted out as a scalar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDisks {
    pub root_storage: InheritedValue,
    pub root_device: Option<String>,
    pub devices: Vec<InheritedDevice>,
}

/// "`<name>` profile"
pub fn source_label(profile: &str) -> String {
    format!("{} profile", profile)
}

/// Look a profile up by name
pub fn find_profile<'a>(name: &str, profiles: &'a [Profile]) -> Option<&'a Profile> {
    profiles.iter().find(|profile| profile.name == name)
}

/// Profile names in lookup precedence: the applied list reversed, empty for profiles
pub fn resolution_order(entity: &Entity) -> Vec<&str> {
    entity.profiles().iter().rev().map(String::as_str).collect()
}

fn applied_profiles<'a>(entity: &Entity, profiles: &'a [Profile]) -> Vec<&'a Profile> {
    resolution_order(entity)
        .into_iter()
        .filter_map(|name| {
            let found = find_profile(name, profiles);
            if found.is_none() {
                debug!(entity = %entity.name, profile = name, "Skipping missing profile");
            }
            found
        })
        .collect()
}

/// Inherited value of a backend configuration key
///
/// Empty strings count as unset, so resolution continues past them.
pub fn resolve_config_key(entity: &Entity, config_key: &str, profiles: &[Profile]) -> InheritedValue {
    applied_profiles(entity, profiles)
        .into_iter()
        .find_map(|profile| {
            profile
                .config
                .get(config_key)
                .filter(|value| !value.is_empty())
                .map(|value| InheritedValue::from_profile(value, &profile.name))
        })
        .unwrap_or_else(|| InheritedValue::lxd_default(NO_VALUE))
}

/// Inherited value of an editor form field
pub fn resolve_field(entity: &Entity, form_field: &str, profiles: &[Profile]) -> InheritedValue {
    match payload_key(form_field) {
        Some(config_key) => resolve_config_key(entity, config_key, profiles),
        None => InheritedValue::lxd_default(NO_VALUE),
    }
}

/// Every configuration form field in editor order
pub fn resolve_fields(entity: &Entity, profiles: &[Profile]) -> Vec<InheritedField> {
    FORM_FIELDS
        .iter()
        .filter(|(_, config_key)| !config_key.is_empty())
        .map(|(field, config_key)| {
            let inherited = resolve_config_key(entity, config_key, profiles);
            InheritedField {
                key: field.to_string(),
                config_key: config_key.to_string(),
                value: inherited.value,
                source: inherited.source,
            }
        })
        .collect()
}

/// Inherited devices accepted by `filter`, in precedence order
///
/// Each profile's devices are filtered first. Among the devices that pass,
/// the first profile (in precedence order) defining a name owns it and
/// same-named matches in lower precedence profiles are ignored.
pub fn resolve_devices<F>(entity: &Entity, profiles: &[Profile], filter: F) -> Vec<InheritedDevice>
where
    F: Fn(&Device) -> bool,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut inherited = Vec::new();

    for profile in applied_profiles(entity, profiles) {
        for (name, device) in profile.devices.iter().filter(|(_, device)| filter(device)) {
            if !seen.insert(name.as_str()) {
                trace!(device = %name, profile = %profile.name, "Device shadowed by higher precedence profile");
                continue;
            }
            inherited.push(InheritedDevice {
                key: name.clone(),
                device: device.clone(),
                profile: profile.name.clone(),
                source: source_label(&profile.name),
            });
        }
    }

    inherited
}

/// Inherited devices of one editor category
pub fn resolve_category(entity: &Entity, profiles: &[Profile], category: DeviceCategory) -> Vec<InheritedDevice> {
    resolve_devices(entity, profiles, |device| category.matches(device))
}

fn is_root_disk(device: &Device) -> bool {
    device.as_disk().map(|disk| disk.is_root()).unwrap_or(false)
}

/// Pool of the inherited root disk, or `("", "LXD")`
pub fn resolve_root_storage(entity: &Entity, profiles: &[Profile]) -> InheritedValue {
    resolve_devices(entity, profiles, is_disk_device)
        .into_iter()
        .find(|inherited| is_root_disk(&inherited.device))
        .map(|inherited| {
            let pool = inherited
                .device
                .as_disk()
                .and_then(|disk| disk.pool.as_deref())
                .unwrap_or_default();
            InheritedValue::from_profile(pool, &inherited.profile)
        })
        .unwrap_or_else(|| InheritedValue::lxd_default(""))
}

/// Inherited disks split into root storage and regular rows
pub fn resolve_disks(entity: &Entity, profiles: &[Profile]) -> ResolvedDisks {
    let mut root_storage = InheritedValue::lxd_default("");
    let mut root_device = None;
    let mut devices = Vec::new();

    for inherited in resolve_devices(entity, profiles, is_disk_device) {
        if root_device.is_none() && is_root_disk(&inherited.device) {
            let pool = inherited
                .device
                .as_disk()
                .and_then(|disk| disk.pool.as_deref())
                .unwrap_or_default();
            root_storage = InheritedValue::from_profile(pool, &inherited.profile);
            root_device = Some(inherited.key);
            continue;
        }
        devices.push(inherited);
    }

    ResolvedDisks {
        root_storage,
        root_device,
        devices,
    }
}

/// Every device name in use, own or inherited, for collision checks
pub fn existing_device_names(entity: &Entity, profiles: &[Profile]) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = entity.devices.keys().cloned().collect();
    names.extend(
        resolve_devices(entity, profiles, |_| true)
            .into_iter()
            .map(|inherited| inherited.key),
    );
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceKind, DiskDevice, NicDevice};

    fn nic(network: &str) -> Device {
        Device::Nic(NicDevice {
            network: Some(network.to_string()),
            ..Default::default()
        })
    }

    fn disk(path: &str, pool: &str) -> Device {
        Device::Disk(DiskDevice {
            path: Some(path.to_string()),
            pool: Some(pool.to_string()),
            ..Default::default()
        })
    }

    fn instance(profiles: &[&str]) -> Entity {
        Entity::instance("c1", profiles.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_resolution_order_reverses() {
        let entity = instance(&["default", "web", "gpu"]);
        assert_eq!(resolution_order(&entity), vec!["gpu", "web", "default"]);
    }

    #[test]
    fn test_resolution_order_empty_for_profiles() {
        let entity = Entity::from_profile(&Profile::new("default"));
        assert!(resolution_order(&entity).is_empty());
    }

    #[test]
    fn test_last_applied_wins() {
        let profiles = vec![
            Profile::new("p1").with_config("limits.cpu", "1"),
            Profile::new("p2").with_config("limits.cpu", "4"),
        ];
        let value = resolve_field(&instance(&["p1", "p2"]), "limits_cpu", &profiles);
        assert_eq!(value.value, "4");
        assert_eq!(value.source, "p2 profile");
        assert!(!value.is_default());
    }

    #[test]
    fn test_empty_value_is_unset() {
        let profiles = vec![
            Profile::new("p1").with_config("limits.memory", "2GiB"),
            Profile::new("p2").with_config("limits.memory", ""),
        ];
        let value = resolve_field(&instance(&["p1", "p2"]), "limits_memory", &profiles);
        assert_eq!(value, InheritedValue::from_profile("2GiB", "p1"));
    }

    #[test]
    fn test_unknown_field_is_default() {
        let profiles = vec![Profile::new("p1").with_config("limits.cpu", "1")];
        let value = resolve_field(&instance(&["p1"]), "rootStorage", &profiles);
        assert_eq!(value.value, NO_VALUE);
        assert_eq!(value.source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_profile_entity_inherits_nothing() {
        let profiles = vec![Profile::new("default")
            .with_config("limits.cpu", "1")
            .with_device("eth0", nic("lxdbr0"))];
        let entity = Entity::from_profile(&profiles[0]);
        assert!(resolve_field(&entity, "limits_cpu", &profiles).is_default());
        assert!(resolve_devices(&entity, &profiles, |_| true).is_empty());
    }

    #[test]
    fn test_resolve_fields_skips_root_storage() {
        let profiles = vec![Profile::new("p1").with_config("snapshots.expiry", "2w")];
        let fields = resolve_fields(&instance(&["p1"]), &profiles);
        assert_eq!(fields.len(), FORM_FIELDS.len() - 1);
        let expiry = fields.iter().find(|f| f.key == "snapshots_expiry").unwrap();
        assert_eq!(expiry.value, "2w");
        assert_eq!(expiry.config_key, "snapshots.expiry");
    }

    #[test]
    fn test_first_seen_device_wins() {
        let profiles = vec![
            Profile::new("p1").with_device("eth0", nic("net-a")).with_device("eth1", nic("net-c")),
            Profile::new("p2").with_device("eth0", nic("net-b")),
        ];
        let devices = resolve_category(&instance(&["p1", "p2"]), &profiles, DeviceCategory::Nic);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].key, "eth0");
        assert_eq!(devices[0].source, "p2 profile");
        assert_eq!(devices[0].device, nic("net-b"));
        assert_eq!(devices[1].key, "eth1");
        assert_eq!(devices[1].profile, "p1");
    }

    #[test]
    fn test_shadowing_within_category_only() {
        let profiles = vec![
            Profile::new("p1").with_device("x", nic("net-a")),
            Profile::new("p2").with_device("x", Device::empty(DeviceKind::Usb)),
        ];
        let entity = instance(&["p1", "p2"]);

        let nics = resolve_category(&entity, &profiles, DeviceCategory::Nic);
        assert_eq!(nics.len(), 1);
        assert_eq!(nics[0].key, "x");
        assert_eq!(nics[0].source, "p1 profile");

        let other = resolve_category(&entity, &profiles, DeviceCategory::Other);
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].profile, "p2");
    }

    #[test]
    fn test_none_device_does_not_hide_other_category() {
        let profiles = vec![
            Profile::new("p1").with_device("extra", nic("net-a")),
            Profile::new("p2").with_device("extra", Device::None),
        ];
        let devices = resolve_category(&instance(&["p1", "p2"]), &profiles, DeviceCategory::Nic);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].profile, "p1");
    }

    #[test]
    fn test_other_category_filters() {
        let profiles = vec![Profile::new("p1")
            .with_device("usb0", Device::empty(DeviceKind::Usb))
            .with_device("gpu0", Device::empty(DeviceKind::Gpu))
            .with_device("root", disk("/", "default"))];
        let other = resolve_category(&instance(&["p1"]), &profiles, DeviceCategory::Other);
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].key, "usb0");
    }

    #[test]
    fn test_root_storage_from_highest_precedence() {
        let profiles = vec![
            Profile::new("base").with_device("root", disk("/", "default")),
            Profile::new("fast").with_device("root", disk("/", "nvme")),
        ];
        let root = resolve_root_storage(&instance(&["base", "fast"]), &profiles);
        assert_eq!(root, InheritedValue::from_profile("nvme", "fast"));
    }

    #[test]
    fn test_root_storage_default() {
        let root = resolve_root_storage(&instance(&[]), &[]);
        assert_eq!(root.value, "");
        assert_eq!(root.source, "LXD");
    }

    #[test]
    fn test_resolve_disks_lifts_root() {
        let profiles = vec![Profile::new("web")
            .with_device("root", disk("/", "default"))
            .with_device("data", disk("/data", "default"))];
        let disks = resolve_disks(&instance(&["web"]), &profiles);
        assert_eq!(disks.root_storage, InheritedValue::from_profile("default", "web"));
        assert_eq!(disks.root_device.as_deref(), Some("root"));
        assert_eq!(disks.devices.len(), 1);
        assert_eq!(disks.devices[0].key, "data");
    }

    #[test]
    fn test_existing_names_union() {
        let profiles = vec![Profile::new("p1")
            .with_device("eth0", nic("lxdbr0"))
            .with_device("root", disk("/", "default"))];
        let entity = instance(&["p1"])
            .with_device("eth0", nic("other"))
            .with_device("usb0", Device::empty(DeviceKind::Usb));
        let names = existing_device_names(&entity, &profiles);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["eth0".to_string(), "root".to_string(), "usb0".to_string()]
        );
    }
}
