//! Device definitions
//!
//! Devices are a closed tagged union keyed by the backend `type` field. Disk
//! and NIC devices expose the attributes the resolvers care about as typed
//! fields; everything else is kept as ordered string attributes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Free-form device attributes in backend order
pub type DeviceAttributes = IndexMap<String, String>;

/// String maps that also accept bare scalars, as hand-written YAML has them
pub(crate) mod string_map {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Bool(bool),
        Int(i64),
        UInt(u64),
        Float(f64),
        Null(()),
    }

    impl From<Scalar> for String {
        fn from(scalar: Scalar) -> Self {
            match scalar {
                Scalar::String(value) => value,
                Scalar::Bool(value) => value.to_string(),
                Scalar::Int(value) => value.to_string(),
                Scalar::UInt(value) => value.to_string(),
                Scalar::Float(value) => value.to_string(),
                Scalar::Null(()) => String::new(),
            }
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = IndexMap::<String, Scalar>::deserialize(deserializer)?;
        Ok(map.into_iter().map(|(key, value)| (key, value.into())).collect())
    }
}

/// Disk device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskDevice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten, deserialize_with = "string_map::deserialize")]
    pub attributes: DeviceAttributes,
}

impl DiskDevice {
    /// Whether this disk is mounted at `/`
    pub fn is_root(&self) -> bool {
        self.path.as_deref() == Some("/")
    }
}

/// Network interface device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicDevice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(flatten, deserialize_with = "string_map::deserialize")]
    pub attributes: DeviceAttributes,
}

/// Any device with no typed attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericDevice {
    #[serde(flatten, deserialize_with = "string_map::deserialize")]
    pub attributes: DeviceAttributes,
}

/// A device definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Device {
    Disk(DiskDevice),
    Nic(NicDevice),
    Gpu(GenericDevice),
    Usb(GenericDevice),
    Pci(GenericDevice),
    Tpm(GenericDevice),
    UnixBlock(GenericDevice),
    UnixChar(GenericDevice),
    UnixHotplug(GenericDevice),
    Infiniband(GenericDevice),
    Proxy(GenericDevice),
    /// Local override marker that hides an inherited device of the same name
    None,
}

impl Device {
    /// Create an empty device of the given kind
    pub fn empty(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Disk => Device::Disk(DiskDevice::default()),
            DeviceKind::Nic => Device::Nic(NicDevice::default()),
            DeviceKind::Gpu => Device::Gpu(GenericDevice::default()),
            DeviceKind::Usb => Device::Usb(GenericDevice::default()),
            DeviceKind::Pci => Device::Pci(GenericDevice::default()),
            DeviceKind::Tpm => Device::Tpm(GenericDevice::default()),
            DeviceKind::UnixBlock => Device::UnixBlock(GenericDevice::default()),
            DeviceKind::UnixChar => Device::UnixChar(GenericDevice::default()),
            DeviceKind::UnixHotplug => Device::UnixHotplug(GenericDevice::default()),
            DeviceKind::Infiniband => Device::Infiniband(GenericDevice::default()),
            DeviceKind::Proxy => Device::Proxy(GenericDevice::default()),
            DeviceKind::None => Device::None,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Disk(_) => DeviceKind::Disk,
            Device::Nic(_) => DeviceKind::Nic,
            Device::Gpu(_) => DeviceKind::Gpu,
            Device::Usb(_) => DeviceKind::Usb,
            Device::Pci(_) => DeviceKind::Pci,
            Device::Tpm(_) => DeviceKind::Tpm,
            Device::UnixBlock(_) => DeviceKind::UnixBlock,
            Device::UnixChar(_) => DeviceKind::UnixChar,
            Device::UnixHotplug(_) => DeviceKind::UnixHotplug,
            Device::Infiniband(_) => DeviceKind::Infiniband,
            Device::Proxy(_) => DeviceKind::Proxy,
            Device::None => DeviceKind::None,
        }
    }

    pub fn as_disk(&self) -> Option<&DiskDevice> {
        match self {
            Device::Disk(disk) => Some(disk),
            _ => None,
        }
    }

    pub fn as_nic(&self) -> Option<&NicDevice> {
        match self {
            Device::Nic(nic) => Some(nic),
            _ => None,
        }
    }

    /// Attribute rows for display, excluding `type` and `name`
    pub fn attributes(&self) -> Vec<(&str, &str)> {
        fn push_typed<'a>(rows: &mut Vec<(&'a str, &'a str)>, key: &'a str, value: &'a Option<String>) {
            if let Some(value) = value {
                rows.push((key, value.as_str()));
            }
        }

        let mut rows = Vec::new();
        let extra = match self {
            Device::Disk(disk) => {
                push_typed(&mut rows, "path", &disk.path);
                push_typed(&mut rows, "pool", &disk.pool);
                push_typed(&mut rows, "source", &disk.source);
                &disk.attributes
            }
            Device::Nic(nic) => {
                push_typed(&mut rows, "network", &nic.network);
                push_typed(&mut rows, "parent", &nic.parent);
                &nic.attributes
            }
            Device::Gpu(d)
            | Device::Usb(d)
            | Device::Pci(d)
            | Device::Tpm(d)
            | Device::UnixBlock(d)
            | Device::UnixChar(d)
            | Device::UnixHotplug(d)
            | Device::Infiniband(d)
            | Device::Proxy(d) => &d.attributes,
            Device::None => return rows,
        };

        rows.extend(
            extra
                .iter()
                .filter(|(key, _)| key.as_str() != "name" && key.as_str() != "type")
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        rows
    }

    /// Key of this device type in the server's config option metadata
    pub fn config_option_key(&self) -> String {
        self.kind().config_option_key()
    }
}

/// The bare device type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    Disk,
    Nic,
    Gpu,
    Usb,
    Pci,
    Tpm,
    UnixBlock,
    UnixChar,
    UnixHotplug,
    Infiniband,
    Proxy,
    None,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 12] = [
        DeviceKind::Disk,
        DeviceKind::Nic,
        DeviceKind::Gpu,
        DeviceKind::Usb,
        DeviceKind::Pci,
        DeviceKind::Tpm,
        DeviceKind::UnixBlock,
        DeviceKind::UnixChar,
        DeviceKind::UnixHotplug,
        DeviceKind::Infiniband,
        DeviceKind::Proxy,
        DeviceKind::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Disk => "disk",
            DeviceKind::Nic => "nic",
            DeviceKind::Gpu => "gpu",
            DeviceKind::Usb => "usb",
            DeviceKind::Pci => "pci",
            DeviceKind::Tpm => "tpm",
            DeviceKind::UnixBlock => "unix-block",
            DeviceKind::UnixChar => "unix-char",
            DeviceKind::UnixHotplug => "unix-hotplug",
            DeviceKind::Infiniband => "infiniband",
            DeviceKind::Proxy => "proxy",
            DeviceKind::None => "none",
        }
    }

    /// Metadata key, `device-<type>`; USB options are published as `unix-usb`
    pub fn config_option_key(&self) -> String {
        match self {
            DeviceKind::Usb => "device-unix-usb".to_string(),
            other => format!("device-{}", other.as_str()),
        }
    }

    /// Prefix used when generating a fresh device name
    pub fn name_prefix(&self) -> &'static str {
        match self {
            DeviceKind::Nic => "eth",
            DeviceKind::Disk => "disk-device",
            DeviceKind::Gpu => "gpu",
            DeviceKind::Proxy => "proxy",
            _ => "custom-device",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown device type: {}", s)))
    }
}

/// Device groupings used by the device editors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    Disk,
    Nic,
    Gpu,
    Proxy,
    Other,
}

impl DeviceCategory {
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            DeviceCategory::Disk => is_disk_device(device),
            DeviceCategory::Nic => is_nic_device(device),
            DeviceCategory::Gpu => is_gpu_device(device),
            DeviceCategory::Proxy => is_proxy_device(device),
            DeviceCategory::Other => is_other_device(device),
        }
    }
}

impl FromStr for DeviceCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disk" => Ok(DeviceCategory::Disk),
            "nic" | "network" => Ok(DeviceCategory::Nic),
            "gpu" => Ok(DeviceCategory::Gpu),
            "proxy" => Ok(DeviceCategory::Proxy),
            "other" => Ok(DeviceCategory::Other),
            _ => Err(Error::InvalidConfig(format!("unknown device category: {}", s))),
        }
    }
}

pub fn is_disk_device(device: &Device) -> bool {
    matches!(device, Device::Disk(_))
}

pub fn is_nic_device(device: &Device) -> bool {
    matches!(device, Device::Nic(_))
}

pub fn is_gpu_device(device: &Device) -> bool {
    matches!(device, Device::Gpu(_))
}

pub fn is_proxy_device(device: &Device) -> bool {
    matches!(device, Device::Proxy(_))
}

pub fn is_none_device(device: &Device) -> bool {
    matches!(device, Device::None)
}

/// Devices edited on the generic "other devices" form
pub fn is_other_device(device: &Device) -> bool {
    !matches!(
        device,
        Device::Disk(_) | Device::Nic(_) | Device::Gpu(_) | Device::Proxy(_) | Device::None
    )
}

/// Human readable label for a device attribute key
pub fn device_key_to_label(key: &str) -> String {
    let known = match key {
        "productid" => Some("Product ID"),
        "vendorid" => Some("Vendor ID"),
        "uid" => Some("UID"),
        "gid" => Some("GID"),
        "pci" => Some("PCI address"),
        "id" => Some("ID"),
        "mtu" => Some("MTU"),
        "hwaddr" => Some("MAC address"),
        "ipv4.address" => Some("IPv4 address"),
        "ipv6.address" => Some("IPv6 address"),
        _ => None,
    };
    if let Some(label) = known {
        return label.to_string();
    }

    let spaced: String = key
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_deserialize() {
        let device: Device =
            serde_json::from_str(r#"{"type":"disk","path":"/","pool":"default","size":"10GiB"}"#)
                .unwrap();
        let disk = device.as_disk().unwrap();
        assert!(disk.is_root());
        assert_eq!(disk.pool.as_deref(), Some("default"));
        assert_eq!(disk.attributes.get("size").map(String::as_str), Some("10GiB"));
        assert!(!disk.attributes.contains_key("type"));
    }

    #[test]
    fn test_none_device_ignores_extra_fields() {
        let device: Device = serde_json::from_str(r#"{"type":"none","name":"eth0"}"#).unwrap();
        assert_eq!(device, Device::None);
        assert_eq!(serde_json::to_string(&device).unwrap(), r#"{"type":"none"}"#);
    }

    #[test]
    fn test_kebab_case_tags() {
        let device: Device =
            serde_json::from_str(r#"{"type":"unix-char","source":"/dev/tty0"}"#).unwrap();
        assert_eq!(device.kind(), DeviceKind::UnixChar);
        assert_eq!(device.attributes(), vec![("source", "/dev/tty0")]);
    }

    #[test]
    fn test_categories() {
        let usb = Device::empty(DeviceKind::Usb);
        let gpu = Device::empty(DeviceKind::Gpu);
        assert!(is_other_device(&usb));
        assert!(!is_other_device(&gpu));
        assert!(!is_other_device(&Device::None));
        assert!(DeviceCategory::Gpu.matches(&gpu));
        assert!(!DeviceCategory::Disk.matches(&Device::None));
    }

    #[test]
    fn test_config_option_key() {
        assert_eq!(Device::empty(DeviceKind::Usb).config_option_key(), "device-unix-usb");
        assert_eq!(Device::empty(DeviceKind::UnixBlock).config_option_key(), "device-unix-block");
    }

    #[test]
    fn test_device_kind_parse() {
        assert_eq!("unix-hotplug".parse::<DeviceKind>().unwrap(), DeviceKind::UnixHotplug);
        assert!("floppy".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_key_labels() {
        assert_eq!(device_key_to_label("productid"), "Product ID");
        assert_eq!(device_key_to_label("limits.egress"), "Limits egress");
        assert_eq!(device_key_to_label("required"), "Required");
        assert_eq!(device_key_to_label(""), "");
    }
}
