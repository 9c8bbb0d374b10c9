//! Core types for LxConsole

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::device::{string_map, Device};
use crate::permissions::Permission;
use crate::{Error, Result};

/// Configuration mapping as returned by the backend
pub type ConfigMap = IndexMap<String, String>;

/// Named device mapping as returned by the backend
pub type DeviceMap = IndexMap<String, Device>;

/// A named bundle of configuration and devices instances can inherit from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "string_map::deserialize")]
    pub config: ConfigMap,
    #[serde(default)]
    pub devices: DeviceMap,
    #[serde(default)]
    pub used_by: Vec<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.config.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_device(mut self, name: &str, device: Device) -> Self {
        self.devices.insert(name.to_string(), device);
        self
    }
}

/// Instance type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceType {
    Container,
    VirtualMachine,
}

impl Default for InstanceType {
    fn default() -> Self {
        Self::Container
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceType::Container => write!(f, "container"),
            InstanceType::VirtualMachine => write!(f, "virtual-machine"),
        }
    }
}

/// Instance status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Running,
    Stopped,
    Frozen,
    Starting,
    Stopping,
    Freezing,
    Restarting,
    Error,
    #[serde(other)]
    Unknown,
}

impl Default for InstanceStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceStatus::Running => "Running",
            InstanceStatus::Stopped => "Stopped",
            InstanceStatus::Frozen => "Frozen",
            InstanceStatus::Starting => "Starting",
            InstanceStatus::Stopping => "Stopping",
            InstanceStatus::Freezing => "Freezing",
            InstanceStatus::Restarting => "Restarting",
            InstanceStatus::Error => "Error",
            InstanceStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Request that brings an instance up from its current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartAction {
    Start,
    Unfreeze,
}

impl StartAction {
    /// `None` when starting is not possible from `status`
    pub fn for_status(status: InstanceStatus) -> Option<Self> {
        match status {
            InstanceStatus::Stopped => Some(StartAction::Start),
            InstanceStatus::Frozen => Some(StartAction::Unfreeze),
            _ => None,
        }
    }
}

/// Address assigned to an instance interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAddress {
    pub family: String,
    pub address: String,
    #[serde(default)]
    pub netmask: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceState {
    #[serde(default)]
    pub addresses: Vec<InstanceAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub network: Option<IndexMap<String, InterfaceState>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub name: String,
}

/// Instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(rename = "type", default)]
    pub instance_type: InstanceType,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default, deserialize_with = "string_map::deserialize")]
    pub config: ConfigMap,
    #[serde(default)]
    pub devices: DeviceMap,
    #[serde(default)]
    pub expanded_devices: DeviceMap,
    #[serde(default)]
    pub state: Option<InstanceState>,
    #[serde(default)]
    pub snapshots: Option<Vec<InstanceSnapshot>>,
}

impl Instance {
    /// Addresses of `iface` in `family` ("inet" or "inet6")
    pub fn addresses(&self, iface: &str, family: &str) -> Vec<&str> {
        self.state
            .as_ref()
            .and_then(|state| state.network.as_ref())
            .and_then(|network| network.get(iface))
            .map(|iface| {
                iface
                    .addresses
                    .iter()
                    .filter(|addr| addr.family == family)
                    .map(|addr| addr.address.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn start_action(&self) -> Option<StartAction> {
        StartAction::for_status(self.status)
    }
}

/// Managed network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    #[serde(rename = "type", default)]
    pub network_type: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default, deserialize_with = "string_map::deserialize")]
    pub config: ConfigMap,
}

/// What kind of entity is being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum EntityKind {
    /// Instances inherit from an ordered list of profiles, last applied wins
    Instance {
        profiles: Vec<String>,
        #[serde(default)]
        instance_type: InstanceType,
    },
    Profile,
}

/// The instance or profile whose configuration is being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(flatten)]
    pub kind: EntityKind,
    #[serde(default, deserialize_with = "string_map::deserialize")]
    pub config: ConfigMap,
    #[serde(default)]
    pub devices: DeviceMap,
}

impl Entity {
    pub fn instance(name: impl Into<String>, profiles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::Instance {
                profiles,
                instance_type: InstanceType::Container,
            },
            config: ConfigMap::new(),
            devices: DeviceMap::new(),
        }
    }

    pub fn from_instance(instance: &Instance) -> Self {
        Self {
            name: instance.name.clone(),
            kind: EntityKind::Instance {
                profiles: instance.profiles.clone(),
                instance_type: instance.instance_type,
            },
            config: instance.config.clone(),
            devices: instance.devices.clone(),
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            kind: EntityKind::Profile,
            config: profile.config.clone(),
            devices: profile.devices.clone(),
        }
    }

    pub fn with_device(mut self, name: &str, device: Device) -> Self {
        self.devices.insert(name.to_string(), device);
        self
    }

    /// Applied profiles in declaration order; empty for profiles
    pub fn profiles(&self) -> &[String] {
        match &self.kind {
            EntityKind::Instance { profiles, .. } => profiles,
            EntityKind::Profile => &[],
        }
    }

    pub fn instance_type(&self) -> Option<InstanceType> {
        match &self.kind {
            EntityKind::Instance { instance_type, .. } => Some(*instance_type),
            EntityKind::Profile => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self.kind, EntityKind::Instance { .. })
    }
}

/// Already-fetched snapshot of backend objects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Inventory {
    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            other => Err(Error::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn instance(&self, name: &str) -> Result<&Instance> {
        self.instances
            .iter()
            .find(|instance| instance.name == name)
            .ok_or_else(|| Error::not_found("instance", name))
    }

    pub fn profile(&self, name: &str) -> Result<&Profile> {
        crate::inheritance::find_profile(name, &self.profiles)
            .ok_or_else(|| Error::not_found("profile", name))
    }

    /// Entity for an instance or, failing that, a profile of that name
    pub fn entity(&self, name: &str) -> Result<Entity> {
        if let Ok(instance) = self.instance(name) {
            return Ok(Entity::from_instance(instance));
        }
        self.profile(name).map(Entity::from_profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_start_action() {
        assert_eq!(StartAction::for_status(InstanceStatus::Stopped), Some(StartAction::Start));
        assert_eq!(StartAction::for_status(InstanceStatus::Frozen), Some(StartAction::Unfreeze));
        assert_eq!(StartAction::for_status(InstanceStatus::Running), None);
        assert_eq!(StartAction::for_status(InstanceStatus::Starting), None);
    }

    #[test]
    fn test_unknown_status() {
        let instance: Instance =
            serde_json::from_str(r#"{"name":"c1","status":"Migrating"}"#).unwrap();
        assert_eq!(instance.status, InstanceStatus::Unknown);
        assert_eq!(instance.start_action(), None);
    }

    #[test]
    fn test_addresses() {
        let instance: Instance = serde_json::from_str(
            r#"{
                "name": "c1",
                "status": "Running",
                "type": "container",
                "state": {"network": {"eth0": {"addresses": [
                    {"family": "inet", "address": "10.0.0.2"},
                    {"family": "inet6", "address": "fd42::2"},
                    {"family": "inet", "address": "10.0.0.3"}
                ]}}}
            }"#,
        )
        .unwrap();
        assert_eq!(instance.addresses("eth0", "inet"), vec!["10.0.0.2", "10.0.0.3"]);
        assert_eq!(instance.addresses("eth0", "inet6"), vec!["fd42::2"]);
        assert!(instance.addresses("eth1", "inet").is_empty());
        assert_eq!(instance.snapshot_count(), 0);
    }

    #[test]
    fn test_entity_from_profile_has_no_profiles() {
        let profile = Profile::new("default").with_config("limits.cpu", "2");
        let entity = Entity::from_profile(&profile);
        assert!(entity.profiles().is_empty());
        assert!(!entity.is_instance());
        assert_eq!(entity.instance_type(), None);
    }

    #[test]
    fn test_entity_serde_flattens_kind() {
        let entity: Entity = serde_json::from_str(
            r#"{"name":"c1","entity_type":"instance","profiles":["default","web"]}"#,
        )
        .unwrap();
        assert_eq!(entity.profiles(), ["default".to_string(), "web".to_string()]);
        assert_eq!(entity.instance_type(), Some(InstanceType::Container));
    }

    #[test]
    fn test_inventory_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "profiles:\n  - name: default\n    config:\n      limits.cpu: \"2\"\ninstances:\n  - name: c1\n    status: Stopped\n    profiles: [default]\n"
        )
        .unwrap();

        let inventory = Inventory::load(file.path()).unwrap();
        assert_eq!(inventory.profiles.len(), 1);
        let entity = inventory.entity("c1").unwrap();
        assert_eq!(entity.profiles(), ["default".to_string()]);
        assert!(inventory.entity("default").is_ok());
        assert!(matches!(
            inventory.entity("missing"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_inventory_load_yaml_bare_scalars() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "profiles:\n  - name: default\n    config:\n      limits.cpu: 2\n      security.nesting: true\n      boot.host_shutdown_timeout: 2.5\n      user.note:\n    devices:\n      eth0:\n        type: nic\n        network: lxdbr0\n        mtu: 1500\n"
        )
        .unwrap();

        let inventory = Inventory::load(file.path()).unwrap();
        let profile = inventory.profile("default").unwrap();
        assert_eq!(profile.config.get("limits.cpu").map(String::as_str), Some("2"));
        assert_eq!(profile.config.get("security.nesting").map(String::as_str), Some("true"));
        assert_eq!(profile.config.get("boot.host_shutdown_timeout").map(String::as_str), Some("2.5"));
        assert_eq!(profile.config.get("user.note").map(String::as_str), Some(""));

        let eth0 = profile.devices.get("eth0").and_then(Device::as_nic).unwrap();
        assert_eq!(eth0.network.as_deref(), Some("lxdbr0"));
        assert_eq!(eth0.attributes.get("mtu").map(String::as_str), Some("1500"));
    }

    #[test]
    fn test_inventory_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(matches!(
            Inventory::load(file.path()),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
