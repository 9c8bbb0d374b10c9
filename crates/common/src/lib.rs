//! LxConsole Common Library
//!
//! Shared types and the pure logic behind the console editors: profile
//! inheritance resolution, device overrides, configuration option metadata,
//! permission listings and the network map.

pub mod config_options;
pub mod device;
pub mod error;
pub mod form_devices;
pub mod form_fields;
pub mod inheritance;
pub mod permissions;
pub mod topology;
pub mod types;

// Re-export commonly used types
pub use device::{Device, DeviceCategory, DeviceKind};
pub use error::{Error, Result};
pub use inheritance::{
    existing_device_names, find_profile, resolution_order, resolve_category, resolve_devices,
    resolve_disks, resolve_field, resolve_fields, resolve_root_storage, InheritedDevice,
    InheritedField, InheritedValue, ResolvedDisks,
};
pub use topology::NetworkMap;
pub use types::*;

/// LxConsole version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration directory
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".lxconsole")
}

/// Default CLI configuration file
pub fn default_config_path() -> std::path::PathBuf {
    default_store_path().join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
