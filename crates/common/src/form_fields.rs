//! Mapping between editor form fields and backend configuration keys

/// Form field → backend key, in the order the editors list them.
/// `rootStorage` is resolved from devices and has no config key.
pub const FORM_FIELDS: &[(&str, &str)] = &[
    ("rootStorage", ""),
    ("limits_cpu", "limits.cpu"),
    ("limits_memory", "limits.memory"),
    ("limits_memory_swap", "limits.memory.swap"),
    ("limits_disk_priority", "limits.disk.priority"),
    ("limits_processes", "limits.processes"),
    ("security_privileged", "security.privileged"),
    ("security_protection_delete", "security.protection.delete"),
    ("security_protection_shift", "security.protection.shift"),
    ("security_idmap_base", "security.idmap.base"),
    ("security_idmap_size", "security.idmap.size"),
    ("security_idmap_isolated", "security.idmap.isolated"),
    ("security_devlxd", "security.devlxd"),
    ("security_devlxd_images", "security.devlxd.images"),
    ("security_secureboot", "security.secureboot"),
    ("snapshots_pattern", "snapshots.pattern"),
    ("snapshots_expiry", "snapshots.expiry"),
    ("snapshots_schedule", "snapshots.schedule"),
    ("snapshots_schedule_stopped", "snapshots.schedule.stopped"),
    ("cloud_init_network_config", "cloud-init.network-config"),
    ("cloud_init_user_data", "cloud-init.user-data"),
    ("cloud_init_vendor_data", "cloud-init.vendor-data"),
];

/// Backend key for a form field; `None` for unknown fields and `rootStorage`
pub fn payload_key(form_field: &str) -> Option<&'static str> {
    FORM_FIELDS
        .iter()
        .find(|(field, _)| *field == form_field)
        .map(|(_, key)| *key)
        .filter(|key| !key.is_empty())
}

/// Form field for a backend key
pub fn form_field(payload_key: &str) -> Option<&'static str> {
    if payload_key.is_empty() {
        return None;
    }
    FORM_FIELDS
        .iter()
        .find(|(_, key)| *key == payload_key)
        .map(|(field, _)| *field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_key() {
        assert_eq!(payload_key("limits_memory_swap"), Some("limits.memory.swap"));
        assert_eq!(payload_key("cloud_init_user_data"), Some("cloud-init.user-data"));
        assert_eq!(payload_key("rootStorage"), None);
        assert_eq!(payload_key("nope"), None);
    }

    #[test]
    fn test_form_field_lookup() {
        assert_eq!(form_field("security.secureboot"), Some("security_secureboot"));
        assert_eq!(form_field(""), None);
    }

    #[test]
    fn test_keys_are_unique() {
        let mut fields: Vec<_> = FORM_FIELDS.iter().map(|(f, _)| *f).collect();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), FORM_FIELDS.len());
    }
}
