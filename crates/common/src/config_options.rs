//! Server configuration option metadata
//!
//! The server publishes its configuration keys grouped by entity and
//! category. Editors need them flattened, with the default pulled out of the
//! human readable `defaultdesc`, and descriptions rendered to HTML with
//! documentation references turned into links.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::device::Device;

/// One configuration key definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOption {
    #[serde(default)]
    pub defaultdesc: Option<String>,
    #[serde(default)]
    pub shortdesc: Option<String>,
    #[serde(default)]
    pub longdesc: Option<String>,
    #[serde(rename = "type", default)]
    pub option_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// A category lists its keys as single-entry maps, preserving server order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigCategory {
    #[serde(default)]
    pub keys: Vec<IndexMap<String, ConfigOption>>,
}

pub type ConfigOptionCategories = IndexMap<String, ConfigCategory>;

/// Entitlement description published per entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Server metadata: config options by entity, entitlements by entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMetadata {
    #[serde(default)]
    pub configs: IndexMap<String, ConfigOptionCategories>,
    #[serde(default)]
    pub entities: IndexMap<String, Vec<EntitlementMetadata>>,
}

impl ServerMetadata {
    /// Editable fields of a device's type, without `name`
    pub fn device_config_fields(&self, device: &Device) -> Vec<ConfigField> {
        self.configs
            .get(&device.config_option_key())
            .map(to_config_fields)
            .unwrap_or_default()
            .into_iter()
            .filter(|field| field.key != "name")
            .collect()
    }

    pub fn entitlement_description(&self, entity_type: &str, entitlement: &str) -> Option<&str> {
        self.entities
            .get(entity_type)?
            .iter()
            .find(|meta| meta.name == entitlement)
            .map(|meta| meta.description.as_str())
    }
}

/// A flattened configuration key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigField {
    pub key: String,
    pub category: String,
    pub default: String,
    pub shortdesc: String,
    #[serde(rename = "type")]
    pub option_type: String,
}

/// Default value from a `defaultdesc` such as "`0` (medium)"
fn default_value(defaultdesc: Option<&str>) -> String {
    let Some(desc) = defaultdesc else {
        return String::new();
    };
    if let Some(rest) = desc.strip_prefix('`') {
        if let Some(end) = rest.find('`') {
            return rest[..end].to_string();
        }
    }
    desc.to_string()
}

/// Flatten categories into fields in server order
pub fn to_config_fields(categories: &ConfigOptionCategories) -> Vec<ConfigField> {
    categories
        .iter()
        .flat_map(|(category, group)| {
            group.keys.iter().flat_map(move |entry| {
                entry.iter().map(move |(key, option)| ConfigField {
                    key: key.clone(),
                    category: category.clone(),
                    default: default_value(option.defaultdesc.as_deref()),
                    shortdesc: option.shortdesc.clone().unwrap_or_default(),
                    option_type: option.option_type.clone(),
                })
            })
        })
        .collect()
}

static DOC_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{ref\}`([^`]+)`").expect("valid doc ref pattern"));
static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid code span pattern"));

/// Documentation page holding an anchor, by anchor prefix
const DOC_PAGES: &[(&str, &str)] = &[
    ("instance-options", "reference/instance_options/"),
    ("server-options", "server/"),
    ("network-", "reference/networks/"),
    ("storage-", "reference/storage_drivers/"),
    ("project-", "reference/projects/"),
    ("devices-", "reference/devices/"),
];

fn doc_link(docs_base: &str, target: &str) -> String {
    let base = docs_base.trim_end_matches('/');
    let label = target.replace('-', " ");
    let href = DOC_PAGES
        .iter()
        .find(|(prefix, _)| target.starts_with(prefix))
        .map(|(_, page)| format!("{}/{}#{}", base, page, target))
        .unwrap_or_else(|| format!("{}/search/?q={}", base, target));
    format!(
        r#"<a href="{}" target="_blank" rel="noreferrer">{}</a>"#,
        href, label
    )
}

/// Render a config description: line breaks, doc references and code spans
pub fn config_description_to_html(description: &str, docs_base: &str) -> String {
    let with_breaks = description.replace('\n', "<br>");
    let with_links = DOC_REF.replace_all(&with_breaks, |caps: &Captures| doc_link(docs_base, &caps[1]));
    CODE_SPAN
        .replace_all(&with_links, "<code>$1</code>")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;

    fn example() -> ConfigOptionCategories {
        serde_json::from_str(
            r#"{
                "acme": {"keys": [
                    {"acme.agree_tos": {"defaultdesc": "`false`", "shortdesc": "Agree to ACME terms of service", "type": "bool"}},
                    {"acme.ca_url": {"defaultdesc": "`https://acme-v02.api.letsencrypt.org/`", "shortdesc": "", "type": "string"}}
                ]},
                "cluster": {"keys": [
                    {"cluster.healing_threshold": {"defaultdesc": "`0` (medium)", "shortdesc": "Threshold when to evacuate", "type": "integer"}},
                    {"cluster.https_address": {"shortdesc": "Address to use for clustering traffic", "type": "string"}}
                ]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_to_config_fields() {
        let fields = to_config_fields(&example());
        assert_eq!(fields.len(), 4);

        assert_eq!(fields[0].key, "acme.agree_tos");
        assert_eq!(fields[0].default, "false");
        assert_eq!(fields[0].option_type, "bool");
        assert_eq!(fields[0].category, "acme");

        assert_eq!(fields[1].shortdesc, "");
        assert_eq!(fields[1].default, "https://acme-v02.api.letsencrypt.org/");

        assert_eq!(fields[2].key, "cluster.healing_threshold");
        assert_eq!(fields[2].default, "0");
        assert_eq!(fields[2].category, "cluster");

        assert_eq!(fields[3].default, "");
        assert_eq!(fields[3].shortdesc, "Address to use for clustering traffic");
    }

    #[test]
    fn test_unquoted_default_kept() {
        assert_eq!(default_value(Some("Inherited from pool")), "Inherited from pool");
        assert_eq!(default_value(Some("`unterminated")), "`unterminated");
    }

    #[test]
    fn test_description_to_html() {
        let input = "Specify a Pongo2 template string that represents the snapshot name.\nThis template is used for scheduled snapshots and for unnamed snapshots.\n\nSee {ref}`instance-options-snapshots-names` for more information.";
        let result = config_description_to_html(input, "https://docs.example.org");
        assert_eq!(
            result,
            r#"Specify a Pongo2 template string that represents the snapshot name.<br>This template is used for scheduled snapshots and for unnamed snapshots.<br><br>See <a href="https://docs.example.org/reference/instance_options/#instance-options-snapshots-names" target="_blank" rel="noreferrer">instance options snapshots names</a> for more information."#
        );
    }

    #[test]
    fn test_code_spans() {
        let result = config_description_to_html("Set to `true` to enable", "https://docs.example.org/");
        assert_eq!(result, "Set to <code>true</code> to enable");
    }

    #[test]
    fn test_device_config_fields() {
        let mut metadata = ServerMetadata::default();
        let usb: ConfigOptionCategories = serde_json::from_str(
            r#"{"device-conf": {"keys": [
                {"name": {"type": "string"}},
                {"vendorid": {"shortdesc": "Vendor ID", "type": "string"}}
            ]}}"#,
        )
        .unwrap();
        metadata.configs.insert("device-unix-usb".to_string(), usb);

        let fields = metadata.device_config_fields(&Device::empty(DeviceKind::Usb));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, "vendorid");
        assert!(metadata.device_config_fields(&Device::empty(DeviceKind::Tpm)).is_empty());
    }
}
