//! Permission entries for identity groups
//!
//! Permissions are (entity type, entity URL, entitlement) triples. The group
//! editor lists them sorted and offers select options built from the
//! permissions the server reports as assignable.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use url::Url;

use crate::config_options::ServerMetadata;

/// A permission as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub entity_type: String,
    pub url: String,
    pub entitlement: String,
}

/// A permission row in the group editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPermission {
    pub id: String,
    pub entity_type: String,
    pub url: String,
    pub entitlement: String,
    pub resource_label: String,
}

impl FormPermission {
    pub fn new(permission: &Permission, resource_label: impl Into<String>) -> Self {
        Self {
            id: format!("{}{}{}", permission.entity_type, permission.url, permission.entitlement),
            entity_type: permission.entity_type.clone(),
            url: permission.url.clone(),
            entitlement: permission.entitlement.clone(),
            resource_label: resource_label.into(),
        }
    }
}

/// Entity types listed ahead of the alphabetical rest
const LEADING_ENTITY_TYPES: &[&str] = &["server", "identity", "group", "project"];

fn entity_type_rank(entity_type: &str) -> usize {
    LEADING_ENTITY_TYPES
        .iter()
        .position(|t| *t == entity_type)
        .unwrap_or(LEADING_ENTITY_TYPES.len())
}

/// Order by entity type, then resource label, then entitlement
pub fn permission_sort(a: &FormPermission, b: &FormPermission) -> Ordering {
    entity_type_rank(&a.entity_type)
        .cmp(&entity_type_rank(&b.entity_type))
        .then_with(|| a.entity_type.cmp(&b.entity_type))
        .then_with(|| a.resource_label.cmp(&b.resource_label))
        .then_with(|| a.entitlement.cmp(&b.entitlement))
}

pub fn sort_permissions(permissions: &mut [FormPermission]) {
    permissions.sort_by(permission_sort);
}

/// Entry of a select input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SelectOption {
    fn placeholder() -> Self {
        Self {
            label: "Select an option".to_string(),
            value: String::new(),
            disabled: Some(true),
            title: Some(String::new()),
        }
    }

    fn heading(label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: String::new(),
            disabled: Some(true),
            title: None,
        }
    }

    fn option(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            disabled: None,
            title: None,
        }
    }
}

/// Entity URLs are server-relative; resolve them against a placeholder origin
fn parse_entity_url(url: &str) -> Option<Url> {
    Url::parse("https://lxd.invalid/").and_then(|base| base.join(url)).ok()
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Human label for an entity URL, e.g. "instance-1 (project: default) "
pub fn resource_label(
    entity_type: &str,
    url: &str,
    image_names: &HashMap<String, String>,
    identity_names: &HashMap<String, String>,
) -> String {
    if entity_type == "server" {
        return "server".to_string();
    }

    let Some(parsed) = parse_entity_url(url) else {
        return url.to_string();
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let last = segments.last().map(|s| decode_segment(s)).unwrap_or_default();

    let name = match entity_type {
        "image" => image_names.get(&last).cloned().unwrap_or(last),
        "identity" => identity_names.get(&last).cloned().unwrap_or(last),
        _ => last,
    };

    let mut qualifiers = String::new();
    if let Some(pos) = segments.iter().position(|s| *s == "storage-pools") {
        if let Some(pool) = segments.get(pos + 1) {
            qualifiers.push_str(&format!("(pool: {}) ", decode_segment(pool)));
        }
    }
    for (_, project) in parsed.query_pairs().filter(|(key, _)| key == "project") {
        qualifiers.push_str(&format!("(project: {}) ", project));
    }

    if qualifiers.is_empty() {
        name
    } else {
        format!("{} {}", name, qualifiers)
    }
}

/// Options for the resource select of `entity_type`, one per distinct URL
pub fn generate_resource_options(
    entity_type: &str,
    permissions: &[Permission],
    image_names: &HashMap<String, String>,
    identity_names: &HashMap<String, String>,
) -> Vec<SelectOption> {
    let mut seen = HashSet::new();
    let mut options = vec![SelectOption::placeholder()];
    for permission in permissions.iter().filter(|p| p.entity_type == entity_type) {
        if !seen.insert(permission.url.as_str()) {
            continue;
        }
        let label = resource_label(entity_type, &permission.url, image_names, identity_names);
        options.push(SelectOption::option(label, permission.url.clone()));
    }
    options
}

/// Options for the entitlement select, built-in roles ahead of `can_*` entitlements
pub fn generate_entitlement_options(
    entity_type: &str,
    permissions: &[Permission],
    metadata: Option<&ServerMetadata>,
) -> Vec<SelectOption> {
    let mut seen = HashSet::new();
    let mut built_in = Vec::new();
    let mut granular = Vec::new();

    for permission in permissions.iter().filter(|p| p.entity_type == entity_type) {
        if !seen.insert(permission.entitlement.as_str()) {
            continue;
        }
        let mut option = SelectOption::option(&permission.entitlement, &permission.entitlement);
        option.title = metadata
            .and_then(|m| m.entitlement_description(entity_type, &permission.entitlement))
            .map(str::to_string);
        if permission.entitlement.starts_with("can_") {
            granular.push(option);
        } else {
            built_in.push(option);
        }
    }

    let mut options = vec![SelectOption::placeholder()];
    if !built_in.is_empty() {
        options.push(SelectOption::heading("Built-in roles"));
        options.extend(built_in);
    }
    if !granular.is_empty() {
        options.push(SelectOption::heading("Granular entitlements"));
        options.extend(granular);
    }
    options
}

/// "identity" → "identities" when `count != 1`
pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{}es", word);
    }
    format!("{}s", word)
}
