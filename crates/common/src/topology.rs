//! Network topology graph
//!
//! Nodes are managed networks and instances; an edge joins an instance to
//! every network one of its expanded NIC devices attaches to.

use serde::Serialize;
use std::fmt::Write;
use tracing::debug;

use crate::types::{Instance, InstanceStatus, Network};

const NETWORK_COLOR: &str = "#0066cc";
const RUNNING_COLOR: &str = "#0E8420";
const IDLE_COLOR: &str = "#D9D9D9";
const EDGE_COLOR: &str = "#D9D9D9";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Network,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    Square,
    Ellipse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub shape: NodeShape,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapEdge {
    pub source: String,
    pub target: String,
    /// NIC device name on the instance
    pub device: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkMap {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
}

fn instance_color(instance: &Instance) -> &'static str {
    match instance.status {
        InstanceStatus::Running => RUNNING_COLOR,
        _ => IDLE_COLOR,
    }
}

impl NetworkMap {
    /// Network nodes first, then instances, then edges
    pub fn build(instances: &[Instance], networks: &[Network]) -> Self {
        let mut map = NetworkMap::default();

        map.nodes.extend(networks.iter().map(|network| MapNode {
            id: network.name.clone(),
            label: network.name.clone(),
            kind: NodeKind::Network,
            shape: NodeShape::Square,
            color: NETWORK_COLOR,
        }));

        map.nodes.extend(instances.iter().map(|instance| MapNode {
            id: instance.name.clone(),
            label: instance.name.clone(),
            kind: NodeKind::Instance,
            shape: NodeShape::Ellipse,
            color: instance_color(instance),
        }));

        for instance in instances {
            for (device, nic) in instance
                .expanded_devices
                .iter()
                .filter_map(|(name, device)| device.as_nic().map(|nic| (name, nic)))
            {
                let Some(network) = nic.network.as_deref() else {
                    debug!(instance = %instance.name, device = %device, "NIC without managed network, no edge");
                    continue;
                };
                map.edges.push(MapEdge {
                    source: instance.name.clone(),
                    target: network.to_string(),
                    device: device.clone(),
                    color: EDGE_COLOR,
                });
            }
        }

        map
    }

    /// Edges whose target is not a known network node
    pub fn dangling_edges(&self) -> Vec<&MapEdge> {
        self.edges
            .iter()
            .filter(|edge| {
                !self
                    .nodes
                    .iter()
                    .any(|node| node.kind == NodeKind::Network && node.id == edge.target)
            })
            .collect()
    }

    /// Render as a Graphviz DOT graph
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("graph network_map {\n");
        for node in &self.nodes {
            let shape = match node.shape {
                NodeShape::Square => "box",
                NodeShape::Ellipse => "ellipse",
            };
            let _ = writeln!(
                dot,
                "  \"{}\" [label=\"{}\", shape={}, style=filled, fillcolor=\"{}\"];",
                dot_escape(&node.id), dot_escape(&node.label), shape, dot_escape(&node.color)
            );
        }
        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "  \"{}\" -- \"{}\" [label=\"{}\", color=\"{}\"];",
                dot_escape(&edge.source), dot_escape(&edge.target), dot_escape(&edge.device), dot_escape(&edge.color)
            );
        }
        dot.push_str("}\n");
        dot
    }
}

/// Escape text for a double-quoted DOT string
fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceKind, NicDevice};

    fn instance(name: &str, status: InstanceStatus, nics: &[(&str, Option<&str>)]) -> Instance {
        let mut instance = Instance {
            name: name.to_string(),
            status,
            ..Default::default()
        };
        for (device, network) in nics {
            instance.expanded_devices.insert(
                device.to_string(),
                Device::Nic(NicDevice {
                    network: network.map(str::to_string),
                    parent: network.is_none().then(|| "eno1".to_string()),
                    ..Default::default()
                }),
            );
        }
        instance
            .expanded_devices
            .insert("root".to_string(), Device::empty(DeviceKind::Disk));
        instance
    }

    fn network(name: &str) -> Network {
        Network {
            name: name.to_string(),
            network_type: "bridge".to_string(),
            managed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_map() {
        let instances = vec![
            instance("web", InstanceStatus::Running, &[("eth0", Some("lxdbr0")), ("eth1", Some("ovn1"))]),
            instance("db", InstanceStatus::Stopped, &[("eth0", Some("lxdbr0")), ("eth1", None)]),
        ];
        let networks = vec![network("lxdbr0"), network("ovn1")];
        let map = NetworkMap::build(&instances, &networks);

        assert_eq!(map.nodes.len(), 4);
        assert_eq!(map.nodes[0].kind, NodeKind::Network);
        assert_eq!(map.nodes[0].color, NETWORK_COLOR);
        assert_eq!(map.nodes[2].color, RUNNING_COLOR);
        assert_eq!(map.nodes[3].color, IDLE_COLOR);

        assert_eq!(map.edges.len(), 3);
        assert_eq!(map.edges[2].source, "db");
        assert_eq!(map.edges[2].target, "lxdbr0");
        assert!(map.dangling_edges().is_empty());
    }

    #[test]
    fn test_dangling_edge_and_dot() {
        let instances = vec![instance("web", InstanceStatus::Running, &[("eth0", Some("gone"))])];
        let map = NetworkMap::build(&instances, &[]);
        assert_eq!(map.dangling_edges().len(), 1);

        let dot = map.to_dot();
        assert!(dot.starts_with("graph network_map {"));
        assert!(dot.contains("\"web\" -- \"gone\" [label=\"eth0\""));
    }

    #[test]
    fn test_dot_escapes_quotes_and_backslashes() {
        let instances = vec![instance(r#"we"b\1"#, InstanceStatus::Running, &[("eth0", Some("lxdbr0"))])];
        let map = NetworkMap::build(&instances, &[network("lxdbr0")]);

        let dot = map.to_dot();
        assert!(dot.contains(r#""we\"b\\1" -- "lxdbr0""#));
        assert!(!dot.contains(r#""we"b"#));
    }
}
