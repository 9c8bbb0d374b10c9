//! Network Commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use lxconsole_common::topology::MapEdge;
use lxconsole_common::NetworkMap;

use super::Context;
use crate::output::{print_heading, print_list, print_value, print_warning, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum NetworkCommands {
    /// Show which instances attach to which networks
    Map {
        /// Emit a Graphviz DOT graph
        #[arg(long)]
        dot: bool,
    },
}

/// Edge display wrapper for serialization
#[derive(Serialize)]
pub struct EdgeDisplay {
    pub instance: String,
    pub device: String,
    pub network: String,
}

impl From<&MapEdge> for EdgeDisplay {
    fn from(edge: &MapEdge) -> Self {
        Self {
            instance: edge.source.clone(),
            device: edge.device.clone(),
            network: edge.target.clone(),
        }
    }
}

impl TableDisplay for EdgeDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Instance", "Device", "Network"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.instance.clone(), self.device.clone(), self.network.clone()]
    }
}

pub fn execute(cmd: NetworkCommands, ctx: &Context) -> Result<()> {
    let inventory = ctx.inventory()?;

    match cmd {
        NetworkCommands::Map { dot } => {
            let map = NetworkMap::build(&inventory.instances, &inventory.networks);

            if dot {
                print!("{}", map.to_dot());
                return Ok(());
            }

            match ctx.format {
                OutputFormat::Json | OutputFormat::Yaml => print_value(&map, ctx.format),
                format => {
                    print_heading(&format!("Network map for project {}", ctx.project(&inventory)), format);
                    let edges: Vec<EdgeDisplay> = map.edges.iter().map(EdgeDisplay::from).collect();
                    print_list(&edges, format);
                    for edge in map.dangling_edges() {
                        print_warning(&format!(
                            "{} attaches to {} which is not in the inventory",
                            edge.source, edge.target
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}
