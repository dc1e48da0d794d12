//! Serializable topology snapshots.
//!
//! The graph itself never leaves the worker thread. Readers request a
//! [`TopologySnapshot`], an owned copy of the live nodes, ports and links
//! plus the routing state, built on the worker and sent back over a reply
//! channel.

use crate::engine::state::PlaybackState;
use crate::graph::id::{LinkId, NodeId, PortId};
use crate::graph::media_graph::MediaGraph;
use crate::graph::node::NodeKind;
use crate::graph::port::{PortDirection, PortPresence};
use crate::graph::routing::ActiveRoute;
use serde::Serialize;

/// Snapshot of a single port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortSnapshot {
    pub id: PortId,
    pub name: String,
    pub direction: PortDirection,
    pub presence: PortPresence,
    pub linked: bool,
}

/// Snapshot of a single node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub factory: String,
    pub ports: Vec<PortSnapshot>,
}

/// Snapshot of a link, endpoints as `element:port`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub from: String,
    pub to: String,
}

/// Complete topology snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologySnapshot {
    pub pipeline: Option<String>,
    pub state: PlaybackState,
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
    pub route: ActiveRoute,
    /// Selector input currently forwarded, if any.
    pub active_pad: Option<String>,
}

impl TopologySnapshot {
    pub fn capture(
        graph: &MediaGraph,
        state: PlaybackState,
        route: &ActiveRoute,
        active_pad: Option<String>,
    ) -> Self {
        let nodes = graph
            .live_nodes()
            .map(|(id, slot)| NodeSnapshot {
                id,
                name: slot.name().to_string(),
                kind: slot.kind(),
                factory: slot.spec.factory.clone(),
                ports: slot
                    .live_ports()
                    .map(|(idx, port)| PortSnapshot {
                        id: PortId::new(id, idx),
                        name: port.name.clone(),
                        direction: port.direction,
                        presence: port.presence,
                        linked: port.link.is_some(),
                    })
                    .collect(),
            })
            .collect();

        let links = graph
            .live_links()
            .map(|(id, link)| LinkSnapshot {
                id,
                from: graph.describe_port(link.from),
                to: graph.describe_port(link.to),
            })
            .collect();

        Self {
            pipeline: graph.root_name().map(str::to_string),
            state,
            nodes,
            links,
            route: route.clone(),
            active_pad,
        }
    }

    pub fn node(&self, name: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &NodeSnapshot> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Live ports on the named node, 0 if absent.
    pub fn port_count(&self, name: &str) -> usize {
        self.node(name).map_or(0, |n| n.ports.len())
    }

    /// Links with an endpoint on the named node.
    pub fn links_of(&self, name: &str) -> usize {
        let prefix = format!("{}:", name);
        self.links
            .iter()
            .filter(|l| l.from.starts_with(&prefix) || l.to.starts_with(&prefix))
            .count()
    }

    pub fn has_link(&self, from: &str, to: &str) -> bool {
        self.links.iter().any(|l| l.from == from && l.to == to)
    }
}
