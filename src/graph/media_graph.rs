//! Node/port/link arena mirrored into a media backend.
//!
//! [`MediaGraph`] is the worker's view of the live processing graph. Nodes,
//! ports and links live in vectors indexed by their IDs. Removed entries are
//! flagged and their slots handed out again by the next allocation, so an
//! engine that attaches and detaches effects indefinitely keeps a bounded
//! arena. Callers drop an ID once they remove its object. Every mutation is applied to the backend first and recorded
//! only once the backend accepted it, so the arena and the backend agree
//! after every call, including failed ones.
//!
//! # Invariants
//!
//! - A port is linked to at most one peer.
//! - Links always run from an output port to an input port.
//! - Removing a node first unlinks each of its ports and releases its
//!   request ports; no link ever points at a removed node.
//! - Element names are unique across the pipeline, bin children included.

use crate::backend::{BusWatch, MediaBackend, PlaybackClock, PortAddr, SeekFlags};
use crate::engine::state::PlaybackState;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{LinkId, NodeId, PortId};
use crate::graph::node::{ElementSpec, NodeKind, PropertyValue};
use crate::graph::port::{PortDirection, PortPresence};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A port slot on a node.
#[derive(Debug, Clone)]
pub struct PortSlot {
    pub name: String,
    pub direction: PortDirection,
    pub presence: PortPresence,
    /// Link currently attached to this port.
    pub link: Option<LinkId>,
    pub removed: bool,
}

/// A node slot holding the element description and its ports.
#[derive(Debug, Clone)]
pub struct NodeSlot {
    pub spec: ElementSpec,
    pub ports: Vec<PortSlot>,
    /// Serial used to name the next request port.
    request_serial: u32,
    pub removed: bool,
}

impl NodeSlot {
    fn new(spec: ElementSpec) -> Self {
        let ports = spec
            .kind
            .static_ports()
            .iter()
            .map(|desc| PortSlot {
                name: desc.name.to_string(),
                direction: desc.direction,
                presence: PortPresence::Always,
                link: None,
                removed: false,
            })
            .collect();
        Self {
            spec,
            ports,
            request_serial: 0,
            removed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> NodeKind {
        self.spec.kind
    }

    /// Index for a new port: the first released slot, else the next free one.
    fn vacant_port(&self) -> Option<u16> {
        match self.ports.iter().position(|p| p.removed) {
            Some(idx) => Some(idx as u16),
            None if self.ports.len() < PortId::MAX_PORTS => Some(self.ports.len() as u16),
            None => None,
        }
    }

    fn put_port(&mut self, idx: u16, port: PortSlot) {
        match self.ports.get_mut(idx as usize) {
            Some(slot) => *slot = port,
            None => self.ports.push(port),
        }
    }

    /// Live ports with their indices.
    pub fn live_ports(&self) -> impl Iterator<Item = (u16, &PortSlot)> {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.removed)
            .map(|(i, p)| (i as u16, p))
    }
}

/// A directed edge between an output and an input port.
#[derive(Debug, Clone, Copy)]
pub struct LinkSlot {
    pub from: PortId,
    pub to: PortId,
    pub removed: bool,
}

/// The media graph owned by the worker thread.
pub struct MediaGraph {
    backend: Box<dyn MediaBackend>,
    root: Option<String>,
    nodes: Vec<NodeSlot>,
    links: Vec<LinkSlot>,
    names: HashMap<String, NodeId>,
    free_nodes: Vec<NodeId>,
    free_links: Vec<LinkId>,
}

impl MediaGraph {
    pub fn new(backend: Box<dyn MediaBackend>) -> Self {
        Self {
            backend,
            root: None,
            nodes: Vec::new(),
            links: Vec::new(),
            names: HashMap::new(),
            free_nodes: Vec::new(),
            free_links: Vec::new(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    // ── Lifecycle ──

    /// Create the root pipeline container.
    pub fn create(&mut self, name: &str) -> GraphResult<()> {
        self.backend.create_pipeline(name)?;
        self.root = Some(name.to_string());
        tracing::debug!("Created root pipeline '{}' on {} backend", name, self.backend.name());
        Ok(())
    }

    pub fn is_realized(&self) -> bool {
        self.root.is_some()
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Destroy the root pipeline and forget any node still inside it.
    pub fn destroy(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };
        self.nodes.clear();
        self.links.clear();
        self.free_nodes.clear();
        self.free_links.clear();
        self.names.clear();
        self.backend.destroy_pipeline();
        tracing::debug!("Destroyed root pipeline '{}'", root);
    }

    fn ensure_realized(&self) -> GraphResult<()> {
        if self.root.is_some() {
            Ok(())
        } else {
            Err(GraphError::NotRealized)
        }
    }

    // ── Nodes ──

    /// Realize an element and add it to the graph.
    pub fn add_node(&mut self, spec: ElementSpec) -> GraphResult<NodeId> {
        self.ensure_realized()?;

        if let Some(taken) = std::iter::once(&spec.name)
            .chain(spec.children.iter().map(|c| &c.name))
            .find(|name| self.names.contains_key(*name) || self.is_child_name(name))
        {
            return Err(GraphError::DuplicateName(taken.clone()));
        }
        if self.free_nodes.is_empty() && self.nodes.len() >= PortId::MAX_NODES {
            return Err(GraphError::NodesExhausted);
        }

        self.backend.create_element(&spec)?;

        let slot = NodeSlot::new(spec);
        let id = match self.free_nodes.pop() {
            Some(id) => {
                self.nodes[id.index()] = slot;
                id
            }
            None => {
                self.nodes.push(slot);
                NodeId(self.nodes.len() as u32 - 1)
            }
        };
        let spec = &self.nodes[id.index()].spec;
        tracing::debug!("Added node {:?} '{}' ({})", id, spec.name, spec.factory);
        self.names.insert(spec.name.clone(), id);
        Ok(id)
    }

    fn is_child_name(&self, name: &str) -> bool {
        self.live_nodes()
            .any(|(_, slot)| slot.spec.child(name).is_some())
    }

    /// Unlink, stop and remove a node.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<()> {
        let slot = self.node_slot(id)?;

        let linked: Vec<LinkId> = slot.ports.iter().filter_map(|p| p.link).collect();
        let requested: Vec<PortId> = slot
            .live_ports()
            .filter(|(_, p)| p.presence == PortPresence::Request)
            .map(|(idx, _)| PortId::new(id, idx))
            .collect();

        for link in linked {
            self.unlink(link)?;
        }
        for port in requested {
            self.release_port(port)?;
        }

        let name = self.node_slot(id)?.spec.name.clone();
        if let Err(e) = self
            .backend
            .set_element_state(&name, PlaybackState::Uninitialized)
        {
            tracing::warn!("Could not stop '{}' before removal: {}", name, e);
        }
        self.backend.remove_element(&name);

        self.names.remove(&name);
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            slot.removed = true;
            self.free_nodes.push(id);
        }
        tracing::debug!("Removed node {:?} '{}'", id, name);
        Ok(())
    }

    // ── Ports ──

    /// Allocate a new request port from the node's template.
    pub fn request_port(&mut self, node: NodeId) -> GraphResult<PortId> {
        let slot = self.node_slot(node)?;
        let template = slot
            .kind()
            .request_template()
            .ok_or_else(|| GraphError::NoRequestTemplate {
                element: slot.spec.name.clone(),
            })?;
        let idx = slot.vacant_port().ok_or_else(|| GraphError::PortsExhausted {
            element: slot.spec.name.clone(),
        })?;

        let port_name = template.instantiate(slot.request_serial);
        let element = slot.spec.name.clone();
        self.backend.request_port(&element, &port_name)?;

        let slot = self.node_slot_mut(node)?;
        slot.request_serial = slot.request_serial.wrapping_add(1);
        slot.put_port(
            idx,
            PortSlot {
                name: port_name,
                direction: template.direction,
                presence: PortPresence::Request,
                link: None,
                removed: false,
            },
        );
        let port = PortId::new(node, idx);
        tracing::trace!("Requested port {}:{}", element, self.port_name(port)?);
        Ok(port)
    }

    /// Release a request port, unlinking it first.
    pub fn release_port(&mut self, port: PortId) -> GraphResult<()> {
        let slot = self.port_slot(port)?;
        if slot.presence != PortPresence::Request {
            return Err(GraphError::NotRequestPort {
                element: self.node_name(port.node())?.to_string(),
                port: slot.name.clone(),
            });
        }
        if let Some(link) = slot.link {
            self.unlink(link)?;
        }

        let element = self.node_name(port.node())?.to_string();
        let port_name = self.port_name(port)?.to_string();
        self.backend.release_port(&element, &port_name);
        self.port_slot_mut(port)?.removed = true;
        tracing::trace!("Released port {}:{}", element, port_name);
        Ok(())
    }

    /// Record a sometimes-port the backend announced on `node`.
    pub fn add_dynamic_port(&mut self, node: NodeId, name: &str) -> GraphResult<PortId> {
        let slot = self.node_slot(node)?;
        let template = slot
            .kind()
            .sometimes_template()
            .filter(|t| t.matches(name))
            .ok_or_else(|| GraphError::NoSuchPort {
                element: slot.spec.name.clone(),
                port: name.to_string(),
            })?;
        if let Ok(existing) = self.port(node, name) {
            return Ok(existing);
        }

        let slot = self.node_slot_mut(node)?;
        let idx = slot.vacant_port().ok_or_else(|| GraphError::PortsExhausted {
            element: slot.spec.name.clone(),
        })?;
        slot.put_port(
            idx,
            PortSlot {
                name: name.to_string(),
                direction: template.direction,
                presence: PortPresence::Sometimes,
                link: None,
                removed: false,
            },
        );
        Ok(PortId::new(node, idx))
    }

    /// Forget every sometimes-port, e.g. after the backend returned to Ready.
    fn drop_dynamic_ports(&mut self) {
        for node in 0..self.nodes.len() {
            if self.nodes[node].removed {
                continue;
            }
            for idx in 0..self.nodes[node].ports.len() {
                let port = &mut self.nodes[node].ports[idx];
                if port.removed || port.presence != PortPresence::Sometimes {
                    continue;
                }
                port.removed = true;
                if let Some(link) = port.link.take() {
                    self.forget_link(link);
                }
            }
        }
    }

    /// Look up a live port by name.
    pub fn port(&self, node: NodeId, name: &str) -> GraphResult<PortId> {
        let slot = self.node_slot(node)?;
        slot.live_ports()
            .find(|(_, p)| p.name == name)
            .map(|(idx, _)| PortId::new(node, idx))
            .ok_or_else(|| GraphError::NoSuchPort {
                element: slot.spec.name.clone(),
                port: name.to_string(),
            })
    }

    pub fn port_name(&self, port: PortId) -> GraphResult<&str> {
        Ok(&self.port_slot(port)?.name)
    }

    pub fn port_link(&self, port: PortId) -> GraphResult<Option<LinkId>> {
        Ok(self.port_slot(port)?.link)
    }

    // ── Links ──

    /// Link an output port to an input port.
    pub fn link(&mut self, from: PortId, to: PortId) -> GraphResult<LinkId> {
        let from_slot = self.port_slot(from)?;
        let to_slot = self.port_slot(to)?;

        if from_slot.direction != PortDirection::Output || to_slot.direction != PortDirection::Input
        {
            return Err(GraphError::DirectionMismatch(format!(
                "{} -> {}",
                self.describe_port(from),
                self.describe_port(to)
            )));
        }
        for (port, slot) in [(from, from_slot), (to, to_slot)] {
            if slot.link.is_some() {
                return Err(GraphError::PortAlreadyLinked {
                    element: self.node_name(port.node())?.to_string(),
                    port: slot.name.clone(),
                });
            }
        }

        let (from_el, from_port) = (self.node_name(from.node())?.to_string(), from_slot.name.clone());
        let (to_el, to_port) = (self.node_name(to.node())?.to_string(), to_slot.name.clone());
        self.backend.link(
            PortAddr::new(&from_el, &from_port),
            PortAddr::new(&to_el, &to_port),
        )?;

        let slot = LinkSlot {
            from,
            to,
            removed: false,
        };
        let id = match self.free_links.pop() {
            Some(id) => {
                self.links[id.index()] = slot;
                id
            }
            None => {
                self.links.push(slot);
                LinkId(self.links.len() as u32 - 1)
            }
        };
        self.port_slot_mut(from)?.link = Some(id);
        self.port_slot_mut(to)?.link = Some(id);
        tracing::trace!(
            "Linked {} -> {}",
            self.describe_port(from),
            self.describe_port(to)
        );
        Ok(id)
    }

    /// Link `from`'s `src` port to `to`'s `sink` port.
    pub fn link_nodes(&mut self, from: NodeId, to: NodeId) -> GraphResult<LinkId> {
        let src = self.port(from, "src")?;
        let sink = self.port(to, "sink")?;
        self.link(src, sink)
    }

    pub fn unlink(&mut self, link: LinkId) -> GraphResult<()> {
        let slot = self
            .links
            .get(link.index())
            .filter(|l| !l.removed)
            .copied()
            .ok_or(GraphError::UnknownLink(link))?;

        let from_el = self.node_name(slot.from.node())?.to_string();
        let from_port = self.port_name(slot.from)?.to_string();
        let to_el = self.node_name(slot.to.node())?.to_string();
        let to_port = self.port_name(slot.to)?.to_string();
        self.backend.unlink(
            PortAddr::new(&from_el, &from_port),
            PortAddr::new(&to_el, &to_port),
        );
        tracing::trace!(
            "Unlinked {} -> {}",
            self.describe_port(slot.from),
            self.describe_port(slot.to)
        );
        self.forget_link(link);
        Ok(())
    }

    fn forget_link(&mut self, link: LinkId) {
        let Some(slot) = self.links.get_mut(link.index()).filter(|l| !l.removed) else {
            return;
        };
        slot.removed = true;
        self.free_links.push(link);
        let (from, to) = (slot.from, slot.to);
        for port in [from, to] {
            if let Some(p) = self
                .nodes
                .get_mut(port.node().index())
                .and_then(|n| n.ports.get_mut(port.port_index() as usize))
            {
                if p.link == Some(link) {
                    p.link = None;
                }
            }
        }
    }

    // ── Properties ──

    pub fn set_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<()> {
        let value = value.into();
        let name = self.node_name(node)?.to_string();
        self.backend.set_property(&name, key, &value)?;
        tracing::trace!("Set {}.{} = {}", name, key, value);
        self.node_slot_mut(node)?.spec.set_property(key, value);
        Ok(())
    }

    /// Write a property on a child element of a bin node.
    pub fn set_child_property(
        &mut self,
        node: NodeId,
        child: &str,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<()> {
        let value = value.into();
        let slot = self.node_slot(node)?;
        if slot.spec.child(child).is_none() {
            return Err(GraphError::NoSuchPort {
                element: slot.spec.name.clone(),
                port: child.to_string(),
            });
        }
        self.backend.set_property(child, key, &value)?;
        tracing::trace!("Set {}.{} = {}", child, key, value);
        if let Some(spec) = self.node_slot_mut(node)?.spec.child_mut(child) {
            spec.set_property(key, value);
        }
        Ok(())
    }

    pub fn property(&self, node: NodeId, key: &str) -> Option<&PropertyValue> {
        self.node(node).and_then(|slot| slot.spec.property(key))
    }

    // ── State, seeking and the bus ──

    pub fn set_state(&mut self, state: PlaybackState) -> GraphResult<()> {
        self.ensure_realized()?;
        self.backend.set_state(state)?;
        if !state.is_prerolled() {
            self.drop_dynamic_ports();
        }
        Ok(())
    }

    pub fn set_element_state(&mut self, node: NodeId, state: PlaybackState) -> GraphResult<()> {
        let name = self.node_name(node)?.to_string();
        self.backend.set_element_state(&name, state)?;
        Ok(())
    }

    pub fn seek(&mut self, position: Duration, flags: SeekFlags) -> GraphResult<()> {
        self.ensure_realized()?;
        self.backend.seek(position, flags)?;
        Ok(())
    }

    pub fn add_bus_watch(&mut self, watch: BusWatch) -> GraphResult<()> {
        self.ensure_realized()?;
        self.backend.add_bus_watch(watch)?;
        Ok(())
    }

    pub fn remove_bus_watch(&mut self) -> GraphResult<()> {
        self.ensure_realized()?;
        self.backend.remove_bus_watch()?;
        Ok(())
    }

    pub fn clock(&self) -> Arc<PlaybackClock> {
        self.backend.clock()
    }

    // ── Queries ──

    /// Live node by ID.
    pub fn node(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id.index()).filter(|s| !s.removed)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn node_name(&self, id: NodeId) -> GraphResult<&str> {
        Ok(self.node_slot(id)?.name())
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeSlot)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed)
            .map(|(i, s)| (NodeId(i as u32), s))
    }

    pub fn live_links(&self) -> impl Iterator<Item = (LinkId, &LinkSlot)> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.removed)
            .map(|(i, l)| (LinkId(i as u32), l))
    }

    pub fn node_count(&self) -> usize {
        self.live_nodes().count()
    }

    pub fn link_count(&self) -> usize {
        self.live_links().count()
    }

    /// Number of live ports on a node, 0 if the node is gone.
    pub fn port_count(&self, node: NodeId) -> usize {
        self.node(node).map_or(0, |slot| slot.live_ports().count())
    }

    /// `element:port` for log lines.
    pub fn describe_port(&self, port: PortId) -> String {
        match (self.node_name(port.node()), self.port_name(port)) {
            (Ok(node), Ok(name)) => format!("{}:{}", node, name),
            _ => format!("{:?}", port),
        }
    }

    fn node_slot(&self, id: NodeId) -> GraphResult<&NodeSlot> {
        self.node(id).ok_or(GraphError::UnknownNode(id))
    }

    fn node_slot_mut(&mut self, id: NodeId) -> GraphResult<&mut NodeSlot> {
        self.nodes
            .get_mut(id.index())
            .filter(|s| !s.removed)
            .ok_or(GraphError::UnknownNode(id))
    }

    fn port_slot(&self, port: PortId) -> GraphResult<&PortSlot> {
        self.node(port.node())
            .and_then(|n| n.ports.get(port.port_index() as usize))
            .filter(|p| !p.removed)
            .ok_or(GraphError::UnknownPort(port))
    }

    fn port_slot_mut(&mut self, port: PortId) -> GraphResult<&mut PortSlot> {
        self.node_slot_mut(port.node())?
            .ports
            .get_mut(port.port_index() as usize)
            .filter(|p| !p.removed)
            .ok_or(GraphError::UnknownPort(port))
    }
}

impl std::fmt::Debug for MediaGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaGraph")
            .field("backend", &self.backend.name())
            .field("root", &self.root)
            .field("nodes", &self.node_count())
            .field("links", &self.link_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SimulatedBackend, SimulatedControl};

    fn realized_graph() -> (MediaGraph, SimulatedControl) {
        let (backend, control) = SimulatedBackend::new();
        let mut graph = MediaGraph::new(Box::new(backend));
        graph.create("test-pipeline").unwrap();
        (graph, control)
    }

    #[test]
    fn test_add_node_requires_root() {
        let (backend, _control) = SimulatedBackend::new();
        let mut graph = MediaGraph::new(Box::new(backend));
        let err = graph
            .add_node(ElementSpec::new(NodeKind::Queue, "q"))
            .unwrap_err();
        assert!(matches!(err, GraphError::NotRealized));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let (mut graph, _control) = realized_graph();
        graph.add_node(ElementSpec::new(NodeKind::Queue, "q")).unwrap();
        let err = graph
            .add_node(ElementSpec::new(NodeKind::Identity, "q"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName(name) if name == "q"));
    }

    #[test]
    fn test_port_links_to_single_peer() {
        let (mut graph, _control) = realized_graph();
        let a = graph.add_node(ElementSpec::new(NodeKind::Queue, "a")).unwrap();
        let b = graph.add_node(ElementSpec::new(NodeKind::Queue, "b")).unwrap();
        let c = graph.add_node(ElementSpec::new(NodeKind::Queue, "c")).unwrap();

        graph.link_nodes(a, b).unwrap();
        let err = graph.link_nodes(a, c).unwrap_err();
        assert!(matches!(err, GraphError::PortAlreadyLinked { .. }));
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn test_link_direction_checked() {
        let (mut graph, _control) = realized_graph();
        let a = graph.add_node(ElementSpec::new(NodeKind::Queue, "a")).unwrap();
        let b = graph.add_node(ElementSpec::new(NodeKind::Queue, "b")).unwrap();
        let sink = graph.port(a, "sink").unwrap();
        let src = graph.port(b, "src").unwrap();
        assert!(matches!(
            graph.link(sink, src),
            Err(GraphError::DirectionMismatch(_))
        ));
    }

    #[test]
    fn test_request_ports_are_named_from_template() {
        let (mut graph, control) = realized_graph();
        let tee = graph.add_node(ElementSpec::new(NodeKind::Tee, "tee")).unwrap();
        let p0 = graph.request_port(tee).unwrap();
        let p1 = graph.request_port(tee).unwrap();
        assert_eq!(graph.port_name(p0).unwrap(), "src_0");
        assert_eq!(graph.port_name(p1).unwrap(), "src_1");
        assert!(control.ports("tee").contains(&"src_1".to_string()));

        graph.release_port(p0).unwrap();
        assert!(graph.port_name(p0).is_err());
        assert_eq!(graph.port_count(tee), 2);
    }

    #[test]
    fn test_released_port_slot_is_reused() {
        let (mut graph, control) = realized_graph();
        let tee = graph.add_node(ElementSpec::new(NodeKind::Tee, "tee")).unwrap();
        let p0 = graph.request_port(tee).unwrap();
        graph.request_port(tee).unwrap();
        graph.release_port(p0).unwrap();

        let p2 = graph.request_port(tee).unwrap();
        assert_eq!(p2, p0);
        assert_eq!(graph.port_name(p2).unwrap(), "src_2");
        assert!(control.ports("tee").contains(&"src_2".to_string()));
        assert_eq!(graph.nodes[tee.index()].ports.len(), 3);
    }

    #[test]
    fn test_request_release_cycles_never_exhaust() {
        let (mut graph, _control) = realized_graph();
        let tee = graph.add_node(ElementSpec::new(NodeKind::Tee, "tee")).unwrap();
        for _ in 0..PortId::MAX_PORTS + 100 {
            let port = graph.request_port(tee).unwrap();
            graph.release_port(port).unwrap();
        }
        assert!(graph.request_port(tee).is_ok());
        assert!(graph.nodes[tee.index()].ports.len() <= 2);
    }

    #[test]
    fn test_node_and_link_slots_are_recycled() {
        let (mut graph, _control) = realized_graph();
        let a = graph.add_node(ElementSpec::new(NodeKind::Queue, "a")).unwrap();
        for _ in 0..1000 {
            let b = graph.add_node(ElementSpec::new(NodeKind::Queue, "b")).unwrap();
            graph.link_nodes(a, b).unwrap();
            graph.remove_node(b).unwrap();
        }
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.link_count(), 0);
        assert!(graph.port_link(graph.port(a, "src").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_request_port_needs_template() {
        let (mut graph, _control) = realized_graph();
        let q = graph.add_node(ElementSpec::new(NodeKind::Queue, "q")).unwrap();
        assert!(matches!(
            graph.request_port(q),
            Err(GraphError::NoRequestTemplate { .. })
        ));
    }

    #[test]
    fn test_static_port_cannot_be_released() {
        let (mut graph, _control) = realized_graph();
        let q = graph.add_node(ElementSpec::new(NodeKind::Queue, "q")).unwrap();
        let sink = graph.port(q, "sink").unwrap();
        assert!(matches!(
            graph.release_port(sink),
            Err(GraphError::NotRequestPort { .. })
        ));
    }

    #[test]
    fn test_remove_node_unlinks_everything() {
        let (mut graph, control) = realized_graph();
        let tee = graph.add_node(ElementSpec::new(NodeKind::Tee, "tee")).unwrap();
        let q = graph.add_node(ElementSpec::new(NodeKind::Queue, "q")).unwrap();
        let tee_src = graph.request_port(tee).unwrap();
        let q_sink = graph.port(q, "sink").unwrap();
        graph.link(tee_src, q_sink).unwrap();

        graph.remove_node(tee).unwrap();
        assert_eq!(graph.link_count(), 0);
        assert!(graph.port_link(q_sink).unwrap().is_none());
        assert!(!control.has_element("tee"));
        assert!(graph.node_by_name("tee").is_none());
    }

    #[test]
    fn test_failed_backend_link_leaves_graph_unchanged() {
        let (mut graph, control) = realized_graph();
        let a = graph.add_node(ElementSpec::new(NodeKind::Queue, "a")).unwrap();
        let b = graph.add_node(ElementSpec::new(NodeKind::Queue, "b")).unwrap();
        control.fail_link_involving("b");

        assert!(matches!(graph.link_nodes(a, b), Err(GraphError::Backend(_))));
        assert_eq!(graph.link_count(), 0);
        assert!(graph.port_link(graph.port(a, "src").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_dynamic_ports_follow_template() {
        let (mut graph, _control) = realized_graph();
        let src = graph
            .add_node(ElementSpec::new(NodeKind::Source, "source"))
            .unwrap();
        let port = graph.add_dynamic_port(src, "src_0").unwrap();
        assert_eq!(graph.add_dynamic_port(src, "src_0").unwrap(), port);
        assert!(graph.add_dynamic_port(src, "video_0").is_err());
    }

    #[test]
    fn test_child_property_requires_child() {
        let (mut graph, control) = realized_graph();
        let bin = graph
            .add_node(ElementSpec::bin(
                "fx",
                vec![ElementSpec::new(NodeKind::Pitch, "fx-pitch")],
            ))
            .unwrap();
        graph.set_child_property(bin, "fx-pitch", "pitch", 1.5).unwrap();
        assert_eq!(
            control.element_property("fx-pitch", "pitch"),
            Some(PropertyValue::Float(1.5))
        );
        assert!(graph.set_child_property(bin, "nope", "pitch", 1.5).is_err());
    }

    #[test]
    fn test_destroy_forgets_nodes() {
        let (mut graph, control) = realized_graph();
        graph.add_node(ElementSpec::new(NodeKind::Queue, "q")).unwrap();
        graph.destroy();
        assert!(!graph.is_realized());
        assert_eq!(graph.node_count(), 0);
        assert!(!control.has_pipeline());
    }
}
