//! Identity types for the media graph.
//!
//! All IDs are newtypes over `u32` that serve as direct array indices
//! into their respective storage vectors, providing O(1) lookup. Removed slots are
//! recycled by the graph, so an ID must be dropped once its object is removed.

use serde::Serialize;
use std::fmt;

/// Index into `MediaGraph::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Compact port identifier. High 20 bits = node index, low 12 bits = port index.
/// Supports up to ~1M nodes with 4096 ports each.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PortId(pub u32);

impl PortId {
    const PORT_BITS: u32 = 12;
    const PORT_MASK: u32 = (1 << Self::PORT_BITS) - 1;

    /// Largest port index a single node can hold.
    pub const MAX_PORTS: usize = 1 << Self::PORT_BITS;

    /// Number of node indices a port ID can address.
    pub const MAX_NODES: usize = 1 << (32 - Self::PORT_BITS);

    pub fn new(node: NodeId, port_index: u16) -> Self {
        debug_assert!(node.index() < Self::MAX_NODES);
        debug_assert!((port_index as usize) < Self::MAX_PORTS);
        Self((node.0 << Self::PORT_BITS) | (port_index as u32 & Self::PORT_MASK))
    }

    #[inline]
    pub fn node(self) -> NodeId {
        NodeId(self.0 >> Self::PORT_BITS)
    }

    #[inline]
    pub fn port_index(self) -> u16 {
        (self.0 & Self::PORT_MASK) as u16
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PortId(node={}, port={})",
            self.node().0,
            self.port_index()
        )
    }
}

/// Index into `MediaGraph::links`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LinkId(pub u32);

impl LinkId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkId({})", self.0)
    }
}
