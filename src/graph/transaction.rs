//! All-or-nothing graph mutation.
//!
//! A [`GraphTransaction`] borrows the graph mutably and journals every node,
//! request port and link it creates. Dropping it without [`commit`] undoes
//! the journal in reverse order (links first, then ports, then nodes), so an
//! early `?` return anywhere in a multi-step change restores the graph.
//!
//! [`commit`]: GraphTransaction::commit

use crate::graph::error::GraphResult;
use crate::graph::id::{LinkId, NodeId, PortId};
use crate::graph::media_graph::MediaGraph;
use crate::graph::node::ElementSpec;

#[derive(Debug, Clone, Copy)]
enum JournalEntry {
    Node(NodeId),
    Port(PortId),
    Link(LinkId),
}

/// Scoped, self-reverting batch of graph mutations.
pub struct GraphTransaction<'g> {
    graph: &'g mut MediaGraph,
    journal: Vec<JournalEntry>,
    label: &'static str,
    committed: bool,
}

impl<'g> GraphTransaction<'g> {
    pub fn begin(graph: &'g mut MediaGraph, label: &'static str) -> Self {
        Self {
            graph,
            journal: Vec::new(),
            label,
            committed: false,
        }
    }

    pub fn add_node(&mut self, spec: ElementSpec) -> GraphResult<NodeId> {
        let id = self.graph.add_node(spec)?;
        self.journal.push(JournalEntry::Node(id));
        Ok(id)
    }

    pub fn request_port(&mut self, node: NodeId) -> GraphResult<PortId> {
        let port = self.graph.request_port(node)?;
        self.journal.push(JournalEntry::Port(port));
        Ok(port)
    }

    pub fn link(&mut self, from: PortId, to: PortId) -> GraphResult<LinkId> {
        let link = self.graph.link(from, to)?;
        self.journal.push(JournalEntry::Link(link));
        Ok(link)
    }

    /// The graph, for steps that need no undo (lookups, state syncs).
    pub fn graph(&mut self) -> &mut MediaGraph {
        &mut *self.graph
    }

    /// Number of journaled mutations.
    pub fn len(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    /// Keep every mutation.
    pub fn commit(mut self) {
        self.committed = true;
        tracing::trace!("Committed '{}' ({} steps)", self.label, self.journal.len());
    }

    fn rollback(&mut self) {
        tracing::debug!(
            "Rolling back '{}' ({} steps)",
            self.label,
            self.journal.len()
        );
        while let Some(entry) = self.journal.pop() {
            let result = match entry {
                JournalEntry::Link(link) => self.graph.unlink(link),
                JournalEntry::Port(port) => self.graph.release_port(port),
                JournalEntry::Node(node) => self.graph.remove_node(node),
            };
            // Later entries may already have been undone by a node removal.
            if let Err(e) = result {
                tracing::trace!("Rollback of {:?} skipped: {}", entry, e);
            }
        }
    }
}

impl Drop for GraphTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}
