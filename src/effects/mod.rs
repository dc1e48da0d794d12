//! Effect units.
//!
//! An effect is an opaque processing subgraph (a bin) with one input and one
//! output port. The worker splices it between the tee and the selector on
//! attach and removes it on detach; the effect itself never touches the
//! graph except through the [`EffectContext`] handed to it on the worker
//! thread.

pub mod pitch;

pub use pitch::{PitchParams, PitchShift};

use crate::error::Result;
use crate::graph::id::NodeId;
use crate::graph::media_graph::MediaGraph;
use crate::graph::node::{ElementSpec, PropertyValue};

/// Worker-side access for an attached effect.
pub struct EffectContext<'a> {
    graph: &'a mut MediaGraph,
    node: NodeId,
}

impl<'a> EffectContext<'a> {
    pub(crate) fn new(graph: &'a mut MediaGraph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// Node the effect's bin was realized as.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Write a property on one of the bin's children.
    pub fn set_child_property(
        &mut self,
        child: &str,
        key: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.graph
            .set_child_property(self.node, child, key, value)
            .map_err(Into::into)
    }

    /// Write a property on the bin itself.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) -> Result<()> {
        self.graph
            .set_property(self.node, key, value)
            .map_err(Into::into)
    }
}

/// Trait for attachable effect subgraphs.
pub trait EffectUnit: Send {
    /// Human-readable name of this effect.
    fn name(&self) -> &str;

    /// Bin description realized on attach. Its name must be unique in the pipeline.
    fn bin(&self) -> &ElementSpec;

    /// Bin port fed by the wet queue.
    fn input_port(&self) -> &str {
        "sink"
    }

    /// Bin port feeding the selector.
    fn output_port(&self) -> &str {
        "src"
    }

    /// Called after the wet path is live.
    fn on_attach(&mut self, _node: NodeId) {}

    /// Called after the wet path has been removed.
    fn on_detach(&mut self) {}

    /// Apply a parameter change while attached.
    fn on_config_change(
        &mut self,
        key: &str,
        value: &PropertyValue,
        ctx: &mut EffectContext<'_>,
    ) -> Result<()>;
}
