//! Dry/wet routing between the tee and the selector.
//!
//! The tee duplicates the decoded stream into every branch; the selector
//! forwards exactly one of its inputs to the sink. Switching between the
//! dry and the wet branch is therefore a single `active-pad` write on the
//! selector, and a branch can be built or torn down while the other one
//! keeps playing.

use crate::engine::state::PlaybackState;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{NodeId, PortId};
use crate::graph::media_graph::MediaGraph;
use crate::graph::node::{ElementSpec, NodeKind};
use crate::graph::skeleton::{Skeleton, SELECTOR, TEE};
use crate::graph::transaction::GraphTransaction;
use serde::Serialize;

/// Which selector input is live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "lowercase")]
pub enum ActiveRoute {
    #[default]
    Dry,
    Wet { effect: String },
}

/// Nodes and ports making up an attached wet branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WetPath {
    pub effect: NodeId,
    pub queue: NodeId,
    pub tee_port: PortId,
    pub selector_port: PortId,
}

/// How to splice an effect bin into the wet branch.
#[derive(Debug, Clone)]
pub struct WetPathRequest<'a> {
    pub bin: ElementSpec,
    pub input_port: &'a str,
    pub output_port: &'a str,
    pub queue_name: String,
    /// Current pipeline state; new elements are brought up to it.
    pub state: PlaybackState,
}

/// Build `tee → queue → effect → selector` and make it the active route.
///
/// Either the whole branch is in place and active when this returns `Ok`,
/// or the graph is exactly as it was before the call.
pub fn attach_wet_path(
    graph: &mut MediaGraph,
    skeleton: &Skeleton,
    request: WetPathRequest<'_>,
) -> GraphResult<WetPath> {
    let tee = skeleton.tee.ok_or(GraphError::MissingElement(TEE))?;
    let selector = skeleton
        .selector
        .ok_or(GraphError::MissingElement(SELECTOR))?;

    let mut txn = GraphTransaction::begin(graph, "attach wet path");

    let effect = txn.add_node(request.bin)?;
    let queue = txn.add_node(ElementSpec::new(NodeKind::Queue, request.queue_name))?;

    let tee_port = txn.request_port(tee)?;
    let queue_sink = txn.graph().port(queue, "sink")?;
    txn.link(tee_port, queue_sink)?;

    let queue_src = txn.graph().port(queue, "src")?;
    let effect_in = txn.graph().port(effect, request.input_port)?;
    txn.link(queue_src, effect_in)?;

    let selector_port = txn.request_port(selector)?;
    let effect_out = txn.graph().port(effect, request.output_port)?;
    txn.link(effect_out, selector_port)?;

    if request.state != PlaybackState::Uninitialized {
        for node in [effect, queue] {
            txn.graph().set_element_state(node, request.state)?;
        }
    }

    select(txn.graph(), selector, selector_port)?;
    txn.commit();

    Ok(WetPath {
        effect,
        queue,
        tee_port,
        selector_port,
    })
}

/// Switch back to the dry branch and remove `wet`.
///
/// The switch happens first. If it fails the wet branch is left intact and
/// still active, and the error is returned.
pub fn detach_wet_path(
    graph: &mut MediaGraph,
    skeleton: &Skeleton,
    wet: &WetPath,
) -> GraphResult<()> {
    skeleton.select_dry(graph)?;

    if let Err(e) = graph.release_port(wet.selector_port) {
        tracing::warn!("Failed to release wet selector port: {}", e);
    }
    if let Err(e) = graph.release_port(wet.tee_port) {
        tracing::warn!("Failed to release wet tee port: {}", e);
    }
    for node in [wet.queue, wet.effect] {
        if let Err(e) = graph.remove_node(node) {
            tracing::warn!("Failed to remove wet node {:?}: {}", node, e);
        }
    }
    Ok(())
}

/// Make `port` the selector's active input.
pub fn select(graph: &mut MediaGraph, selector: NodeId, port: PortId) -> GraphResult<()> {
    let name = graph.port_name(port)?.to_string();
    graph.set_property(selector, "active-pad", name)
}
