//! The fixed playback skeleton.
//!
//! ```text
//!                         ┌─ src_0 → queue-dry → identity → sink_0 ─┐
//! source ⇢ convert → resample → tee                                  selector → sink
//!                         └─ src_N → [wet queue → effect] → sink_N ─┘
//! ```
//!
//! The dry branch is built once; the wet branch is added and removed by
//! [`routing`](crate::graph::routing). The source's decoded output appears
//! at runtime and is linked when the backend announces it.
//!
//! Construction is best-effort. Every element creation and link is attempted
//! independently; a failure is logged and only the steps depending on it
//! are skipped, leaving a degraded but consistent graph.

use crate::backend::BusWatch;
use crate::config::PipelineConfig;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{NodeId, PortId};
use crate::graph::media_graph::MediaGraph;
use crate::graph::node::{ElementSpec, NodeKind};

pub const SOURCE: &str = "source";
pub const CONVERTER: &str = "convert";
pub const RESAMPLER: &str = "resample";
pub const TEE: &str = "tee";
pub const DRY_QUEUE: &str = "queue-dry";
pub const IDENTITY: &str = "identity";
pub const SELECTOR: &str = "selector";
pub const SINK: &str = "sink";

/// Caps prefix accepted from the source's decoded ports.
pub const AUDIO_CAPS_PREFIX: &str = "audio/x-raw";

/// Handles to the skeleton's nodes and dry-path ports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skeleton {
    pub source: Option<NodeId>,
    pub converter: Option<NodeId>,
    pub resampler: Option<NodeId>,
    pub tee: Option<NodeId>,
    pub dry_queue: Option<NodeId>,
    pub identity: Option<NodeId>,
    pub selector: Option<NodeId>,
    pub sink: Option<NodeId>,
    /// Tee output feeding the dry queue.
    pub dry_tee_port: Option<PortId>,
    /// Selector input fed by the dry branch.
    pub dry_selector_port: Option<PortId>,
}

fn create(graph: &mut MediaGraph, spec: ElementSpec) -> Option<NodeId> {
    let (name, factory) = (spec.name.clone(), spec.factory.clone());
    match graph.add_node(spec) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!(
                "Failed to create element '{}' of type '{}': {}",
                name,
                factory,
                e
            );
            None
        }
    }
}

fn link(graph: &mut MediaGraph, from: Option<NodeId>, to: Option<NodeId>, label: &str) {
    let (Some(from), Some(to)) = (from, to) else {
        tracing::warn!("Skipping link {}: element missing", label);
        return;
    };
    match graph.link_nodes(from, to) {
        Ok(_) => tracing::debug!("Linked {}", label),
        Err(e) => tracing::error!("Failed to link {}: {}", label, e),
    }
}

/// Request a port on `fanned` and link it with `peer_port` of `peer`.
fn branch(
    graph: &mut MediaGraph,
    fanned: Option<NodeId>,
    peer: Option<NodeId>,
    peer_port: &str,
    fan_out: bool,
) -> Option<PortId> {
    let fanned = fanned?;
    let port = match graph.request_port(fanned) {
        Ok(port) => port,
        Err(e) => {
            tracing::error!("Failed to request dry-path port: {}", e);
            return None;
        }
    };
    let Some(peer) = peer else {
        return Some(port);
    };
    let result = graph.port(peer, peer_port).and_then(|peer_port| {
        if fan_out {
            graph.link(port, peer_port)
        } else {
            graph.link(peer_port, port)
        }
    });
    if let Err(e) = result {
        tracing::error!(
            "Failed to link dry-path port {}: {}",
            graph.describe_port(port),
            e
        );
    }
    Some(port)
}

impl Skeleton {
    /// Build the skeleton and bind the bus. The caller drives the state.
    pub fn build(graph: &mut MediaGraph, config: &PipelineConfig, bus: BusWatch) -> Self {
        let mut skeleton = Skeleton::default();

        if let Err(e) = graph.create(&config.name) {
            tracing::error!("Pipeline '{}' could not be created: {}", config.name, e);
            return skeleton;
        }

        skeleton.source = create(graph, ElementSpec::new(NodeKind::Source, SOURCE));
        skeleton.converter = create(graph, ElementSpec::new(NodeKind::Converter, CONVERTER));
        skeleton.resampler = create(graph, ElementSpec::new(NodeKind::Resampler, RESAMPLER));
        skeleton.tee = create(graph, ElementSpec::new(NodeKind::Tee, TEE));
        skeleton.dry_queue = create(graph, ElementSpec::new(NodeKind::Queue, DRY_QUEUE));
        skeleton.identity = create(graph, ElementSpec::new(NodeKind::Identity, IDENTITY));
        skeleton.selector = create(graph, ElementSpec::new(NodeKind::Selector, SELECTOR));
        skeleton.sink = create(
            graph,
            ElementSpec::new(NodeKind::Sink, SINK).with_factory(config.sink_factory.clone()),
        );

        link(graph, skeleton.converter, skeleton.resampler, "convert -> resample");
        link(graph, skeleton.resampler, skeleton.tee, "resample -> tee");
        link(graph, skeleton.dry_queue, skeleton.identity, "queue-dry -> identity");
        link(graph, skeleton.selector, skeleton.sink, "selector -> sink");

        skeleton.dry_tee_port = branch(graph, skeleton.tee, skeleton.dry_queue, "sink", true);
        skeleton.dry_selector_port =
            branch(graph, skeleton.selector, skeleton.identity, "src", false);

        if let Err(e) = skeleton.select_dry(graph) {
            tracing::error!("Failed to activate the dry path: {}", e);
        }

        if let Err(e) = graph.add_bus_watch(bus) {
            tracing::error!("Failed to install bus watch: {}", e);
        }

        tracing::info!("Pipeline '{}' built ({})", config.name, skeleton.summary());
        skeleton
    }

    /// Make the dry branch the selector's active input.
    pub fn select_dry(&self, graph: &mut MediaGraph) -> GraphResult<()> {
        let selector = self.selector.ok_or(GraphError::MissingElement(SELECTOR))?;
        let port = self
            .dry_selector_port
            .ok_or(GraphError::MissingElement("dry selector port"))?;
        let name = graph.port_name(port)?.to_string();
        graph.set_property(selector, "active-pad", name)
    }

    /// Link a decoded source port to the converter.
    ///
    /// Returns `Ok(false)` when the port is not for us: another element, a
    /// non-audio stream, or a converter that is already fed.
    pub fn link_source_port(
        &self,
        graph: &mut MediaGraph,
        element: &str,
        port: &str,
        caps: &str,
    ) -> GraphResult<bool> {
        let Some(source) = self.source.filter(|id| graph.node_name(*id).ok() == Some(element))
        else {
            return Ok(false);
        };
        let converter = self.converter.ok_or(GraphError::MissingElement(CONVERTER))?;

        if !caps.starts_with(AUDIO_CAPS_PREFIX) {
            tracing::info!("Port {}:{} has type '{}', which is not raw audio. Ignoring.", element, port, caps);
            return Ok(false);
        }
        let converter_sink = graph.port(converter, "sink")?;
        if graph.port_link(converter_sink)?.is_some() {
            tracing::info!("Converter is already linked. Ignoring {}:{}.", element, port);
            return Ok(false);
        }

        let src = graph.add_dynamic_port(source, port)?;
        graph.link(src, converter_sink)?;
        Ok(true)
    }

    /// Whether the tee and selector needed for a wet branch exist.
    pub fn supports_wet_path(&self) -> bool {
        self.tee.is_some() && self.selector.is_some()
    }

    /// Remove every skeleton element in reverse build order.
    pub fn teardown(&mut self, graph: &mut MediaGraph) {
        let nodes = [
            (SINK, self.sink.take()),
            (SELECTOR, self.selector.take()),
            (IDENTITY, self.identity.take()),
            (DRY_QUEUE, self.dry_queue.take()),
            (TEE, self.tee.take()),
            (RESAMPLER, self.resampler.take()),
            (CONVERTER, self.converter.take()),
            (SOURCE, self.source.take()),
        ];
        self.dry_tee_port = None;
        self.dry_selector_port = None;

        for (name, id) in nodes {
            let Some(id) = id else { continue };
            if let Err(e) = graph.remove_node(id) {
                tracing::warn!("Failed to remove '{}': {}", name, e);
            }
        }
    }

    fn summary(&self) -> String {
        let present = [
            self.source,
            self.converter,
            self.resampler,
            self.tee,
            self.dry_queue,
            self.identity,
            self.selector,
            self.sink,
        ]
        .iter()
        .filter(|n| n.is_some())
        .count();
        if present == 8 {
            "complete".to_string()
        } else {
            format!("degraded, {}/8 elements", present)
        }
    }
}
