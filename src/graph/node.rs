//! Node kinds and element specifications.
//!
//! A node is described by an [`ElementSpec`]: its unique name, its
//! [`NodeKind`], the backend factory that realizes it and initial
//! properties. Bins (effect units) additionally carry child elements and
//! the links between them; the graph only sees the bin's boundary ports.

use crate::graph::port::{PortDescriptor, PortDirection, PortTemplate};
use serde::Serialize;
use std::fmt;

static FILTER_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("sink"),
    PortDescriptor::output("src"),
];
static TEE_PORTS: &[PortDescriptor] = &[PortDescriptor::input("sink")];
static SELECTOR_PORTS: &[PortDescriptor] = &[PortDescriptor::output("src")];
static SINK_PORTS: &[PortDescriptor] = &[PortDescriptor::input("sink")];
static NO_PORTS: &[PortDescriptor] = &[];

const TEE_TEMPLATE: PortTemplate = PortTemplate::request("src_%u", PortDirection::Output);
const SELECTOR_TEMPLATE: PortTemplate = PortTemplate::request("sink_%u", PortDirection::Input);
const SOURCE_TEMPLATE: PortTemplate = PortTemplate::sometimes("src_%u", PortDirection::Output);

/// What a node does in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// URI source with built-in decoding; exposes decoded streams as sometimes-ports.
    Source,
    /// Sample format converter.
    Converter,
    /// Sample rate converter.
    Resampler,
    /// Fan-out: duplicates its input to every requested output.
    Tee,
    /// Thread-decoupling buffer.
    Queue,
    /// Pass-through.
    Identity,
    /// Fan-in: forwards exactly one requested input (the active pad).
    Selector,
    /// Audio output.
    Sink,
    /// Flow-control gate (drops or forwards buffers).
    Valve,
    /// Pitch/tempo transform.
    Pitch,
    /// Container for an effect chain, exposing boundary `sink`/`src` ports.
    EffectBin,
}

impl NodeKind {
    /// Default backend factory name for this kind.
    pub fn default_factory(self) -> &'static str {
        match self {
            NodeKind::Source => "uridecodebin",
            NodeKind::Converter => "audioconvert",
            NodeKind::Resampler => "audioresample",
            NodeKind::Tee => "tee",
            NodeKind::Queue => "queue",
            NodeKind::Identity => "identity",
            NodeKind::Selector => "input-selector",
            NodeKind::Sink => "autoaudiosink",
            NodeKind::Valve => "valve",
            NodeKind::Pitch => "pitch",
            NodeKind::EffectBin => "bin",
        }
    }

    /// Ports created together with the node.
    pub fn static_ports(self) -> &'static [PortDescriptor] {
        match self {
            NodeKind::Source => NO_PORTS,
            NodeKind::Tee => TEE_PORTS,
            NodeKind::Selector => SELECTOR_PORTS,
            NodeKind::Sink => SINK_PORTS,
            NodeKind::Converter
            | NodeKind::Resampler
            | NodeKind::Queue
            | NodeKind::Identity
            | NodeKind::Valve
            | NodeKind::Pitch
            | NodeKind::EffectBin => FILTER_PORTS,
        }
    }

    /// Template for request ports, if this kind supports them.
    pub fn request_template(self) -> Option<PortTemplate> {
        match self {
            NodeKind::Tee => Some(TEE_TEMPLATE),
            NodeKind::Selector => Some(SELECTOR_TEMPLATE),
            _ => None,
        }
    }

    /// Template for ports the backend announces at runtime.
    pub fn sometimes_template(self) -> Option<PortTemplate> {
        match self {
            NodeKind::Source => Some(SOURCE_TEMPLATE),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_factory())
    }
}

/// Property values that can be written to an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::String(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

/// Description of an element to be realized by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    pub name: String,
    pub kind: NodeKind,
    pub factory: String,
    pub properties: Vec<(String, PropertyValue)>,
    /// Child elements, only meaningful for [`NodeKind::EffectBin`].
    pub children: Vec<ElementSpec>,
    /// Internal `src → sink` links between children, by child name.
    pub child_links: Vec<(String, String)>,
    /// Child whose `sink` port is exposed as the bin's `sink`.
    pub entry: Option<String>,
    /// Child whose `src` port is exposed as the bin's `src`.
    pub exit: Option<String>,
}

impl ElementSpec {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            factory: kind.default_factory().to_string(),
            properties: Vec::new(),
            children: Vec::new(),
            child_links: Vec::new(),
            entry: None,
            exit: None,
        }
    }

    pub fn with_factory(mut self, factory: impl Into<String>) -> Self {
        self.factory = factory.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Create a bin from a linear chain of children. The first child becomes
    /// the entry and the last the exit.
    pub fn bin(name: impl Into<String>, chain: Vec<ElementSpec>) -> Self {
        let mut spec = Self::new(NodeKind::EffectBin, name);
        spec.child_links = chain
            .windows(2)
            .map(|pair| (pair[0].name.clone(), pair[1].name.clone()))
            .collect();
        spec.entry = chain.first().map(|c| c.name.clone());
        spec.exit = chain.last().map(|c| c.name.clone());
        spec.children = chain;
        spec
    }

    pub fn child(&self, name: &str) -> Option<&ElementSpec> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut ElementSpec> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Overwrite or append an initial property.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) {
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.properties.push((key.to_string(), value)),
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}
