//! Graph-specific error types.

use crate::backend::BackendError;
use crate::graph::id::{LinkId, NodeId, PortId};
use thiserror::Error;

/// Errors that can occur while mutating the media graph.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Pipeline does not exist")]
    NotRealized,

    #[error("An element named '{0}' already exists")]
    DuplicateName(String),

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Unknown port {0:?}")]
    UnknownPort(PortId),

    #[error("Unknown link {0:?}")]
    UnknownLink(LinkId),

    #[error("'{element}' has no port named '{port}'")]
    NoSuchPort { element: String, port: String },

    #[error("'{element}' does not support request ports")]
    NoRequestTemplate { element: String },

    #[error("'{element}' has run out of port slots")]
    PortsExhausted { element: String },

    #[error("The graph has run out of node slots")]
    NodesExhausted,

    #[error("Port '{element}:{port}' is already linked")]
    PortAlreadyLinked { element: String, port: String },

    #[error("Port '{element}:{port}' is not a request port")]
    NotRequestPort { element: String, port: String },

    #[error("Port direction mismatch: {0}")]
    DirectionMismatch(String),

    #[error("Missing skeleton element: {0}")]
    MissingElement(&'static str),

    #[error("An effect is already attached: '{0}'")]
    EffectAlreadyAttached(String),

    #[error("No effect is attached")]
    NoEffectAttached,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
