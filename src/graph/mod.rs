//! Media graph
//!
//! The worker-owned model of the processing graph and the topology
//! operations performed on it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   mutations   ┌────────────────┐
//! │  MediaGraph  │ ────────────▶ │  MediaBackend  │
//! │ nodes/ports/ │               │ (real elements)│
//! │    links     │ ◀──────────── └────────────────┘
//! └──────┬───────┘   accepted?
//!        │
//!  ┌─────┴──────┬───────────────┬──────────────────┐
//!  │ Skeleton   │ routing       │ GraphTransaction │
//!  │ dry path   │ wet attach/   │ reverse-order    │
//!  │ build/tear │ detach, switch│ undo journal     │
//!  └────────────┴───────────────┴──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`id`] - Node, port and link identifiers
//! - [`port`] - Port directions, presence and templates
//! - [`node`] - Node kinds, element specifications and property values
//! - [`media_graph`] - The arena and its backend mirroring
//! - [`transaction`] - All-or-nothing multi-step mutation
//! - [`skeleton`] - The fixed source-to-sink skeleton
//! - [`routing`] - Dry/wet branch management
//! - [`snapshot`] - Serializable topology snapshots

pub mod error;
pub mod id;
pub mod media_graph;
pub mod node;
pub mod port;
pub mod routing;
pub mod skeleton;
pub mod snapshot;
pub mod transaction;

pub use error::{GraphError, GraphResult};
pub use id::{LinkId, NodeId, PortId};
pub use media_graph::MediaGraph;
pub use node::{ElementSpec, NodeKind, PropertyValue};
pub use port::{PortDirection, PortPresence};
pub use routing::{ActiveRoute, WetPath};
pub use skeleton::Skeleton;
pub use snapshot::TopologySnapshot;
pub use transaction::GraphTransaction;
