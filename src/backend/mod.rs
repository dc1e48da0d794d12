//! Media backend seam
//!
//! The engine never decodes or renders audio itself. Every graph mutation and
//! state change is mirrored into a [`MediaBackend`], which owns the real
//! processing elements and reports asynchronous events back through a
//! [`BusWatch`].
//!
//! # Components
//!
//! - [`MediaBackend`] - Trait implemented by concrete backends
//! - [`SimulatedBackend`] - In-process backend used by the headless driver and tests
//! - [`BusMessage`] - Asynchronous notifications (async-done, EOS, errors, pads)
//! - [`PlaybackClock`] - Position/duration published for lock-free sampling
//! - [`BackendRuntime`] - Process-wide init/deinit guard
//!
//! # Threading
//!
//! A backend is moved into the worker thread when the pipeline is built and
//! only ever called from there. The only state shared with other threads is
//! the [`PlaybackClock`] and whatever the [`BusWatch`] sends.

pub mod runtime;
pub mod simulated;

pub use runtime::BackendRuntime;
pub use simulated::{SimulatedBackend, SimulatedControl};

use crate::engine::state::PlaybackState;
use crate::engine::task::LoopEvent;
use crate::graph::node::{ElementSpec, PropertyValue};
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a media backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Pipeline '{0}' could not be created")]
    PipelineCreation(String),

    #[error("No pipeline has been created")]
    NoPipeline,

    #[error("Failed to create element '{name}' of type '{factory}'")]
    ElementCreation { name: String, factory: String },

    #[error("Unknown element '{0}'")]
    UnknownElement(String),

    #[error("Failed to request port '{port}' on '{element}'")]
    PortRequest { element: String, port: String },

    #[error("Failed to link {from} -> {to}: {reason}")]
    Link {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Failed to set '{key}' on '{element}': {reason}")]
    Property {
        element: String,
        key: String,
        reason: String,
    },

    #[error("State change to {0} failed")]
    StateChange(PlaybackState),

    #[error("Seek to {0:?} failed")]
    Seek(Duration),

    #[error("Bus watch error: {0}")]
    Bus(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Address of a port on a named element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortAddr<'a> {
    pub element: &'a str,
    pub port: &'a str,
}

impl<'a> PortAddr<'a> {
    pub fn new(element: &'a str, port: &'a str) -> Self {
        Self { element, port }
    }
}

impl fmt::Display for PortAddr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element, self.port)
    }
}

/// Seek behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekFlags {
    /// Discard queued data so the new position is heard immediately.
    pub flush: bool,
    /// Snap to the nearest key unit.
    pub key_unit: bool,
}

impl Default for SeekFlags {
    fn default() -> Self {
        Self {
            flush: true,
            key_unit: true,
        }
    }
}

/// Asynchronous notification posted by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// An asynchronous state change (preroll, flushing seek) completed.
    AsyncDone,
    /// The stream reached its end.
    Eos,
    /// A runtime error inside the backend.
    Error {
        source: String,
        message: String,
        debug: Option<String>,
    },
    Warning {
        source: String,
        message: String,
    },
    Info {
        source: String,
        message: String,
    },
    /// The pipeline changed state.
    StateChanged {
        old: PlaybackState,
        new: PlaybackState,
    },
    /// An element exposed a new sometimes-port carrying `caps`.
    PadAdded {
        element: String,
        port: String,
        caps: String,
    },
}

/// Delivery handle for bus messages into the worker loop.
///
/// Messages share the worker's task channel, so they are handled in the
/// order they arrive relative to submitted tasks.
#[derive(Debug, Clone)]
pub struct BusWatch {
    tx: Sender<LoopEvent>,
}

impl BusWatch {
    pub(crate) fn new(tx: Sender<LoopEvent>) -> Self {
        Self { tx }
    }

    /// Post a message. Returns `false` once the worker loop is gone.
    pub fn post(&self, message: BusMessage) -> bool {
        self.tx.send(LoopEvent::Bus(message)).is_ok()
    }
}

const UNKNOWN: u64 = u64::MAX;

/// Playback position and duration, maintained by the backend and readable
/// from any thread without locking.
#[derive(Debug)]
pub struct PlaybackClock {
    position_ns: AtomicU64,
    duration_ns: AtomicU64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            position_ns: AtomicU64::new(UNKNOWN),
            duration_ns: AtomicU64::new(UNKNOWN),
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position, `None` when no stream is prerolled.
    pub fn position(&self) -> Option<Duration> {
        Self::load(&self.position_ns)
    }

    /// Stream duration, `None` when unknown.
    pub fn duration(&self) -> Option<Duration> {
        Self::load(&self.duration_ns)
    }

    pub fn set_position(&self, position: Option<Duration>) {
        Self::store(&self.position_ns, position);
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        Self::store(&self.duration_ns, duration);
    }

    pub fn reset(&self) {
        self.set_position(None);
        self.set_duration(None);
    }

    fn load(cell: &AtomicU64) -> Option<Duration> {
        match cell.load(Ordering::Acquire) {
            UNKNOWN => None,
            ns => Some(Duration::from_nanos(ns)),
        }
    }

    fn store(cell: &AtomicU64, value: Option<Duration>) {
        let ns = value
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(UNKNOWN - 1))
            .unwrap_or(UNKNOWN);
        cell.store(ns, Ordering::Release);
    }
}

/// Unified interface for media backends
///
/// Element and port addressing is by name; the [`MediaGraph`] guarantees
/// element names are unique within a pipeline. Bin children are addressed
/// by their own names as well.
///
/// Removal operations are infallible: a backend logs whatever it could not
/// release, since callers are already unwinding.
///
/// [`MediaGraph`]: crate::graph::MediaGraph
pub trait MediaBackend: Send {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Create the root pipeline container.
    fn create_pipeline(&mut self, name: &str) -> BackendResult<()>;

    /// Destroy the root pipeline and everything still inside it.
    fn destroy_pipeline(&mut self);

    /// Realize an element (and, for bins, its children and internal links).
    fn create_element(&mut self, spec: &ElementSpec) -> BackendResult<()>;

    /// Stop and remove an element from the pipeline.
    fn remove_element(&mut self, element: &str);

    /// Allocate a request port on a tee/selector.
    fn request_port(&mut self, element: &str, port: &str) -> BackendResult<()>;

    /// Release a previously requested port.
    fn release_port(&mut self, element: &str, port: &str);

    /// Link an output port to an input port.
    fn link(&mut self, from: PortAddr<'_>, to: PortAddr<'_>) -> BackendResult<()>;

    /// Remove a link.
    fn unlink(&mut self, from: PortAddr<'_>, to: PortAddr<'_>);

    /// Write a property on an element or bin child.
    fn set_property(
        &mut self,
        element: &str,
        key: &str,
        value: &PropertyValue,
    ) -> BackendResult<()>;

    /// Change the state of a single element, e.g. to sync a late-added one.
    fn set_element_state(&mut self, element: &str, state: PlaybackState) -> BackendResult<()>;

    /// Change the state of the whole pipeline.
    fn set_state(&mut self, state: PlaybackState) -> BackendResult<()>;

    /// Seek the pipeline to an absolute position.
    fn seek(&mut self, position: Duration, flags: SeekFlags) -> BackendResult<()>;

    /// Start delivering bus messages to `watch`.
    fn add_bus_watch(&mut self, watch: BusWatch) -> BackendResult<()>;

    /// Stop delivering bus messages.
    fn remove_bus_watch(&mut self) -> BackendResult<()>;

    /// Shared position/duration published by the backend.
    fn clock(&self) -> Arc<PlaybackClock>;
}
