//! Tasks and the command queue feeding the worker loop.
//!
//! Callers on any thread submit [`Task`]s through a [`TaskQueue`]. The
//! backend's bus watch feeds the same channel, so the worker sees tasks and
//! bus notifications as one ordered stream of [`LoopEvent`]s.

use crate::backend::{BusMessage, BusWatch};
use crate::effects::EffectUnit;
use crate::graph::node::PropertyValue;
use crate::graph::snapshot::TopologySnapshot;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::time::Duration;

/// Callback fired on transitions to Paused or Playing, with `is_playing`.
pub type StateCallback = Box<dyn Fn(bool) + Send + 'static>;

/// Callback fired once a newly loaded medium has prerolled.
pub type MediaCallback = Box<dyn Fn() + Send + 'static>;

/// Closure executed on the worker thread.
pub type WorkerFn = Box<dyn FnOnce() + Send + 'static>;

/// A command for the worker.
pub enum Task {
    /// Build the fixed skeleton. Always the first task in the queue.
    BuildGraph,
    /// Insert an effect between the tee and the selector and route to it.
    AttachEffect(Box<dyn EffectUnit>),
    /// Route back to the dry path and remove the attached effect.
    DetachEffect {
        reply: Option<Sender<Box<dyn EffectUnit>>>,
    },
    /// Preroll a new medium.
    LoadMedia(String),
    Play,
    Pause,
    /// Seek to an absolute position. `eos_rewind` seeks never resume playback.
    Seek { position: Duration, eos_rewind: bool },
    /// Forward a parameter change to the attached effect.
    ConfigureEffect { key: String, value: PropertyValue },
    /// Run an arbitrary closure on the worker thread.
    RunFunc(WorkerFn),
    SetStateCallback(StateCallback),
    SetMediaCallback(MediaCallback),
    /// Reply with a snapshot of the current topology.
    RequestTopology(Sender<TopologySnapshot>),
    /// Tear everything down and stop the loop.
    Shutdown,
}

impl Task {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::BuildGraph => "BuildGraph",
            Task::AttachEffect(_) => "AttachEffect",
            Task::DetachEffect { .. } => "DetachEffect",
            Task::LoadMedia(_) => "LoadMedia",
            Task::Play => "Play",
            Task::Pause => "Pause",
            Task::Seek { .. } => "Seek",
            Task::ConfigureEffect { .. } => "ConfigureEffect",
            Task::RunFunc(_) => "RunFunc",
            Task::SetStateCallback(_) => "SetStateCallback",
            Task::SetMediaCallback(_) => "SetMediaCallback",
            Task::RequestTopology(_) => "RequestTopology",
            Task::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::AttachEffect(unit) => write!(f, "AttachEffect({})", unit.name()),
            Task::LoadMedia(uri) => write!(f, "LoadMedia({})", uri),
            Task::Seek {
                position,
                eos_rewind,
            } => write!(f, "Seek({:?}, eos_rewind={})", position, eos_rewind),
            Task::ConfigureEffect { key, value } => {
                write!(f, "ConfigureEffect({}={})", key, value)
            }
            other => f.write_str(other.kind()),
        }
    }
}

/// One item of the worker's input stream.
#[derive(Debug)]
pub enum LoopEvent {
    Task(Task),
    Bus(BusMessage),
}

/// Cloneable, non-blocking submission handle.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: Sender<LoopEvent>,
}

impl TaskQueue {
    /// Create a queue and the receiving end drained by the worker.
    pub fn new() -> (Self, Receiver<LoopEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Enqueue a task. Returns `false` only once the worker is gone.
    pub fn submit(&self, task: Task) -> bool {
        let kind = task.kind();
        match self.tx.send(LoopEvent::Task(task)) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("Dropping {} task: worker has stopped", kind);
                false
            }
        }
    }

    /// Bus watch delivering into this queue.
    pub fn bus_watch(&self) -> BusWatch {
        BusWatch::new(self.tx.clone())
    }
}
