//! Caller-facing pipeline handle
//!
//! [`Pipeline`] owns the worker thread and exposes the playback API. Every
//! mutating call only enqueues a [`Task`] and returns; the worker applies it
//! later, in submission order. Position, duration and the playing flag are
//! read from atomics and never wait for the worker.

use crate::backend::{BackendRuntime, MediaBackend, PlaybackClock};
use crate::config::EngineConfig;
use crate::effects::EffectUnit;
use crate::engine::gate::{gate, Gate};
use crate::engine::state::{PlaybackState, SharedStatus};
use crate::engine::task::{Task, TaskQueue};
use crate::engine::worker::Worker;
use crate::error::{EngineError, Result};
use crate::graph::node::PropertyValue;
use crate::graph::snapshot::TopologySnapshot;
use crossbeam_channel::{bounded, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running media pipeline
pub struct Pipeline {
    queue: TaskQueue,
    status: Arc<SharedStatus>,
    clock: Arc<PlaybackClock>,
    /// Open once the skeleton has been built
    built: Gate,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Start the worker and schedule the skeleton build.
    ///
    /// Returns before the skeleton exists. Use [`Pipeline::wait_until_built`]
    /// to block until it does.
    pub fn new(backend: impl MediaBackend + 'static, config: EngineConfig) -> Result<Self> {
        if !BackendRuntime::is_active() {
            tracing::warn!(
                "Creating a pipeline on '{}' without an active backend runtime",
                backend.name()
            );
        }

        let (queue, events) = TaskQueue::new();
        let status = Arc::new(SharedStatus::new());
        let clock = backend.clock();
        let (start_opener, start) = gate();
        let (built_opener, built) = gate();

        let thread_name = config.pipeline.worker_thread_name.clone();
        let worker = Worker::new(
            config,
            Box::new(backend),
            queue.clone(),
            events,
            status.clone(),
            built_opener,
        );
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker.run(start))
            .map_err(EngineError::WorkerSpawn)?;

        // The worker blocks on `start` until BuildGraph is queued first.
        queue.submit(Task::BuildGraph);
        start_opener.open();

        Ok(Self {
            queue,
            status,
            clock,
            built,
            worker: Some(handle),
        })
    }

    // ==================== Playback ====================

    /// Bind a new media URI and preroll it
    pub fn load_media(&self, uri: impl Into<String>) {
        self.queue.submit(Task::LoadMedia(uri.into()));
    }

    pub fn play(&self) {
        self.queue.submit(Task::Play);
    }

    pub fn pause(&self) {
        self.queue.submit(Task::Pause);
    }

    /// Seek to `position`, resuming playback if it was playing
    pub fn seek(&self, position: Duration) {
        self.queue.submit(Task::Seek {
            position,
            eos_rewind: false,
        });
    }

    // ==================== Effects ====================

    /// Splice an effect into the wet branch and route through it.
    ///
    /// Blocks until the skeleton is built.
    pub fn attach_effect(&self, effect: Box<dyn EffectUnit>) {
        self.built.wait();
        self.queue.submit(Task::AttachEffect(effect));
    }

    /// Route back to the dry branch and remove the effect.
    ///
    /// The receiver yields the detached effect, or disconnects if nothing
    /// was attached or the detach failed. Blocks until the skeleton is built.
    pub fn detach_effect(&self) -> Receiver<Box<dyn EffectUnit>> {
        self.built.wait();
        let (tx, rx) = bounded(1);
        self.queue.submit(Task::DetachEffect { reply: Some(tx) });
        rx
    }

    /// Forward a parameter change to the attached effect
    pub fn configure_effect(&self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let submitted = self.queue.submit(Task::ConfigureEffect {
            key: key.to_string(),
            value: value.into(),
        });
        if submitted {
            Ok(())
        } else {
            Err(EngineError::Channel("media worker has stopped".to_string()))
        }
    }

    // ==================== Worker access ====================

    /// Run a closure on the worker thread, after everything queued before it
    pub fn run_on_worker(&self, f: impl FnOnce() + Send + 'static) {
        self.queue.submit(Task::RunFunc(Box::new(f)));
    }

    /// Ask the worker for a snapshot of the current graph
    pub fn request_topology(&self) -> Receiver<TopologySnapshot> {
        let (tx, rx) = bounded(1);
        self.queue.submit(Task::RequestTopology(tx));
        rx
    }

    /// Register the callback fired on every Paused/Playing transition.
    ///
    /// It runs on the worker thread with `true` for Playing.
    pub fn on_state_changed(&self, callback: impl Fn(bool) + Send + 'static) {
        self.queue.submit(Task::SetStateCallback(Box::new(callback)));
    }

    /// Register the callback fired once each newly loaded media has prerolled
    pub fn on_media_changed(&self, callback: impl Fn() + Send + 'static) {
        self.queue.submit(Task::SetMediaCallback(Box::new(callback)));
    }

    // ==================== Queries ====================

    /// Current position, zero when unknown
    pub fn query_position(&self) -> Duration {
        self.clock.position().unwrap_or(Duration::ZERO)
    }

    /// Media duration, zero when unknown
    pub fn query_duration(&self) -> Duration {
        self.clock.duration().unwrap_or(Duration::ZERO)
    }

    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    pub fn state(&self) -> PlaybackState {
        self.status.state()
    }

    pub fn is_media_loaded(&self) -> bool {
        self.status.media_loaded()
    }

    /// Block until the skeleton build has run
    pub fn wait_until_built(&self) {
        self.built.wait();
    }

    /// Like [`Pipeline::wait_until_built`], giving up after `timeout`
    pub fn wait_until_built_timeout(&self, timeout: Duration) -> bool {
        self.built.wait_timeout(timeout)
    }

    // ==================== Shutdown ====================

    /// Tear down the graph and join the worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        tracing::debug!("Stopping media worker");
        self.queue.submit(Task::Shutdown);
        if handle.join().is_err() {
            tracing::error!("Media worker panicked during shutdown");
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state())
            .field("built", &self.status.is_built())
            .field("running", &self.worker.is_some())
            .finish()
    }
}
