//! Media Worker Thread Implementation
//!
//! This module contains the loop that owns the [`MediaGraph`] and the
//! playback state. It runs on a dedicated thread and is the only code that
//! ever mutates the graph.
//!
//! # Responsibilities
//!
//! - **Task processing**: builds the skeleton, loads media, plays, pauses,
//!   seeks, attaches and detaches effects, tears everything down
//! - **Bus handling**: reacts to preroll completion, end-of-stream, errors
//!   and newly decoded source ports
//! - **State publication**: mirrors the playback state into [`SharedStatus`]
//!   and fires user callbacks
//!
//! # Ordering
//!
//! Tasks and bus messages arrive on one channel and are handled strictly in
//! arrival order. Follow-up work triggered by a bus message (a rewind after
//! end-of-stream, a pause after an error) is enqueued behind whatever is
//! already waiting rather than run inline.
//!
//! # Failure model
//!
//! Handlers return [`Result`]; the dispatcher logs errors and keeps the loop
//! alive. Nothing that goes wrong inside a task, including a panic in a user
//! closure or callback, crosses back to the caller.

use crate::backend::{BusMessage, MediaBackend};
use crate::config::EngineConfig;
use crate::effects::{EffectContext, EffectUnit};
use crate::engine::gate::{Gate, GateOpener};
use crate::engine::state::{PlaybackState, SharedStatus};
use crate::engine::task::{LoopEvent, MediaCallback, StateCallback, Task, TaskQueue};
use crate::error::{EngineError, Result, ResultExt};
use crate::graph::error::GraphError;
use crate::graph::media_graph::MediaGraph;
use crate::graph::node::PropertyValue;
use crate::graph::routing::{self, ActiveRoute, WetPath, WetPathRequest};
use crate::graph::skeleton::{Skeleton, SOURCE};
use crate::graph::snapshot::TopologySnapshot;
use crossbeam_channel::{Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// An effect spliced into the wet branch.
struct AttachedEffect {
    unit: Box<dyn EffectUnit>,
    path: WetPath,
}

/// The worker that owns the graph and runs the loop
pub struct Worker {
    config: EngineConfig,
    graph: MediaGraph,
    skeleton: Skeleton,
    /// Submission handle for follow-up tasks and the bus watch
    queue: TaskQueue,
    events: Receiver<LoopEvent>,
    status: Arc<SharedStatus>,
    state: PlaybackState,
    /// URI bound to the source, if any
    uri: Option<String>,
    /// Set by LoadMedia, cleared by the next AsyncDone or Error
    media_change_pending: bool,
    attached: Option<AttachedEffect>,
    /// Serial for wet queue names
    wet_serial: u32,
    state_callback: Option<StateCallback>,
    media_callback: Option<MediaCallback>,
    /// Opened once BuildGraph has run
    built: Option<GateOpener>,
    running: bool,
}

impl Worker {
    pub fn new(
        config: EngineConfig,
        backend: Box<dyn MediaBackend>,
        queue: TaskQueue,
        events: Receiver<LoopEvent>,
        status: Arc<SharedStatus>,
        built: GateOpener,
    ) -> Self {
        Self {
            config,
            graph: MediaGraph::new(backend),
            skeleton: Skeleton::default(),
            queue,
            events,
            status,
            state: PlaybackState::Uninitialized,
            uri: None,
            media_change_pending: false,
            attached: None,
            wet_serial: 0,
            state_callback: None,
            media_callback: None,
            built: Some(built),
            running: true,
        }
    }

    /// Run the loop until a Shutdown task has been processed
    pub fn run(mut self, start: Gate) {
        start.wait();
        tracing::info!(
            "Media worker started on {} backend",
            self.graph.backend_name()
        );

        while self.running {
            match self.events.recv() {
                Ok(LoopEvent::Task(task)) => self.handle_task(task),
                Ok(LoopEvent::Bus(message)) => self.handle_bus_message(message),
                Err(_) => {
                    tracing::warn!("Task channel closed without a Shutdown task");
                    break;
                }
            }
        }

        let dropped = self.events.try_iter().count();
        if dropped > 0 {
            tracing::debug!("Discarding {} events queued after shutdown", dropped);
        }
        tracing::info!("Media worker stopped");
    }

    // ── Dispatch ──

    fn handle_task(&mut self, task: Task) {
        tracing::debug!("Executing task: {:?}", task);
        let kind = task.kind();

        let result = match task {
            Task::BuildGraph => {
                self.handle_build_graph();
                Ok(())
            }
            Task::Shutdown => {
                self.handle_shutdown();
                Ok(())
            }
            Task::RunFunc(f) => {
                guarded("worker closure", f);
                Ok(())
            }
            Task::SetStateCallback(callback) => {
                self.state_callback = Some(callback);
                Ok(())
            }
            Task::SetMediaCallback(callback) => {
                self.media_callback = Some(callback);
                Ok(())
            }
            Task::RequestTopology(reply) => {
                self.handle_request_topology(reply);
                Ok(())
            }
            task if !self.graph.is_realized() => {
                tracing::error!("{} ignored: pipeline does not exist", task.kind());
                Ok(())
            }
            Task::AttachEffect(unit) => self.handle_attach_effect(unit),
            Task::DetachEffect { reply } => self.handle_detach_effect(reply),
            Task::LoadMedia(uri) => self.handle_load_media(uri),
            Task::Play => {
                self.handle_play();
                Ok(())
            }
            Task::Pause => {
                self.handle_pause();
                Ok(())
            }
            Task::Seek {
                position,
                eos_rewind,
            } => {
                self.handle_seek(position, eos_rewind);
                Ok(())
            }
            Task::ConfigureEffect { key, value } => self.handle_configure_effect(&key, &value),
        };

        if let Err(e) = result {
            tracing::error!("{} failed: {}", kind, e);
        }
    }

    fn handle_bus_message(&mut self, message: BusMessage) {
        match message {
            BusMessage::AsyncDone => {
                tracing::trace!("Async state change completed");
                if self.media_change_pending {
                    self.media_change_pending = false;
                    if let Some(callback) = &self.media_callback {
                        guarded("media-changed callback", callback);
                    }
                }
            }
            BusMessage::Eos => {
                tracing::info!("End-of-stream reached");
                self.queue.submit(Task::Seek {
                    position: Duration::ZERO,
                    eos_rewind: true,
                });
                self.queue.submit(Task::Pause);
            }
            BusMessage::Error {
                source,
                message,
                debug: debug_info,
            } => {
                tracing::error!("Error received from element {}: {}", source, message);
                tracing::error!(
                    "Debugging information: {}",
                    debug_info.as_deref().unwrap_or("none")
                );
                self.media_change_pending = false;
                self.queue.submit(Task::Pause);
            }
            BusMessage::Warning { source, message } => {
                tracing::warn!("Warning from element {}: {}", source, message);
            }
            BusMessage::Info { source, message } => {
                tracing::info!("Info from element {}: {}", source, message);
            }
            BusMessage::StateChanged { old, new } => {
                tracing::trace!("Backend state changed: {} -> {}", old, new);
            }
            BusMessage::PadAdded {
                element,
                port,
                caps,
            } => {
                match self
                    .skeleton
                    .link_source_port(&mut self.graph, &element, &port, &caps)
                {
                    Ok(true) => tracing::debug!("Linked {}:{} to the converter", element, port),
                    Ok(false) => {}
                    Err(e) => tracing::error!("Failed to link {}:{}: {}", element, port, e),
                }
            }
        }
    }

    // ── State ──

    /// Change the pipeline state. Failures are logged and leave the state unchanged.
    fn set_state(&mut self, new: PlaybackState) -> bool {
        if let Err(e) = self.graph.set_state(new) {
            tracing::error!("Failed to change state {} -> {}: {}", self.state, new, e);
            return false;
        }

        let old = std::mem::replace(&mut self.state, new);
        self.status.publish_state(new);
        tracing::debug!("State {} -> {}", old, new);

        if new.is_prerolled() {
            if let Some(callback) = &self.state_callback {
                let playing = new == PlaybackState::Playing;
                guarded("state-changed callback", || callback(playing));
            }
        }
        true
    }

    // ── Task handlers ──

    fn handle_build_graph(&mut self) {
        if self.graph.is_realized() {
            tracing::warn!("Pipeline is already built");
            return;
        }

        self.skeleton = Skeleton::build(
            &mut self.graph,
            &self.config.pipeline,
            self.queue.bus_watch(),
        );
        if self.graph.is_realized() {
            self.set_state(PlaybackState::Uninitialized);
            self.set_state(PlaybackState::Ready);
        }

        self.status.publish_built();
        if let Some(opener) = self.built.take() {
            opener.open();
        }
    }

    fn handle_load_media(&mut self, uri: String) -> Result<()> {
        if self.uri.as_deref() == Some(uri.as_str()) {
            tracing::info!("'{}' is already loaded", uri);
            return Ok(());
        }
        let source = self
            .skeleton
            .source
            .ok_or(GraphError::MissingElement(SOURCE))?;

        tracing::info!("Loading '{}'", uri);
        self.media_change_pending = true;
        self.set_state(PlaybackState::Ready);

        if let Err(e) = self.graph.set_property(source, "uri", uri.as_str()) {
            self.media_change_pending = false;
            return Err(EngineError::from(e).with_context(format!("Setting URI '{}'", uri)));
        }
        self.uri = Some(uri);
        self.status.publish_media_loaded(true);

        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    fn handle_play(&mut self) {
        if self.state == PlaybackState::Playing {
            tracing::info!("Pipeline is already playing");
            return;
        }
        if self.uri.is_none() {
            tracing::warn!("Cannot play: no media is loaded");
            return;
        }
        self.set_state(PlaybackState::Playing);
    }

    fn handle_pause(&mut self) {
        if self.state == PlaybackState::Paused {
            tracing::info!("Pipeline is already paused");
            return;
        }
        self.set_state(PlaybackState::Paused);
    }

    fn handle_seek(&mut self, position: Duration, eos_rewind: bool) {
        if self.uri.is_none() {
            tracing::warn!("Cannot seek: no media is loaded");
            return;
        }

        let prior = self.state;
        self.handle_pause();

        match self.graph.seek(position, self.config.seek_flags()) {
            Ok(()) => tracing::debug!("Seeked to {:?}", position),
            Err(e) => tracing::error!("Seek to {:?} failed: {}", position, e),
        }

        if prior == PlaybackState::Playing && !eos_rewind {
            self.handle_play();
        }
    }

    fn handle_attach_effect(&mut self, mut unit: Box<dyn EffectUnit>) -> Result<()> {
        if let Some(attached) = &self.attached {
            tracing::warn!(
                "Effect '{}' is already attached; rejecting '{}'",
                attached.unit.name(),
                unit.name()
            );
            return Ok(());
        }
        if !self.skeleton.supports_wet_path() {
            tracing::warn!(
                "Cannot attach '{}': the graph has no tee or selector",
                unit.name()
            );
            return Ok(());
        }

        let queue_name = format!("queue-wet-{}", self.wet_serial);
        self.wet_serial = self.wet_serial.wrapping_add(1);

        let request = WetPathRequest {
            bin: unit.bin().clone(),
            input_port: unit.input_port(),
            output_port: unit.output_port(),
            queue_name,
            state: self.state,
        };
        let path = routing::attach_wet_path(&mut self.graph, &self.skeleton, request)
            .with_context(|| format!("Attaching effect '{}'", unit.name()))?;

        unit.on_attach(path.effect);
        tracing::info!("Effect '{}' attached, wet path active", unit.name());
        self.attached = Some(AttachedEffect { unit, path });
        Ok(())
    }

    fn handle_detach_effect(&mut self, reply: Option<Sender<Box<dyn EffectUnit>>>) -> Result<()> {
        let Some(attached) = self.attached.take() else {
            tracing::warn!("No effect is attached");
            return Ok(());
        };

        if let Err(e) = routing::detach_wet_path(&mut self.graph, &self.skeleton, &attached.path)
        {
            let name = attached.unit.name().to_string();
            self.attached = Some(attached);
            return Err(EngineError::from(e).with_context(format!("Detaching effect '{}'", name)));
        }

        let mut unit = attached.unit;
        unit.on_detach();
        tracing::info!("Effect '{}' detached, dry path active", unit.name());

        if let Some(reply) = reply {
            if reply.send(unit).is_err() {
                tracing::debug!("Detached effect dropped: caller is gone");
            }
        }
        Ok(())
    }

    fn handle_configure_effect(&mut self, key: &str, value: &PropertyValue) -> Result<()> {
        let Some(attached) = self.attached.as_mut() else {
            tracing::warn!("Cannot set '{}': no effect is attached", key);
            return Ok(());
        };
        let mut ctx = EffectContext::new(&mut self.graph, attached.path.effect);
        attached
            .unit
            .on_config_change(key, value, &mut ctx)
            .with_context(|| format!("Configuring '{}'", attached.unit.name()))?;
        tracing::debug!("Effect '{}': {} = {}", attached.unit.name(), key, value);
        Ok(())
    }

    fn handle_request_topology(&self, reply: Sender<TopologySnapshot>) {
        if reply.send(self.snapshot()).is_err() {
            tracing::debug!("Topology requester is gone");
        }
    }

    fn handle_shutdown(&mut self) {
        tracing::info!("Shutting down pipeline");

        if self.graph.is_realized() {
            if self.state == PlaybackState::Playing {
                self.handle_pause();
            }
            self.teardown_wet_path();
            self.set_state(PlaybackState::Uninitialized);
            self.skeleton.teardown(&mut self.graph);
            if let Err(e) = self.graph.remove_bus_watch() {
                tracing::warn!("Failed to remove bus watch: {}", e);
            }
            self.graph.destroy();
        } else {
            tracing::warn!("Pipeline does not exist, nothing to tear down");
        }

        self.uri = None;
        self.media_change_pending = false;
        self.state = PlaybackState::Uninitialized;
        self.status.publish_state(self.state);
        self.status.publish_media_loaded(false);
        self.running = false;
    }

    /// Remove the wet branch during shutdown, even if the route switch fails.
    fn teardown_wet_path(&mut self) {
        let Some(attached) = self.attached.take() else {
            return;
        };
        if let Err(e) = routing::detach_wet_path(&mut self.graph, &self.skeleton, &attached.path) {
            tracing::warn!("Route switch failed during shutdown ({}), removing wet path", e);
            for node in [attached.path.queue, attached.path.effect] {
                if let Err(e) = self.graph.remove_node(node) {
                    tracing::warn!("Failed to remove wet node {:?}: {}", node, e);
                }
            }
        }
        let mut unit = attached.unit;
        unit.on_detach();
    }

    // ── Queries ──

    fn route(&self) -> ActiveRoute {
        match &self.attached {
            Some(attached) => ActiveRoute::Wet {
                effect: attached.unit.name().to_string(),
            },
            None => ActiveRoute::Dry,
        }
    }

    fn snapshot(&self) -> TopologySnapshot {
        let active_pad = self
            .skeleton
            .selector
            .and_then(|selector| self.graph.property(selector, "active-pad"))
            .and_then(|value| value.as_str())
            .map(str::to_string);
        TopologySnapshot::capture(&self.graph, self.state, &self.route(), active_pad)
    }
}

/// Run user code, logging instead of unwinding through the loop.
fn guarded(label: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!("A {} panicked; continuing", label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SimulatedBackend, SimulatedControl};
    use crate::effects::PitchShift;
    use crate::engine::gate::gate;

    struct Harness {
        worker: Worker,
        control: SimulatedControl,
        status: Arc<SharedStatus>,
        built: Gate,
    }

    fn harness() -> Harness {
        let (backend, control) = SimulatedBackend::new();
        let (queue, events) = TaskQueue::new();
        let status = Arc::new(SharedStatus::new());
        let (opener, built) = gate();
        let worker = Worker::new(
            EngineConfig::default(),
            Box::new(backend),
            queue,
            events,
            status.clone(),
            opener,
        );
        Harness {
            worker,
            control,
            status,
            built,
        }
    }

    /// Handle everything queued so far, including follow-ups.
    fn drain(worker: &mut Worker) {
        while worker.running {
            match worker.events.try_recv() {
                Ok(LoopEvent::Task(task)) => worker.handle_task(task),
                Ok(LoopEvent::Bus(message)) => worker.handle_bus_message(message),
                Err(_) => break,
            }
        }
    }

    fn built_harness() -> Harness {
        let mut h = harness();
        h.worker.handle_task(Task::BuildGraph);
        drain(&mut h.worker);
        h
    }

    #[test]
    fn test_build_opens_gate_and_reaches_ready() {
        let h = built_harness();
        assert!(h.built.is_open());
        assert!(h.status.is_built());
        assert_eq!(h.worker.state, PlaybackState::Ready);
        assert_eq!(h.control.state(), PlaybackState::Ready);
    }

    #[test]
    fn test_tasks_ignored_without_pipeline() {
        let mut h = harness();
        h.control.fail_pipeline_creation();
        h.worker.handle_task(Task::BuildGraph);
        h.worker.handle_task(Task::LoadMedia("file:///a.wav".into()));
        assert!(h.built.is_open());
        assert!(h.worker.uri.is_none());
        assert_eq!(h.worker.state, PlaybackState::Uninitialized);
    }

    #[test]
    fn test_load_media_prerolls_and_links_source() {
        let mut h = built_harness();
        h.worker.handle_task(Task::LoadMedia("file:///a.wav".into()));
        drain(&mut h.worker);

        assert_eq!(h.worker.state, PlaybackState::Paused);
        assert!(!h.worker.media_change_pending);
        let snapshot = h.worker.snapshot();
        assert!(snapshot.has_link("source:src_0", "convert:sink"));
    }

    #[test]
    fn test_play_without_media_is_noop() {
        let mut h = built_harness();
        h.worker.handle_task(Task::Play);
        assert_eq!(h.worker.state, PlaybackState::Ready);
    }

    #[test]
    fn test_error_clears_pending_media_change() {
        let mut h = built_harness();
        h.control.fail_media("file:///broken.wav");
        h.worker
            .handle_task(Task::LoadMedia("file:///broken.wav".into()));
        drain(&mut h.worker);
        assert!(!h.worker.media_change_pending);
        assert_eq!(h.worker.state, PlaybackState::Paused);
    }

    #[test]
    fn test_bus_error_with_debug_info_pauses() {
        let mut h = built_harness();
        h.worker.handle_task(Task::LoadMedia("file:///a.wav".into()));
        drain(&mut h.worker);
        h.worker.handle_task(Task::Play);
        drain(&mut h.worker);
        assert_eq!(h.worker.state, PlaybackState::Playing);

        h.worker.handle_bus_message(BusMessage::Error {
            source: "decoder".to_string(),
            message: "stream corrupt".to_string(),
            debug: Some("frame 12 truncated".to_string()),
        });
        drain(&mut h.worker);
        assert_eq!(h.worker.state, PlaybackState::Paused);
        assert!(!h.status.is_playing());
    }

    #[test]
    fn test_wet_queue_serial_wraps() {
        let mut h = built_harness();
        h.worker.wet_serial = u32::MAX;
        h.worker
            .handle_task(Task::AttachEffect(Box::new(PitchShift::new("fx"))));

        assert!(h.control.has_element(&format!("queue-wet-{}", u32::MAX)));
        assert_eq!(h.worker.wet_serial, 0);
    }

    #[test]
    fn test_attach_rejected_without_tee() {
        let mut h = harness();
        h.control.fail_factory("tee");
        h.worker.handle_task(Task::BuildGraph);
        drain(&mut h.worker);

        h.worker
            .handle_task(Task::AttachEffect(Box::new(PitchShift::new("fx"))));
        assert_eq!(h.worker.route(), ActiveRoute::Dry);
        assert!(!h.control.has_element("fx"));
        assert_eq!(h.worker.wet_serial, 0);
    }

    #[test]
    fn test_second_attach_rejected() {
        let mut h = built_harness();
        h.worker
            .handle_task(Task::AttachEffect(Box::new(PitchShift::new("fx-a"))));
        h.worker
            .handle_task(Task::AttachEffect(Box::new(PitchShift::new("fx-b"))));

        assert_eq!(
            h.worker.route(),
            ActiveRoute::Wet {
                effect: "fx-a".to_string()
            }
        );
        assert!(!h.control.has_element("fx-b"));
    }

    #[test]
    fn test_detach_replies_with_unit() {
        let mut h = built_harness();
        h.worker
            .handle_task(Task::AttachEffect(Box::new(PitchShift::new("fx"))));
        let (tx, rx) = crossbeam_channel::bounded(1);
        h.worker.handle_task(Task::DetachEffect { reply: Some(tx) });

        let unit = rx.try_recv().unwrap();
        assert_eq!(unit.name(), "fx");
        assert_eq!(h.worker.route(), ActiveRoute::Dry);
    }

    #[test]
    fn test_panicking_closure_does_not_stop_loop() {
        let mut h = built_harness();
        h.worker
            .handle_task(Task::RunFunc(Box::new(|| panic!("boom"))));
        assert!(h.worker.running);
    }

    #[test]
    fn test_shutdown_tears_everything_down() {
        let mut h = built_harness();
        h.worker
            .handle_task(Task::AttachEffect(Box::new(PitchShift::new("fx"))));
        h.worker.handle_task(Task::Shutdown);

        assert!(!h.worker.running);
        assert!(!h.control.has_pipeline());
        assert!(!h.control.bus_attached());
        assert_eq!(h.control.element_count(), 0);
    }
}
