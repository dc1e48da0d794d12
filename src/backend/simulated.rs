//! Simulated Media Backend
//!
//! An in-process [`MediaBackend`] that keeps the same bookkeeping a real
//! backend would (elements, ports, links, properties, pipeline state) without
//! touching any audio hardware. It is what the headless driver and the test
//! suite run against.
//!
//! # Behaviour
//!
//! - **Preroll**: moving from Ready to Paused with a `uri` set on the source
//!   announces a decoded `src_0` port (`PadAdded`, caps `audio/x-raw`) and
//!   then posts `AsyncDone`, publishing the media duration on the clock.
//! - **Seek**: updates the clock position; flushing seeks post `AsyncDone`.
//! - **Ready/Null**: the source drops its decoded ports and the clock resets.
//!
//! # Control
//!
//! [`SimulatedControl`] is a cloneable handle that stays valid after the
//! backend has been moved into the worker. It can inject failures at any
//! step, post end-of-stream or errors, advance the position, register media
//! durations and inspect the realized topology and the call log.
//!
//! ```ignore
//! use streamfx_rs::backend::{SimulatedBackend, SimulatedControl};
//!
//! let (backend, control) = SimulatedBackend::new();
//! control.register_media("file:///a.wav", Duration::from_secs(42));
//! control.fail_link_involving("queue-wet-1");
//! let pipeline = Pipeline::new(backend, EngineConfig::default())?;
//! ```

use super::{
    BackendError, BackendResult, BusMessage, BusWatch, MediaBackend, PlaybackClock, PortAddr,
    SeekFlags,
};
use crate::engine::state::PlaybackState;
use crate::graph::node::{ElementSpec, NodeKind, PropertyValue};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Duration reported for media that was not registered explicitly.
pub const DEFAULT_MEDIA_DURATION: Duration = Duration::from_secs(180);

/// Caps announced for decoded streams unless overridden per URI.
pub const RAW_AUDIO_CAPS: &str = "audio/x-raw";

/// A backend operation that completed, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreatePipeline(String),
    DestroyPipeline,
    CreateElement(String),
    RemoveElement(String),
    RequestPort { element: String, port: String },
    ReleasePort { element: String, port: String },
    Link { from: String, to: String },
    Unlink { from: String, to: String },
    SetProperty {
        element: String,
        key: String,
        value: PropertyValue,
    },
    SetElementState { element: String, state: PlaybackState },
    SetState(PlaybackState),
    Seek(Duration),
    AddBusWatch,
    RemoveBusWatch,
}

#[derive(Debug, Default)]
struct FailurePlan {
    pipeline: bool,
    elements: HashSet<String>,
    factories: HashSet<String>,
    port_requests: HashSet<String>,
    links: HashSet<String>,
    properties: HashSet<(String, String)>,
    element_states: HashSet<String>,
    states: HashSet<PlaybackState>,
    seek: bool,
    media: HashSet<String>,
}

#[derive(Debug)]
struct SimElement {
    kind: NodeKind,
    parent: Option<String>,
    properties: HashMap<String, PropertyValue>,
    ports: BTreeSet<String>,
    dynamic_ports: BTreeSet<String>,
    state: PlaybackState,
}

impl SimElement {
    fn new(spec: &ElementSpec, parent: Option<&str>) -> Self {
        Self {
            kind: spec.kind,
            parent: parent.map(str::to_string),
            properties: spec.properties.iter().cloned().collect(),
            ports: spec
                .kind
                .static_ports()
                .iter()
                .map(|p| p.name.to_string())
                .collect(),
            dynamic_ports: BTreeSet::new(),
            state: PlaybackState::Uninitialized,
        }
    }
}

type LinkKey = (String, String, String, String);

#[derive(Debug)]
struct SimState {
    pipeline: Option<String>,
    elements: HashMap<String, SimElement>,
    links: HashSet<LinkKey>,
    state: PlaybackState,
    bus: Option<BusWatch>,
    media: HashMap<String, Duration>,
    caps: HashMap<String, String>,
    failures: FailurePlan,
    calls: Vec<BackendCall>,
}

impl SimState {
    fn new() -> Self {
        Self {
            pipeline: None,
            elements: HashMap::new(),
            links: HashSet::new(),
            state: PlaybackState::Uninitialized,
            bus: None,
            media: HashMap::new(),
            caps: HashMap::new(),
            failures: FailurePlan::default(),
            calls: Vec::new(),
        }
    }

    fn post(&self, message: BusMessage) {
        match &self.bus {
            Some(bus) => {
                if !bus.post(message) {
                    tracing::trace!("Bus message dropped: worker loop is gone");
                }
            }
            None => tracing::trace!("Bus message dropped: no watch installed: {:?}", message),
        }
    }

    fn port_linked(&self, element: &str, port: &str) -> bool {
        self.links.iter().any(|(fe, fp, te, tp)| {
            (fe == element && fp == port) || (te == element && tp == port)
        })
    }

    fn has_port(&self, element: &str, port: &str) -> bool {
        self.elements
            .get(element)
            .is_some_and(|e| e.ports.contains(port) || e.dynamic_ports.contains(port))
    }

    fn source_name(&self) -> Option<String> {
        self.elements
            .iter()
            .find(|(_, e)| e.kind == NodeKind::Source && e.parent.is_none())
            .map(|(name, _)| name.clone())
    }

    fn drop_source_ports(&mut self) {
        let Some(source) = self.source_name() else {
            return;
        };
        let dropped: Vec<String> = self
            .elements
            .get_mut(&source)
            .map(|e| std::mem::take(&mut e.dynamic_ports).into_iter().collect())
            .unwrap_or_default();
        for port in dropped {
            self.links
                .retain(|(fe, fp, _, _)| !(fe == &source && fp == &port));
        }
    }

    fn preroll(&mut self, clock: &PlaybackClock) {
        let Some(source) = self.source_name() else {
            return;
        };
        let uri = self
            .elements
            .get(&source)
            .and_then(|e| e.properties.get("uri"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let Some(uri) = uri else {
            self.post(BusMessage::Error {
                source,
                message: "No URI specified to play from.".to_string(),
                debug: None,
            });
            return;
        };

        if self.failures.media.contains(&uri) {
            self.post(BusMessage::Error {
                source,
                message: "Could not open resource for reading.".to_string(),
                debug: Some(format!("uri: {}", uri)),
            });
            return;
        }

        let duration = self.media.get(&uri).copied().unwrap_or(DEFAULT_MEDIA_DURATION);
        clock.set_duration(Some(duration));
        clock.set_position(Some(Duration::ZERO));

        let caps = self
            .caps
            .get(&uri)
            .cloned()
            .unwrap_or_else(|| RAW_AUDIO_CAPS.to_string());
        if let Some(element) = self.elements.get_mut(&source) {
            element.dynamic_ports.insert("src_0".to_string());
        }
        self.post(BusMessage::PadAdded {
            element: source,
            port: "src_0".to_string(),
            caps,
        });
        self.post(BusMessage::AsyncDone);
    }
}

/// In-process media backend.
#[derive(Debug)]
pub struct SimulatedBackend {
    shared: Arc<Mutex<SimState>>,
    clock: Arc<PlaybackClock>,
}

impl SimulatedBackend {
    /// Create a backend and the control handle bound to it.
    pub fn new() -> (Self, SimulatedControl) {
        let shared = Arc::new(Mutex::new(SimState::new()));
        let clock = Arc::new(PlaybackClock::new());
        let control = SimulatedControl {
            shared: shared.clone(),
            clock: clock.clone(),
        };
        (Self { shared, clock }, control)
    }

    fn sim(&self) -> MutexGuard<'_, SimState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MediaBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn create_pipeline(&mut self, name: &str) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim.failures.pipeline {
            return Err(BackendError::PipelineCreation(name.to_string()));
        }
        sim.pipeline = Some(name.to_string());
        sim.state = PlaybackState::Uninitialized;
        sim.calls.push(BackendCall::CreatePipeline(name.to_string()));
        Ok(())
    }

    fn destroy_pipeline(&mut self) {
        let mut sim = self.sim();
        sim.pipeline = None;
        sim.elements.clear();
        sim.links.clear();
        sim.state = PlaybackState::Uninitialized;
        sim.calls.push(BackendCall::DestroyPipeline);
        self.clock.reset();
    }

    fn create_element(&mut self, spec: &ElementSpec) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim.pipeline.is_none() {
            return Err(BackendError::NoPipeline);
        }

        let all_names = std::iter::once(spec).chain(spec.children.iter());
        for candidate in all_names {
            if sim.failures.elements.contains(&candidate.name)
                || sim.failures.factories.contains(&candidate.factory)
                || sim.elements.contains_key(&candidate.name)
            {
                return Err(BackendError::ElementCreation {
                    name: candidate.name.clone(),
                    factory: candidate.factory.clone(),
                });
            }
        }

        sim.elements
            .insert(spec.name.clone(), SimElement::new(spec, None));
        for child in &spec.children {
            sim.elements
                .insert(child.name.clone(), SimElement::new(child, Some(&spec.name)));
        }
        for (from, to) in &spec.child_links {
            sim.links.insert((
                from.clone(),
                "src".to_string(),
                to.clone(),
                "sink".to_string(),
            ));
        }
        sim.calls.push(BackendCall::CreateElement(spec.name.clone()));
        Ok(())
    }

    fn remove_element(&mut self, element: &str) {
        let mut sim = self.sim();
        let doomed: HashSet<String> = sim
            .elements
            .iter()
            .filter(|(name, e)| name.as_str() == element || e.parent.as_deref() == Some(element))
            .map(|(name, _)| name.clone())
            .collect();
        if doomed.is_empty() {
            tracing::warn!("Simulated backend: cannot remove unknown element '{}'", element);
            return;
        }
        sim.elements.retain(|name, _| !doomed.contains(name));
        sim.links
            .retain(|(fe, _, te, _)| !doomed.contains(fe) && !doomed.contains(te));
        sim.calls.push(BackendCall::RemoveElement(element.to_string()));
    }

    fn request_port(&mut self, element: &str, port: &str) -> BackendResult<()> {
        let mut sim = self.sim();
        let fail = sim.failures.port_requests.contains(element);
        match sim.elements.get_mut(element) {
            Some(e) if !fail && !e.ports.contains(port) => {
                e.ports.insert(port.to_string());
            }
            Some(_) => {
                return Err(BackendError::PortRequest {
                    element: element.to_string(),
                    port: port.to_string(),
                })
            }
            None => return Err(BackendError::UnknownElement(element.to_string())),
        }
        sim.calls.push(BackendCall::RequestPort {
            element: element.to_string(),
            port: port.to_string(),
        });
        Ok(())
    }

    fn release_port(&mut self, element: &str, port: &str) {
        let mut sim = self.sim();
        if let Some(e) = sim.elements.get_mut(element) {
            e.ports.remove(port);
        }
        sim.links.retain(|(fe, fp, te, tp)| {
            !((fe == element && fp == port) || (te == element && tp == port))
        });
        sim.calls.push(BackendCall::ReleasePort {
            element: element.to_string(),
            port: port.to_string(),
        });
    }

    fn link(&mut self, from: PortAddr<'_>, to: PortAddr<'_>) -> BackendResult<()> {
        let mut sim = self.sim();
        let fail = |reason: &str| BackendError::Link {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        };

        if sim.failures.links.contains(from.element) || sim.failures.links.contains(to.element) {
            return Err(fail("refused"));
        }
        if !sim.has_port(from.element, from.port) || !sim.has_port(to.element, to.port) {
            return Err(fail("no such port"));
        }
        if sim.port_linked(from.element, from.port) || sim.port_linked(to.element, to.port) {
            return Err(fail("was linked"));
        }

        sim.links.insert((
            from.element.to_string(),
            from.port.to_string(),
            to.element.to_string(),
            to.port.to_string(),
        ));
        sim.calls.push(BackendCall::Link {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    fn unlink(&mut self, from: PortAddr<'_>, to: PortAddr<'_>) {
        let mut sim = self.sim();
        sim.links.remove(&(
            from.element.to_string(),
            from.port.to_string(),
            to.element.to_string(),
            to.port.to_string(),
        ));
        sim.calls.push(BackendCall::Unlink {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    fn set_property(
        &mut self,
        element: &str,
        key: &str,
        value: &PropertyValue,
    ) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim
            .failures
            .properties
            .contains(&(element.to_string(), key.to_string()))
        {
            return Err(BackendError::Property {
                element: element.to_string(),
                key: key.to_string(),
                reason: "refused".to_string(),
            });
        }
        if key == "active-pad" {
            let target = value.as_str().unwrap_or_default();
            if !sim.has_port(element, target) {
                return Err(BackendError::Property {
                    element: element.to_string(),
                    key: key.to_string(),
                    reason: format!("no pad named '{}'", target),
                });
            }
        }
        match sim.elements.get_mut(element) {
            Some(e) => {
                e.properties.insert(key.to_string(), value.clone());
            }
            None => return Err(BackendError::UnknownElement(element.to_string())),
        }
        sim.calls.push(BackendCall::SetProperty {
            element: element.to_string(),
            key: key.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn set_element_state(&mut self, element: &str, state: PlaybackState) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim.failures.element_states.contains(element) {
            return Err(BackendError::StateChange(state));
        }
        let children: Vec<String> = sim
            .elements
            .iter()
            .filter(|(_, e)| e.parent.as_deref() == Some(element))
            .map(|(name, _)| name.clone())
            .collect();
        match sim.elements.get_mut(element) {
            Some(e) => e.state = state,
            None => return Err(BackendError::UnknownElement(element.to_string())),
        }
        for child in children {
            if let Some(e) = sim.elements.get_mut(&child) {
                e.state = state;
            }
        }
        sim.calls.push(BackendCall::SetElementState {
            element: element.to_string(),
            state,
        });
        Ok(())
    }

    fn set_state(&mut self, state: PlaybackState) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim.pipeline.is_none() {
            return Err(BackendError::NoPipeline);
        }
        if sim.failures.states.contains(&state) {
            return Err(BackendError::StateChange(state));
        }

        let old = sim.state;
        sim.state = state;
        for element in sim.elements.values_mut() {
            element.state = state;
        }
        sim.calls.push(BackendCall::SetState(state));
        if old != state {
            sim.post(BusMessage::StateChanged { old, new: state });
        }

        match state {
            PlaybackState::Uninitialized | PlaybackState::Ready => {
                sim.drop_source_ports();
                self.clock.reset();
            }
            PlaybackState::Paused if !old.is_prerolled() => sim.preroll(&self.clock),
            PlaybackState::Paused | PlaybackState::Playing => {}
        }
        Ok(())
    }

    fn seek(&mut self, position: Duration, flags: SeekFlags) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim.failures.seek || !sim.state.is_prerolled() {
            return Err(BackendError::Seek(position));
        }
        let target = match self.clock.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.clock.set_position(Some(target));
        sim.calls.push(BackendCall::Seek(position));
        if flags.flush {
            sim.post(BusMessage::AsyncDone);
        }
        Ok(())
    }

    fn add_bus_watch(&mut self, watch: BusWatch) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim.bus.is_some() {
            return Err(BackendError::Bus("a watch is already installed".to_string()));
        }
        sim.bus = Some(watch);
        sim.calls.push(BackendCall::AddBusWatch);
        Ok(())
    }

    fn remove_bus_watch(&mut self) -> BackendResult<()> {
        let mut sim = self.sim();
        if sim.bus.take().is_none() {
            return Err(BackendError::Bus("no watch installed".to_string()));
        }
        sim.calls.push(BackendCall::RemoveBusWatch);
        Ok(())
    }

    fn clock(&self) -> Arc<PlaybackClock> {
        self.clock.clone()
    }
}

/// Handle for driving and inspecting a [`SimulatedBackend`] from any thread.
#[derive(Debug, Clone)]
pub struct SimulatedControl {
    shared: Arc<Mutex<SimState>>,
    clock: Arc<PlaybackClock>,
}

impl SimulatedControl {
    fn sim(&self) -> MutexGuard<'_, SimState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Media ---

    /// Report `duration` when `uri` prerolls.
    pub fn register_media(&self, uri: impl Into<String>, duration: Duration) {
        self.sim().media.insert(uri.into(), duration);
    }

    /// Announce `caps` instead of raw audio when `uri` prerolls.
    pub fn set_media_caps(&self, uri: impl Into<String>, caps: impl Into<String>) {
        self.sim().caps.insert(uri.into(), caps.into());
    }

    // --- Failure injection ---

    pub fn fail_pipeline_creation(&self) {
        self.sim().failures.pipeline = true;
    }

    /// Fail creation of the element with this name (or a bin containing it).
    pub fn fail_element(&self, name: impl Into<String>) {
        self.sim().failures.elements.insert(name.into());
    }

    /// Fail creation of every element built from `factory`.
    pub fn fail_factory(&self, factory: impl Into<String>) {
        self.sim().failures.factories.insert(factory.into());
    }

    pub fn fail_port_request(&self, element: impl Into<String>) {
        self.sim().failures.port_requests.insert(element.into());
    }

    /// Fail any link that has `element` on either end.
    pub fn fail_link_involving(&self, element: impl Into<String>) {
        self.sim().failures.links.insert(element.into());
    }

    pub fn fail_property(&self, element: impl Into<String>, key: impl Into<String>) {
        self.sim()
            .failures
            .properties
            .insert((element.into(), key.into()));
    }

    pub fn fail_element_state(&self, element: impl Into<String>) {
        self.sim().failures.element_states.insert(element.into());
    }

    pub fn fail_state(&self, state: PlaybackState) {
        self.sim().failures.states.insert(state);
    }

    pub fn fail_seek(&self) {
        self.sim().failures.seek = true;
    }

    /// Post an error instead of prerolling `uri`.
    pub fn fail_media(&self, uri: impl Into<String>) {
        self.sim().failures.media.insert(uri.into());
    }

    pub fn clear_failures(&self) {
        self.sim().failures = FailurePlan::default();
    }

    // --- Events ---

    /// Post an arbitrary bus message. Returns `false` without a live watch.
    pub fn post(&self, message: BusMessage) -> bool {
        self.sim().bus.as_ref().is_some_and(|bus| bus.post(message))
    }

    /// Jump to the end of the stream and post end-of-stream.
    pub fn post_eos(&self) -> bool {
        if let Some(duration) = self.clock.duration() {
            self.clock.set_position(Some(duration));
        }
        self.post(BusMessage::Eos)
    }

    pub fn post_error(&self, source: impl Into<String>, message: impl Into<String>) -> bool {
        self.post(BusMessage::Error {
            source: source.into(),
            message: message.into(),
            debug: None,
        })
    }

    /// Move the position forward as if `by` had been played.
    pub fn advance(&self, by: Duration) {
        let current = self.clock.position().unwrap_or_default();
        let mut next = current + by;
        if let Some(duration) = self.clock.duration() {
            next = next.min(duration);
        }
        self.clock.set_position(Some(next));
    }

    // --- Inspection ---

    pub fn state(&self) -> PlaybackState {
        self.sim().state
    }

    pub fn has_pipeline(&self) -> bool {
        self.sim().pipeline.is_some()
    }

    pub fn bus_attached(&self) -> bool {
        self.sim().bus.is_some()
    }

    pub fn has_element(&self, name: &str) -> bool {
        self.sim().elements.contains_key(name)
    }

    /// Number of realized elements, bin children included.
    pub fn element_count(&self) -> usize {
        self.sim().elements.len()
    }

    pub fn element_property(&self, element: &str, key: &str) -> Option<PropertyValue> {
        self.sim()
            .elements
            .get(element)
            .and_then(|e| e.properties.get(key).cloned())
    }

    pub fn element_state(&self, element: &str) -> Option<PlaybackState> {
        self.sim().elements.get(element).map(|e| e.state)
    }

    pub fn ports(&self, element: &str) -> Vec<String> {
        self.sim()
            .elements
            .get(element)
            .map(|e| e.ports.iter().chain(e.dynamic_ports.iter()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_linked(&self, from: PortAddr<'_>, to: PortAddr<'_>) -> bool {
        self.sim().links.contains(&(
            from.element.to_string(),
            from.port.to_string(),
            to.element.to_string(),
            to.port.to_string(),
        ))
    }

    pub fn link_count(&self) -> usize {
        self.sim().links.len()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.sim().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.sim().calls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn backend_with_bus() -> (
        SimulatedBackend,
        SimulatedControl,
        crossbeam_channel::Receiver<crate::engine::task::LoopEvent>,
    ) {
        let (mut backend, control) = SimulatedBackend::new();
        let (tx, rx) = unbounded();
        backend.create_pipeline("test-pipeline").unwrap();
        backend.add_bus_watch(BusWatch::new(tx)).unwrap();
        (backend, control, rx)
    }

    fn bus_messages(
        rx: &crossbeam_channel::Receiver<crate::engine::task::LoopEvent>,
    ) -> Vec<BusMessage> {
        rx.try_iter()
            .filter_map(|event| match event {
                crate::engine::task::LoopEvent::Bus(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_create_element_requires_pipeline() {
        let (mut backend, _control) = SimulatedBackend::new();
        let spec = ElementSpec::new(NodeKind::Queue, "q");
        assert_eq!(backend.create_element(&spec), Err(BackendError::NoPipeline));
    }

    #[test]
    fn test_bin_children_are_realized_and_linked() {
        let (mut backend, control, _rx) = backend_with_bus();
        let bin = ElementSpec::bin(
            "fx",
            vec![
                ElementSpec::new(NodeKind::Valve, "fx-valve"),
                ElementSpec::new(NodeKind::Pitch, "fx-pitch"),
            ],
        );
        backend.create_element(&bin).unwrap();

        assert!(control.has_element("fx"));
        assert!(control.has_element("fx-valve"));
        assert!(control.is_linked(
            PortAddr::new("fx-valve", "src"),
            PortAddr::new("fx-pitch", "sink")
        ));

        backend.remove_element("fx");
        assert_eq!(control.element_count(), 0);
        assert_eq!(control.link_count(), 0);
    }

    #[test]
    fn test_link_rejects_linked_port() {
        let (mut backend, _control, _rx) = backend_with_bus();
        for name in ["a", "b", "c"] {
            backend
                .create_element(&ElementSpec::new(NodeKind::Queue, name))
                .unwrap();
        }
        backend
            .link(PortAddr::new("a", "src"), PortAddr::new("b", "sink"))
            .unwrap();
        let err = backend
            .link(PortAddr::new("a", "src"), PortAddr::new("c", "sink"))
            .unwrap_err();
        assert!(matches!(err, BackendError::Link { .. }));
    }

    #[test]
    fn test_preroll_announces_pad_then_async_done() {
        let (mut backend, control, rx) = backend_with_bus();
        control.register_media("file:///a.wav", Duration::from_secs(42));
        backend
            .create_element(&ElementSpec::new(NodeKind::Source, "src"))
            .unwrap();
        backend
            .set_property("src", "uri", &PropertyValue::from("file:///a.wav"))
            .unwrap();
        backend.set_state(PlaybackState::Ready).unwrap();
        backend.set_state(PlaybackState::Paused).unwrap();

        let messages = bus_messages(&rx);
        let pad_idx = messages
            .iter()
            .position(|m| matches!(m, BusMessage::PadAdded { .. }))
            .expect("pad-added posted");
        let done_idx = messages
            .iter()
            .position(|m| matches!(m, BusMessage::AsyncDone))
            .expect("async-done posted");
        assert!(pad_idx < done_idx);
        assert_eq!(backend.clock().duration(), Some(Duration::from_secs(42)));
        assert_eq!(control.ports("src"), vec!["src_0".to_string()]);
    }

    #[test]
    fn test_failed_media_posts_error() {
        let (mut backend, control, rx) = backend_with_bus();
        control.fail_media("file:///broken.wav");
        backend
            .create_element(&ElementSpec::new(NodeKind::Source, "src"))
            .unwrap();
        backend
            .set_property("src", "uri", &PropertyValue::from("file:///broken.wav"))
            .unwrap();
        backend.set_state(PlaybackState::Paused).unwrap();

        assert!(bus_messages(&rx)
            .iter()
            .any(|m| matches!(m, BusMessage::Error { .. })));
    }

    #[test]
    fn test_seek_requires_preroll() {
        let (mut backend, _control, _rx) = backend_with_bus();
        backend.set_state(PlaybackState::Ready).unwrap();
        assert!(backend
            .seek(Duration::from_secs(1), SeekFlags::default())
            .is_err());
    }

    #[test]
    fn test_active_pad_must_exist() {
        let (mut backend, _control, _rx) = backend_with_bus();
        backend
            .create_element(&ElementSpec::new(NodeKind::Selector, "sel"))
            .unwrap();
        assert!(backend
            .set_property("sel", "active-pad", &PropertyValue::from("sink_0"))
            .is_err());
        backend.request_port("sel", "sink_0").unwrap();
        backend
            .set_property("sel", "active-pad", &PropertyValue::from("sink_0"))
            .unwrap();
    }
}
