//! Callback recorders
//!
//! Callbacks run on the worker thread; recorders collect what they saw so a
//! test can assert on it after [`settle`](super::settle).

use std::sync::{Arc, Mutex};
use streamfx_rs::Pipeline;

/// Records every state-changed callback
#[derive(Clone, Default)]
pub struct StateRecorder {
    seen: Arc<Mutex<Vec<bool>>>,
}

impl StateRecorder {
    pub fn attach(pipeline: &Pipeline) -> Self {
        let recorder = Self::default();
        let seen = recorder.seen.clone();
        pipeline.on_state_changed(move |playing| seen.lock().unwrap().push(playing));
        recorder
    }

    pub fn events(&self) -> Vec<bool> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<bool> {
        self.seen.lock().unwrap().last().copied()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

/// Counts media-changed callbacks
#[derive(Clone, Default)]
pub struct MediaRecorder {
    count: Arc<Mutex<usize>>,
}

impl MediaRecorder {
    pub fn attach(pipeline: &Pipeline) -> Self {
        let recorder = Self::default();
        let count = recorder.count.clone();
        pipeline.on_media_changed(move || *count.lock().unwrap() += 1);
        recorder
    }

    pub fn count(&self) -> usize {
        *self.count.lock().unwrap()
    }
}
