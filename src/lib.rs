//! # streamfx-rs: Streaming Media Playback Engine
//!
//! A playback engine that decodes a media URI into a fixed audio graph and
//! lets callers splice an effect into the signal path while it plays. The
//! architecture keeps every graph mutation on one worker thread and hands
//! callers a non-blocking [`Pipeline`] handle.
//!
//! ## Architecture
//!
//! - **Engine**: worker thread, task queue, playback state machine
//! - **Graph**: node/port/link arena mirrored into the backend, dry/wet routing
//!   with transactional rollback
//! - **Backend**: the [`MediaBackend`] trait plus an in-process
//!   [`SimulatedBackend`] with failure injection
//! - **Effects**: the [`EffectUnit`] trait and the [`PitchShift`] reference effect
//! - **Communication**: Crossbeam channels shared by tasks and bus messages
//!
//! ## Configuration
//!
//! Engine settings live in `engine.toml` under the platform config directory
//! `dev.streamfx.streamfx-rs`. See [`config`] for the layout.
//!
//! ## Example
//!
//! ```no_run
//! use streamfx_rs::{BackendRuntime, EngineConfig, PitchShift, Pipeline, SimulatedBackend};
//! use std::time::Duration;
//!
//! fn main() -> streamfx_rs::Result<()> {
//!     let (_runtime, _args) = BackendRuntime::init(std::env::args());
//!     let (backend, _control) = SimulatedBackend::new();
//!
//!     let pipeline = Pipeline::new(backend, EngineConfig::default())?;
//!     pipeline.load_media("file:///music/track.ogg");
//!     pipeline.attach_effect(Box::new(PitchShift::new("pitch-shift").with_pitch(1.2)?));
//!     pipeline.play();
//!     pipeline.seek(Duration::from_secs(30));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logging;

// Re-export commonly used types
pub use backend::{BackendRuntime, BusMessage, MediaBackend, SimulatedBackend, SimulatedControl};
pub use config::EngineConfig;
pub use effects::{EffectUnit, PitchShift};
pub use engine::{Pipeline, PlaybackState};
pub use error::{EngineError, Result};
pub use graph::{ActiveRoute, TopologySnapshot};
