//! Playback engine
//!
//! The engine is split across two threads:
//!
//! ```text
//! ┌──────────────┐    Task / Bus     ┌──────────────────────────┐
//! │   Pipeline   │ ────────────────► │          Worker          │
//! │ (any thread) │   one channel     │ MediaGraph + Skeleton    │
//! │              │ ◄──────────────── │ state, effect, callbacks │
//! └──────────────┘  atomics, replies └──────────────────────────┘
//! ```
//!
//! Callers talk to [`Pipeline`], which only enqueues work. The [`Worker`]
//! owns the graph exclusively and applies tasks in order. Backend bus
//! messages travel on the same channel as tasks.

pub mod gate;
pub mod pipeline;
pub mod state;
pub mod task;
pub mod worker;

pub use gate::{gate, Gate, GateOpener};
pub use pipeline::Pipeline;
pub use state::{PlaybackState, SharedStatus};
pub use task::{LoopEvent, Task, TaskQueue};
pub use worker::Worker;
