//! Error handling for the streamfx engine
//!
//! This module defines the crate-level error type and a Result alias. Layer
//! specific errors ([`GraphError`], [`BackendError`]) convert into it.

use crate::backend::BackendError;
use crate::graph::GraphError;
use thiserror::Error;

/// Main error type for streamfx operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Errors raised while mutating the media graph
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Errors reported by the media backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised by an effect unit
    #[error("Effect error: {0}")]
    Effect(String),

    /// A parameter value was rejected
    #[error("Invalid value for '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// The worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a rejected parameter value
    pub fn invalid_parameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for streamfx operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EngineError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
