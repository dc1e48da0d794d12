//! Process-wide backend runtime guard.
//!
//! Backends typically need one global initialization per process and a
//! matching deinitialization at exit. [`BackendRuntime`] models that as a
//! scoped guard owned by the process entry point: the first guard
//! initializes, dropping the last one deinitializes. The engine itself only
//! asks whether a runtime is active.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Prefix of command-line options consumed by the runtime.
pub const BACKEND_ARG_PREFIX: &str = "--backend-";

static ACTIVE_GUARDS: AtomicUsize = AtomicUsize::new(0);

/// Options recognized on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// `--backend-debug=<level>`
    pub debug_level: Option<String>,
    /// Any other `--backend-*` option, kept verbatim.
    pub extra: Vec<String>,
}

/// Scoped process-wide backend initialization.
#[derive(Debug)]
pub struct BackendRuntime {
    options: RuntimeOptions,
}

impl BackendRuntime {
    /// Initialize the runtime from process arguments.
    ///
    /// Returns the guard and the arguments with every `--backend-*` option
    /// removed, in their original order.
    pub fn init<I, S>(args: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = RuntimeOptions::default();
        let mut remaining = Vec::new();

        for arg in args.into_iter().map(Into::into) {
            match arg.strip_prefix(BACKEND_ARG_PREFIX) {
                Some(rest) => match rest.split_once('=') {
                    Some(("debug", level)) => options.debug_level = Some(level.to_string()),
                    _ => options.extra.push(arg),
                },
                None => remaining.push(arg),
            }
        }

        if ACTIVE_GUARDS.fetch_add(1, Ordering::AcqRel) == 0 {
            tracing::info!("Backend runtime initialized");
        } else {
            tracing::debug!("Backend runtime already initialized, sharing it");
        }
        if let Some(level) = &options.debug_level {
            tracing::debug!("Backend debug level requested: {}", level);
        }

        (Self { options }, remaining)
    }

    /// Whether at least one guard is alive in this process.
    pub fn is_active() -> bool {
        ACTIVE_GUARDS.load(Ordering::Acquire) > 0
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }
}

impl Drop for BackendRuntime {
    fn drop(&mut self) {
        if ACTIVE_GUARDS.fetch_sub(1, Ordering::AcqRel) == 1 {
            tracing::info!("Backend runtime deinitialized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_inactive_without_guard() {
        assert!(!BackendRuntime::is_active());
    }

    #[test]
    #[serial]
    fn test_init_strips_backend_args() {
        let (runtime, rest) = BackendRuntime::init([
            "player",
            "--backend-debug=3",
            "file:///a.wav",
            "--backend-no-fork",
        ]);
        assert_eq!(rest, vec!["player".to_string(), "file:///a.wav".to_string()]);
        assert_eq!(runtime.options().debug_level.as_deref(), Some("3"));
        assert_eq!(runtime.options().extra, vec!["--backend-no-fork".to_string()]);
        assert!(BackendRuntime::is_active());
        drop(runtime);
        assert!(!BackendRuntime::is_active());
    }

    #[test]
    #[serial]
    fn test_guards_nest() {
        let (outer, _) = BackendRuntime::init(Vec::<String>::new());
        let (inner, _) = BackendRuntime::init(Vec::<String>::new());
        drop(inner);
        assert!(BackendRuntime::is_active());
        drop(outer);
        assert!(!BackendRuntime::is_active());
    }
}
