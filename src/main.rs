//! streamfx - Main Entry Point
//!
//! Runs a scripted playback session against the simulated backend: load a
//! URI, splice in the pitch-shift effect, play, seek, detach, and print the
//! graph topology as JSON along the way.
//!
//! Usage: `streamfx [--backend-debug=<level>] [URI] [--config <path>]`

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;
use streamfx_rs::{
    logging, BackendRuntime, EffectUnit, EngineConfig, PitchShift, Pipeline, SimulatedBackend,
    TopologySnapshot,
};

const DEFAULT_URI: &str = "file:///media/sample.ogg";

/// Give up on a worker reply after this long
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

struct Args {
    uri: String,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> anyhow::Result<Args> {
    let mut uri = None;
    let mut config = None;
    let mut iter = args.into_iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config expects a path")?;
                config = Some(PathBuf::from(path));
            }
            _ if uri.is_none() => uri = Some(arg),
            _ => anyhow::bail!("Unexpected argument '{}'", arg),
        }
    }
    Ok(Args {
        uri: uri.unwrap_or_else(|| DEFAULT_URI.to_string()),
        config,
    })
}

fn print_topology(pipeline: &Pipeline, label: &str) -> anyhow::Result<()> {
    let snapshot: TopologySnapshot = pipeline
        .request_topology()
        .recv_timeout(REPLY_TIMEOUT)
        .context("Worker did not answer the topology request")?;
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to encode topology")?;
    println!("--- {} ---\n{}", label, json);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // The runtime guard must outlive every pipeline
    let (runtime, args) = BackendRuntime::init(std::env::args());
    let args = parse_args(args)?;

    let config = match args.config.or_else(EngineConfig::default_path) {
        Some(path) => EngineConfig::load_or_default(path),
        None => EngineConfig::default(),
    };
    let _log_guard = logging::init_logging(&config.logging).context("Failed to set up logging")?;

    tracing::info!("Starting streamfx session for {}", args.uri);
    tracing::debug!("Backend options: {:?}", runtime.options());

    let (backend, control) = SimulatedBackend::new();
    control.register_media(args.uri.clone(), Duration::from_secs(240));

    let mut pipeline = Pipeline::new(backend, config.clone()).context("Failed to start pipeline")?;
    pipeline.on_state_changed(|playing| {
        tracing::info!("Playback {}", if playing { "started" } else { "paused" });
    });
    pipeline.on_media_changed(|| tracing::info!("Media changed"));

    pipeline.load_media(args.uri.as_str());
    let effect = PitchShift::new("pitch-shift")
        .with_pitch(config.effects.default_pitch)
        .context("Invalid default pitch in config")?;
    pipeline.attach_effect(Box::new(effect));
    pipeline.play();
    print_topology(&pipeline, "wet path")?;

    control.advance(Duration::from_secs(12));
    pipeline.seek(Duration::from_secs(60));
    PitchShift::set_pitch_async(&pipeline, 0.9)?;

    let detached = pipeline.detach_effect();
    match detached.recv_timeout(REPLY_TIMEOUT) {
        Ok(effect) => tracing::info!("Detached '{}'", effect.name()),
        Err(_) => tracing::warn!("No effect came back from detach"),
    }
    print_topology(&pipeline, "dry path")?;

    tracing::info!(
        "Position {:?} of {:?}",
        pipeline.query_position(),
        pipeline.query_duration()
    );

    pipeline.shutdown();
    tracing::info!("Session finished");
    Ok(())
}
