//! Integration tests for engine configuration files

mod common;

use common::builders::PipelineBuilder;
use common::settle;
use std::time::Duration;
use streamfx_rs::backend::simulated::BackendCall;
use streamfx_rs::config::EngineConfig;
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("engine.toml");

    let mut config = EngineConfig::default();
    config.pipeline.name = "kiosk".to_string();
    config.pipeline.seek.key_unit = false;
    config.effects.default_pitch = 0.9;
    config.logging.filter = "warn".to_string();
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[pipeline\nname = ").unwrap();

    let err = EngineConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
    assert_eq!(EngineConfig::load_or_default(&path), EngineConfig::default());
}

#[test]
fn test_wrong_types_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[effects]\ndefault_pitch = \"high\"\n").unwrap();

    assert!(EngineConfig::load(&path).is_err());
    assert_eq!(EngineConfig::load_or_default(&path), EngineConfig::default());
}

#[test]
fn test_loaded_config_drives_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        r#"
        [pipeline]
        name = "from-file"
        worker_thread_name = "fx-worker"

        [pipeline.seek]
        flush = false
        "#,
    )
    .unwrap();
    let config = EngineConfig::load(&path).unwrap();

    let test = PipelineBuilder::new().config(config).build();
    let (tx, rx) = crossbeam_channel::bounded(1);
    test.pipeline.run_on_worker(move || {
        let _ = tx.send(std::thread::current().name().map(str::to_string));
    });
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap().as_deref(),
        Some("fx-worker")
    );

    test.pipeline.load_media("file:///a.wav");
    test.pipeline.seek(Duration::from_secs(3));
    settle(&test.pipeline);
    let calls = test.control.calls();
    assert_eq!(
        calls.first(),
        Some(&BackendCall::CreatePipeline("from-file".to_string()))
    );
    assert!(calls.contains(&BackendCall::Seek(Duration::from_secs(3))));
    assert_eq!(test.pipeline.query_position(), Duration::from_secs(3));
}
