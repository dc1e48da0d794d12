//! Integration tests for pipeline lifecycle
//!
//! These tests validate construction and teardown:
//! - Complete and degraded skeleton builds
//! - Unrealized pipelines
//! - Shutdown and drop

mod common;

use common::builders::{pipeline_with_sim, PipelineBuilder};
use common::{settle, test_timeout, topology, wait_for};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use streamfx_rs::backend::simulated::BackendCall;
use streamfx_rs::{ActiveRoute, PlaybackState};

#[test]
fn test_construction_builds_complete_skeleton() {
    let test = pipeline_with_sim();
    let snapshot = topology(&test.pipeline);

    assert_eq!(snapshot.pipeline.as_deref(), Some("media-player-audio-pipeline"));
    assert_eq!(snapshot.state, PlaybackState::Ready);
    assert_eq!(snapshot.nodes.len(), 8);
    assert_eq!(snapshot.links.len(), 6);
    assert_eq!(snapshot.route, ActiveRoute::Dry);
    assert_eq!(snapshot.active_pad.as_deref(), Some("sink_0"));
    assert!(snapshot.has_link("convert:src", "resample:sink"));
    assert!(snapshot.has_link("resample:src", "tee:sink"));
    assert!(snapshot.has_link("tee:src_0", "queue-dry:sink"));
    assert!(snapshot.has_link("queue-dry:src", "identity:sink"));
    assert!(snapshot.has_link("identity:src", "selector:sink_0"));
    assert!(snapshot.has_link("selector:src", "sink:sink"));
    assert!(test.control.bus_attached());
    assert_eq!(test.pipeline.state(), PlaybackState::Ready);
}

#[test]
fn test_first_backend_call_creates_pipeline() {
    let test = pipeline_with_sim();
    let calls = test.control.calls();
    assert_eq!(calls.first(), Some(&BackendCall::CreatePipeline("media-player-audio-pipeline".into())));
}

#[test]
fn test_custom_sink_factory() {
    let mut config = streamfx_rs::EngineConfig::default();
    config.pipeline.sink_factory = "fakesink".to_string();
    let test = PipelineBuilder::new().config(config).build();

    let snapshot = topology(&test.pipeline);
    assert_eq!(snapshot.node("sink").map(|n| n.factory.as_str()), Some("fakesink"));
}

#[test]
fn test_single_element_failure_degrades_and_shuts_down() {
    let mut test = PipelineBuilder::new()
        .before_build(|control| control.fail_element("resample"))
        .build();

    let snapshot = topology(&test.pipeline);
    assert!(snapshot.node("resample").is_none());
    assert_eq!(snapshot.nodes.len(), 7);
    assert!(!snapshot.has_link("resample:src", "tee:sink"));
    // The dry branch is independent of the failed element
    assert!(snapshot.has_link("tee:src_0", "queue-dry:sink"));
    assert_eq!(snapshot.state, PlaybackState::Ready);

    test.pipeline.shutdown();
    assert!(!test.control.has_pipeline());
    assert_eq!(test.control.element_count(), 0);
    assert_eq!(test.control.link_count(), 0);
}

#[test]
fn test_failed_link_degrades() {
    let test = PipelineBuilder::new()
        .before_build(|control| control.fail_link_involving("identity"))
        .build();

    let snapshot = topology(&test.pipeline);
    assert_eq!(snapshot.nodes.len(), 8);
    assert!(!snapshot.has_link("queue-dry:src", "identity:sink"));
    assert!(!snapshot.has_link("identity:src", "selector:sink_0"));
    assert_eq!(snapshot.active_pad.as_deref(), Some("sink_0"));
}

#[test]
fn test_unrealized_pipeline_ignores_tasks() {
    let test = PipelineBuilder::new()
        .before_build(|control| control.fail_pipeline_creation())
        .build();

    test.pipeline.load_media("file:///a.wav");
    test.pipeline.play();
    let snapshot = topology(&test.pipeline);

    assert!(snapshot.pipeline.is_none());
    assert!(snapshot.nodes.is_empty());
    assert_eq!(test.pipeline.state(), PlaybackState::Uninitialized);
    assert!(!test.pipeline.is_media_loaded());
    assert!(!test.control.has_pipeline());
}

#[test]
fn test_run_on_worker_executes_in_order() {
    let test = pipeline_with_sim();
    let counter = Arc::new(AtomicUsize::new(0));

    for expected in 0..10 {
        let counter = counter.clone();
        test.pipeline.run_on_worker(move || {
            assert_eq!(counter.fetch_add(1, Ordering::SeqCst), expected);
        });
    }
    settle(&test.pipeline);
    assert_eq!(counter.load(Ordering::SeqCst), 10);
}

#[test]
fn test_worker_survives_panicking_closure() {
    let test = pipeline_with_sim();
    test.pipeline.run_on_worker(|| panic!("closure failure"));
    test.pipeline.load_media("file:///a.wav");
    settle(&test.pipeline);
    assert_eq!(test.pipeline.state(), PlaybackState::Paused);
}

#[test]
fn test_shutdown_tears_down_in_reverse_order() {
    let mut test = pipeline_with_sim();
    test.pipeline.load_media("file:///a.wav");
    test.pipeline.play();
    settle(&test.pipeline);
    test.control.clear_calls();

    test.pipeline.shutdown();
    assert!(!test.pipeline.is_playing());
    assert_eq!(test.pipeline.state(), PlaybackState::Uninitialized);

    let removed: Vec<String> = test
        .control
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::RemoveElement(name) => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(
        removed,
        vec!["sink", "selector", "identity", "queue-dry", "tee", "resample", "convert", "source"]
    );
    let calls = test.control.calls();
    assert_eq!(calls.last(), Some(&BackendCall::DestroyPipeline));
    assert!(calls.contains(&BackendCall::RemoveBusWatch));
    assert!(!test.control.bus_attached());
}

#[test]
fn test_shutdown_is_idempotent() {
    let mut test = pipeline_with_sim();
    test.pipeline.shutdown();
    test.pipeline.shutdown();
    // Submissions after shutdown are dropped, not panics
    test.pipeline.play();
    assert!(test.pipeline.configure_effect("pitch", 1.1).is_err());
}

#[test]
fn test_drop_joins_worker() {
    let test = pipeline_with_sim();
    let control = test.control;
    drop(test.pipeline);
    assert!(wait_for(test_timeout(), || !control.has_pipeline()));
    assert_eq!(control.element_count(), 0);
}
