//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod recorders;

use std::time::{Duration, Instant};
use streamfx_rs::{Pipeline, TopologySnapshot};

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Number of barrier rounds in [`settle`]. Each round lets the worker handle
/// one generation of follow-ups: bus messages posted by a task, tasks queued
/// by a bus message, and so on.
const SETTLE_ROUNDS: usize = 5;

/// Block until the worker has handled everything queued so far, including
/// bus messages and the follow-up tasks they trigger.
pub fn settle(pipeline: &Pipeline) {
    for _ in 0..SETTLE_ROUNDS {
        let (tx, rx) = crossbeam_channel::bounded(1);
        pipeline.run_on_worker(move || {
            let _ = tx.send(());
        });
        rx.recv_timeout(test_timeout())
            .expect("worker did not reach the barrier");
    }
}

/// Settle, then capture the topology
pub fn topology(pipeline: &Pipeline) -> TopologySnapshot {
    settle(pipeline);
    pipeline
        .request_topology()
        .recv_timeout(test_timeout())
        .expect("worker did not answer the topology request")
}
