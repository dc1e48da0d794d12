//! Test data builders for creating pipelines over the simulated backend

use std::time::Duration;
use streamfx_rs::config::EngineConfig;
use streamfx_rs::{Pipeline, SimulatedBackend, SimulatedControl};

/// A pipeline and the handle steering its backend
pub struct TestPipeline {
    pub pipeline: Pipeline,
    pub control: SimulatedControl,
}

/// Builder for creating test pipelines
pub struct PipelineBuilder {
    config: EngineConfig,
    media: Vec<(String, Duration)>,
    setup: Vec<Box<dyn FnOnce(&SimulatedControl)>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            media: Vec::new(),
            setup: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a media URI with a known duration
    pub fn media(mut self, uri: &str, duration: Duration) -> Self {
        self.media.push((uri.to_string(), duration));
        self
    }

    /// Steer the backend before the skeleton is built, e.g. to inject failures
    pub fn before_build(mut self, setup: impl FnOnce(&SimulatedControl) + 'static) -> Self {
        self.setup.push(Box::new(setup));
        self
    }

    /// Start the pipeline and wait for the skeleton build
    pub fn build(self) -> TestPipeline {
        let (backend, control) = SimulatedBackend::new();
        for (uri, duration) in self.media {
            control.register_media(uri, duration);
        }
        for setup in self.setup {
            setup(&control);
        }

        let pipeline = Pipeline::new(backend, self.config).expect("pipeline should start");
        assert!(
            pipeline.wait_until_built_timeout(super::test_timeout()),
            "skeleton was never built"
        );
        TestPipeline { pipeline, control }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully built pipeline with default settings
pub fn pipeline_with_sim() -> TestPipeline {
    PipelineBuilder::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_registers_media_before_start() {
        let test = PipelineBuilder::new()
            .media("file:///short.wav", Duration::from_secs(3))
            .build();
        test.pipeline.load_media("file:///short.wav");
        crate::common::settle(&test.pipeline);
        assert_eq!(test.pipeline.query_duration(), Duration::from_secs(3));
    }
}
