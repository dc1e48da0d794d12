//! Pitch-shift effect.
//!
//! A two-element chain wrapped in a bin:
//!
//! ```text
//! sink → [valve → pitch] → src
//! ```
//!
//! The valve can drop buffers (`drop = true`) to silence the wet branch
//! without unlinking it. The pitch element changes pitch, tempo and rate
//! independently.

use crate::effects::{EffectContext, EffectUnit};
use crate::engine::pipeline::Pipeline;
use crate::error::{EngineError, Result};
use crate::graph::id::NodeId;
use crate::graph::node::{ElementSpec, NodeKind, PropertyValue};
use std::ops::RangeInclusive;

/// Accepted range for `pitch`, `tempo` and `rate`.
pub const FACTOR_RANGE: RangeInclusive<f64> = 0.1..=10.0;

/// Current parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchParams {
    pub pitch: f64,
    pub tempo: f64,
    pub rate: f64,
    pub drop: bool,
}

impl Default for PitchParams {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            tempo: 1.0,
            rate: 1.0,
            drop: false,
        }
    }
}

#[derive(Debug)]
pub struct PitchShift {
    name: String,
    bin: ElementSpec,
    params: PitchParams,
    node: Option<NodeId>,
}

impl PitchShift {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let params = PitchParams::default();
        let valve = ElementSpec::new(NodeKind::Valve, format!("{}-valve", name))
            .with_property("drop", params.drop);
        let pitch = ElementSpec::new(NodeKind::Pitch, format!("{}-pitch", name))
            .with_property("pitch", params.pitch)
            .with_property("tempo", params.tempo)
            .with_property("rate", params.rate);
        Self {
            bin: ElementSpec::bin(name.clone(), vec![valve, pitch]),
            name,
            params,
            node: None,
        }
    }

    /// Set the initial pitch factor.
    pub fn with_pitch(mut self, pitch: f64) -> Result<Self> {
        let value = Self::validate("pitch", &PropertyValue::Float(pitch))?;
        self.record("pitch", value);
        Ok(self)
    }

    pub fn params(&self) -> PitchParams {
        self.params
    }

    /// Node the bin is realized as while attached.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Change the pitch of whichever effect is attached to `pipeline`.
    ///
    /// The value is checked here and applied later on the worker thread.
    pub fn set_pitch_async(pipeline: &Pipeline, pitch: f64) -> Result<()> {
        Self::validate("pitch", &PropertyValue::Float(pitch))?;
        pipeline.configure_effect("pitch", pitch)
    }

    fn child_for(&self, key: &str) -> String {
        match key {
            "drop" => format!("{}-valve", self.name),
            _ => format!("{}-pitch", self.name),
        }
    }

    /// Normalize and range-check a parameter.
    pub fn validate(key: &str, value: &PropertyValue) -> Result<PropertyValue> {
        match key {
            "pitch" | "tempo" | "rate" => {
                let factor = value
                    .as_float()
                    .ok_or_else(|| EngineError::invalid_parameter(key, "expected a number"))?;
                if !FACTOR_RANGE.contains(&factor) {
                    return Err(EngineError::invalid_parameter(
                        key,
                        format!(
                            "{} is outside {}..={}",
                            factor,
                            FACTOR_RANGE.start(),
                            FACTOR_RANGE.end()
                        ),
                    ));
                }
                Ok(PropertyValue::Float(factor))
            }
            "drop" => value
                .as_bool()
                .map(PropertyValue::Bool)
                .ok_or_else(|| EngineError::invalid_parameter(key, "expected a boolean")),
            _ => Err(EngineError::invalid_parameter(key, "unknown parameter")),
        }
    }

    fn record(&mut self, key: &str, value: PropertyValue) {
        match (key, &value) {
            ("pitch", PropertyValue::Float(v)) => self.params.pitch = *v,
            ("tempo", PropertyValue::Float(v)) => self.params.tempo = *v,
            ("rate", PropertyValue::Float(v)) => self.params.rate = *v,
            ("drop", PropertyValue::Bool(v)) => self.params.drop = *v,
            _ => return,
        }
        let child = self.child_for(key);
        if let Some(spec) = self.bin.child_mut(&child) {
            spec.set_property(key, value);
        }
    }
}

impl EffectUnit for PitchShift {
    fn name(&self) -> &str {
        &self.name
    }

    fn bin(&self) -> &ElementSpec {
        &self.bin
    }

    fn on_attach(&mut self, node: NodeId) {
        self.node = Some(node);
        tracing::debug!("Pitch shift '{}' attached as {:?}", self.name, node);
    }

    fn on_detach(&mut self) {
        self.node = None;
    }

    fn on_config_change(
        &mut self,
        key: &str,
        value: &PropertyValue,
        ctx: &mut EffectContext<'_>,
    ) -> Result<()> {
        let value = Self::validate(key, value)?;
        ctx.set_child_property(&self.child_for(key), key, value.clone())?;
        self.record(key, value);
        Ok(())
    }
}
