//! Pipeline configuration
//!
//! Every struct here has sensible defaults and can be loaded with serde.

use crate::layer::ExtraStage;
use crate::stages::StageKind;
use serde::{Deserialize, Serialize};

/// Parameters of the threshold + blur stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomParams {
    /// Luminance below which pixels do not glow
    pub threshold: f32,
    pub strength: f32,
    /// Spread of the glow across mip levels, 0..1
    pub radius: f32,
}

impl BloomParams {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.max(0.0);
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength.max(0.0);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.clamp(0.0, 1.0);
        self
    }
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            strength: 2.0,
            radius: 0.0,
        }
    }
}

/// Constants of the two texture blends.
///
/// Obfuscation: `base * (1 - obfuscation_weight * mask.a)`.
/// Final bloom: `base + (1 - base) * bloom / bloom_divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    pub obfuscation_weight: f32,
    pub bloom_divisor: f32,
}

impl CompositeParams {
    /// Clamp into the range where both blends stay well defined
    pub fn sanitized(self) -> Self {
        Self {
            obfuscation_weight: self.obfuscation_weight.clamp(0.0, 1.0),
            bloom_divisor: if self.bloom_divisor.is_finite() && self.bloom_divisor > f32::EPSILON {
                self.bloom_divisor
            } else {
                1.0
            },
        }
    }
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            obfuscation_weight: 1.0,
            bloom_divisor: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Build a bloom render next to the normal one
    pub bloom: bool,
    /// Non-scene stages appended to the layer's composers
    pub extra_stages: Vec<ExtraStage>,
    pub start_visible: bool,
    pub bloom_params: BloomParams,
    pub composite: CompositeParams,
}

impl LayerConfig {
    pub fn bloomable() -> Self {
        Self {
            bloom: true,
            ..Self::default()
        }
    }

    pub fn with_extra_stages(mut self, extra_stages: Vec<ExtraStage>) -> Self {
        self.extra_stages = extra_stages;
        self
    }

    pub fn with_bloom_params(mut self, bloom_params: BloomParams) -> Self {
        self.bloom_params = bloom_params;
        self
    }

    pub fn with_composite(mut self, composite: CompositeParams) -> Self {
        self.composite = composite.sanitized();
        self
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            bloom: false,
            extra_stages: vec![ExtraStage::new(StageKind::Fxaa.name(), true)],
            start_visible: true,
            bloom_params: BloomParams::default(),
            composite: CompositeParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub start_enabled: bool,
    /// Collect frame timings and log a summary periodically
    pub debug_timing: bool,
    pub timing_period_ms: u64,
    /// Number of frames averaged in the summary
    pub timing_window: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            start_enabled: true,
            debug_timing: false,
            timing_period_ms: 5000,
            timing_window: 32,
        }
    }
}
