use serde::{Deserialize, Serialize};

use crate::depth::mapper::OverflowPolicy;
use crate::sensor::types::FrameDescription;
use crate::status::monitor::StatusMessages;

/// Which upper bound the pipeline uses for the reliability window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthRangePolicy {
    /// Upper bound fixed at `u16::MAX` so noisy far-field data stays visible.
    #[default]
    FullRange,
    /// Upper bound taken from the frame's reported maximum reliable distance.
    SensorReliable,
}

/// Options for the synthetic sensor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DummySensorSettings {
    pub description: FrameDescription,
    pub frame_interval_ms: u64,
    /// Expire every Nth frame before it can be acquired. 0 disables drops.
    pub drop_every: u64,
}

impl Default for DummySensorSettings {
    fn default() -> Self {
        Self {
            description: FrameDescription::TOF_512X424,
            frame_interval_ms: 33,
            drop_every: 0,
        }
    }
}

/// Top-level settings file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    pub range_policy: DepthRangePolicy,
    pub overflow: OverflowPolicy,
    pub status: StatusMessages,
    pub dummy_sensor: DummySensorSettings,
}
