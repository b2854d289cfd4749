use serde::{Deserialize, Serialize};

use crate::api::catalog;
use crate::api::mock::MockBehavior;
use crate::api::siliconflow::DEFAULT_BASE_URL;

/// Core application settings, persisted as TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Which speech service backs the workflow.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Defaults applied to synthesis requests that don't override them.
    #[serde(default)]
    pub synthesis: SynthesisDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServiceConfig {
    #[serde(rename = "siliconflow")]
    SiliconFlow {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default)]
        api_key: String,
    },
    #[serde(rename = "mock")]
    Mock {
        #[serde(default)]
        behavior: MockBehavior,
    },
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::SiliconFlow {
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub gain: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for SynthesisDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            speed: default_speed(),
            gain: 0.0,
            sample_rate: default_sample_rate(),
        }
    }
}

fn default_model() -> String {
    catalog::DEFAULT_MODEL.to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_sample_rate() -> u32 {
    44_100
}
