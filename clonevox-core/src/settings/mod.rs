pub mod config;
pub mod manager;

pub use config::{ServiceConfig, Settings, SynthesisDefaults};
pub use manager::SettingsManager;
