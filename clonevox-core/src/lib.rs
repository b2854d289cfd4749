pub mod api;
pub mod media;
pub mod settings;
pub mod workflow;

// Public library API - UI wrappers (desktop shells, mobile bridges) should
// only need these types plus the command/event enums they re-export.
pub use api::provider::SpeechService;
pub use media::gateway::MediaGateway;
pub use settings::{Settings, SettingsManager};
pub use workflow::{VoiceActor, VoiceCommand, WorkflowEvent, WorkflowState};
