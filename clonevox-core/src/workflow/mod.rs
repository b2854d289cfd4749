pub mod actor;
pub mod events;
pub mod progress;
pub mod state;

#[cfg(test)]
mod tests;

pub use actor::{VoiceActor, VoiceCommand};
pub use events::{EventSender, WorkflowEvent};
pub use state::{PlaybackSource, RecordingPurpose, WorkflowState};
