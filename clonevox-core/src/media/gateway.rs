use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("audio device error: {0}")]
    Device(String),

    #[error("media i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch remote audio: {0}")]
    Fetch(String),

    #[error("no recording in progress")]
    NoRecording,

    #[error("a recording is already in progress")]
    RecordingInProgress,
}

/// OS media surface the orchestrator drives: record to a file, play a file
/// or remote uri, report progress.
///
/// Implementations hold device streams that are not `Send`, so the trait
/// is single-threaded; the actor and its poller run on one thread via
/// `spawn_local`. At most one recording and one playback are active at a
/// time; starting a new playback releases the previous one's resources.
#[async_trait::async_trait(?Send)]
pub trait MediaGateway {
    async fn start_recording(&self, target: &Path) -> Result<(), MediaError>;

    /// Stop the active recording and finalize the target file.
    async fn stop_recording(&self) -> Result<(), MediaError>;

    async fn play_file(&self, path: &Path) -> Result<(), MediaError>;

    async fn play_remote(&self, uri: &str) -> Result<(), MediaError>;

    fn pause(&self);

    fn resume(&self);

    fn stop(&self);

    fn seek(&self, position_ms: u64) -> Result<(), MediaError>;

    fn position_ms(&self) -> u64;

    /// Total duration of the active playback, 0 when unknown.
    fn duration_ms(&self) -> u64;

    fn is_playing(&self) -> bool;
}
