use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// The single observable state of the workflow. Every operation overwrites
/// it at start and end; the presentation layer renders nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum WorkflowState {
    Idle,
    Loading,
    Success,
    Error(String),
}

/// What a recording is destined for once it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingPurpose {
    /// Uploaded as a regular named voice.
    GeneralVoice,
    /// Uploaded as a voice-cloning reference sample.
    ReferenceClone,
}

/// An in-flight recording. Created on start, consumed by stop (upload) or
/// cancel (discard).
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub target: PathBuf,
    pub purpose: RecordingPurpose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum PlaybackSource {
    File(PathBuf),
    Remote(String),
}

/// The single active playback. Starting a new one supersedes this session
/// and must abort its poller first.
pub struct PlaybackSession {
    pub source: PlaybackSource,
    pub playing: bool,
    pub poller: Option<JoinHandle<()>>,
}
