use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::api::types::VoiceAsset;
use crate::workflow::state::{PlaybackSource, RecordingPurpose, WorkflowState};

/// `WorkflowEvent`s are the actor's output. UI applications render them;
/// they carry everything the presentation layer is allowed to observe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum WorkflowEvent {
    StateChanged(WorkflowState),
    VoiceListUpdated(Vec<VoiceAsset>),
    RecordingStarted { purpose: RecordingPurpose },
    RecordingDiscarded,
    VoiceUploaded { uri: String },
    PlaybackStarted(PlaybackSource),
    PlaybackProgress { fraction: f32 },
    PlaybackFinished,
    Notice(String),
}

/// A small wrapper over the event channel. Keeps a history so tests can
/// assert on the exact sequence that was published.
#[derive(Clone)]
pub struct EventSender {
    event_tx: mpsc::UnboundedSender<WorkflowEvent>,
    event_history: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl EventSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (event_tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                event_tx,
                event_history: Arc::new(Mutex::new(Vec::new())),
            },
            rx,
        )
    }

    pub fn send(&self, event: WorkflowEvent) {
        self.event_history.lock().unwrap().push(event.clone());
        let _ = self.event_tx.send(event);
    }

    pub fn event_history(&self) -> Vec<WorkflowEvent> {
        self.event_history.lock().unwrap().clone()
    }
}
