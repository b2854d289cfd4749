use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use crate::media::gateway::{MediaError, MediaGateway};

/// One observed gateway invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    StartRecording(PathBuf),
    StopRecording,
    PlayFile(PathBuf),
    PlayRemote(String),
    Pause,
    Resume,
    Stop,
    Seek(u64),
}

/// Bytes the mock recorder leaves in its target file.
pub const MOCK_RECORDING: &[u8] = b"RIFFmock-recorded-audio";

/// Scriptable in-memory gateway.
///
/// Recording actually writes `MOCK_RECORDING` to the target so upload
/// flows read real file contents; playback is a clock the test sets by
/// hand via `set_position_ms` / `set_duration_ms`.
#[derive(Default)]
pub struct MockGateway {
    calls: RefCell<Vec<GatewayCall>>,
    playing: Cell<bool>,
    position_ms: Cell<u64>,
    duration_ms: Cell<u64>,
    fail_recording: Cell<bool>,
    fail_playback: Cell<bool>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.borrow().clone()
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Seek(position) => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn played_files(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::PlayFile(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_position_ms(&self, position: u64) {
        self.position_ms.set(position);
    }

    pub fn set_duration_ms(&self, duration: u64) {
        self.duration_ms.set(duration);
    }

    pub fn fail_recording(&self) {
        self.fail_recording.set(true);
    }

    pub fn fail_playback(&self) {
        self.fail_playback.set(true);
    }

    fn record(&self, call: GatewayCall) {
        self.calls.borrow_mut().push(call);
    }
}

#[async_trait::async_trait(?Send)]
impl MediaGateway for MockGateway {
    async fn start_recording(&self, target: &Path) -> Result<(), MediaError> {
        self.record(GatewayCall::StartRecording(target.to_path_buf()));
        if self.fail_recording.get() {
            return Err(MediaError::Device("microphone unavailable".to_string()));
        }
        std::fs::write(target, MOCK_RECORDING)?;
        Ok(())
    }

    async fn stop_recording(&self) -> Result<(), MediaError> {
        self.record(GatewayCall::StopRecording);
        if self.fail_recording.get() {
            return Err(MediaError::Device("microphone unavailable".to_string()));
        }
        Ok(())
    }

    async fn play_file(&self, path: &Path) -> Result<(), MediaError> {
        self.record(GatewayCall::PlayFile(path.to_path_buf()));
        if self.fail_playback.get() {
            return Err(MediaError::Device("output device unavailable".to_string()));
        }
        self.playing.set(true);
        self.position_ms.set(0);
        Ok(())
    }

    async fn play_remote(&self, uri: &str) -> Result<(), MediaError> {
        self.record(GatewayCall::PlayRemote(uri.to_string()));
        if self.fail_playback.get() {
            return Err(MediaError::Fetch("unreachable".to_string()));
        }
        self.playing.set(true);
        self.position_ms.set(0);
        Ok(())
    }

    fn pause(&self) {
        self.record(GatewayCall::Pause);
        self.playing.set(false);
    }

    fn resume(&self) {
        self.record(GatewayCall::Resume);
        self.playing.set(true);
    }

    fn stop(&self) {
        self.record(GatewayCall::Stop);
        self.playing.set(false);
        self.position_ms.set(0);
        self.duration_ms.set(0);
    }

    fn seek(&self, position_ms: u64) -> Result<(), MediaError> {
        self.record(GatewayCall::Seek(position_ms));
        self.position_ms.set(position_ms);
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.position_ms.get()
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms.get()
    }

    fn is_playing(&self) -> bool {
        self.playing.get()
    }
}
