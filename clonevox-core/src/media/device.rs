//! `MediaGateway` over the host's default input and output devices.

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use crate::media::capture::WavRecorder;
use crate::media::gateway::{MediaError, MediaGateway};
use crate::media::playback::FilePlayer;
use crate::media::AudioProfile;

pub struct DeviceGateway {
    player: FilePlayer,
    recorder: RefCell<Option<WavRecorder>>,
    http: reqwest::Client,
}

impl DeviceGateway {
    pub fn new() -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MediaError::Fetch(e.to_string()))?;

        Ok(Self {
            player: FilePlayer::new()?,
            recorder: RefCell::new(None),
            http,
        })
    }
}

#[async_trait::async_trait(?Send)]
impl MediaGateway for DeviceGateway {
    async fn start_recording(&self, target: &Path) -> Result<(), MediaError> {
        if self.recorder.borrow().is_some() {
            return Err(MediaError::RecordingInProgress);
        }

        let recorder = WavRecorder::start(AudioProfile::RECORDING, target)?;
        *self.recorder.borrow_mut() = Some(recorder);
        Ok(())
    }

    async fn stop_recording(&self) -> Result<(), MediaError> {
        let Some(recorder) = self.recorder.borrow_mut().take() else {
            return Err(MediaError::NoRecording);
        };
        recorder.finish().await
    }

    async fn play_file(&self, path: &Path) -> Result<(), MediaError> {
        self.player.play_file(path)
    }

    async fn play_remote(&self, uri: &str) -> Result<(), MediaError> {
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .map_err(|e| MediaError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Fetch(format!("{uri} returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Fetch(e.to_string()))?;

        self.player.play_bytes(bytes.to_vec())
    }

    fn pause(&self) {
        self.player.pause();
    }

    fn resume(&self) {
        self.player.resume();
    }

    fn stop(&self) {
        self.player.stop();
    }

    fn seek(&self, position_ms: u64) -> Result<(), MediaError> {
        self.player.seek(position_ms)
    }

    fn position_ms(&self) -> u64 {
        self.player.position_ms()
    }

    fn duration_ms(&self) -> u64 {
        self.player.duration_ms()
    }

    fn is_playing(&self) -> bool {
        self.player.is_playing()
    }
}
