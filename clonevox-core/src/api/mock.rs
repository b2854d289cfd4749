use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, provider::SpeechService, types::*};

/// Scripted outcome for every mock operation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockBehavior {
    /// All operations succeed against an in-memory voice store.
    #[default]
    Success,
    /// Every operation fails as if the service rejected it.
    AlwaysRemoteError { code: u16, body: String },
    /// Every operation fails at the transport level.
    AlwaysNetworkError,
}

/// In-memory speech service for tests and offline configurations.
///
/// Uploads mint a uri and land in the store, deletions remove from it,
/// listings snapshot it; every request is captured so tests can assert on
/// exactly what was (or was not) sent.
#[derive(Clone, Default)]
pub struct MockService {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    behavior: MockBehavior,
    voices: Vec<VoiceAsset>,
    synth_requests: Vec<SpeechRequest>,
    uploads: Vec<UploadVoiceRequest>,
    reference_uploads: Vec<UploadVoiceRequest>,
    deletions: Vec<String>,
    list_calls: usize,
    next_uri: usize,
}

impl MockService {
    pub fn new(behavior: MockBehavior) -> Self {
        let service = Self::default();
        service.inner.lock().unwrap().behavior = behavior;
        service
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.inner.lock().unwrap().behavior = behavior;
    }

    /// Pre-seed the remote store, as if earlier uploads already happened.
    pub fn seed_voices(&self, voices: Vec<VoiceAsset>) {
        self.inner.lock().unwrap().voices = voices;
    }

    pub fn synth_requests(&self) -> Vec<SpeechRequest> {
        self.inner.lock().unwrap().synth_requests.clone()
    }

    pub fn uploads(&self) -> Vec<UploadVoiceRequest> {
        self.inner.lock().unwrap().uploads.clone()
    }

    pub fn reference_uploads(&self) -> Vec<UploadVoiceRequest> {
        self.inner.lock().unwrap().reference_uploads.clone()
    }

    pub fn deletions(&self) -> Vec<String> {
        self.inner.lock().unwrap().deletions.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }

    fn check(&self) -> Result<(), ApiError> {
        match &self.inner.lock().unwrap().behavior {
            MockBehavior::Success => Ok(()),
            MockBehavior::AlwaysRemoteError { code, body } => Err(ApiError::Remote {
                code: *code,
                body: body.clone(),
            }),
            MockBehavior::AlwaysNetworkError => {
                Err(ApiError::Network("connection refused".to_string()))
            }
        }
    }
}

/// Bytes handed back by mock synthesis; close enough to an mp3 header for
/// anything that sniffs the payload.
pub const MOCK_AUDIO: &[u8] = b"ID3\x03\x00mock-synthesized-audio";

#[async_trait::async_trait]
impl SpeechService for MockService {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ApiError> {
        self.check()?;
        let mut state = self.inner.lock().unwrap();
        state.synth_requests.push(request.clone());
        Ok(MOCK_AUDIO.to_vec())
    }

    async fn upload_voice(&self, request: UploadVoiceRequest) -> Result<String, ApiError> {
        self.check()?;
        let mut state = self.inner.lock().unwrap();
        state.next_uri += 1;
        let uri = format!("speech:mock:{}", state.next_uri);
        state.voices.push(VoiceAsset {
            uri: uri.clone(),
            name: request.display_name.clone(),
        });
        state.uploads.push(request);
        Ok(uri)
    }

    async fn upload_reference_voice(
        &self,
        request: UploadVoiceRequest,
    ) -> Result<String, ApiError> {
        self.check()?;
        let mut state = self.inner.lock().unwrap();
        state.next_uri += 1;
        let uri = format!("speech:mock:ref:{}", state.next_uri);
        state.voices.push(VoiceAsset {
            uri: uri.clone(),
            name: request.display_name.clone(),
        });
        state.reference_uploads.push(request);
        Ok(uri)
    }

    async fn list_voices(&self) -> Result<Vec<VoiceAsset>, ApiError> {
        let mut state = self.inner.lock().unwrap();
        state.list_calls += 1;
        drop(state);

        self.check()?;
        Ok(self.inner.lock().unwrap().voices.clone())
    }

    async fn delete_voice(&self, uri: &str) -> Result<(), ApiError> {
        self.check()?;
        let mut state = self.inner.lock().unwrap();
        state.deletions.push(uri.to_string());
        // Deleting an unknown uri succeeds, matching the service.
        state.voices.retain(|v| v.uri != uri);
        Ok(())
    }
}
