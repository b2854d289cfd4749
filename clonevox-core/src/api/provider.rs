use crate::api::{error::ApiError, types::*};

/// The remote speech service seen from this crate.
///
/// One production implementation (`SiliconFlow`) and one mock
/// (`MockService`) exist; the orchestrator only ever talks through this
/// trait so tests can script every remote outcome.
#[async_trait::async_trait]
pub trait SpeechService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synthesize text into audio bytes. The full response body is
    /// buffered and returned at once.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ApiError>;

    /// Upload a recorded sample as a new voice. Returns the new asset's
    /// uri.
    async fn upload_voice(&self, request: UploadVoiceRequest) -> Result<String, ApiError>;

    /// Upload a recorded sample as a voice-cloning reference. Same inputs
    /// as `upload_voice`, distinct operation on the service side.
    async fn upload_reference_voice(&self, request: UploadVoiceRequest)
        -> Result<String, ApiError>;

    /// List the caller's uploaded voices. An empty listing is not an
    /// error.
    async fn list_voices(&self) -> Result<Vec<VoiceAsset>, ApiError>;

    async fn delete_voice(&self, uri: &str) -> Result<(), ApiError>;
}
