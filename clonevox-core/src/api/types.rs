use serde::{Deserialize, Serialize};

use crate::api::catalog;

/// Wire request for speech synthesis.
///
/// Field names match the service's JSON contract, so this type serializes
/// directly as the request body. `stream` is carried on the wire but the
/// response is always consumed as one buffered payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub model: String,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    pub response_format: String,
    pub stream: bool,
    pub speed: f32,
    pub gain: f32,
    pub sample_rate: u32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, params: SynthesisParams) -> Self {
        Self {
            model: params.model,
            input: text.into(),
            voice: params.voice,
            response_format: "mp3".to_string(),
            stream: true,
            speed: params.speed,
            gain: params.gain,
            sample_rate: params.sample_rate,
        }
    }
}

/// Caller-facing synthesis knobs; everything except the voice has a sane
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub model: String,
    pub voice: Option<String>,
    pub speed: f32,
    pub gain: f32,
    pub sample_rate: u32,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            model: catalog::DEFAULT_MODEL.to_string(),
            voice: None,
            speed: 1.0,
            gain: 0.0,
            sample_rate: 44_100,
        }
    }
}

impl SynthesisParams {
    pub fn for_voice(voice: impl Into<String>) -> Self {
        Self {
            voice: Some(voice.into()),
            ..Self::default()
        }
    }
}

/// A named voice stored by the remote service, usable as a synthesis
/// parameter. The `uri` is the service's opaque identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceAsset {
    pub uri: String,
    pub name: String,
}

/// Input to both upload operations. The audio bytes are the recorded
/// sample; `text` is its transcript, which the service uses to align the
/// clone.
#[derive(Debug, Clone)]
pub struct UploadVoiceRequest {
    pub file_name: String,
    pub audio: Vec<u8>,
    pub model: String,
    pub display_name: String,
    pub text: String,
}
