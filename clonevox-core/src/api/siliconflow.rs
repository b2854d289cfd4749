use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::api::{error::ApiError, provider::SpeechService, types::*};

pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// SiliconFlow speech service binding.
///
/// The bearer credential is attached to every outbound call; the base URL
/// is overridable for tests and self-hosted gateways.
#[derive(Clone)]
pub struct SiliconFlow {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SiliconFlow {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let mut service = Self::new(api_key);
        service.base_url = base_url.into().trim_end_matches('/').to_string();
        service
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_upload(
        &self,
        path: &str,
        request: UploadVoiceRequest,
    ) -> Result<reqwest::Response, ApiError> {
        let mime = match request.file_name.rsplit('.').next() {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            _ => "application/octet-stream",
        };
        let file_part = Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str(mime)
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", request.model)
            .text("customName", request.display_name)
            .text("text", request.text);

        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }
}

/// Read the response body and map a non-2xx status to `ApiError::Remote`.
async fn into_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    if !status.is_success() {
        debug!(%status, %body, "speech service returned error");
        return Err(ApiError::Remote {
            code: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

fn uri_from_upload_body(code: u16, body: &str) -> Result<String, ApiError> {
    let parsed: UploadResponse = serde_json::from_str(body).map_err(|_| ApiError::Remote {
        code,
        body: body.to_string(),
    })?;

    parsed.uri.ok_or_else(|| ApiError::Remote {
        code,
        body: "upload response is missing a voice uri".to_string(),
    })
}

#[async_trait::async_trait]
impl SpeechService for SiliconFlow {
    fn name(&self) -> &'static str {
        "SiliconFlow"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ApiError> {
        debug!(model = %request.model, voice = ?request.voice, "dispatching synthesis request");

        let response = self
            .client
            .post(self.url("audio/speech"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, %body, "synthesis request rejected");
            return Err(ApiError::Remote {
                code: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn upload_voice(&self, request: UploadVoiceRequest) -> Result<String, ApiError> {
        let response = self.post_upload("uploads/audio/voice", request).await?;
        let code = response.status().as_u16();
        let body = into_body(response).await?;
        uri_from_upload_body(code, &body)
    }

    // The service routes both upload variants through one endpoint; the
    // reference flavor stays a separate operation so callers select it by
    // intent rather than by payload shape.
    async fn upload_reference_voice(
        &self,
        request: UploadVoiceRequest,
    ) -> Result<String, ApiError> {
        let response = self.post_upload("uploads/audio/voice", request).await?;
        let code = response.status().as_u16();
        let body = into_body(response).await?;

        let parsed: UploadReferenceResponse =
            serde_json::from_str(&body).map_err(|_| ApiError::Remote {
                code,
                body: body.clone(),
            })?;

        parsed.uri.ok_or_else(|| ApiError::Remote {
            code,
            body: "reference upload response is missing a voice uri".to_string(),
        })
    }

    async fn list_voices(&self) -> Result<Vec<VoiceAsset>, ApiError> {
        let response = self
            .client
            .get(self.url("audio/voice/list"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let code = response.status().as_u16();
        let body = into_body(response).await?;

        // An empty body means no voices, not a malformed response.
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: VoiceListResponse = serde_json::from_str(&body).map_err(|_| {
            ApiError::Remote {
                code,
                body: body.clone(),
            }
        })?;

        Ok(parsed
            .voices
            .into_iter()
            .map(|v| VoiceAsset {
                uri: v.uri,
                name: v.custom_name,
            })
            .collect())
    }

    async fn delete_voice(&self, uri: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("audio/voice/deletions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&DeleteVoiceBody { uri })
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        into_body(response).await?;
        Ok(())
    }
}

// Wire types

#[derive(serde::Serialize)]
struct DeleteVoiceBody<'a> {
    uri: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    uri: Option<String>,
}

#[derive(Deserialize)]
struct UploadReferenceResponse {
    uri: Option<String>,
}

#[derive(Deserialize)]
struct VoiceListResponse {
    #[serde(default)]
    voices: Vec<VoiceInfo>,
}

#[derive(Deserialize)]
struct VoiceInfo {
    uri: String,
    #[serde(rename = "customName")]
    custom_name: String,
}
