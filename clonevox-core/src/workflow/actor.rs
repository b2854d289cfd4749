use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::api::{
    catalog,
    error::ApiError,
    mock::MockService,
    provider::SpeechService,
    siliconflow::SiliconFlow,
    types::{SpeechRequest, SynthesisParams, UploadVoiceRequest, VoiceAsset},
};
use crate::media::gateway::{MediaError, MediaGateway};
use crate::media::mock::MockGateway;
use crate::settings::{ServiceConfig, SettingsManager};
use crate::workflow::events::{EventSender, WorkflowEvent};
use crate::workflow::progress::{self, PlaybackNote};
use crate::workflow::state::{
    PlaybackSession, PlaybackSource, RecordingPurpose, RecordingSession, WorkflowState,
};

/// The possible inputs to the `VoiceActor`.
///
/// These derive serde so UI shells running the core in a sub-process can
/// send them as json over stdin.
#[derive(Debug, Serialize, Deserialize)]
pub enum VoiceCommand {
    /// Synthesize text and play the result.
    RequestSpeech {
        text: String,
        params: SynthesisParams,
    },

    /// Start recording to a fresh temporary file.
    BeginRecording { purpose: RecordingPurpose },

    /// Stop recording and upload the captured sample. The transcript is
    /// what was spoken, which the service needs to align a clone.
    EndRecording { transcript: String },

    /// Stop recording and throw the captured sample away.
    CancelRecording,

    PlayFile { path: PathBuf },
    PlayRemote { uri: String },
    PausePlayback,
    ResumePlayback,

    /// Seek to a fraction of the active playback's duration.
    Seek { fraction: f32 },

    DeleteVoice { uri: String },
    RefreshVoices,
    ClearError,
    Shutdown,
}

/// The `VoiceActor` implements the core of the application.
///
/// UI shells contain no application logic; they send `VoiceCommand`s to
/// the actor and render the `WorkflowEvent`s it emits. Commands are
/// processed strictly one at a time, so no two mutating operations ever
/// run concurrently against the voice cache or the recording session.
///
/// The actor holds device streams that are not `Send`, so `launch` must be
/// called from within a `tokio::task::LocalSet`.
pub struct VoiceActor {
    pub tx: mpsc::UnboundedSender<VoiceCommand>,
}

impl VoiceActor {
    /// Launch the actor and return a handle plus its event stream.
    pub fn launch(settings: SettingsManager) -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_sender, event_rx) = EventSender::new();
        let (note_tx, note_rx) = mpsc::unbounded_channel();

        tokio::task::spawn_local(async move {
            let service = create_service(&settings);
            let gateway = create_gateway();

            if let ServiceConfig::SiliconFlow { api_key, .. } = &settings.settings().service {
                if api_key.is_empty() {
                    event_sender.send(WorkflowEvent::Notice(
                        "No API key is configured; synthesis requests will be rejected."
                            .to_string(),
                    ));
                }
            }

            let state = ActorState {
                event_sender,
                service,
                gateway,
                settings,
                workflow: WorkflowState::Idle,
                voices: Vec::new(),
                recording: None,
                playback: None,
                note_tx,
            };

            run_actor(state, rx, note_rx).await;
        });

        (VoiceActor { tx }, event_rx)
    }

    pub fn request_speech(&self, text: impl Into<String>, params: SynthesisParams) -> Result<()> {
        self.tx.send(VoiceCommand::RequestSpeech {
            text: text.into(),
            params,
        })?;
        Ok(())
    }

    pub fn begin_recording(&self, purpose: RecordingPurpose) -> Result<()> {
        self.tx.send(VoiceCommand::BeginRecording { purpose })?;
        Ok(())
    }

    pub fn end_recording(&self, transcript: impl Into<String>) -> Result<()> {
        self.tx.send(VoiceCommand::EndRecording {
            transcript: transcript.into(),
        })?;
        Ok(())
    }

    pub fn cancel_recording(&self) -> Result<()> {
        self.tx.send(VoiceCommand::CancelRecording)?;
        Ok(())
    }

    pub fn play_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.tx.send(VoiceCommand::PlayFile { path: path.into() })?;
        Ok(())
    }

    pub fn play_remote(&self, uri: impl Into<String>) -> Result<()> {
        self.tx.send(VoiceCommand::PlayRemote { uri: uri.into() })?;
        Ok(())
    }

    pub fn pause_playback(&self) -> Result<()> {
        self.tx.send(VoiceCommand::PausePlayback)?;
        Ok(())
    }

    pub fn resume_playback(&self) -> Result<()> {
        self.tx.send(VoiceCommand::ResumePlayback)?;
        Ok(())
    }

    pub fn seek(&self, fraction: f32) -> Result<()> {
        self.tx.send(VoiceCommand::Seek { fraction })?;
        Ok(())
    }

    pub fn delete_voice(&self, uri: impl Into<String>) -> Result<()> {
        self.tx.send(VoiceCommand::DeleteVoice { uri: uri.into() })?;
        Ok(())
    }

    pub fn refresh_voices(&self) -> Result<()> {
        self.tx.send(VoiceCommand::RefreshVoices)?;
        Ok(())
    }

    pub fn clear_error(&self) -> Result<()> {
        self.tx.send(VoiceCommand::ClearError)?;
        Ok(())
    }

    pub fn shutdown(&self) -> Result<()> {
        self.tx.send(VoiceCommand::Shutdown)?;
        Ok(())
    }
}

pub struct ActorState {
    pub event_sender: EventSender,
    pub service: Arc<dyn SpeechService>,
    pub gateway: Rc<dyn MediaGateway>,
    pub settings: SettingsManager,
    pub workflow: WorkflowState,
    pub voices: Vec<VoiceAsset>,
    pub recording: Option<RecordingSession>,
    pub playback: Option<PlaybackSession>,
    pub note_tx: mpsc::UnboundedSender<PlaybackNote>,
}

impl ActorState {
    pub fn set_state(&mut self, next: WorkflowState) {
        self.workflow = next.clone();
        self.event_sender.send(WorkflowEvent::StateChanged(next));
    }

    fn fail(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        error!(%message, "command failed");
        self.set_state(WorkflowState::Error(message));
    }
}

/// Build the speech service the settings name.
pub fn create_service(settings: &SettingsManager) -> Arc<dyn SpeechService> {
    match settings.settings().service {
        ServiceConfig::SiliconFlow { base_url, api_key } => {
            Arc::new(SiliconFlow::with_base_url(api_key, base_url))
        }
        ServiceConfig::Mock { behavior } => Arc::new(MockService::new(behavior)),
    }
}

/// Open the host's audio devices, falling back to the mock gateway when
/// none are available (headless machines, CI).
pub fn create_gateway() -> Rc<dyn MediaGateway> {
    #[cfg(feature = "audio-io")]
    match crate::media::device::DeviceGateway::new() {
        Ok(gateway) => return Rc::new(gateway),
        Err(e) => error!(error = %e, "audio devices unavailable, using mock gateway"),
    }

    Rc::new(MockGateway::new())
}

// Actor implementation as free functions

async fn run_actor(
    mut state: ActorState,
    mut rx: mpsc::UnboundedReceiver<VoiceCommand>,
    mut note_rx: mpsc::UnboundedReceiver<PlaybackNote>,
) {
    info!("VoiceActor started");

    // The voice list is loaded as soon as the actor starts.
    handle_command(&mut state, VoiceCommand::RefreshVoices).await;

    loop {
        tokio::select! {
            Some(note) = note_rx.recv() => handle_playback_note(&mut state, note),

            command = rx.recv() => {
                let Some(command) = command else { break };
                if matches!(command, VoiceCommand::Shutdown) {
                    break;
                }
                handle_command(&mut state, command).await;
            }
        }
    }

    shutdown(&mut state);
    info!("VoiceActor stopped");
}

pub async fn handle_command(state: &mut ActorState, command: VoiceCommand) {
    debug!(?command, "processing command");

    match command {
        VoiceCommand::RequestSpeech { text, params } => request_speech(state, text, params).await,
        VoiceCommand::BeginRecording { purpose } => begin_recording(state, purpose).await,
        VoiceCommand::EndRecording { transcript } => end_recording(state, transcript).await,
        VoiceCommand::CancelRecording => cancel_recording(state).await,
        VoiceCommand::PlayFile { path } => start_playback(state, PlaybackSource::File(path)).await,
        VoiceCommand::PlayRemote { uri } => {
            start_playback(state, PlaybackSource::Remote(uri)).await
        }
        VoiceCommand::PausePlayback => pause_playback(state),
        VoiceCommand::ResumePlayback => resume_playback(state),
        VoiceCommand::Seek { fraction } => seek(state, fraction),
        VoiceCommand::DeleteVoice { uri } => delete_voice(state, uri).await,
        VoiceCommand::RefreshVoices => refresh_voices(state).await,
        VoiceCommand::ClearError => state.set_state(WorkflowState::Idle),
        // Handled by the loop before dispatch.
        VoiceCommand::Shutdown => {}
    }
}

pub fn handle_playback_note(state: &mut ActorState, note: PlaybackNote) {
    match note {
        PlaybackNote::Finished => {
            if let Some(session) = state.playback.as_mut() {
                session.playing = false;
                if let Some(poller) = session.poller.take() {
                    poller.abort();
                }
            }
        }
    }
}

async fn request_speech(state: &mut ActorState, text: String, params: SynthesisParams) {
    if text.trim().is_empty() {
        // Rejected before any I/O; Loading is never entered.
        state.fail(ApiError::Validation(
            "enter some text to synthesize".to_string(),
        ));
        return;
    }

    state.set_state(WorkflowState::Loading);

    let request = SpeechRequest::new(text, params);
    let bytes = match state.service.synthesize(&request).await {
        Ok(bytes) => bytes,
        Err(e) => return state.fail(e),
    };

    let path = temp_path("speech", "mp3");
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        // A half-written file must never reach playback.
        let _ = tokio::fs::remove_file(&path).await;
        return state.fail(e);
    }

    if let Err(e) = begin_playback(state, PlaybackSource::File(path)).await {
        return state.fail(e);
    }

    state.set_state(WorkflowState::Success);
}

async fn begin_recording(state: &mut ActorState, purpose: RecordingPurpose) {
    if state.recording.is_some() {
        state.fail(MediaError::RecordingInProgress);
        return;
    }

    state.set_state(WorkflowState::Loading);

    let target = temp_path("recording", "wav");
    match state.gateway.start_recording(&target).await {
        Ok(()) => {
            state.recording = Some(RecordingSession { target, purpose });
            state
                .event_sender
                .send(WorkflowEvent::RecordingStarted { purpose });
            state.set_state(WorkflowState::Success);
        }
        Err(e) => state.fail(e),
    }
}

async fn end_recording(state: &mut ActorState, transcript: String) {
    let Some(session) = state.recording.take() else {
        state.fail(MediaError::NoRecording);
        return;
    };

    state.set_state(WorkflowState::Loading);

    if let Err(e) = state.gateway.stop_recording().await {
        return state.fail(e);
    }

    let audio = match tokio::fs::read(&session.target).await {
        Ok(bytes) => bytes,
        Err(e) => return state.fail(e),
    };

    let file_name = session
        .target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording.wav".to_string());

    let request = UploadVoiceRequest {
        file_name,
        audio,
        model: catalog::CLONE_MODEL.to_string(),
        display_name: format!("voice_{}", Utc::now().timestamp_millis()),
        text: transcript,
    };

    let upload = match session.purpose {
        RecordingPurpose::ReferenceClone => state.service.upload_reference_voice(request).await,
        RecordingPurpose::GeneralVoice => state.service.upload_voice(request).await,
    };

    let uri = match upload {
        Ok(uri) => uri,
        Err(e) => return state.fail(e),
    };

    info!(%uri, purpose = ?session.purpose, "voice uploaded");
    state.event_sender.send(WorkflowEvent::VoiceUploaded { uri });

    // The new asset may not be indexed by the listing yet; refresh anyway.
    match replace_voice_cache(state).await {
        Ok(()) => state.set_state(WorkflowState::Success),
        Err(e) => state.fail(e),
    }
}

async fn cancel_recording(state: &mut ActorState) {
    let Some(session) = state.recording.take() else {
        state.set_state(WorkflowState::Idle);
        return;
    };

    // Stop failures don't matter here; the recording is being discarded.
    if let Err(error) = state.gateway.stop_recording().await {
        debug!(%error, "ignoring stop failure during cancel");
    }
    let _ = tokio::fs::remove_file(&session.target).await;

    state.event_sender.send(WorkflowEvent::RecordingDiscarded);
    state.set_state(WorkflowState::Idle);
}

async fn start_playback(state: &mut ActorState, source: PlaybackSource) {
    if let Err(e) = begin_playback(state, source).await {
        state.fail(e);
    }
}

/// Supersede any active session, start the new one, and attach a fresh
/// progress poller.
async fn begin_playback(state: &mut ActorState, source: PlaybackSource) -> Result<(), MediaError> {
    supersede_playback(state);

    match &source {
        PlaybackSource::File(path) => state.gateway.play_file(path).await?,
        PlaybackSource::Remote(uri) => state.gateway.play_remote(uri).await?,
    }

    let poller = progress::spawn_poller(
        state.gateway.clone(),
        state.event_sender.clone(),
        state.note_tx.clone(),
    );

    state
        .event_sender
        .send(WorkflowEvent::PlaybackStarted(source.clone()));
    state.playback = Some(PlaybackSession {
        source,
        playing: true,
        poller: Some(poller),
    });

    Ok(())
}

/// Abort the previous session's poller before its resources are released.
fn supersede_playback(state: &mut ActorState) {
    if let Some(mut session) = state.playback.take() {
        if let Some(poller) = session.poller.take() {
            poller.abort();
        }
    }
}

fn pause_playback(state: &mut ActorState) {
    let Some(session) = state.playback.as_mut() else {
        return;
    };

    state.gateway.pause();
    session.playing = false;
    if let Some(poller) = session.poller.take() {
        poller.abort();
    }
}

fn resume_playback(state: &mut ActorState) {
    let Some(session) = state.playback.as_mut() else {
        return;
    };

    state.gateway.resume();
    session.playing = true;
    if session.poller.is_none() {
        session.poller = Some(progress::spawn_poller(
            state.gateway.clone(),
            state.event_sender.clone(),
            state.note_tx.clone(),
        ));
    }
}

fn seek(state: &mut ActorState, fraction: f32) {
    let duration = state.gateway.duration_ms();
    // Unknown duration makes seeking meaningless.
    if duration == 0 {
        return;
    }

    let fraction = fraction.clamp(0.0, 1.0);
    let position = (fraction as f64 * duration as f64).round() as u64;
    if let Err(e) = state.gateway.seek(position) {
        state.fail(e);
    }
}

async fn delete_voice(state: &mut ActorState, uri: String) {
    state.set_state(WorkflowState::Loading);

    if let Err(e) = state.service.delete_voice(&uri).await {
        return state.fail(e);
    }

    // Refresh whether or not the uri was ever in the cache.
    match replace_voice_cache(state).await {
        Ok(()) => state.set_state(WorkflowState::Success),
        Err(e) => state.fail(e),
    }
}

async fn refresh_voices(state: &mut ActorState) {
    state.set_state(WorkflowState::Loading);

    // On failure the previous cache stays; the list is only ever replaced
    // by a successful fetch.
    match replace_voice_cache(state).await {
        Ok(()) => state.set_state(WorkflowState::Success),
        Err(e) => state.fail(e),
    }
}

async fn replace_voice_cache(state: &mut ActorState) -> Result<(), ApiError> {
    let voices = state.service.list_voices().await?;
    state.voices = voices.clone();
    state
        .event_sender
        .send(WorkflowEvent::VoiceListUpdated(voices));
    Ok(())
}

fn shutdown(state: &mut ActorState) {
    supersede_playback(state);
    state.gateway.stop();
}

fn temp_path(prefix: &str, extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}_{}.{extension}", Uuid::new_v4()))
}
