use std::rc::Rc;
use std::sync::{Arc, Once};
use std::time::Duration;

use rstest::rstest;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::api::mock::{MockBehavior, MockService, MOCK_AUDIO};
use crate::api::types::{SynthesisParams, VoiceAsset};
use crate::media::gateway::MediaGateway;
use crate::media::mock::{MockGateway, MOCK_RECORDING};
use crate::settings::{ServiceConfig, SettingsManager};
use crate::workflow::actor::{handle_command, handle_playback_note, ActorState, VoiceActor, VoiceCommand};
use crate::workflow::events::{EventSender, WorkflowEvent};
use crate::workflow::progress::PlaybackNote;
use crate::workflow::state::{RecordingPurpose, WorkflowState};

static TRACING_INIT: Once = Once::new();

fn setup_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

struct TestFixture {
    state: ActorState,
    service: Arc<MockService>,
    gateway: Rc<MockGateway>,
    note_rx: mpsc::UnboundedReceiver<PlaybackNote>,
    _event_rx: mpsc::UnboundedReceiver<WorkflowEvent>,
    _temp: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        Self::with_behavior(MockBehavior::Success)
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        setup_tracing();

        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = Arc::new(MockService::new(behavior));
        let gateway = Rc::new(MockGateway::new());
        let (event_sender, event_rx) = EventSender::new();
        let (note_tx, note_rx) = mpsc::unbounded_channel();

        let state = ActorState {
            event_sender,
            service: service.clone(),
            gateway: gateway.clone(),
            settings: SettingsManager::from_path(temp.path().join("settings.toml"))
                .expect("Failed to create settings manager"),
            workflow: WorkflowState::Idle,
            voices: Vec::new(),
            recording: None,
            playback: None,
            note_tx,
        };

        TestFixture {
            state,
            service,
            gateway,
            note_rx,
            _event_rx: event_rx,
            _temp: temp,
        }
    }

    fn states(&self) -> Vec<WorkflowState> {
        self.state
            .event_sender
            .event_history()
            .into_iter()
            .filter_map(|event| match event {
                WorkflowEvent::StateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    fn progress_count(&self) -> usize {
        self.state
            .event_sender
            .event_history()
            .iter()
            .filter(|event| matches!(event, WorkflowEvent::PlaybackProgress { .. }))
            .count()
    }
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\n\t")]
#[tokio::test]
async fn blank_text_never_reaches_the_service(#[case] text: &str) {
    let mut fixture = TestFixture::new();

    handle_command(
        &mut fixture.state,
        VoiceCommand::RequestSpeech {
            text: text.to_string(),
            params: SynthesisParams::default(),
        },
    )
    .await;

    assert!(matches!(fixture.state.workflow, WorkflowState::Error(_)));
    assert!(fixture.service.synth_requests().is_empty());
    assert!(fixture.gateway.played_files().is_empty());
    assert!(
        !fixture.states().contains(&WorkflowState::Loading),
        "validation failures must not enter Loading"
    );
}

#[tokio::test]
async fn synthesis_plays_exactly_one_temp_file() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let mut fixture = TestFixture::new();

            handle_command(
                &mut fixture.state,
                VoiceCommand::RequestSpeech {
                    text: "hello world".to_string(),
                    params: SynthesisParams::for_voice("fishaudio/fish-speech-1.5:alex"),
                },
            )
            .await;

            assert_eq!(fixture.state.workflow, WorkflowState::Success);

            let played = fixture.gateway.played_files();
            assert_eq!(played.len(), 1, "exactly one playback per synthesis");
            assert_eq!(std::fs::read(&played[0]).unwrap(), MOCK_AUDIO);

            let requests = fixture.service.synth_requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].input, "hello world");
            assert_eq!(
                requests[0].voice.as_deref(),
                Some("fishaudio/fish-speech-1.5:alex")
            );

            std::fs::remove_file(&played[0]).ok();
        })
        .await;
}

#[tokio::test]
async fn synthesis_failure_starts_no_playback() {
    let mut fixture = TestFixture::with_behavior(MockBehavior::AlwaysRemoteError {
        code: 503,
        body: "overloaded".to_string(),
    });

    handle_command(
        &mut fixture.state,
        VoiceCommand::RequestSpeech {
            text: "hello".to_string(),
            params: SynthesisParams::default(),
        },
    )
    .await;

    assert!(matches!(fixture.state.workflow, WorkflowState::Error(_)));
    assert!(fixture.gateway.played_files().is_empty());
    assert!(fixture.state.playback.is_none());
}

#[tokio::test]
async fn refresh_failure_keeps_previous_cache() {
    let mut fixture = TestFixture::new();
    fixture.state.voices = vec![VoiceAsset {
        uri: "speech:mock:kept".to_string(),
        name: "kept".to_string(),
    }];

    fixture.service.set_behavior(MockBehavior::AlwaysRemoteError {
        code: 500,
        body: "listing broke".to_string(),
    });

    handle_command(&mut fixture.state, VoiceCommand::RefreshVoices).await;

    assert!(matches!(fixture.state.workflow, WorkflowState::Error(_)));
    assert_eq!(fixture.state.voices.len(), 1);
    assert_eq!(fixture.state.voices[0].uri, "speech:mock:kept");
    assert!(
        !fixture
            .state
            .event_sender
            .event_history()
            .iter()
            .any(|event| matches!(event, WorkflowEvent::VoiceListUpdated(_))),
        "a failed refresh must not publish a list"
    );
}

#[tokio::test]
async fn refresh_replaces_cache_wholesale() {
    let mut fixture = TestFixture::new();
    fixture.state.voices = vec![VoiceAsset {
        uri: "speech:mock:stale".to_string(),
        name: "stale".to_string(),
    }];

    fixture.service.seed_voices(vec![VoiceAsset {
        uri: "speech:mock:fresh".to_string(),
        name: "fresh".to_string(),
    }]);

    handle_command(&mut fixture.state, VoiceCommand::RefreshVoices).await;

    assert_eq!(fixture.states(), vec![WorkflowState::Loading, WorkflowState::Success]);
    assert_eq!(fixture.state.voices.len(), 1);
    assert_eq!(fixture.state.voices[0].uri, "speech:mock:fresh");
}

#[tokio::test(start_paused = true)]
async fn new_playback_supersedes_previous_poller() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let mut fixture = TestFixture::new();
            fixture.gateway.set_duration_ms(10_000);

            handle_command(
                &mut fixture.state,
                VoiceCommand::PlayFile {
                    path: "first.mp3".into(),
                },
            )
            .await;
            handle_command(
                &mut fixture.state,
                VoiceCommand::PlayFile {
                    path: "second.mp3".into(),
                },
            )
            .await;

            // Ticks at 0, 100, 200 and 300ms; a leaked first poller would
            // double the rate.
            tokio::time::sleep(Duration::from_millis(350)).await;

            assert_eq!(fixture.progress_count(), 4);
            assert_eq!(fixture.gateway.played_files().len(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn playback_finishes_and_stops_polling() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let mut fixture = TestFixture::new();
            fixture.gateway.set_duration_ms(4_000);

            handle_command(
                &mut fixture.state,
                VoiceCommand::PlayFile {
                    path: "done.mp3".into(),
                },
            )
            .await;
            fixture.gateway.set_position_ms(4_000);

            tokio::time::sleep(Duration::from_millis(250)).await;

            let finished = fixture
                .state
                .event_sender
                .event_history()
                .iter()
                .filter(|event| matches!(event, WorkflowEvent::PlaybackFinished))
                .count();
            assert_eq!(finished, 1);
            // The poller exits after reporting 1.0 instead of ticking on.
            assert_eq!(fixture.progress_count(), 1);

            let note = fixture.note_rx.try_recv().expect("finish note");
            handle_playback_note(&mut fixture.state, note);
            assert!(!fixture.state.playback.as_ref().unwrap().playing);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn pause_halts_polling_and_resume_restarts_it() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let mut fixture = TestFixture::new();
            fixture.gateway.set_duration_ms(10_000);

            handle_command(
                &mut fixture.state,
                VoiceCommand::PlayFile {
                    path: "long.mp3".into(),
                },
            )
            .await;

            tokio::time::sleep(Duration::from_millis(250)).await;
            assert_eq!(fixture.progress_count(), 3);

            handle_command(&mut fixture.state, VoiceCommand::PausePlayback).await;
            assert!(!fixture.gateway.is_playing());
            assert!(!fixture.state.playback.as_ref().unwrap().playing);

            tokio::time::sleep(Duration::from_millis(300)).await;
            assert_eq!(fixture.progress_count(), 3, "paused playback must not poll");

            handle_command(&mut fixture.state, VoiceCommand::ResumePlayback).await;
            assert!(fixture.state.playback.as_ref().unwrap().playing);

            tokio::time::sleep(Duration::from_millis(250)).await;
            assert_eq!(fixture.progress_count(), 6);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn seek_translates_fraction_through_duration() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let mut fixture = TestFixture::new();
            fixture.gateway.set_duration_ms(4_000);

            handle_command(
                &mut fixture.state,
                VoiceCommand::PlayFile {
                    path: "seekable.mp3".into(),
                },
            )
            .await;

            handle_command(&mut fixture.state, VoiceCommand::Seek { fraction: 0.0 }).await;
            handle_command(&mut fixture.state, VoiceCommand::Seek { fraction: 1.0 }).await;

            assert_eq!(fixture.gateway.seeks(), vec![0, 4_000]);
        })
        .await;
}

#[tokio::test]
async fn seek_with_unknown_duration_is_a_noop() {
    let mut fixture = TestFixture::new();

    handle_command(&mut fixture.state, VoiceCommand::Seek { fraction: 0.5 }).await;

    assert!(fixture.gateway.seeks().is_empty());
    assert_eq!(fixture.state.workflow, WorkflowState::Idle);
}

#[tokio::test]
async fn record_stop_uploads_and_refreshes_the_cache() {
    let mut fixture = TestFixture::new();

    handle_command(
        &mut fixture.state,
        VoiceCommand::BeginRecording {
            purpose: RecordingPurpose::GeneralVoice,
        },
    )
    .await;
    assert_eq!(fixture.state.workflow, WorkflowState::Success);

    let target = fixture.state.recording.as_ref().unwrap().target.clone();
    assert!(target.exists());

    handle_command(
        &mut fixture.state,
        VoiceCommand::EndRecording {
            transcript: "a quick sample".to_string(),
        },
    )
    .await;

    assert_eq!(fixture.state.workflow, WorkflowState::Success);
    assert!(fixture.state.recording.is_none());

    let uploads = fixture.service.uploads();
    assert_eq!(uploads.len(), 1);
    assert!(fixture.service.reference_uploads().is_empty());
    assert_eq!(uploads[0].audio, MOCK_RECORDING);
    assert_eq!(uploads[0].text, "a quick sample");
    assert!(uploads[0].display_name.starts_with("voice_"));

    // The refreshed cache lists the asset the upload created.
    let uploaded_uri = fixture
        .state
        .event_sender
        .event_history()
        .iter()
        .find_map(|event| match event {
            WorkflowEvent::VoiceUploaded { uri } => Some(uri.clone()),
            _ => None,
        })
        .expect("upload event");
    assert!(fixture.state.voices.iter().any(|v| v.uri == uploaded_uri));

    std::fs::remove_file(&target).ok();
}

#[tokio::test]
async fn reference_recordings_route_to_the_reference_upload() {
    let mut fixture = TestFixture::new();

    handle_command(
        &mut fixture.state,
        VoiceCommand::BeginRecording {
            purpose: RecordingPurpose::ReferenceClone,
        },
    )
    .await;
    let target = fixture.state.recording.as_ref().unwrap().target.clone();

    handle_command(
        &mut fixture.state,
        VoiceCommand::EndRecording {
            transcript: "clone me".to_string(),
        },
    )
    .await;

    assert_eq!(fixture.state.workflow, WorkflowState::Success);
    assert!(fixture.service.uploads().is_empty());
    assert_eq!(fixture.service.reference_uploads().len(), 1);

    std::fs::remove_file(&target).ok();
}

#[tokio::test]
async fn cancel_discards_the_recording_without_uploading() {
    let mut fixture = TestFixture::new();

    handle_command(
        &mut fixture.state,
        VoiceCommand::BeginRecording {
            purpose: RecordingPurpose::GeneralVoice,
        },
    )
    .await;
    let target = fixture.state.recording.as_ref().unwrap().target.clone();
    assert!(target.exists());

    handle_command(&mut fixture.state, VoiceCommand::CancelRecording).await;

    assert_eq!(fixture.state.workflow, WorkflowState::Idle);
    assert!(!target.exists());
    assert!(fixture.service.uploads().is_empty());
    assert!(fixture.service.reference_uploads().is_empty());
    assert!(fixture.state.voices.is_empty());
    assert!(fixture
        .state
        .event_sender
        .event_history()
        .iter()
        .any(|event| matches!(event, WorkflowEvent::RecordingDiscarded)));
}

#[tokio::test]
async fn cancel_ignores_gateway_stop_failures() {
    let mut fixture = TestFixture::new();

    handle_command(
        &mut fixture.state,
        VoiceCommand::BeginRecording {
            purpose: RecordingPurpose::GeneralVoice,
        },
    )
    .await;

    fixture.gateway.fail_recording();
    handle_command(&mut fixture.state, VoiceCommand::CancelRecording).await;

    // Discarding already supersedes whatever went wrong stopping.
    assert_eq!(fixture.state.workflow, WorkflowState::Idle);
}

#[tokio::test]
async fn deleting_an_absent_uri_still_refreshes_and_succeeds() {
    let mut fixture = TestFixture::new();
    let lists_before = fixture.service.list_calls();

    handle_command(
        &mut fixture.state,
        VoiceCommand::DeleteVoice {
            uri: "speech:mock:absent".to_string(),
        },
    )
    .await;

    assert_eq!(fixture.state.workflow, WorkflowState::Success);
    assert_eq!(fixture.service.deletions(), vec!["speech:mock:absent"]);
    assert_eq!(fixture.service.list_calls(), lists_before + 1);
}

#[tokio::test]
async fn upload_failure_surfaces_as_error() {
    let mut fixture = TestFixture::new();

    handle_command(
        &mut fixture.state,
        VoiceCommand::BeginRecording {
            purpose: RecordingPurpose::GeneralVoice,
        },
    )
    .await;
    let target = fixture.state.recording.as_ref().unwrap().target.clone();

    fixture.service.set_behavior(MockBehavior::AlwaysRemoteError {
        code: 503,
        body: "upload rejected".to_string(),
    });

    handle_command(
        &mut fixture.state,
        VoiceCommand::EndRecording {
            transcript: "doomed".to_string(),
        },
    )
    .await;

    match &fixture.state.workflow {
        WorkflowState::Error(message) => assert!(message.contains("503")),
        other => panic!("expected error state, got {other:?}"),
    }
    assert!(fixture.state.voices.is_empty());

    std::fs::remove_file(&target).ok();
}

#[tokio::test]
async fn clear_error_returns_to_idle() {
    let mut fixture = TestFixture::with_behavior(MockBehavior::AlwaysNetworkError);

    handle_command(&mut fixture.state, VoiceCommand::RefreshVoices).await;
    assert!(matches!(fixture.state.workflow, WorkflowState::Error(_)));

    handle_command(&mut fixture.state, VoiceCommand::ClearError).await;
    assert_eq!(fixture.state.workflow, WorkflowState::Idle);
}

#[tokio::test]
async fn launch_performs_an_initial_voice_refresh() {
    setup_tracing();
    let local = LocalSet::new();
    local
        .run_until(async {
            let temp = TempDir::new().unwrap();
            let settings = SettingsManager::from_path(temp.path().join("settings.toml")).unwrap();
            settings.update_setting(|s| {
                s.service = ServiceConfig::Mock {
                    behavior: MockBehavior::default(),
                };
            });

            let (actor, mut events) = VoiceActor::launch(settings);

            let mut saw_list = false;
            while let Some(event) = events.recv().await {
                match event {
                    WorkflowEvent::VoiceListUpdated(_) => saw_list = true,
                    WorkflowEvent::StateChanged(WorkflowState::Success) => break,
                    _ => {}
                }
            }

            assert!(saw_list, "launch must load the voice list");
            actor.shutdown().unwrap();
        })
        .await;
}
