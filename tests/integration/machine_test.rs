//! End-to-end submission machine flows against scripted collaborators.

use bytes::Bytes;
use chrono::{Duration, Utc};

use brewlink::core::events::ReceiptStatusEvent;
use brewlink::core::types::{CafeId, ChannelKey};
use brewlink::receipt::image::{CapturedImage, ImageSource};
use brewlink::receipt::machine::{
    MachineState, ProcessingPhase, SubmitMode, WarningChoice, WarningResolution,
};
use brewlink::session::session::CafeSession;

use crate::helpers::{PNG_MAGIC, ScriptedApi, ScriptedChannelFactory, TestRig, png_image};

fn success_event(expires_at: chrono::DateTime<Utc>) -> ReceiptStatusEvent {
    ReceiptStatusEvent {
        status: None,
        receipt_id: Some("r-1".into()),
        expires_at: Some(expires_at),
        cafe_id: Some(CafeId(7)),
        channel_key: Some(ChannelKey::new("k")),
        reject_reason: None,
    }
}

fn failure_event(reason: &str) -> ReceiptStatusEvent {
    ReceiptStatusEvent {
        status: None,
        receipt_id: Some("r-1".into()),
        expires_at: None,
        cafe_id: None,
        channel_key: None,
        reject_reason: Some(reason.to_string()),
    }
}

fn valid_session(cafe_id: i64, channel_key: &str) -> CafeSession {
    let mut s = CafeSession::new(CafeId(cafe_id));
    s.channel_key = Some(channel_key.into());
    s.expires_at = Some(Utc::now() + Duration::hours(1));
    s
}

#[tokio::test]
async fn test_successful_submission_transitions_in_order() {
    let expires_at = Utc::now() + Duration::hours(1);
    let channels = ScriptedChannelFactory::with_events(vec![success_event(expires_at)]);
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    let outcome = rig.machine.submit().await.unwrap();

    assert_eq!(
        rig.machine.history(),
        &[
            MachineState::Select,
            MachineState::Preview,
            MachineState::Processing(ProcessingPhase::Init),
            MachineState::Processing(ProcessingPhase::Uploading),
            MachineState::Processing(ProcessingPhase::Processing),
            MachineState::Done,
        ]
    );
    assert_eq!(rig.api.call_log(), vec!["initialize", "upload", "complete"]);

    // The session landed in the store and shared state with server fields.
    let stored = rig.store.load().await.unwrap();
    assert_eq!(stored.cafe_id, CafeId(7));
    assert_eq!(stored.channel_key, Some(ChannelKey::new("k")));
    assert_eq!(stored.expires_at, Some(expires_at));
    assert_eq!(rig.shared.get().unwrap().cafe_id, CafeId(7));

    // New mode navigates into the presence view.
    assert_eq!(outcome.navigate_to, Some(CafeId(7)));

    // The receipt channel was joined once and stopped exactly once.
    assert_eq!(rig.channels.joined.lock().unwrap().len(), 1);
    assert_eq!(rig.channels.stop_count(), 1);
}

#[tokio::test]
async fn test_failure_event_surfaces_reason_verbatim() {
    let channels = ScriptedChannelFactory::with_events(vec![failure_event("blurry")]);
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    let err = rig.machine.submit().await.unwrap_err();

    assert_eq!(err.message, "blurry");
    assert_eq!(
        rig.machine.state(),
        &MachineState::Error("blurry".to_string())
    );
    assert!(rig.store.load().await.is_none());
    assert_eq!(rig.channels.stop_count(), 1);
}

#[tokio::test]
async fn test_progress_events_are_skipped_until_terminal() {
    let expires_at = Utc::now() + Duration::hours(1);
    let progress = ReceiptStatusEvent {
        status: Some("OCR_RUNNING".to_string()),
        receipt_id: Some("r-1".into()),
        expires_at: None,
        cafe_id: None,
        channel_key: None,
        reject_reason: None,
    };
    let channels =
        ScriptedChannelFactory::with_events(vec![progress, success_event(expires_at)]);
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    rig.machine.submit().await.unwrap();

    assert_eq!(rig.machine.state(), &MachineState::Done);
}

#[tokio::test]
async fn test_oversized_file_is_rejected_before_any_network_call() {
    let channels = ScriptedChannelFactory::with_events(Vec::new());
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);
    rig.machine.open().await;

    let mut data = PNG_MAGIC.to_vec();
    data.resize(11 * 1024 * 1024, 0);
    let err = CapturedImage::from_file(Bytes::from(data), 10 * 1024 * 1024).unwrap_err();
    assert!(err.message.contains("limit"));

    // Nothing was attached, so the machine stayed in selection and no
    // network call was issued.
    assert_eq!(rig.machine.state(), &MachineState::Select);
    assert!(rig.api.call_log().is_empty());
    assert_eq!(rig.channels.open_count(), 0);
}

#[tokio::test]
async fn test_entry_guard_warns_and_replace_clears_before_init() {
    let channels = ScriptedChannelFactory::with_events(vec![success_event(
        Utc::now() + Duration::hours(1),
    )]);
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);

    // Existing unexpired session in the durable store; probe that store
    // at initialize time from inside the API double.
    assert!(rig.store.save(&valid_session(3, "old-key")).await);
    *rig.api.store_probe.lock().unwrap() = Some(rig.store.clone());

    rig.machine.open().await;
    assert_eq!(rig.machine.state(), &MachineState::ActiveSessionWarning);

    let resolution = rig.machine.resolve_warning(WarningChoice::Replace).await;
    assert_eq!(resolution, WarningResolution::Replaced);
    assert_eq!(rig.machine.state(), &MachineState::Select);
    assert!(rig.store.load().await.is_none());
    assert!(rig.shared.get().is_none());

    rig.machine.attach_image(png_image()).unwrap();
    rig.machine.submit().await.unwrap();

    // The prior record was already gone when INIT was issued.
    assert_eq!(*rig.api.record_present_at_init.lock().unwrap(), Some(false));
}

#[tokio::test]
async fn test_entry_guard_return_navigates_to_existing_session() {
    let channels = ScriptedChannelFactory::with_events(Vec::new());
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);
    rig.shared.set(valid_session(5, "key-5"));

    rig.machine.open().await;
    assert_eq!(rig.machine.state(), &MachineState::ActiveSessionWarning);

    let resolution = rig
        .machine
        .resolve_warning(WarningChoice::ReturnToSession)
        .await;
    assert_eq!(
        resolution,
        WarningResolution::ReturnToSession(Some(CafeId(5)))
    );
    assert_eq!(rig.machine.state(), &MachineState::Closed);

    // The existing session is untouched.
    assert_eq!(rig.shared.get().unwrap().cafe_id, CafeId(5));
}

#[tokio::test]
async fn test_extend_mode_bypasses_guard_and_keeps_channel_key() {
    let expires_at = Utc::now() + Duration::hours(2);
    let channels = ScriptedChannelFactory::with_events(vec![success_event(expires_at)]);
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::Extend);
    rig.shared.set(valid_session(7, "old-key"));

    rig.machine.open().await;
    // No warning in extend mode.
    assert_eq!(rig.machine.state(), &MachineState::Select);

    rig.machine.attach_image(png_image()).unwrap();
    let outcome = rig.machine.submit().await.unwrap();

    // The retained key survives; the server-issued "k" is ignored.
    assert_eq!(outcome.session.channel_key, Some(ChannelKey::new("old-key")));
    assert_eq!(outcome.session.expires_at, Some(expires_at));
    assert_eq!(outcome.navigate_to, None);
}

#[tokio::test]
async fn test_processing_deadline_forces_timeout_error() {
    // No events are scripted and the channel hangs; the deadline fires
    // immediately at zero seconds.
    let channels = ScriptedChannelFactory::with_events(Vec::new());
    let mut rig = TestRig::with_timeout(ScriptedApi::new(), channels, SubmitMode::New, 0);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    let err = rig.machine.submit().await.unwrap_err();

    assert_eq!(err.kind, brewlink::core::error::ErrorKind::Timeout);
    assert!(matches!(rig.machine.state(), MachineState::Error(_)));
    assert_eq!(rig.channels.stop_count(), 1);
    assert!(rig.store.load().await.is_none());
}

#[tokio::test]
async fn test_initialize_failure_aborts_with_collaborator_message() {
    let mut api = ScriptedApi::new();
    api.fail_initialize = Some("receipt service unavailable".to_string());
    let channels = ScriptedChannelFactory::with_events(Vec::new());
    let mut rig = TestRig::new(api, channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    let err = rig.machine.submit().await.unwrap_err();

    assert_eq!(err.message, "receipt service unavailable");
    assert_eq!(
        rig.machine.state(),
        &MachineState::Error("receipt service unavailable".to_string())
    );
    // The channel was never opened, so there is nothing to stop.
    assert_eq!(rig.channels.open_count(), 0);
}

#[tokio::test]
async fn test_upload_failure_tears_down_channel() {
    let api = ScriptedApi::new();
    *api.fail_upload.lock().unwrap() = Some("upload target rejected the payload".to_string());
    let channels = ScriptedChannelFactory::with_events(Vec::new());
    let mut rig = TestRig::new(api, channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    let err = rig.machine.submit().await.unwrap_err();

    assert_eq!(err.message, "upload target rejected the payload");
    assert_eq!(rig.channels.stop_count(), 1);
}

#[tokio::test]
async fn test_retake_surfaces_source_and_allows_resubmit() {
    let expires_at = Utc::now() + Duration::hours(1);
    let channels = ScriptedChannelFactory::with_events(vec![success_event(expires_at)]);
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);

    rig.machine.open().await;
    let mut data = crate::helpers::PNG_MAGIC.to_vec();
    data.resize(256, 0);
    let frame = CapturedImage::from_camera_frame(Bytes::from(data), 10 * 1024 * 1024).unwrap();
    rig.machine.attach_image(frame).unwrap();

    // The caller learns which input path to reopen.
    assert_eq!(rig.machine.retake(), Some(ImageSource::Camera));
    assert_eq!(rig.machine.state(), &MachineState::Select);

    rig.machine.attach_image(png_image()).unwrap();
    rig.machine.submit().await.unwrap();
    assert_eq!(rig.machine.state(), &MachineState::Done);
}

#[tokio::test]
async fn test_error_is_recoverable_via_retry_without_recapture() {
    let expires_at = Utc::now() + Duration::hours(1);
    let channels = ScriptedChannelFactory::with_events(vec![success_event(expires_at)]);
    let api = ScriptedApi::new();
    *api.fail_upload.lock().unwrap() = Some("upload target rejected the payload".to_string());
    let mut rig = TestRig::new(api, channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    assert!(rig.machine.submit().await.is_err());
    assert!(matches!(rig.machine.state(), MachineState::Error(_)));

    // The transient failure clears; the captured image is still held.
    *rig.api.fail_upload.lock().unwrap() = None;
    rig.machine.retry();
    assert_eq!(rig.machine.state(), &MachineState::Preview);

    rig.machine.submit().await.unwrap();
    assert_eq!(rig.machine.state(), &MachineState::Done);
    assert_eq!(
        rig.api.call_log(),
        vec!["initialize", "upload", "initialize", "upload", "complete"]
    );
}

#[tokio::test]
async fn test_close_clears_transient_state() {
    let channels = ScriptedChannelFactory::with_events(Vec::new());
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    rig.machine.close().await;

    assert_eq!(rig.machine.state(), &MachineState::Closed);
    // Closing without a run never touched the session sources.
    assert!(rig.store.load().await.is_none());
    assert!(rig.api.call_log().is_empty());
}

#[tokio::test]
async fn test_fallback_expiry_and_cafe_when_server_omits_fields() {
    // Success signalled by bare DONE status with no expiry or cafe id.
    let bare_done = ReceiptStatusEvent {
        status: Some("DONE".to_string()),
        receipt_id: Some("r-1".into()),
        expires_at: None,
        cafe_id: None,
        channel_key: None,
        reject_reason: None,
    };
    let channels = ScriptedChannelFactory::with_events(vec![bare_done]);
    let mut rig = TestRig::new(ScriptedApi::new(), channels, SubmitMode::New);

    rig.machine.open().await;
    rig.machine.attach_image(png_image()).unwrap();
    let outcome = rig.machine.submit().await.unwrap();

    // Falls back to the run's cafe context and the configured duration.
    assert_eq!(outcome.session.cafe_id, CafeId(7));
    let expires_at = outcome.session.expires_at.unwrap();
    let minutes = (expires_at - Utc::now()).num_minutes();
    assert!((55..=60).contains(&minutes));
    // The join key from initialization is used when the event omits one.
    assert_eq!(outcome.session.channel_key, Some(ChannelKey::new("k")));
}
