use super::*;
use crate::config::CameraConfig;
use crate::dispatch::{UiContext, UiLoop};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct Harness {
    controller: CameraSessionController,
    ui_loop: UiLoop,
    backend: MockBackend,
    view: Arc<Mutex<HeadlessView>>,
    frames: Arc<FrameCounter>,
}

fn harness_with(backend: MockBackend, camera: CameraConfig) -> Harness {
    let (ui, ui_loop) = UiContext::new();
    let view = Arc::new(Mutex::new(HeadlessView::new(Rect::from_size(640, 360))));
    let host: Arc<Mutex<dyn HostView>> = view.clone();
    let frames = Arc::new(FrameCounter::new());

    let controller = CameraSessionController::builder()
        .backend(Arc::new(backend.clone()))
        .ui_context(ui)
        .view(host)
        .frame_handler(frames.clone())
        .camera_config(camera)
        .build()
        .expect("controller should build");

    Harness {
        controller,
        ui_loop,
        backend,
        view,
        frames,
    }
}

fn harness(backend: MockBackend) -> Harness {
    harness_with(backend, CameraConfig::default())
}

#[tokio::test]
async fn test_authorized_activation_configures_and_starts() {
    let mut h = harness(MockBackend::new());

    assert_eq!(h.controller.activate(), AuthorizationState::Authorized);
    assert_eq!(h.controller.state(), SessionState::Authorized);
    // Configuration is posted, not run inline
    assert!(!h.controller.has_session());

    assert!(h.ui_loop.turn(&mut h.controller).await);

    assert_eq!(h.controller.state(), SessionState::Running);
    assert!(h.controller.is_running());
    assert!(h.controller.has_input());
    assert!(h.controller.has_output());
    assert_eq!(h.backend.prompts(), 0);
    assert_eq!(h.backend.last_preset(), Some(SessionPreset::Photo));

    let surface = h.controller.surface().expect("surface should exist");
    assert_eq!(surface.is_mirrored(), Some(true));
    assert_eq!(surface.gravity(), Some(VideoGravity::ResizeAspectFill));
    assert_eq!(surface.frame(), Some(Rect::from_size(640, 360)));

    let view = h.view.lock();
    assert!(view.wants_layer());
    assert_eq!(view.layer().map(|l| l.id()), Some(surface.id()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_running_session_delivers_frames_to_handler() {
    let mut h = harness(MockBackend::new().with_frames(100, (8, 8)));

    h.controller.activate();
    h.ui_loop.turn(&mut h.controller).await;
    assert!(h.controller.is_running());

    timeout(Duration::from_secs(2), async {
        while h.frames.frames() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Should receive frames within timeout");

    assert!(h.controller.frames_delivered() >= 3);
    h.controller.teardown();
}

#[tokio::test]
async fn test_denied_prompt_never_configures() {
    let backend = MockBackend::new()
        .with_authorization(AuthorizationState::NotDetermined)
        .granting(false);
    let mut h = harness(backend);

    assert_eq!(h.controller.activate(), AuthorizationState::NotDetermined);
    assert_eq!(h.controller.state(), SessionState::Pending);

    assert!(h.ui_loop.turn(&mut h.controller).await);

    assert_eq!(h.controller.state(), SessionState::Denied);
    assert_eq!(h.backend.prompts(), 1);
    assert_eq!(h.backend.sessions_created(), 0);
    assert!(!h.controller.has_session());
    assert!(!h.controller.is_running());
    assert!(h.view.lock().layer().is_none());
}

#[tokio::test]
async fn test_granted_prompt_configures_and_starts() {
    let backend = MockBackend::new()
        .with_authorization(AuthorizationState::NotDetermined)
        .granting(true);
    let mut h = harness(backend);

    h.controller.activate();
    h.ui_loop.turn(&mut h.controller).await;

    assert_eq!(h.controller.state(), SessionState::Running);
    assert_eq!(h.backend.sessions_created(), 1);
    assert_eq!(
        h.controller.check_authorization(),
        AuthorizationState::Authorized
    );
}

#[tokio::test]
async fn test_access_prompt_is_issued_once() {
    let backend = MockBackend::new()
        .with_authorization(AuthorizationState::NotDetermined)
        .granting(false);
    let mut h = harness(backend);

    h.controller.activate();
    assert!(!h.controller.request_access_if_needed());

    h.ui_loop.turn(&mut h.controller).await;
    assert!(!h.controller.request_access_if_needed());
    assert_eq!(h.controller.activate(), AuthorizationState::Denied);

    assert_eq!(h.ui_loop.drain(&mut h.controller), 0);
    assert_eq!(h.backend.prompts(), 1);
}

#[tokio::test]
async fn test_terminal_statuses_take_no_action() {
    let cases = [
        (AuthorizationState::Denied, SessionState::Denied),
        (AuthorizationState::Restricted, SessionState::Restricted),
        (AuthorizationState::Unknown, SessionState::Unrequested),
    ];

    for (status, expected) in cases {
        let mut h = harness(MockBackend::new().with_authorization(status));

        assert_eq!(h.controller.activate(), status);
        assert_eq!(h.controller.state(), expected);
        assert!(!h.controller.request_access_if_needed());
        assert!(h.controller.configure().is_none());
        assert_eq!(h.ui_loop.drain(&mut h.controller), 0);
        assert_eq!(h.backend.prompts(), 0);
        assert_eq!(h.backend.sessions_created(), 0);
    }
}

#[tokio::test]
async fn test_configure_refused_before_authorization() {
    let mut h = harness(MockBackend::new());

    assert!(h.controller.configure().is_none());
    assert!(!h.controller.start_session());
    assert_eq!(h.backend.sessions_created(), 0);
}

#[tokio::test]
async fn test_configure_report_and_single_session() {
    let mut h = harness(MockBackend::new());
    h.controller.activate();

    let report = h.controller.configure().expect("should configure");
    assert_eq!(report.device.as_deref(), Some("Mock Camera"));
    assert!(report.input_attached);
    assert!(report.output_attached);
    assert!(report.mirroring_forced);
    assert!(report.surface_attached);
    assert!(report.issues.is_empty());
    assert_eq!(h.controller.state(), SessionState::Stopped);

    // The posted configure finds a session already in place and only starts it
    h.ui_loop.drain(&mut h.controller);
    assert!(h.controller.configure().is_none());
    assert_eq!(h.backend.sessions_created(), 1);
    assert!(h.controller.is_running());
}

#[tokio::test]
async fn test_start_session_is_idempotent() {
    let mut h = harness(MockBackend::new());
    h.controller.activate();
    h.ui_loop.drain(&mut h.controller);

    assert!(h.controller.is_running());
    assert!(!h.controller.start_session());
    assert!(!h.controller.start_session());
    assert!(h.controller.is_running());
    assert_eq!(h.backend.start_calls(), 1);
}

#[tokio::test]
async fn test_repeated_activation_keeps_running_state() {
    let mut h = harness(MockBackend::new());
    h.controller.activate();
    h.ui_loop.drain(&mut h.controller);
    assert_eq!(h.controller.state(), SessionState::Running);

    assert_eq!(h.controller.activate(), AuthorizationState::Authorized);
    assert_eq!(h.ui_loop.drain(&mut h.controller), 0);

    assert_eq!(h.controller.state(), SessionState::Running);
    assert!(h.controller.is_running());
    assert_eq!(h.backend.sessions_created(), 1);
    assert_eq!(h.backend.start_calls(), 1);
}

#[tokio::test]
async fn test_stop_before_start_is_noop() {
    let mut h = harness(MockBackend::new());

    assert!(!h.controller.stop_session());
    assert!(!h.controller.is_running());

    h.controller.activate();
    h.controller.configure();
    assert!(!h.controller.stop_session());
    assert!(!h.controller.is_running());
    assert_eq!(h.backend.stop_calls(), 0);

    assert!(h.controller.start_session());
    assert!(h.controller.stop_session());
    assert!(!h.controller.stop_session());
    assert_eq!(h.controller.state(), SessionState::Stopped);
    assert_eq!(h.backend.stop_calls(), 1);
}

#[tokio::test]
async fn test_no_video_device_leaves_session_without_input() {
    let backend = MockBackend::new().with_devices(vec![MockDevice::audio("Built-in Microphone")]);
    let mut h = harness(backend);
    h.controller.activate();

    let report = h.controller.configure().expect("configure should complete");
    assert_eq!(report.device, None);
    assert!(!report.input_attached);
    assert!(!report.mirroring_forced);
    assert!(report.output_attached);
    assert_eq!(report.issues, vec![crate::error::CameraError::NoDeviceFound]);

    assert!(!h.controller.start_session());
    assert!(!h.controller.is_running());
    assert!(h.controller.has_session());
    assert!(h.controller.device().is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.frames.frames(), 0);
}

#[tokio::test]
async fn test_input_failure_still_attaches_surface() {
    let backend = MockBackend::new().with_devices(vec![MockDevice::video("Busy Camera").busy()]);
    let mut h = harness(backend);
    h.controller.activate();

    let report = h.controller.configure().expect("configure should complete");
    assert!(!report.input_attached);
    assert!(report.surface_attached);
    assert!(matches!(
        report.issues.as_slice(),
        [crate::error::CameraError::DeviceUnavailable { .. }]
    ));

    assert!(!h.controller.has_input());
    assert_eq!(
        h.controller.device().map(|d| d.name.as_str()),
        Some("Busy Camera")
    );

    let view = h.view.lock();
    assert!(view.wants_layer());
    assert!(view.layer().map(|l| l.is_live()).unwrap_or(false));
}

#[tokio::test]
async fn test_only_first_video_device_is_used() {
    let backend = MockBackend::new().with_devices(vec![
        MockDevice::audio("Microphone"),
        MockDevice::video("Front Camera"),
        MockDevice::video("Back Camera"),
    ]);
    let mut h = harness(backend);
    h.controller.activate();

    let report = h.controller.configure().unwrap();
    assert_eq!(report.device.as_deref(), Some("Front Camera"));
    assert!(report.input_attached);
}

#[tokio::test]
async fn test_rejected_guards_are_skipped() {
    let backend = MockBackend::new().rejecting_inputs().rejecting_outputs();
    let mut h = harness(backend);
    h.controller.activate();

    let report = h.controller.configure().expect("configure should complete");
    assert!(!report.input_attached);
    assert!(!report.output_attached);
    assert_eq!(report.issues.len(), 2);
    assert!(report.issues.iter().all(|e| e.is_recoverable()));
    assert!(!h.controller.has_output());
    assert!(h.controller.has_session());
}

#[tokio::test]
async fn test_mirroring_policy() {
    let mut h = harness(MockBackend::new().without_mirroring());
    h.controller.activate();
    assert!(!h.controller.configure().unwrap().mirroring_forced);
    assert_eq!(h.controller.surface().unwrap().is_mirrored(), Some(false));

    let camera = CameraConfig {
        force_mirroring: false,
        ..CameraConfig::default()
    };
    let mut h = harness_with(MockBackend::new(), camera);
    h.controller.activate();
    assert!(!h.controller.configure().unwrap().mirroring_forced);
    assert_eq!(h.controller.surface().unwrap().is_mirrored(), Some(false));
}

#[tokio::test]
async fn test_layout_updates_surface_frame() {
    let mut h = harness(MockBackend::new());
    h.controller.activate();
    h.ui_loop.drain(&mut h.controller);

    h.controller.layout(Rect::from_size(1280, 720));
    assert_eq!(
        h.controller.surface().unwrap().frame(),
        Some(Rect::from_size(1280, 720))
    );
}

#[tokio::test]
async fn test_teardown_releases_everything() {
    let mut h = harness(MockBackend::new());
    h.controller.activate();
    h.ui_loop.drain(&mut h.controller);
    let handle = h.controller.surface().unwrap();

    h.controller.teardown();

    assert_eq!(h.controller.state(), SessionState::Released);
    assert!(!h.controller.has_session());
    assert!(!h.controller.is_running());
    assert!(h.controller.surface().is_none());
    assert!(!handle.is_live());

    // Released is terminal
    h.controller.activate();
    assert_eq!(h.ui_loop.drain(&mut h.controller), 0);
    assert_eq!(h.controller.state(), SessionState::Released);
    assert_eq!(h.backend.stop_calls(), 1);
    assert_eq!(h.controller.frames_delivered(), 0);
}

#[tokio::test]
async fn test_ui_loop_run_returns_controller_on_cancel() {
    let h = harness(MockBackend::new());
    let cancel = CancellationToken::new();
    let mut controller = h.controller;
    controller.activate();

    let task = tokio::spawn(h.ui_loop.run(controller, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let mut controller = timeout(Duration::from_secs(1), task)
        .await
        .expect("UI loop should stop")
        .expect("UI loop should not panic");
    assert!(controller.is_running());
    controller.teardown();
}

#[tokio::test]
async fn test_ui_loop_turn_ends_when_handles_dropped() {
    let mut h = harness(MockBackend::new());
    let (ui, mut ui_loop) = UiContext::new();

    assert!(ui.dispatch(|controller| {
        controller.activate();
    }));
    drop(ui);

    assert!(ui_loop.turn(&mut h.controller).await);
    assert!(!ui_loop.turn(&mut h.controller).await);
    assert_eq!(h.controller.state(), SessionState::Authorized);
}

#[test]
fn test_builder_validation() {
    let result = CameraSessionController::builder().build();
    assert!(result.is_err());

    if let Err(crate::error::SimplecamError::System { message }) = result {
        assert!(message.contains("Capture backend must be specified"));
    } else {
        panic!("Expected system error for missing backend");
    }
}
