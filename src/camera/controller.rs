use super::backend::{AuthorizationState, CaptureBackend, DeviceHandle, MediaType};
use super::delivery::{DeliveryQueue, FrameHandler, NoopFrameHandler};
use super::preview::{HostView, PreviewSurface, Rect, SharedSurface, SurfaceHandle};
use super::session::CaptureSession;
use crate::config::{CameraConfig, DeliveryConfig};
use crate::dispatch::UiContext;
use crate::error::{CameraError, Result, SimplecamError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Authorization not yet resolved
    Unrequested,
    /// Access prompt in flight
    Pending,
    Authorized,
    /// Terminal
    Denied,
    /// Terminal
    Restricted,
    Configuring,
    Running,
    /// Configured and idle
    Stopped,
    /// Session torn down; terminal
    Released,
}

/// What `configure` managed to wire up
#[derive(Debug, Clone)]
pub struct ConfigureReport {
    pub session_id: Uuid,
    pub device: Option<String>,
    pub input_attached: bool,
    pub output_attached: bool,
    pub mirroring_forced: bool,
    pub surface_attached: bool,
    /// Non-fatal failures hit along the way
    pub issues: Vec<CameraError>,
}

/// Owns a capture session and its preview surface and drives them from
/// authorization through start and stop.
///
/// Lives on the UI context; work that completes elsewhere is posted back
/// through the [`UiContext`] it was built with.
pub struct CameraSessionController {
    backend: Arc<dyn CaptureBackend>,
    ui: UiContext,
    view: Arc<Mutex<dyn HostView>>,
    frame_handler: Arc<dyn FrameHandler>,
    camera: CameraConfig,
    delivery: DeliveryConfig,
    state: SessionState,
    access_requested: bool,
    device: Option<DeviceHandle>,
    session: Option<Arc<Mutex<CaptureSession>>>,
    surface: Option<SharedSurface>,
    delivery_queue: Option<DeliveryQueue>,
}

impl CameraSessionController {
    pub fn builder() -> CameraSessionControllerBuilder {
        CameraSessionControllerBuilder::new()
    }

    /// Entry point once the host view is loaded.
    ///
    /// Authorized hosts get configure + start posted to the UI context,
    /// undetermined ones get the access prompt, everything else stops here.
    /// Only the first call acts; later calls just report the status.
    pub fn activate(&mut self) -> AuthorizationState {
        let status = self.check_authorization();
        info!("Camera authorization status: {}", status);

        if self.state != SessionState::Unrequested {
            debug!("Controller already activated ({:?})", self.state);
            return status;
        }

        match status {
            AuthorizationState::Authorized => {
                self.state = SessionState::Authorized;
                self.ui.dispatch(|controller| {
                    controller.configure();
                    controller.start_session();
                });
            }
            AuthorizationState::NotDetermined => {
                self.request_access_if_needed();
            }
            AuthorizationState::Denied => {
                info!("Camera access previously denied, not configuring");
                self.state = SessionState::Denied;
            }
            AuthorizationState::Restricted => {
                info!("Camera access restricted by policy, not configuring");
                self.state = SessionState::Restricted;
            }
            AuthorizationState::Unknown => {
                warn!("Unrecognised camera authorization status, not configuring");
            }
        }

        status
    }

    pub fn check_authorization(&self) -> AuthorizationState {
        self.backend.authorization_status(MediaType::Video)
    }

    /// Show the access prompt, at most once per controller.
    ///
    /// Returns whether a prompt was issued. The answer is delivered to
    /// [`complete_access_request`](Self::complete_access_request) on the UI context.
    pub fn request_access_if_needed(&mut self) -> bool {
        if self.access_requested || self.state != SessionState::Unrequested {
            debug!("Access already requested or decided ({:?})", self.state);
            return false;
        }

        let status = self.check_authorization();
        if status != AuthorizationState::NotDetermined {
            debug!("Not prompting, authorization is {}", status);
            return false;
        }

        self.access_requested = true;
        self.state = SessionState::Pending;
        info!("Requesting camera access");

        let backend = Arc::clone(&self.backend);
        let ui = self.ui.clone();
        tokio::spawn(async move {
            let granted = backend.request_access(MediaType::Video).await;
            if !ui.dispatch(move |controller| controller.complete_access_request(granted)) {
                warn!("Camera access answered after the UI context closed");
            }
        });

        true
    }

    /// Apply the answer to the access prompt. Runs on the UI context.
    pub fn complete_access_request(&mut self, granted: bool) {
        if self.state != SessionState::Pending {
            warn!(
                "Ignoring access answer while {:?} (granted: {})",
                self.state, granted
            );
            return;
        }

        if granted {
            info!("Camera access granted");
            self.state = SessionState::Authorized;
            self.configure();
            self.start_session();
        } else {
            info!("Camera access denied");
            self.state = SessionState::Denied;
        }
    }

    /// Build the session, preview surface, input and frame output.
    ///
    /// Only runs when authorized and not yet configured. Device and backend
    /// failures are logged and recorded in the report; the session is kept
    /// even if it ends up without an input.
    pub fn configure(&mut self) -> Option<ConfigureReport> {
        if self.state != SessionState::Authorized {
            warn!("Refusing to configure camera session while {:?}", self.state);
            return None;
        }
        if self.session.is_some() {
            warn!("{}", CameraError::AlreadyConfigured);
            return None;
        }

        self.state = SessionState::Configuring;

        let session = Arc::new(Mutex::new(CaptureSession::new(
            self.backend.create_session(),
            self.camera.preset,
        )));
        let session_id = session.lock().id();
        let mut surface = PreviewSurface::new(&session, self.camera.gravity);

        let mut report = ConfigureReport {
            session_id,
            device: None,
            input_attached: false,
            output_attached: false,
            mirroring_forced: false,
            surface_attached: false,
            issues: Vec::new(),
        };

        match self
            .backend
            .devices()
            .into_iter()
            .find(|device| device.has_media_type(MediaType::Video))
        {
            Some(device) => {
                info!("Using capture device '{}' ({})", device.name, device.id);
                report.device = Some(device.name.clone());

                match self.backend.create_input(&device) {
                    Ok(input) => match session.lock().add_input(input) {
                        Ok(()) => report.input_attached = true,
                        Err(e) => {
                            debug!("Skipping input: {}", e);
                            report.issues.push(e);
                        }
                    },
                    Err(e) => {
                        error!("Failed to open capture device: {}", e);
                        report.issues.push(e);
                    }
                }

                self.device = Some(device);
            }
            None => {
                warn!("{}", CameraError::NoDeviceFound);
                report.issues.push(CameraError::NoDeviceFound);
            }
        }

        if self.camera.force_mirroring && surface.force_mirroring() {
            debug!("Preview mirroring forced on");
            report.mirroring_forced = true;
        }

        let surface = {
            let mut view = self.view.lock();
            surface.set_frame(view.bounds());
            let surface: SharedSurface = Arc::new(RwLock::new(surface));
            view.mount(SurfaceHandle::new(&surface));
            view.set_wants_layer(true);
            surface
        };
        report.surface_attached = true;

        let queue = DeliveryQueue::spawn(&self.delivery, Arc::clone(&self.frame_handler));
        let attached = session.lock().add_output(queue.sink());
        match attached {
            Ok(()) => {
                report.output_attached = true;
                self.delivery_queue = Some(queue);
            }
            Err(e) => {
                debug!("Skipping frame output: {}", e);
                report.issues.push(e);
                queue.close();
            }
        }

        self.session = Some(session);
        self.surface = Some(surface);
        self.state = SessionState::Stopped;

        info!(
            "Camera session {} configured (input: {}, output: {}, mirrored: {})",
            session_id, report.input_attached, report.output_attached, report.mirroring_forced
        );

        Some(report)
    }

    /// Begin frame delivery. Returns false when there was nothing to do.
    pub fn start_session(&mut self) -> bool {
        let Some(session) = &self.session else {
            debug!("No camera session to start");
            return false;
        };

        let mut session = session.lock();
        if session.is_running() {
            debug!("Camera session already running");
            return false;
        }

        if session.start() {
            info!("Camera session {} started", session.id());
            self.state = SessionState::Running;
            true
        } else {
            false
        }
    }

    /// Stop frame delivery. Returns false when there was nothing to do.
    pub fn stop_session(&mut self) -> bool {
        let Some(session) = &self.session else {
            debug!("No camera session to stop");
            return false;
        };

        let mut session = session.lock();
        if session.stop() {
            info!("Camera session {} stopped", session.id());
            self.state = SessionState::Stopped;
            true
        } else {
            debug!("Camera session not running");
            false
        }
    }

    /// Host view resized
    pub fn layout(&mut self, bounds: Rect) {
        if let Some(surface) = &self.surface {
            surface.write().set_frame(bounds);
        }
    }

    /// Stop and release the session, surface and delivery queue
    pub fn teardown(&mut self) {
        self.stop_session();

        if let Some(queue) = self.delivery_queue.take() {
            info!(
                "Delivery queue '{}' closing after {} frames ({} dropped)",
                queue.label(),
                queue.delivered(),
                queue.dropped()
            );
            queue.close();
        }

        self.surface = None;
        self.device = None;
        if let Some(session) = self.session.take() {
            info!("Camera session {} released", session.lock().id());
            self.state = SessionState::Released;
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.lock().is_running())
            .unwrap_or(false)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn has_input(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.lock().has_input())
            .unwrap_or(false)
    }

    pub fn has_output(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.lock().has_output())
            .unwrap_or(false)
    }

    /// Device selected during configuration
    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface.as_ref().map(SurfaceHandle::new)
    }

    pub fn frames_delivered(&self) -> u64 {
        self.delivery_queue
            .as_ref()
            .map(|q| q.delivered())
            .unwrap_or(0)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.delivery_queue
            .as_ref()
            .map(|q| q.dropped())
            .unwrap_or(0)
    }
}

/// Builder for [`CameraSessionController`]
pub struct CameraSessionControllerBuilder {
    backend: Option<Arc<dyn CaptureBackend>>,
    ui: Option<UiContext>,
    view: Option<Arc<Mutex<dyn HostView>>>,
    frame_handler: Arc<dyn FrameHandler>,
    camera: CameraConfig,
    delivery: DeliveryConfig,
}

impl CameraSessionControllerBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            ui: None,
            view: None,
            frame_handler: Arc::new(NoopFrameHandler),
            camera: CameraConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }

    pub fn backend(mut self, backend: Arc<dyn CaptureBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn ui_context(mut self, ui: UiContext) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn view(mut self, view: Arc<Mutex<dyn HostView>>) -> Self {
        self.view = Some(view);
        self
    }

    /// Attach a frame consumer; defaults to a no-op
    pub fn frame_handler(mut self, handler: Arc<dyn FrameHandler>) -> Self {
        self.frame_handler = handler;
        self
    }

    pub fn camera_config(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn delivery_config(mut self, delivery: DeliveryConfig) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn build(self) -> Result<CameraSessionController> {
        let backend = self
            .backend
            .ok_or_else(|| SimplecamError::system("Capture backend must be specified"))?;
        let ui = self
            .ui
            .ok_or_else(|| SimplecamError::system("UI context must be specified"))?;
        let view = self
            .view
            .ok_or_else(|| SimplecamError::system("Host view must be specified"))?;

        Ok(CameraSessionController {
            backend,
            ui,
            view,
            frame_handler: self.frame_handler,
            camera: self.camera,
            delivery: self.delivery,
            state: SessionState::Unrequested,
            access_requested: false,
            device: None,
            session: None,
            surface: None,
            delivery_queue: None,
        })
    }
}

impl Default for CameraSessionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
