use super::backend::PreviewConnection;
use super::session::CaptureSession;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// How video is scaled into the surface frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoGravity {
    /// Preserve aspect ratio, letterbox
    ResizeAspect,
    /// Preserve aspect ratio, crop to fill
    ResizeAspectFill,
    /// Stretch to fill
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }
}

/// Render target bound to one capture session for its lifetime.
///
/// The surface only observes the session; the controller owns both.
pub struct PreviewSurface {
    id: Uuid,
    session: Weak<Mutex<CaptureSession>>,
    gravity: VideoGravity,
    frame: Rect,
    automatically_adjusts_mirroring: bool,
    mirrored: bool,
}

pub type SharedSurface = Arc<RwLock<PreviewSurface>>;

impl PreviewSurface {
    pub fn new(session: &Arc<Mutex<CaptureSession>>, gravity: VideoGravity) -> Self {
        Self {
            id: Uuid::new_v4(),
            session: Arc::downgrade(session),
            gravity,
            frame: Rect::default(),
            automatically_adjusts_mirroring: true,
            mirrored: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    /// Whether the session this surface was created for is still alive
    pub fn is_bound(&self) -> bool {
        self.session.strong_count() > 0
    }

    /// The session-to-surface connection, if the session currently has one
    pub fn connection(&self) -> Option<PreviewConnection> {
        let session = self.session.upgrade()?;
        let connection = session.lock().preview_connection();
        connection
    }

    pub fn automatically_adjusts_mirroring(&self) -> bool {
        self.automatically_adjusts_mirroring
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Turn off automatic mirroring and mirror the preview.
    ///
    /// Returns false, leaving the flags untouched, when the connection is
    /// missing or cannot mirror.
    pub fn force_mirroring(&mut self) -> bool {
        match self.connection() {
            Some(connection) if connection.supports_mirroring => {
                self.automatically_adjusts_mirroring = false;
                self.mirrored = true;
                true
            }
            _ => false,
        }
    }
}

/// Non-owning reference to a preview surface, handed to the host view
#[derive(Clone)]
pub struct SurfaceHandle {
    id: Uuid,
    surface: Weak<RwLock<PreviewSurface>>,
}

impl SurfaceHandle {
    pub fn new(surface: &SharedSurface) -> Self {
        Self {
            id: surface.read().id(),
            surface: Arc::downgrade(surface),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// False once the owning controller has torn the surface down
    pub fn is_live(&self) -> bool {
        self.surface.strong_count() > 0
    }

    pub fn frame(&self) -> Option<Rect> {
        self.surface.upgrade().map(|s| s.read().frame())
    }

    pub fn is_mirrored(&self) -> Option<bool> {
        self.surface.upgrade().map(|s| s.read().is_mirrored())
    }

    pub fn gravity(&self) -> Option<VideoGravity> {
        self.surface.upgrade().map(|s| s.read().gravity())
    }
}

/// The host's displayable view
pub trait HostView: Send {
    fn bounds(&self) -> Rect;

    /// Install the surface as the view's backing layer
    fn mount(&mut self, surface: SurfaceHandle);

    fn set_wants_layer(&mut self, wants_layer: bool);
}

/// A view with no window behind it; records what was mounted.
pub struct HeadlessView {
    bounds: Rect,
    layer: Option<SurfaceHandle>,
    wants_layer: bool,
}

impl HeadlessView {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            layer: None,
            wants_layer: false,
        }
    }

    pub fn layer(&self) -> Option<&SurfaceHandle> {
        self.layer.as_ref()
    }

    pub fn wants_layer(&self) -> bool {
        self.wants_layer
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }
}

impl HostView for HeadlessView {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn mount(&mut self, surface: SurfaceHandle) {
        self.layer = Some(surface);
    }

    fn set_wants_layer(&mut self, wants_layer: bool) {
        self.wants_layer = wants_layer;
    }
}
