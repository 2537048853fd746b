pub mod camera;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;

pub use camera::{
    AuthorizationState, CameraSessionController, CameraSessionControllerBuilder, CaptureBackend,
    ConfigureReport, FrameCounter, FrameHandler, HeadlessView, HostView, MockBackend, Rect,
    SessionState, SurfaceHandle,
};
pub use config::SimplecamConfig;
pub use dispatch::{UiContext, UiLoop};
pub use error::{CameraError, Result, SimplecamError};
pub use frame::{FrameData, PixelFormat};
