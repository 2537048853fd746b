mod backend;
mod controller;
mod delivery;
mod mock;
mod preview;
mod session;
#[cfg(test)]
mod tests;

pub use backend::{
    AuthorizationState, CaptureBackend, DeviceHandle, DeviceInput, MediaType, PreviewConnection,
    SessionBackend,
};
pub use controller::{
    CameraSessionController, CameraSessionControllerBuilder, ConfigureReport, SessionState,
};
pub use delivery::{DeliveryQueue, FrameCounter, FrameHandler, FrameSink, NoopFrameHandler};
pub use mock::{MockBackend, MockDevice};
pub use preview::{HeadlessView, HostView, PreviewSurface, Rect, SurfaceHandle, VideoGravity};
pub use session::{CaptureSession, SessionPreset};
