use thiserror::Error;

/// Failures that can occur while bringing up a capture session.
///
/// None of these escape `configure()`; they are logged and collected into the
/// configure report so the host can inspect them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera access denied by user or policy")]
    PermissionDenied,

    #[error("Camera access is not authorized (state: {state})")]
    NotAuthorized { state: String },

    #[error("Capture device {device} unavailable: {details}")]
    DeviceUnavailable { device: String, details: String },

    #[error("Capture session rejected {what}")]
    BackendRejected { what: String },

    #[error("No video capable capture device found")]
    NoDeviceFound,

    #[error("Capture session already configured")]
    AlreadyConfigured,

    #[error("Frame delivery queue closed")]
    DeliveryClosed,
}

impl CameraError {
    /// Whether configuration can continue past this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CameraError::DeviceUnavailable { .. }
                | CameraError::BackendRejected { .. }
                | CameraError::NoDeviceFound
        )
    }

    pub fn rejected<S: Into<String>>(what: S) -> Self {
        Self::BackendRejected { what: what.into() }
    }
}

#[derive(Error, Debug)]
pub enum SimplecamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("System error: {message}")]
    System { message: String },
}

impl SimplecamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimplecamError>;
