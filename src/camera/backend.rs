//! Contract with the platform capture subsystem.
//!
//! The controller never talks to hardware directly; it drives these traits,
//! which a platform binding (or [`MockBackend`](super::MockBackend)) implements.

use super::delivery::FrameSink;
use super::session::SessionPreset;
use crate::error::CameraError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Permission status for a media capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    NotDetermined,
    Authorized,
    Denied,
    Restricted,
    /// A status this build does not know about
    Unknown,
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthorizationState::NotDetermined => "not_determined",
            AuthorizationState::Authorized => "authorized",
            AuthorizationState::Denied => "denied",
            AuthorizationState::Restricted => "restricted",
            AuthorizationState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Media capability used to scope authorization and device queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
    Muxed,
}

/// Handle to a physical capture device as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub id: String,
    pub name: String,
    pub media_types: Vec<MediaType>,
}

impl DeviceHandle {
    pub fn new<S: Into<String>>(id: S, name: S, media_types: Vec<MediaType>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            media_types,
        }
    }

    pub fn has_media_type(&self, media: MediaType) -> bool {
        self.media_types.contains(&media)
    }
}

/// An opened input on a capture device, ready to be attached to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub id: Uuid,
    pub device: DeviceHandle,
}

impl DeviceInput {
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
        }
    }
}

/// Capabilities of the connection between a session and a preview surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewConnection {
    pub supports_mirroring: bool,
}

/// Device access, authorization and session factory.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Current authorization for the capability. Has no side effects.
    fn authorization_status(&self, media: MediaType) -> AuthorizationState;

    /// Show the access prompt and resolve once the user answers.
    ///
    /// The future may complete on any thread.
    async fn request_access(&self, media: MediaType) -> bool;

    /// All devices currently known to the system
    fn devices(&self) -> Vec<DeviceHandle>;

    /// Open an input on the device
    fn create_input(&self, device: &DeviceHandle) -> Result<DeviceInput, CameraError>;

    /// Create an empty, stopped session
    fn create_session(&self) -> Box<dyn SessionBackend>;
}

/// Backend side of a capture session
pub trait SessionBackend: Send {
    fn set_preset(&mut self, preset: SessionPreset);

    fn can_add_input(&self, input: &DeviceInput) -> bool;

    fn add_input(&mut self, input: &DeviceInput);

    fn can_add_output(&self, sink: &FrameSink) -> bool;

    fn add_output(&mut self, sink: FrameSink);

    /// Connection a preview surface would observe, if the session has one
    fn preview_connection(&self) -> Option<PreviewConnection>;

    fn is_running(&self) -> bool;

    fn start_running(&mut self);

    fn stop_running(&mut self);
}
