use super::backend::{DeviceInput, PreviewConnection, SessionBackend};
use super::delivery::FrameSink;
use crate::error::CameraError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Named quality bundle applied to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    /// Full resolution stills quality
    Photo,
    High,
    Medium,
    Low,
}

/// A capture session owning at most one input and one frame output
pub struct CaptureSession {
    id: Uuid,
    preset: SessionPreset,
    backend: Box<dyn SessionBackend>,
    input: Option<DeviceInput>,
    output: Option<FrameSink>,
}

impl CaptureSession {
    pub fn new(mut backend: Box<dyn SessionBackend>, preset: SessionPreset) -> Self {
        backend.set_preset(preset);
        let id = Uuid::new_v4();
        debug!("Created capture session {} with preset {:?}", id, preset);

        Self {
            id,
            preset,
            backend,
            input: None,
            output: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn preset(&self) -> SessionPreset {
        self.preset
    }

    pub fn input(&self) -> Option<&DeviceInput> {
        self.input.as_ref()
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Attach an input if the session has room for it and the backend accepts it
    pub fn add_input(&mut self, input: DeviceInput) -> Result<(), CameraError> {
        if self.input.is_some() || !self.backend.can_add_input(&input) {
            return Err(CameraError::rejected(format!(
                "input from {}",
                input.device.name
            )));
        }

        self.backend.add_input(&input);
        info!(
            "Attached input from '{}' to session {}",
            input.device.name, self.id
        );
        self.input = Some(input);
        Ok(())
    }

    /// Attach a frame output if the session has room for it and the backend accepts it
    pub fn add_output(&mut self, sink: FrameSink) -> Result<(), CameraError> {
        if self.output.is_some() || !self.backend.can_add_output(&sink) {
            return Err(CameraError::rejected(format!(
                "frame output on queue '{}'",
                sink.label()
            )));
        }

        self.backend.add_output(sink.clone());
        debug!("Attached frame output '{}' to session {}", sink.label(), self.id);
        self.output = Some(sink);
        Ok(())
    }

    pub fn preview_connection(&self) -> Option<PreviewConnection> {
        self.backend.preview_connection()
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }

    /// Start frame delivery. Returns false if nothing changed.
    pub fn start(&mut self) -> bool {
        if self.backend.is_running() {
            return false;
        }

        if self.input.is_none() {
            warn!("Session {} has no input, not starting", self.id);
            return false;
        }

        self.backend.start_running();
        self.backend.is_running()
    }

    /// Stop frame delivery. Returns false if nothing changed.
    pub fn stop(&mut self) -> bool {
        if !self.backend.is_running() {
            return false;
        }

        self.backend.stop_running();
        true
    }
}
