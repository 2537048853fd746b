use super::backend::{
    AuthorizationState, CaptureBackend, DeviceHandle, DeviceInput, MediaType, PreviewConnection,
    SessionBackend,
};
use super::delivery::FrameSink;
use super::session::SessionPreset;
use crate::config::MockConfig;
use crate::error::CameraError;
use crate::frame::{FrameData, PixelFormat};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// A scripted device for the mock backend
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub handle: DeviceHandle,
    pub fail_input: bool,
}

impl MockDevice {
    pub fn video(name: &str) -> Self {
        Self {
            handle: DeviceHandle::new(
                name.to_lowercase().replace(' ', "-"),
                name.to_string(),
                vec![MediaType::Video, MediaType::Muxed],
            ),
            fail_input: false,
        }
    }

    pub fn audio(name: &str) -> Self {
        Self {
            handle: DeviceHandle::new(
                name.to_lowercase().replace(' ', "-"),
                name.to_string(),
                vec![MediaType::Audio],
            ),
            fail_input: false,
        }
    }

    /// Opening an input on this device will fail
    pub fn busy(mut self) -> Self {
        self.fail_input = true;
        self
    }
}

struct MockState {
    authorization: AuthorizationState,
    grant_access: bool,
    devices: Vec<MockDevice>,
    accept_inputs: bool,
    accept_outputs: bool,
    mirroring_supported: bool,
    fps: u32,
    resolution: (u32, u32),
    prompts: u32,
    sessions_created: u32,
    start_calls: u32,
    stop_calls: u32,
    last_preset: Option<SessionPreset>,
}

/// In-process capture backend producing synthetic frames.
///
/// Every knob the controller reacts to is scriptable, and every call the
/// controller makes is counted so tests can assert on it.
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Authorized backend with one working video device
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                authorization: AuthorizationState::Authorized,
                grant_access: true,
                devices: vec![MockDevice::video("Mock Camera")],
                accept_inputs: true,
                accept_outputs: true,
                mirroring_supported: true,
                fps: 30,
                resolution: (320, 240),
                prompts: 0,
                sessions_created: 0,
                start_calls: 0,
                stop_calls: 0,
                last_preset: None,
            })),
        }
    }

    pub fn from_config(config: &MockConfig) -> Self {
        let devices = config
            .devices
            .iter()
            .map(|d| {
                let device = if d.video {
                    MockDevice::video(&d.name)
                } else {
                    MockDevice::audio(&d.name)
                };
                if d.fail_input {
                    device.busy()
                } else {
                    device
                }
            })
            .collect();

        let backend = Self::new()
            .with_authorization(config.authorization)
            .granting(config.grant_access)
            .with_devices(devices)
            .with_frames(config.fps, config.resolution);

        if config.mirroring_supported {
            backend
        } else {
            backend.without_mirroring()
        }
    }

    pub fn with_authorization(self, authorization: AuthorizationState) -> Self {
        self.state.lock().authorization = authorization;
        self
    }

    /// Answer the access prompt with `grant`
    pub fn granting(self, grant: bool) -> Self {
        self.state.lock().grant_access = grant;
        self
    }

    pub fn with_devices(self, devices: Vec<MockDevice>) -> Self {
        self.state.lock().devices = devices;
        self
    }

    pub fn with_frames(self, fps: u32, resolution: (u32, u32)) -> Self {
        {
            let mut state = self.state.lock();
            state.fps = fps.max(1);
            state.resolution = resolution;
        }
        self
    }

    pub fn rejecting_inputs(self) -> Self {
        self.state.lock().accept_inputs = false;
        self
    }

    pub fn rejecting_outputs(self) -> Self {
        self.state.lock().accept_outputs = false;
        self
    }

    pub fn without_mirroring(self) -> Self {
        self.state.lock().mirroring_supported = false;
        self
    }

    /// Number of access prompts shown
    pub fn prompts(&self) -> u32 {
        self.state.lock().prompts
    }

    pub fn sessions_created(&self) -> u32 {
        self.state.lock().sessions_created
    }

    pub fn start_calls(&self) -> u32 {
        self.state.lock().start_calls
    }

    pub fn stop_calls(&self) -> u32 {
        self.state.lock().stop_calls
    }

    pub fn last_preset(&self) -> Option<SessionPreset> {
        self.state.lock().last_preset
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for MockBackend {
    fn authorization_status(&self, media: MediaType) -> AuthorizationState {
        let state = self.state.lock();
        match media {
            MediaType::Video => state.authorization,
            _ => AuthorizationState::Authorized,
        }
    }

    async fn request_access(&self, media: MediaType) -> bool {
        let (current, grant) = {
            let mut state = self.state.lock();
            state.prompts += 1;
            (state.authorization, state.grant_access)
        };
        info!("Mock access prompt for {:?} (current: {})", media, current);

        // The answer comes back from a thread outside the caller's context.
        let granted = match current {
            AuthorizationState::NotDetermined => {
                tokio::task::spawn_blocking(move || grant).await.unwrap_or(false)
            }
            AuthorizationState::Authorized => true,
            _ => false,
        };

        if current == AuthorizationState::NotDetermined {
            self.state.lock().authorization = if granted {
                AuthorizationState::Authorized
            } else {
                AuthorizationState::Denied
            };
        }

        granted
    }

    fn devices(&self) -> Vec<DeviceHandle> {
        self.state
            .lock()
            .devices
            .iter()
            .map(|d| d.handle.clone())
            .collect()
    }

    fn create_input(&self, device: &DeviceHandle) -> Result<DeviceInput, CameraError> {
        let state = self.state.lock();

        if state.authorization != AuthorizationState::Authorized {
            return Err(CameraError::DeviceUnavailable {
                device: device.name.clone(),
                details: format!("access is {}", state.authorization),
            });
        }

        match state.devices.iter().find(|d| d.handle.id == device.id) {
            Some(d) if d.fail_input => Err(CameraError::DeviceUnavailable {
                device: device.name.clone(),
                details: "device is in use by another application".to_string(),
            }),
            Some(_) => Ok(DeviceInput::new(device.clone())),
            None => Err(CameraError::DeviceUnavailable {
                device: device.name.clone(),
                details: "device disconnected".to_string(),
            }),
        }
    }

    fn create_session(&self) -> Box<dyn SessionBackend> {
        self.state.lock().sessions_created += 1;
        Box::new(MockSession {
            backend: Arc::clone(&self.state),
            inputs: Vec::new(),
            outputs: Vec::new(),
            running: false,
            producer: None,
        })
    }
}

struct MockSession {
    backend: Arc<Mutex<MockState>>,
    inputs: Vec<DeviceInput>,
    outputs: Vec<FrameSink>,
    running: bool,
    producer: Option<JoinHandle<()>>,
}

impl MockSession {
    fn spawn_producer(&mut self) {
        let Some(sink) = self.outputs.first().cloned() else {
            debug!("Mock session has no frame output, nothing to produce");
            return;
        };
        if self.inputs.is_empty() {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime available, mock frames disabled");
                return;
            }
        };

        let (fps, (width, height)) = {
            let state = self.backend.lock();
            (state.fps, state.resolution)
        };

        self.producer = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
            let format = PixelFormat::Bgra32;
            let mut frame_id = 0u64;

            loop {
                interval.tick().await;

                // Solid colour that cycles with the frame number
                let shade = (frame_id % 256) as u8;
                let mut data = vec![0u8; format.frame_size(width, height)];
                for pixel in data.chunks_mut(4) {
                    pixel.copy_from_slice(&[shade, 128, 255 - shade, 255]);
                }
                let frame = FrameData::new(frame_id, SystemTime::now(), data, width, height, format);

                let result = if sink.discards_late_frames() {
                    sink.deliver(frame).map(|_| ())
                } else {
                    sink.deliver_async(frame).await
                };

                if result.is_err() {
                    debug!("Mock frame output closed, producer exiting");
                    break;
                }

                trace!("Mock frame {} ({}x{})", frame_id, width, height);
                frame_id += 1;
            }
        }));
    }
}

impl SessionBackend for MockSession {
    fn set_preset(&mut self, preset: SessionPreset) {
        self.backend.lock().last_preset = Some(preset);
    }

    fn can_add_input(&self, _input: &DeviceInput) -> bool {
        self.backend.lock().accept_inputs
    }

    fn add_input(&mut self, input: &DeviceInput) {
        self.inputs.push(input.clone());
    }

    fn can_add_output(&self, _sink: &FrameSink) -> bool {
        self.backend.lock().accept_outputs
    }

    fn add_output(&mut self, sink: FrameSink) {
        self.outputs.push(sink);
    }

    fn preview_connection(&self) -> Option<PreviewConnection> {
        if self.inputs.is_empty() {
            return None;
        }
        Some(PreviewConnection {
            supports_mirroring: self.backend.lock().mirroring_supported,
        })
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start_running(&mut self) {
        self.backend.lock().start_calls += 1;
        self.running = true;
        self.spawn_producer();
    }

    fn stop_running(&mut self) {
        self.backend.lock().stop_calls += 1;
        self.running = false;
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}
