use crate::camera::{AuthorizationState, SessionPreset, VideoGravity};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimplecamConfig {
    pub camera: CameraConfig,
    pub delivery: DeliveryConfig,
    pub view: ViewConfig,
    pub mock: MockConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Session quality preset
    #[serde(default = "default_preset")]
    pub preset: SessionPreset,

    /// Preview scaling mode
    #[serde(default = "default_gravity")]
    pub gravity: VideoGravity,

    /// Disable automatic mirroring and force a mirrored preview when supported
    #[serde(default = "default_force_mirroring")]
    pub force_mirroring: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeliveryConfig {
    /// Label of the background frame delivery queue
    #[serde(default = "default_queue_label")]
    pub queue_label: String,

    /// Frames buffered between the backend and the frame handler
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,

    /// Drop frames that arrive while the queue is full
    #[serde(default = "default_discard_late_frames")]
    pub discard_late_frames: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ViewConfig {
    /// Host view width in points
    #[serde(default = "default_view_width")]
    pub width: u32,

    /// Host view height in points
    #[serde(default = "default_view_height")]
    pub height: u32,
}

/// Settings for the simulated capture backend used by the headless binary.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MockConfig {
    /// Authorization status reported before any prompt
    #[serde(default = "default_mock_authorization")]
    pub authorization: AuthorizationState,

    /// Answer given when the access prompt is shown
    #[serde(default = "default_mock_grant")]
    pub grant_access: bool,

    /// Synthetic frame rate
    #[serde(default = "default_mock_fps")]
    pub fps: u32,

    /// Synthetic frame resolution (width, height)
    #[serde(default = "default_mock_resolution")]
    pub resolution: (u32, u32),

    /// Whether preview connections report mirroring support
    #[serde(default = "default_mock_mirroring_supported")]
    pub mirroring_supported: bool,

    /// Devices reported by enumeration, in order
    #[serde(default = "default_mock_devices")]
    pub devices: Vec<MockDeviceConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MockDeviceConfig {
    pub name: String,

    /// Device exposes the video capability
    #[serde(default = "default_true")]
    pub video: bool,

    /// Opening an input on this device fails
    #[serde(default)]
    pub fail_input: bool,
}

impl SimplecamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("simplecam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.preset", "photo")?
            .set_default("camera.gravity", "resize_aspect_fill")?
            .set_default("camera.force_mirroring", default_force_mirroring())?
            .set_default("delivery.queue_label", default_queue_label())?
            .set_default("delivery.capacity", default_queue_capacity() as i64)?
            .set_default("delivery.discard_late_frames", default_discard_late_frames())?
            .set_default("view.width", default_view_width())?
            .set_default("view.height", default_view_height())?
            .set_default("mock.authorization", "not_determined")?
            .set_default("mock.grant_access", default_mock_grant())?
            .set_default("mock.fps", default_mock_fps())?
            .set_default(
                "mock.resolution",
                vec![default_mock_resolution().0, default_mock_resolution().1],
            )?
            .set_default("mock.mirroring_supported", default_mock_mirroring_supported())?
            .add_source(File::with_name(&path_str).required(false))
            // SIMPLECAM_VIEW__WIDTH=1280, SIMPLECAM_CAMERA__FORCE_MIRRORING=false
            .add_source(
                Environment::with_prefix("SIMPLECAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SimplecamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view.width == 0 || self.view.height == 0 {
            return Err(ConfigError::Message(
                "View bounds must be greater than 0".to_string(),
            ));
        }

        if self.delivery.capacity == 0 {
            return Err(ConfigError::Message(
                "Delivery queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.delivery.queue_label.trim().is_empty() {
            return Err(ConfigError::Message(
                "Delivery queue label must not be empty".to_string(),
            ));
        }

        if self.mock.fps == 0 {
            return Err(ConfigError::Message(
                "Mock fps must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render this configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for SimplecamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            delivery: DeliveryConfig::default(),
            view: ViewConfig {
                width: default_view_width(),
                height: default_view_height(),
            },
            mock: MockConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            gravity: default_gravity(),
            force_mirroring: default_force_mirroring(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            queue_label: default_queue_label(),
            capacity: default_queue_capacity(),
            discard_late_frames: default_discard_late_frames(),
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            authorization: default_mock_authorization(),
            grant_access: default_mock_grant(),
            fps: default_mock_fps(),
            resolution: default_mock_resolution(),
            mirroring_supported: default_mock_mirroring_supported(),
            devices: default_mock_devices(),
        }
    }
}

// Default value functions
fn default_preset() -> SessionPreset {
    SessionPreset::Photo
}
fn default_gravity() -> VideoGravity {
    VideoGravity::ResizeAspectFill
}
fn default_force_mirroring() -> bool {
    true
}

fn default_queue_label() -> String {
    "sampleBufferDelegate".to_string()
}
fn default_queue_capacity() -> usize {
    1
}
fn default_discard_late_frames() -> bool {
    true
}

fn default_view_width() -> u32 {
    480
}
fn default_view_height() -> u32 {
    270
}

fn default_mock_authorization() -> AuthorizationState {
    AuthorizationState::NotDetermined
}
fn default_mock_grant() -> bool {
    true
}
fn default_mock_fps() -> u32 {
    30
}
fn default_mock_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_mock_mirroring_supported() -> bool {
    true
}
fn default_mock_devices() -> Vec<MockDeviceConfig> {
    vec![MockDeviceConfig {
        name: "FaceTime HD Camera".to_string(),
        video: true,
        fail_input: false,
    }]
}
fn default_true() -> bool {
    true
}
