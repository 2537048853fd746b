use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel layout of a delivered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit BGRA, the default layout of a video data output
    Bgra32,
    /// Bi-planar 4:2:0 YCbCr
    Nv12,
}

impl PixelFormat {
    /// Bytes needed for one frame of the given size
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Bgra32 => pixels * 4,
            PixelFormat::Nv12 => pixels + pixels / 2,
        }
    }
}

/// A single captured frame handed to the frame hook.
///
/// The pixel buffer is shared, so handlers that need to keep the data beyond
/// the callback must clone what they need rather than block delivery.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Sequence number within the session
    pub id: u64,
    /// Presentation timestamp
    pub timestamp: SystemTime,
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl FrameData {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Check the buffer length against the pixel format
    pub fn validate_size(&self) -> bool {
        self.data.len() == self.format.frame_size(self.width, self.height)
    }

    /// Frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
