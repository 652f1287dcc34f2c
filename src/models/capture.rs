// Data structures for camera capture

use serde::{Deserialize, Serialize};

/// Represents a video device that frames are captured from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDevice {
    pub index: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// A captured video frame
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl RawFrame {
    /// Expected byte length for the frame's size and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Pixel format of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    RGB8,
    RGBA8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::RGB8 => 3,
            PixelFormat::RGBA8 => 4,
        }
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            PixelFormat::RGB8 => "rgb",
            PixelFormat::RGBA8 => "rgba",
        }
    }
}

/// Error types for camera capture operations
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Capture stopped")]
    Stopped,
}

pub type CaptureResult<T> = Result<T, CaptureError>;
