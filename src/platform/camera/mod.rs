// Camera capture abstraction
// Frames are pulled synchronously on the landmark source thread.

#[cfg(feature = "camera")]
mod webcam;

#[cfg(feature = "camera")]
pub use webcam::WebcamCapture;

use crate::core::config::Config;
use crate::models::capture::{CameraDevice, CaptureResult, PixelFormat, RawFrame};
use image::{Rgb, RgbImage};
use std::time::{Duration, Instant};

/// Blocking source of video frames
pub trait FrameCapture {
    /// Wait for and return the next frame
    fn capture(&mut self) -> CaptureResult<RawFrame>;

    /// Device the frames come from
    fn device(&self) -> CameraDevice;
}

/// Moving gradient test pattern, paced to a fixed frame rate
pub struct SyntheticCapture {
    width: u32,
    height: u32,
    interval: Duration,
    frame_count: u64,
    next_deadline: Option<Instant>,
}

impl SyntheticCapture {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            interval: Duration::from_secs(1) / fps.max(1),
            frame_count: 0,
            next_deadline: None,
        }
    }

    fn render(&self) -> RgbImage {
        let shift = (self.frame_count % 256) as u32;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([
                ((x + shift) % 256) as u8,
                ((y + shift) % 256) as u8,
                (shift % 256) as u8,
            ])
        })
    }
}

impl FrameCapture for SyntheticCapture {
    fn capture(&mut self) -> CaptureResult<RawFrame> {
        let now = Instant::now();
        if let Some(deadline) = self.next_deadline {
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
        self.next_deadline = Some(Instant::now() + self.interval);

        let image = self.render();
        self.frame_count += 1;

        Ok(RawFrame {
            timestamp: chrono::Utc::now().timestamp_millis(),
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
            format: PixelFormat::RGB8,
        })
    }

    fn device(&self) -> CameraDevice {
        CameraDevice {
            index: 0,
            name: "Synthetic test pattern".to_string(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Open the configured webcam. Blocks while the device is acquired.
#[cfg(feature = "camera")]
pub fn open_capture(config: &Config) -> CaptureResult<Box<dyn FrameCapture>> {
    Ok(Box::new(WebcamCapture::open(
        config.camera_index,
        config.frame_width,
        config.frame_height,
        config.target_fps,
    )?))
}

/// Without the `camera` feature frames come from the synthetic pattern
#[cfg(not(feature = "camera"))]
pub fn open_capture(config: &Config) -> CaptureResult<Box<dyn FrameCapture>> {
    tracing::warn!("Built without the 'camera' feature, using a synthetic test pattern");
    Ok(Box::new(SyntheticCapture::new(
        config.frame_width,
        config.frame_height,
        config.target_fps,
    )))
}
