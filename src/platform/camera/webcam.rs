// Native webcam capture via nokhwa

use super::FrameCapture;
use crate::models::capture::{CameraDevice, CaptureError, CaptureResult, PixelFormat, RawFrame};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    Camera,
};
use tracing::info;

pub struct WebcamCapture {
    camera: Camera,
    index: u32,
}

impl WebcamCapture {
    /// Open the camera at the format closest to the requested size and rate
    pub fn open(index: u32, width: u32, height: u32, fps: u32) -> CaptureResult<Self> {
        let requested = RequestedFormat::new::<RgbFormat>(requested_format(width, height, fps));
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| CaptureError::PermissionDenied(format!("Camera {}: {}", index, e)))?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::CaptureFailed(format!("Failed to open camera stream: {}", e)))?;

        info!(
            "Opened camera: {} ({})",
            camera.info().human_name(),
            camera.camera_format()
        );

        Ok(Self { camera, index })
    }
}

fn requested_format(width: u32, height: u32, fps: u32) -> RequestedFormatType {
    RequestedFormatType::Closest(CameraFormat::new(
        Resolution::new(width, height),
        FrameFormat::MJPEG,
        fps,
    ))
}

impl FrameCapture for WebcamCapture {
    fn capture(&mut self) -> CaptureResult<RawFrame> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| CaptureError::CaptureFailed(format!("Failed to get frame: {}", e)))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::CaptureFailed(format!("Failed to decode frame: {}", e)))?;

        Ok(RawFrame {
            timestamp: chrono::Utc::now().timestamp_millis(),
            width: decoded.width(),
            height: decoded.height(),
            data: decoded.into_raw(),
            format: PixelFormat::RGB8,
        })
    }

    fn device(&self) -> CameraDevice {
        let resolution = self.camera.resolution();
        CameraDevice {
            index: self.index,
            name: self.camera.info().human_name(),
            width: resolution.width(),
            height: resolution.height(),
        }
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}
