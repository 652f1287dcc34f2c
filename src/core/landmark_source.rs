// Landmark source
// Captures frames and runs holistic detection on a dedicated thread, delivering
// results in capture order to the pipeline. The queue keeps the newest frames:
// when the pipeline falls behind, the oldest queued frames are overwritten and
// the receiver learns how many it missed.

use crate::models::capture::{CaptureError, CaptureResult};
use crate::models::gesture::GestureResult;
use crate::models::landmarks::HolisticFrame;
use crate::platform::camera::FrameCapture;
use crate::platform::holistic::HolisticBridge;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{error, info, trace, warn};

/// Event delivered from the landmark source to the pipeline
#[derive(Debug, Clone)]
pub enum LandmarkEvent {
    Frame(HolisticFrame),
    SourceFailed(String),
}

/// Counters reported when the source thread exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub frames_sent: u64,
    pub detection_errors: u64,
}

/// Bounded queue between the source thread and the pipeline. Sending never
/// blocks; a full queue drops its oldest frame.
pub fn frame_queue(capacity: usize) -> (broadcast::Sender<LandmarkEvent>, broadcast::Receiver<LandmarkEvent>) {
    broadcast::channel(capacity)
}

/// Start capture and detection on a new OS thread.
///
/// Both factories run on the source thread, so device acquisition never blocks
/// the async runtime. The thread stops when `shutdown` is set, the receiver is
/// dropped, or the capture device fails.
pub fn spawn_landmark_source<C, B>(
    open_capture: C,
    open_bridge: B,
    tx: broadcast::Sender<LandmarkEvent>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<SourceStats>>
where
    C: FnOnce() -> CaptureResult<Box<dyn FrameCapture>> + Send + 'static,
    B: FnOnce() -> GestureResult<Box<dyn HolisticBridge>> + Send + 'static,
{
    std::thread::Builder::new()
        .name("landmark-source".to_string())
        .spawn(move || run_source(open_capture, open_bridge, tx, shutdown))
}

fn run_source<C, B>(
    open_capture: C,
    open_bridge: B,
    tx: broadcast::Sender<LandmarkEvent>,
    shutdown: Arc<AtomicBool>,
) -> SourceStats
where
    C: FnOnce() -> CaptureResult<Box<dyn FrameCapture>>,
    B: FnOnce() -> GestureResult<Box<dyn HolisticBridge>>,
{
    let mut stats = SourceStats::default();

    let mut capture = match open_capture() {
        Ok(capture) => capture,
        Err(e) => {
            report_failure(&tx, format!("Failed to open camera: {}", e));
            return stats;
        }
    };

    let bridge = match open_bridge() {
        Ok(bridge) => bridge,
        Err(e) => {
            report_failure(&tx, format!("Failed to start holistic tracker: {}", e));
            return stats;
        }
    };

    let device = capture.device();
    info!(
        "Landmark source started: {} ({}x{}), tracker: {}",
        device.name,
        device.width,
        device.height,
        bridge.get_model_info()
    );
    if !bridge.is_initialized() {
        warn!("Holistic tracker has no model loaded, frames will carry no landmarks");
    }

    let mut frame_id: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        let raw = match capture.capture() {
            Ok(raw) => raw,
            Err(CaptureError::Stopped) => break,
            Err(e) => {
                report_failure(&tx, e.to_string());
                break;
            }
        };
        stats.frames_captured += 1;

        if tx.receiver_count() == 0 {
            break;
        }

        let started = Instant::now();
        let landmarks = match bridge.process_frame(&raw) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                stats.detection_errors += 1;
                warn!("Skipping frame: {}", e);
                continue;
            }
        };

        frame_id += 1;
        trace!("Frame {}: {:?}", frame_id, landmarks.present_groups());
        let mut frame = HolisticFrame::new(frame_id, landmarks);
        frame.timestamp = raw.timestamp;
        frame.processing_time_ms = started.elapsed().as_millis() as u64;

        // Fails only once the pipeline has dropped its receiver
        if tx.send(LandmarkEvent::Frame(frame)).is_err() {
            break;
        }
        stats.frames_sent += 1;
    }

    info!(
        "Landmark source stopped: {} captured, {} sent, {} detection errors",
        stats.frames_captured, stats.frames_sent, stats.detection_errors
    );
    stats
}

fn report_failure(tx: &broadcast::Sender<LandmarkEvent>, reason: String) {
    error!("Landmark source failed: {}", reason);
    let _ = tx.send(LandmarkEvent::SourceFailed(reason));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capture::{CameraDevice, PixelFormat, RawFrame};
    use crate::models::gesture::GestureError;
    use crate::models::landmarks::{HolisticConfig, HolisticLandmarks, Keypoint3D, POSE_LANDMARKS};
    use std::collections::VecDeque;
    use tokio::sync::broadcast::error::TryRecvError;

    /// Yields a fixed number of frames, then a terminal error
    struct ScriptedCapture {
        remaining: usize,
        then: Option<CaptureError>,
    }

    impl FrameCapture for ScriptedCapture {
        fn capture(&mut self) -> CaptureResult<RawFrame> {
            if self.remaining == 0 {
                return Err(self.then.take().unwrap_or(CaptureError::Stopped));
            }
            self.remaining -= 1;
            Ok(RawFrame {
                timestamp: 1_000 + self.remaining as i64,
                width: 1,
                height: 1,
                data: vec![0; 3],
                format: PixelFormat::RGB8,
            })
        }

        fn device(&self) -> CameraDevice {
            CameraDevice {
                index: 0,
                name: "scripted".to_string(),
                width: 1,
                height: 1,
            }
        }
    }

    /// Fails detection on the listed calls, otherwise reports a pose
    struct FlakyBridge {
        failures: std::sync::Mutex<VecDeque<bool>>,
    }

    impl HolisticBridge for FlakyBridge {
        fn new(_config: &HolisticConfig) -> GestureResult<Self> {
            Ok(Self {
                failures: std::sync::Mutex::new(VecDeque::new()),
            })
        }

        fn process_frame(&self, _frame: &RawFrame) -> GestureResult<HolisticLandmarks> {
            let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);
            if fail {
                return Err(GestureError::DetectionFailed("no result".to_string()));
            }
            Ok(HolisticLandmarks {
                pose: Some(vec![Keypoint3D::new(0.5, 0.5, 0.0); POSE_LANDMARKS]),
                ..Default::default()
            })
        }

        fn is_initialized(&self) -> bool {
            true
        }

        fn get_model_info(&self) -> String {
            "flaky".to_string()
        }
    }

    fn scripted(remaining: usize, then: Option<CaptureError>) -> Box<dyn FrameCapture> {
        Box::new(ScriptedCapture { remaining, then })
    }

    fn flaky(failures: &[bool]) -> Box<dyn HolisticBridge> {
        Box::new(FlakyBridge {
            failures: std::sync::Mutex::new(failures.iter().copied().collect()),
        })
    }

    #[test]
    fn test_frames_delivered_in_order() {
        let (tx, mut rx) = frame_queue(16);
        let handle = spawn_landmark_source(
            || Ok(scripted(5, None)),
            || Ok(flaky(&[])),
            tx,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        let stats = handle.join().unwrap();
        assert_eq!(stats.frames_sent, 5);

        let mut ids = Vec::new();
        while let Ok(LandmarkEvent::Frame(frame)) = rx.try_recv() {
            assert!(frame.landmarks.pose.is_some());
            ids.push(frame.frame_id);
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_detection_errors_skip_frame() {
        let (tx, mut rx) = frame_queue(16);
        let handle = spawn_landmark_source(
            || Ok(scripted(4, None)),
            || Ok(flaky(&[false, true, false, false])),
            tx,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        let stats = handle.join().unwrap();
        assert_eq!(stats.detection_errors, 1);
        assert_eq!(stats.frames_sent, 3);

        let mut count = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, LandmarkEvent::Frame(_)));
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_full_queue_keeps_latest_frames() {
        let (tx, mut rx) = frame_queue(2);
        let handle = spawn_landmark_source(
            || Ok(scripted(6, None)),
            || Ok(flaky(&[])),
            tx,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        let stats = handle.join().unwrap();
        assert_eq!(stats.frames_captured, 6);
        assert_eq!(stats.frames_sent, 6);

        let mut missed = 0;
        let mut ids = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(LandmarkEvent::Frame(frame)) => ids.push(frame.frame_id),
                Ok(other) => panic!("unexpected event: {:?}", other),
                Err(TryRecvError::Lagged(n)) => missed += n,
                Err(_) => break,
            }
        }
        assert_eq!(missed, 4);
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn test_open_failure_reports_once() {
        let (tx, mut rx) = frame_queue(4);
        let handle = spawn_landmark_source(
            || Err(CaptureError::PermissionDenied("camera access denied".to_string())),
            || Ok(flaky(&[])),
            tx,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        assert_eq!(handle.join().unwrap(), SourceStats::default());
        match rx.try_recv() {
            Ok(LandmarkEvent::SourceFailed(reason)) => assert!(reason.contains("camera access denied")),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_capture_error_ends_stream() {
        let (tx, mut rx) = frame_queue(8);
        let handle = spawn_landmark_source(
            || Ok(scripted(2, Some(CaptureError::CaptureFailed("unplugged".to_string())))),
            || Ok(flaky(&[])),
            tx,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        handle.join().unwrap();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], LandmarkEvent::SourceFailed(_)));
    }

    #[test]
    fn test_shutdown_flag_stops_source() {
        let (tx, _rx) = frame_queue(4);
        let handle = spawn_landmark_source(
            || Ok(scripted(usize::MAX, None)),
            || Ok(flaky(&[])),
            tx,
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();

        assert_eq!(handle.join().unwrap().frames_captured, 0);
    }
}
