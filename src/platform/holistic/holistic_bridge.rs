// MediaPipe Holistic integration bridge
// Provides an abstraction over the holistic tracker (face mesh, pose, both hands).
// The Python backend is compiled in with the `ml-pyo3` feature.

use crate::models::capture::RawFrame;
use crate::models::gesture::{GestureError, GestureResult};
use crate::models::landmarks::{HolisticConfig, HolisticLandmarks, Keypoint3D};
use serde_json::Value;

/// Holistic bridge trait
/// Implement this for each landmark detection backend
pub trait HolisticBridge {
    /// Initialize the tracker
    fn new(config: &HolisticConfig) -> GestureResult<Self>
    where
        Self: Sized;

    /// Run landmark detection on a frame
    fn process_frame(&self, frame: &RawFrame) -> GestureResult<HolisticLandmarks>;

    /// Check if models are loaded
    fn is_initialized(&self) -> bool;

    /// Get model info
    fn get_model_info(&self) -> String;
}

/// Parse a tracker result of the form
/// `{"face": [[x,y,z], ...] | null, "pose": ..., "left_hand": ..., "right_hand": ...}`.
/// Missing or null groups are absent; point counts are checked later by the extractor.
pub fn parse_holistic_json(json: &str) -> GestureResult<HolisticLandmarks> {
    let result: Value = serde_json::from_str(json)
        .map_err(|e| GestureError::DetectionFailed(format!("Failed to parse JSON: {}", e)))?;

    Ok(HolisticLandmarks {
        face: parse_group(&result, "face")?,
        pose: parse_group(&result, "pose")?,
        left_hand: parse_group(&result, "left_hand")?,
        right_hand: parse_group(&result, "right_hand")?,
    })
}

fn parse_group(result: &Value, key: &str) -> GestureResult<Option<Vec<Keypoint3D>>> {
    let points = match result.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(points) => points
            .as_array()
            .ok_or_else(|| GestureError::DetectionFailed(format!("{} is not a list", key)))?,
    };

    points
        .iter()
        .map(|point| {
            let coords = point
                .as_array()
                .filter(|c| c.len() == 3)
                .ok_or_else(|| GestureError::DetectionFailed(format!("{} point is not [x, y, z]", key)))?;
            let mut xyz = [0.0f32; 3];
            for (slot, value) in xyz.iter_mut().zip(coords) {
                *slot = value
                    .as_f64()
                    .ok_or_else(|| GestureError::DetectionFailed(format!("{} coordinate is not a number", key)))?
                    as f32;
            }
            Ok(Keypoint3D::new(xyz[0], xyz[1], xyz[2]))
        })
        .collect::<GestureResult<Vec<_>>>()
        .map(Some)
}

// ==============================================================================
// PyO3 Implementation (Python MediaPipe Holistic)
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub mod pyo3_backend {
    use super::*;
    use pyo3::prelude::*;
    use pyo3::types::{PyBytes, PyDict};
    use tracing::info;

    pub struct PyO3Holistic {
        // Python inference module
        inference_module: Py<PyModule>,
        config: HolisticConfig,
    }

    impl HolisticBridge for PyO3Holistic {
        fn new(config: &HolisticConfig) -> GestureResult<Self> {
            Python::with_gil(|py| {
                let sys = py
                    .import_bound("sys")
                    .map_err(|e| GestureError::ModelLoadFailed(format!("Failed to import sys: {}", e)))?;
                let path_list = sys
                    .getattr("path")
                    .map_err(|e| GestureError::ModelLoadFailed(format!("Failed to get sys.path: {}", e)))?;

                // Python helpers live next to Cargo.toml
                let python_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("python");
                path_list
                    .call_method1("insert", (0, python_dir.display().to_string()))
                    .map_err(|e| GestureError::ModelLoadFailed(format!("Failed to add python dir to path: {}", e)))?;

                let module = py.import_bound("holistic_inference").map_err(|e| {
                    GestureError::ModelLoadFailed(format!(
                        "Failed to import holistic_inference: {}. Make sure Python dependencies are installed (pip install -r python/requirements.txt)",
                        e
                    ))
                })?;

                info!(
                    "PyO3Holistic initialized: complexity={:?}, refine_face={}",
                    config.model_complexity, config.refine_face_landmarks
                );

                Ok(Self {
                    inference_module: module.unbind(),
                    config: config.clone(),
                })
            })
        }

        fn process_frame(&self, frame: &RawFrame) -> GestureResult<HolisticLandmarks> {
            Python::with_gil(|py| {
                let module = self.inference_module.bind(py);
                let process_fn = module
                    .getattr("process_image_bytes")
                    .map_err(|e| GestureError::DetectionFailed(format!("Failed to get process_image_bytes: {}", e)))?;

                let kwargs = PyDict::new_bound(py);
                let set = |key: &str, value: PyObject| {
                    kwargs
                        .set_item(key, value)
                        .map_err(|e| GestureError::DetectionFailed(format!("Failed to set {}: {}", key, e)))
                };
                set("image_bytes", PyBytes::new_bound(py, &frame.data).into_py(py))?;
                set("width", frame.width.into_py(py))?;
                set("height", frame.height.into_py(py))?;
                set("pixel_format", frame.format.to_string().into_py(py))?;
                set("model_complexity", (self.config.model_complexity as u8).into_py(py))?;
                set("smooth_landmarks", self.config.smooth_landmarks.into_py(py))?;
                set("enable_segmentation", self.config.enable_segmentation.into_py(py))?;
                set("refine_face_landmarks", self.config.refine_face_landmarks.into_py(py))?;
                set("min_detection_confidence", self.config.min_detection_confidence.into_py(py))?;
                set("min_tracking_confidence", self.config.min_tracking_confidence.into_py(py))?;

                let result_json = process_fn
                    .call((), Some(&kwargs))
                    .map_err(|e| GestureError::DetectionFailed(format!("Holistic inference failed: {}", e)))?;
                let json_str: String = result_json
                    .extract()
                    .map_err(|e| GestureError::DetectionFailed(format!("Failed to extract JSON: {}", e)))?;

                parse_holistic_json(&json_str)
            })
        }

        fn is_initialized(&self) -> bool {
            true
        }

        fn get_model_info(&self) -> String {
            format!(
                "PyO3 MediaPipe Holistic (Python backend) - complexity: {:?}, smoothing: {}",
                self.config.model_complexity, self.config.smooth_landmarks
            )
        }
    }
}

// ==============================================================================
// Dummy Implementation (for compilation without features)
// ==============================================================================

#[cfg(not(feature = "ml-pyo3"))]
pub struct DummyHolistic {
    config: HolisticConfig,
}

#[cfg(not(feature = "ml-pyo3"))]
impl HolisticBridge for DummyHolistic {
    fn new(config: &HolisticConfig) -> GestureResult<Self> {
        tracing::warn!("Using dummy holistic tracker (no landmarks will be detected)");
        tracing::warn!("Enable the 'ml-pyo3' feature for MediaPipe Holistic inference");
        Ok(Self {
            config: config.clone(),
        })
    }

    fn process_frame(&self, _frame: &RawFrame) -> GestureResult<HolisticLandmarks> {
        Ok(HolisticLandmarks::default())
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn get_model_info(&self) -> String {
        format!(
            "Dummy holistic tracker (no inference, complexity {:?}) - enable 'ml-pyo3'",
            self.config.model_complexity
        )
    }
}

// ==============================================================================
// Default Backend Selection
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub type DefaultHolistic = pyo3_backend::PyO3Holistic;

#[cfg(not(feature = "ml-pyo3"))]
pub type DefaultHolistic = DummyHolistic;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_result() {
        let json = r#"{
            "face": null,
            "pose": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]],
            "right_hand": [[1, 2, 3]]
        }"#;
        let landmarks = parse_holistic_json(json).unwrap();
        assert!(landmarks.face.is_none());
        assert!(landmarks.left_hand.is_none());
        assert_eq!(
            landmarks.pose.unwrap(),
            vec![Keypoint3D::new(0.1, 0.2, 0.3), Keypoint3D::new(0.4, 0.5, 0.6)]
        );
        assert_eq!(landmarks.right_hand.unwrap(), vec![Keypoint3D::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn test_parse_rejects_bad_points() {
        assert!(parse_holistic_json(r#"{"pose": [[0.1, 0.2]]}"#).is_err());
        assert!(parse_holistic_json(r#"{"pose": [["a", 0.2, 0.3]]}"#).is_err());
        assert!(parse_holistic_json(r#"{"pose": 3}"#).is_err());
        assert!(parse_holistic_json("not json").is_err());
    }

    #[test]
    fn test_parse_empty_result() {
        let landmarks = parse_holistic_json("{}").unwrap();
        assert_eq!(landmarks, HolisticLandmarks::default());
    }

    #[cfg(not(feature = "ml-pyo3"))]
    #[test]
    fn test_dummy_detects_nothing() {
        use crate::models::capture::PixelFormat;

        let bridge = DummyHolistic::new(&HolisticConfig::default()).unwrap();
        assert!(!bridge.is_initialized());
        let frame = RawFrame {
            timestamp: 0,
            width: 2,
            height: 2,
            data: vec![0; 12],
            format: PixelFormat::RGB8,
        };
        assert_eq!(bridge.process_frame(&frame).unwrap(), HolisticLandmarks::default());
    }
}
