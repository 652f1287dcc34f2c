// Gesture classifier seam
// The pipeline only needs "window in, scores out"; the ONNX Runtime backend is
// compiled in with the `ml-onnx` feature.

use crate::core::config::Config;
use crate::core::ml_models::{gesture, ModelManager};
use crate::models::gesture::{GestureError, GestureResult};
use async_trait::async_trait;
use ndarray::Array3;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Sequence classifier over a `[1, frames, features]` window
pub trait GestureClassifier: Send {
    /// Raw per-label scores for one window
    fn predict(&mut self, window: &Array3<f32>) -> GestureResult<Vec<f32>>;

    /// Get model info
    fn get_model_info(&self) -> String;
}

/// Shared holder for the active classifier. Empty until a model is loaded.
#[derive(Clone, Default)]
pub struct ClassifierSlot {
    inner: Arc<Mutex<Option<Box<dyn GestureClassifier>>>>,
}

impl ClassifierSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, classifier: Box<dyn GestureClassifier>) -> GestureResult<()> {
        let mut slot = self
            .inner
            .lock()
            .map_err(|_| GestureError::InferenceFailed("classifier lock poisoned".to_string()))?;
        *slot = Some(classifier);
        Ok(())
    }

    /// Remove the active classifier, suspending inference
    pub fn eject(&self) -> Option<Box<dyn GestureClassifier>> {
        self.inner.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Whether a classifier is installed. Reports false while the slot is busy.
    pub fn is_ready(&self) -> bool {
        match self.inner.try_lock() {
            Ok(slot) => slot.is_some(),
            Err(_) => false,
        }
    }

    /// Run the installed classifier. Blocks while another prediction holds the slot.
    pub fn predict(&self, window: &Array3<f32>) -> GestureResult<Vec<f32>> {
        let mut slot = self
            .inner
            .lock()
            .map_err(|_| GestureError::InferenceFailed("classifier lock poisoned".to_string()))?;
        match slot.as_mut() {
            Some(classifier) => classifier.predict(window),
            None => Err(GestureError::NotInitialized),
        }
    }
}

/// Produces a classifier, typically by fetching and opening a model artifact
#[async_trait]
pub trait ClassifierLoader: Send + Sync {
    async fn load(&self) -> GestureResult<Box<dyn GestureClassifier>>;
}

/// Loads the configured classifier through the model cache
pub struct ModelCacheLoader {
    config: Config,
}

impl ModelCacheLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClassifierLoader for ModelCacheLoader {
    async fn load(&self) -> GestureResult<Box<dyn GestureClassifier>> {
        let manager = ModelManager::new(self.config.model_cache_dir.clone())
            .map_err(|e| GestureError::ModelLoadFailed(format!("Model cache unavailable: {}", e)))?;

        let model = gesture::sign_classifier(&self.config);
        let model_path = manager
            .ensure_model(&model)
            .await
            .map_err(|e| GestureError::ModelLoadFailed(format!("{}: {}", model.name, e)))?;
        if let Ok(bytes) = manager.get_cache_size() {
            debug!("Model cache {:?} holds {} bytes", manager.cache_dir(), bytes);
        }

        open_classifier(model_path).await
    }
}

#[cfg(feature = "ml-onnx")]
async fn open_classifier(model_path: std::path::PathBuf) -> GestureResult<Box<dyn GestureClassifier>> {
    let classifier = tokio::task::spawn_blocking(move || onnx_backend::OnnxClassifier::load(&model_path))
        .await
        .map_err(|e| GestureError::ModelLoadFailed(format!("Loader task failed: {}", e)))??;
    Ok(Box::new(classifier))
}

#[cfg(not(feature = "ml-onnx"))]
async fn open_classifier(model_path: std::path::PathBuf) -> GestureResult<Box<dyn GestureClassifier>> {
    Err(GestureError::ModelLoadFailed(format!(
        "Cannot open {}: enable the 'ml-onnx' feature for classifier inference",
        model_path.display()
    )))
}

// ==============================================================================
// ONNX Runtime Implementation
// ==============================================================================

#[cfg(feature = "ml-onnx")]
pub mod onnx_backend {
    use super::*;
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::Tensor;
    use std::path::Path;
    use tracing::info;

    pub struct OnnxClassifier {
        session: Session,
        model_name: String,
    }

    impl OnnxClassifier {
        pub fn load(model_path: &Path) -> GestureResult<Self> {
            let session = Session::builder()
                .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|builder| builder.with_intra_threads(2))
                .and_then(|builder| builder.commit_from_file(model_path))
                .map_err(|e| GestureError::ModelLoadFailed(format!("{}: {}", model_path.display(), e)))?;

            info!("Model loaded successfully from {}", model_path.display());

            Ok(Self {
                session,
                model_name: model_path.display().to_string(),
            })
        }
    }

    impl GestureClassifier for OnnxClassifier {
        fn predict(&mut self, window: &Array3<f32>) -> GestureResult<Vec<f32>> {
            let shape: Vec<i64> = window.shape().iter().map(|d| *d as i64).collect();
            let data: Vec<f32> = window.iter().copied().collect();

            let input = Tensor::from_array((shape, data))
                .map_err(|e| GestureError::InferenceFailed(format!("Failed to build input tensor: {}", e)))?;
            let outputs = self
                .session
                .run(ort::inputs![input])
                .map_err(|e| GestureError::InferenceFailed(e.to_string()))?;

            let (_shape, scores) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| GestureError::InferenceFailed(format!("Failed to read scores: {}", e)))?;

            Ok(scores.to_vec())
        }

        fn get_model_info(&self) -> String {
            format!("ONNX Runtime classifier ({})", self.model_name)
        }
    }
}
