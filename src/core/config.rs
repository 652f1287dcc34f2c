use crate::core::decision::CONFIDENCE_THRESHOLD;
use crate::core::sequence_buffer::SEQUENCE_LENGTH;
use crate::models::landmarks::HolisticConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub type ConfigError = Box<dyn std::error::Error + Send + Sync>;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Local classifier artifact (ONNX)
    pub model_path: PathBuf,
    /// Optional download location for the classifier, used instead of `model_path`
    pub model_url: Option<String>,
    /// Where downloaded or copied models are cached
    pub model_cache_dir: PathBuf,
    /// Frames per classification window
    pub sequence_length: usize,
    /// Minimum top score for a prediction (0.0-1.0, strict)
    pub confidence_threshold: f32,
    /// Webcam device index
    pub camera_index: u32,
    /// Requested capture width in pixels
    pub frame_width: u32,
    /// Requested capture height in pixels
    pub frame_height: u32,
    /// Capture rate for the synthetic source
    pub target_fps: u32,
    /// Landmark frames that may wait for the pipeline before the oldest is overwritten
    pub frame_queue_capacity: usize,
    /// Options passed through to the holistic tracker
    pub holistic: HolisticConfig,
    /// Write the latest landmark overlay here as a PNG on each new prediction
    pub overlay_snapshot_path: Option<PathBuf>,
    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::data_dir();

        Self {
            model_path: PathBuf::from("models").join("sign_gesture.onnx"),
            model_url: None,
            model_cache_dir: data_dir.join("models"),
            sequence_length: SEQUENCE_LENGTH,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            target_fps: 30,
            frame_queue_capacity: 2,
            holistic: HolisticConfig::default(),
            overlay_snapshot_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating with defaults if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load configuration from an explicit path, creating it with defaults if missing
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        // Create parent directories if they don't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "Invalid confidence threshold: {}. Must be between 0.0 and 1.0",
                self.confidence_threshold
            )
            .into());
        }

        if self.sequence_length == 0 || self.sequence_length > 300 {
            return Err(format!(
                "Invalid sequence length: {}. Must be between 1 and 300",
                self.sequence_length
            )
            .into());
        }

        if self.target_fps == 0 || self.target_fps > 60 {
            return Err(format!(
                "Invalid target FPS: {}. Must be between 1 and 60",
                self.target_fps
            )
            .into());
        }

        if self.frame_queue_capacity == 0 {
            return Err("Frame queue capacity must be at least 1".into());
        }

        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(format!(
                "Invalid frame size: {}x{}",
                self.frame_width, self.frame_height
            )
            .into());
        }

        if let Some(url) = &self.model_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Invalid model URL: {}. Must be http(s)", url).into());
            }
        }

        self.holistic.validate()?;

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> Result<Self, ConfigError> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".sign_gesture");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }

    fn data_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());

        PathBuf::from(home).join(".sign_gesture")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn get_test_config_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("sign_gesture_test_config_{}", name));
        path.push("settings.json");
        path
    }

    fn cleanup_test_config(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sequence_length, 20);
        assert_eq!(config.confidence_threshold, 0.75);
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.frame_width, 640);
        assert_eq!(config.frame_height, 480);
        assert_eq!(config.frame_queue_capacity, 2);
        assert_eq!(config.model_url, None);
        assert_eq!(config.overlay_snapshot_path, None);
        assert_eq!(config.log_filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
        config.confidence_threshold = 0.75;

        config.sequence_length = 0;
        assert!(config.validate().is_err());
        config.sequence_length = 20;

        config.target_fps = 0;
        assert!(config.validate().is_err());
        config.target_fps = 100;
        assert!(config.validate().is_err());
        config.target_fps = 30;

        config.frame_queue_capacity = 0;
        assert!(config.validate().is_err());
        config.frame_queue_capacity = 2;

        config.model_url = Some("ftp://models/sign.onnx".to_string());
        assert!(config.validate().is_err());
        config.model_url = None;

        config.holistic.min_tracking_confidence = -0.1;
        assert!(config.validate().is_err());
        config.holistic.min_tracking_confidence = 0.5;

        config.holistic.refine_face_landmarks = true;
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("refine_face_landmarks"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"camera_index": 2}"#).unwrap();
        assert_eq!(config.camera_index, 2);
        assert_eq!(config.sequence_length, 20);
    }

    #[test]
    fn test_load_creates_default_then_reads_back() {
        let path = get_test_config_path("load");
        cleanup_test_config(&path);

        let created = Config::load_from(&path).unwrap();
        assert_eq!(created, Config::default());
        assert!(path.exists());

        let mut changed = created.clone();
        changed.confidence_threshold = 0.9;
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().confidence_threshold, 0.9);

        cleanup_test_config(&path);
    }

    #[test]
    fn test_invalid_config_is_not_saved() {
        let path = get_test_config_path("invalid");
        cleanup_test_config(&path);

        let mut config = Config::default();
        config.sequence_length = 0;
        assert!(config.save_to(&path).is_err());
        assert!(!path.exists());

        cleanup_test_config(&path);
    }
}
