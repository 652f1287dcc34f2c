// ML Model loader and manager utilities
// Handles model downloading, caching, and initialization

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

/// Model source configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Local file path
    LocalFile(PathBuf),
    /// Hugging Face model hub
    HuggingFace { repo: String, filename: String },
    /// Direct URL
    Url(String),
}

impl ModelSource {
    /// Remote location to fetch from, if the source is remote
    pub fn download_url(&self) -> Option<String> {
        match self {
            ModelSource::LocalFile(_) => None,
            ModelSource::HuggingFace { repo, filename } => Some(format!(
                "https://huggingface.co/{}/resolve/main/{}",
                repo, filename
            )),
            ModelSource::Url(url) => Some(url.clone()),
        }
    }

    /// Stable cache file name for this source. Different sources never share
    /// a cache entry, so changing the configured model invalidates the cache.
    pub fn cache_name(&self) -> String {
        let (key, file_name) = match self {
            ModelSource::LocalFile(path) => (
                path.display().to_string(),
                path.file_name().map(|n| n.to_string_lossy().into_owned()),
            ),
            source => {
                let url = source.download_url().unwrap_or_default();
                let file_name = url
                    .split(['?', '#'])
                    .next()
                    .and_then(|u| u.rsplit('/').next())
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                (url, file_name)
            }
        };

        let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).simple().to_string();
        let file_name = file_name.unwrap_or_else(|| "model.onnx".to_string());
        format!("{}-{}", &digest[..12], file_name)
    }
}

/// ML model metadata
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub source: ModelSource,
    pub size_bytes: Option<u64>,
    pub checksum: Option<String>,
}

/// Model manager for caching and loading ML models
pub struct ModelManager {
    cache_dir: PathBuf,
}

impl ModelManager {
    /// Create a new model manager with cache directory
    pub fn new(cache_dir: PathBuf) -> Result<Self, ModelError> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Check if a model is cached. A local source edited after it was
    /// cached counts as not cached.
    pub fn is_cached(&self, model: &ModelInfo) -> bool {
        let cached = self.get_model_path(&model.name);
        let Ok(cached_meta) = fs::metadata(&cached) else {
            return false;
        };

        match &model.source {
            ModelSource::LocalFile(path) => match (fs::metadata(path), cached_meta.modified()) {
                (Ok(source_meta), Ok(cached_at)) => source_meta
                    .modified()
                    .map(|modified| modified <= cached_at)
                    .unwrap_or(true),
                _ => true,
            },
            _ => true,
        }
    }

    /// Get the local path for a model
    pub fn get_model_path(&self, model_name: &str) -> PathBuf {
        self.cache_dir.join(model_name)
    }

    /// Copy or download a model into the cache if it is not there yet
    pub async fn ensure_model(&self, model: &ModelInfo) -> Result<PathBuf, ModelError> {
        let model_path = self.get_model_path(&model.name);

        if self.is_cached(model) {
            debug!("Model {} already cached at {:?}", model.name, model_path);
            return Ok(model_path);
        }

        match &model.source {
            ModelSource::LocalFile(path) => {
                if !path.exists() {
                    return Err(format!("Model file not found: {}", path.display()).into());
                }
                info!("Caching model {} from {:?}", model.name, path);
                fs::copy(path, &model_path)?;
            }
            source => {
                let url = source
                    .download_url()
                    .ok_or("Model source has no download location")?;
                info!("Downloading model {} from {}", model.name, url);

                let target = model_path.clone();
                tokio::task::spawn_blocking(move || download_to(&url, &target)).await??;
            }
        }

        if let Some(expected) = model.size_bytes {
            let actual = fs::metadata(&model_path)?.len();
            if actual != expected {
                fs::remove_file(&model_path)?;
                return Err(format!(
                    "Model {} has {} bytes, expected {}",
                    model.name, actual, expected
                )
                .into());
            }
        }

        Ok(model_path)
    }

    /// Get cache size in bytes
    pub fn get_cache_size(&self) -> Result<u64, ModelError> {
        let mut total_size = 0u64;

        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                let metadata = entry.metadata()?;
                if metadata.is_file() {
                    total_size += metadata.len();
                }
            }
        }

        Ok(total_size)
    }
}

/// Fetch `url` into `target`, writing through a partial file so an
/// interrupted download never looks cached
fn download_to(url: &str, target: &Path) -> Result<(), ModelError> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let bytes = response.bytes()?;

    let partial = target.with_extension("part");
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, target)?;
    Ok(())
}

// ==============================================================================
// Predefined Model Configurations
// ==============================================================================

/// Sign gesture classifier configurations
pub mod gesture {
    use super::*;
    use crate::core::config::Config;

    /// Classifier artifact described by the application config
    pub fn sign_classifier(config: &Config) -> ModelInfo {
        let source = match &config.model_url {
            Some(url) => ModelSource::Url(url.clone()),
            None => ModelSource::LocalFile(config.model_path.clone()),
        };

        ModelInfo {
            name: source.cache_name(),
            version: "v1".to_string(),
            source,
            size_bytes: None,
            checksum: None,
        }
    }
}
