//! Model management for ONNX Runtime
//!
//! Handles downloading, caching, and loading of the PaddleOCR recognition
//! model and its character dictionary.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use ort::session::{builder::GraphOptimizationLevel, Session};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Model identifier for the OCR components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// Text recognition model (CRNN)
    Recognition,
    /// Character dictionary for CTC decoding
    Dictionary,
}

impl ModelType {
    /// Get the filename for this model type
    pub fn filename(&self) -> &'static str {
        match self {
            ModelType::Recognition => "rec.onnx",
            ModelType::Dictionary => "dict.txt",
        }
    }

    /// Get the download URL for this model
    /// Using PaddleOCR models from Hugging Face (monkt/paddleocr-onnx)
    pub fn download_url(&self) -> &'static str {
        match self {
            ModelType::Recognition => {
                "https://huggingface.co/monkt/paddleocr-onnx/resolve/main/languages/english/rec.onnx"
            }
            ModelType::Dictionary => {
                "https://huggingface.co/monkt/paddleocr-onnx/resolve/main/languages/english/dict.txt"
            }
        }
    }

    /// Expected file size for integrity check (approximate, in bytes)
    pub fn expected_size_range(&self) -> (u64, u64) {
        match self {
            ModelType::Recognition => (7_000_000, 10_000_000), // ~7.83 MB
            ModelType::Dictionary => (500, 10_000),            // ~1.42 KB
        }
    }

    /// Display name for progress reporting
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::Recognition => "Text Recognition",
            ModelType::Dictionary => "Character Dictionary",
        }
    }
}

/// Model manifest tracking downloaded models
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub version: String,
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: Option<String>,
    pub downloaded_at: String,
}

impl Default for ModelManifest {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            models: Vec::new(),
        }
    }
}

/// Model manager for downloading and caching ONNX models
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a new model manager rooted in the app data directory
    pub fn new() -> Result<Self> {
        let data_dir = crate::config::get_data_dir()?;
        let models_dir = data_dir.join("models");
        std::fs::create_dir_all(&models_dir)?;

        Ok(Self { models_dir })
    }

    /// Create model manager with custom directory
    pub fn with_dir(models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    /// Get the path to a specific model file
    pub fn model_path(&self, model_type: ModelType) -> PathBuf {
        self.models_dir.join(model_type.filename())
    }

    /// Check if a model is already downloaded
    pub fn is_model_available(&self, model_type: ModelType) -> bool {
        let path = self.model_path(model_type);
        if !path.exists() {
            return false;
        }

        // Verify file size is reasonable
        if let Ok(metadata) = std::fs::metadata(&path) {
            let (min, max) = model_type.expected_size_range();
            let size = metadata.len();
            size >= min && size <= max
        } else {
            false
        }
    }

    /// Check if all required models are available
    pub fn are_models_ready(&self) -> bool {
        self.is_model_available(ModelType::Recognition)
            && self.is_model_available(ModelType::Dictionary)
    }

    /// Download a model if not already available.
    /// Returns the path to the model file.
    pub fn ensure_model(&self, model_type: ModelType) -> Result<PathBuf> {
        let path = self.model_path(model_type);

        if self.is_model_available(model_type) {
            debug!("Model {:?} already available at {:?}", model_type, path);
            return Ok(path);
        }

        info!("Downloading model {:?}...", model_type);
        self.download_model(model_type)?;

        Ok(path)
    }

    /// Download a specific model (blocking)
    fn download_model(&self, model_type: ModelType) -> Result<()> {
        let url = model_type.download_url();
        let path = self.model_path(model_type);

        info!("Downloading {} model from {}", model_type.display_name(), url);

        if std::env::var("ELIDEX_OFFLINE").is_ok() {
            anyhow::bail!(
                "Offline mode: cannot download models. Please download manually from {} and place at {:?}",
                url,
                path
            );
        }

        // Create a tokio runtime for async download
        let rt = Runtime::new().context("Failed to create tokio runtime")?;

        rt.block_on(async { self.download_file_async(url, &path).await })?;

        // Verify the download
        if !self.is_model_available(model_type) {
            anyhow::bail!("Download completed but model verification failed");
        }

        self.update_manifest_for_model(model_type)?;

        info!("Successfully downloaded {} model", model_type.display_name());
        Ok(())
    }

    /// Async download implementation
    async fn download_file_async(&self, url: &str, path: &Path) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .await
            .context("Failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}: {}", response.status(), url);
        }

        let total_size = response.content_length();
        debug!("Download size: {:?} bytes", total_size);

        // Download into a temp file, rename on success
        let temp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).context("Failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;
            file.write_all(&chunk).context("Failed to write to temp file")?;
            hasher.update(&chunk);
        }

        file.flush().context("Failed to flush temp file")?;
        drop(file);

        let hash = format!("{:x}", hasher.finalize());
        debug!("Downloaded {} (sha256 {})", url, hash);

        std::fs::rename(&temp_path, path)
            .context("Failed to move downloaded file to final location")?;

        Ok(())
    }

    /// Update manifest after successful download
    fn update_manifest_for_model(&self, model_type: ModelType) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();

        let path = self.model_path(model_type);
        let metadata = std::fs::metadata(&path)?;

        let hash = {
            let data = std::fs::read(&path)?;
            let mut hasher = Sha256::new();
            hasher.update(&data);
            format!("{:x}", hasher.finalize())
        };

        let model_info = ModelInfo {
            model_type: format!("{:?}", model_type),
            filename: model_type.filename().to_string(),
            size_bytes: metadata.len(),
            sha256: Some(hash),
            downloaded_at: unix_timestamp_now(),
        };

        if let Some(existing) = manifest
            .models
            .iter_mut()
            .find(|m| m.filename == model_info.filename)
        {
            *existing = model_info;
        } else {
            manifest.models.push(model_info);
        }

        self.save_manifest(&manifest)?;
        Ok(())
    }

    /// Load the model manifest
    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let manifest_path = self.models_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            let manifest: ModelManifest = serde_json::from_str(&content)?;
            Ok(manifest)
        } else {
            Ok(ModelManifest::default())
        }
    }

    /// Save the model manifest
    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let manifest_path = self.models_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }
}

/// ONNX Runtime session wrapper
pub struct OnnxSession {
    session: Session,
    output_names: Vec<String>,
}

impl OnnxSession {
    /// Create a new ONNX session from a model file
    pub fn new(model_path: &Path) -> Result<Self> {
        info!("Loading ONNX model from {:?}", model_path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(model_path)
            .context("Failed to load ONNX model")?;

        let input_names: Vec<String> = session.inputs().iter().map(|i| i.name().to_string()).collect();
        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        info!(
            "Model loaded. Inputs: {:?}, Outputs: {:?}",
            input_names, output_names
        );

        Ok(Self {
            session,
            output_names,
        })
    }

    /// Get the underlying session mutably for running inference
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Get output names
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

/// Get current timestamp as a Unix-seconds string for the manifest
fn unix_timestamp_now() -> String {
    use std::time::SystemTime;

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    format!("{}", now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_filenames() {
        assert_eq!(ModelType::Recognition.filename(), "rec.onnx");
        assert_eq!(ModelType::Dictionary.filename(), "dict.txt");
    }

    #[test]
    fn test_model_availability_checks_size() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();

        assert!(!manager.is_model_available(ModelType::Dictionary));

        // Too small to be a plausible dictionary
        std::fs::write(manager.model_path(ModelType::Dictionary), "ab").unwrap();
        assert!(!manager.is_model_available(ModelType::Dictionary));

        let plausible: String = "x\n".repeat(500);
        std::fs::write(manager.model_path(ModelType::Dictionary), plausible).unwrap();
        assert!(manager.is_model_available(ModelType::Dictionary));
        // Recognition model still missing
        assert!(!manager.are_models_ready());
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();

        let mut manifest = ModelManifest::default();
        manifest.models.push(ModelInfo {
            model_type: "Recognition".to_string(),
            filename: "rec.onnx".to_string(),
            size_bytes: 123,
            sha256: None,
            downloaded_at: "0".to_string(),
        });

        manager.save_manifest(&manifest).unwrap();
        let loaded = manager.load_manifest().unwrap();
        assert_eq!(loaded.models.len(), 1);
        assert_eq!(loaded.models[0].filename, "rec.onnx");
    }
}
