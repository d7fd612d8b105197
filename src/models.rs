//! Model management for the neural OCR engine
//!
//! Handles downloading, caching, and verifying the rten model files. The first
//! recognition triggers the download unless `textgrab-prepare` has already
//! warmed the cache.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Environment variable that disables all downloads.
pub const OFFLINE_ENV: &str = "TEXTGRAB_OFFLINE";

/// Model files the neural engine needs before it can run.
pub const REQUIRED_MODELS: [ModelKind; 2] = [ModelKind::Detection, ModelKind::Recognition];

/// Identifier for the neural engine's model files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Text detection model
    Detection,
    /// Text recognition model
    Recognition,
}

impl ModelKind {
    /// Get the filename for this model
    pub fn filename(&self) -> &'static str {
        match self {
            ModelKind::Detection => "text-detection.rten",
            ModelKind::Recognition => "text-recognition.rten",
        }
    }

    /// Get the download URL for this model (ocrs release bucket)
    pub fn download_url(&self) -> &'static str {
        match self {
            ModelKind::Detection => {
                "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten"
            }
            ModelKind::Recognition => {
                "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten"
            }
        }
    }

    /// Expected file size for integrity check (approximate, in bytes)
    pub fn expected_size_range(&self) -> (u64, u64) {
        match self {
            ModelKind::Detection => (500_000, 8_000_000),
            ModelKind::Recognition => (2_000_000, 30_000_000),
        }
    }

    /// Expected SHA256 checksum for verification, when pinned.
    pub fn expected_sha256(&self) -> Option<&'static str> {
        // The bucket serves unversioned files; no stable checksum to pin.
        match self {
            ModelKind::Detection => None,
            ModelKind::Recognition => None,
        }
    }

    /// Display name for progress reporting
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Detection => "text detection",
            ModelKind::Recognition => "text recognition",
        }
    }
}

/// Manifest tracking downloaded model files.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub version: String,
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
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

/// Progress callback for download operations: (bytes downloaded, total if known).
pub type DownloadProgress = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Downloads and caches the neural model files.
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a manager over the default platform data directory.
    pub fn new() -> Result<Self> {
        let data_dir = crate::config::get_data_dir()?;
        Self::with_dir(data_dir.join("models"))
    }

    /// Create a manager with a custom directory.
    pub fn with_dir(models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    /// Get the models directory path
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Get the path to a specific model file
    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        self.models_dir.join(kind.filename())
    }

    /// Check whether a model file is present and plausibly sized.
    pub fn is_model_available(&self, kind: ModelKind) -> bool {
        let path = self.model_path(kind);
        if !path.exists() {
            return false;
        }

        if let Ok(metadata) = std::fs::metadata(&path) {
            let (min, max) = kind.expected_size_range();
            let size = metadata.len();
            size >= min && size <= max
        } else {
            false
        }
    }

    /// Check if every required model is available
    pub fn are_models_ready(&self) -> bool {
        REQUIRED_MODELS.iter().all(|&kind| self.is_model_available(kind))
    }

    /// Download a model if not already cached; returns the path to the file.
    pub fn ensure_model(&self, kind: ModelKind) -> Result<PathBuf> {
        let path = self.model_path(kind);

        if self.is_model_available(kind) {
            debug!("{} model already cached at {:?}", kind.display_name(), path);
            return Ok(path);
        }

        info!("downloading {} model...", kind.display_name());
        self.download_model_with_progress(kind, None)?;

        Ok(path)
    }

    /// Download a specific model with an optional progress callback.
    pub fn download_model_with_progress(
        &self,
        kind: ModelKind,
        progress: Option<DownloadProgress>,
    ) -> Result<()> {
        let url = kind.download_url();
        let path = self.model_path(kind);

        if std::env::var(OFFLINE_ENV).is_ok() {
            anyhow::bail!(
                "Offline mode: cannot download models. Fetch {} manually and place it at {:?}",
                url,
                path
            );
        }

        info!("downloading {} model from {}", kind.display_name(), url);

        let rt = Runtime::new().context("Failed to create tokio runtime")?;
        rt.block_on(async { self.download_file_async(url, &path, kind, progress).await })?;

        if !self.is_model_available(kind) {
            anyhow::bail!("Download completed but model verification failed");
        }

        self.update_manifest_for_model(kind)?;

        info!("downloaded {} model", kind.display_name());
        Ok(())
    }

    async fn download_file_async(
        &self,
        url: &str,
        path: &Path,
        kind: ModelKind,
        progress: Option<DownloadProgress>,
    ) -> Result<()> {
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
        debug!("download size: {:?} bytes", total_size);

        // Stream into a temp file and rename once verified, so an interrupted
        // download never masquerades as a cached model.
        let temp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).context("Failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;

            file.write_all(&chunk).context("Failed to write to temp file")?;

            hasher.update(&chunk);
            downloaded += chunk.len() as u64;

            if let Some(ref callback) = progress {
                callback(downloaded, total_size);
            }
        }

        file.flush().context("Failed to flush temp file")?;
        drop(file);

        let hash = format!("{:x}", hasher.finalize());
        if let Some(expected_hash) = kind.expected_sha256() {
            if hash != expected_hash {
                std::fs::remove_file(&temp_path).ok();
                anyhow::bail!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    kind.filename(),
                    expected_hash,
                    hash
                );
            }
            debug!("checksum verified for {}", kind.display_name());
        }

        std::fs::rename(&temp_path, path)
            .context("Failed to move downloaded file to final location")?;

        Ok(())
    }

    /// Update the manifest after a successful download.
    fn update_manifest_for_model(&self, kind: ModelKind) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();

        let path = self.model_path(kind);
        let metadata = std::fs::metadata(&path)?;

        let hash = {
            let data = std::fs::read(&path)?;
            let mut hasher = Sha256::new();
            hasher.update(&data);
            format!("{:x}", hasher.finalize())
        };

        let model_info = ModelInfo {
            filename: kind.filename().to_string(),
            size_bytes: metadata.len(),
            sha256: Some(hash),
            downloaded_at: unix_timestamp(),
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

/// Current time as a Unix-seconds string for the manifest.
fn unix_timestamp() -> String {
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
    fn test_model_kind_filenames() {
        assert_eq!(ModelKind::Detection.filename(), "text-detection.rten");
        assert_eq!(ModelKind::Recognition.filename(), "text-recognition.rten");
    }

    #[test]
    fn test_model_manager_with_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().join("models")).unwrap();
        assert!(manager.models_dir().exists());
    }

    #[test]
    fn test_models_not_ready_in_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();

        assert!(!manager.is_model_available(ModelKind::Detection));
        assert!(!manager.are_models_ready());
    }

    #[test]
    fn test_undersized_model_file_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();

        std::fs::write(manager.model_path(ModelKind::Detection), b"stub").unwrap();
        assert!(!manager.is_model_available(ModelKind::Detection));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();

        let mut manifest = ModelManifest::default();
        manifest.models.push(ModelInfo {
            filename: "text-detection.rten".to_string(),
            size_bytes: 1_234_567,
            sha256: None,
            downloaded_at: "0".to_string(),
        });

        manager.save_manifest(&manifest).unwrap();
        let loaded = manager.load_manifest().unwrap();

        assert_eq!(loaded.models.len(), 1);
        assert_eq!(loaded.models[0].filename, "text-detection.rten");
        assert_eq!(loaded.models[0].size_bytes, 1_234_567);
    }

    #[test]
    fn test_missing_manifest_defaults_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf()).unwrap();

        let manifest = manager.load_manifest().unwrap();
        assert!(manifest.models.is_empty());
    }
}
