//! Model artifact management with auto-download

use crate::config::PipelineConfig;
use crate::error::VisionError;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// One downloadable artifact: file name in the model directory, source URL,
/// and an optional SHA-256 checksum (hex, empty = verification skipped).
///
/// Note: these are example URLs; in production, pin verified model
/// repositories and fill in the checksums.
struct Artifact {
    name: &'static str,
    url: &'static str,
    checksum: &'static str,
}

// The segmentation model needs an ONNX export of SAM ViT-B (the upstream
// checkpoint is a PyTorch .pth and must be converted before hosting).
const SEGMENTER_MODEL: Artifact = Artifact {
    name: "sam_vit_b.onnx",
    url: "https://huggingface.co/facebook/sam-vit-base/resolve/main/model.onnx",
    checksum: "",
};

const CLASSIFIER_MODEL: Artifact = Artifact {
    name: "resnet50.onnx",
    url: "https://github.com/onnx/models/raw/main/validated/vision/classification/resnet/model/resnet50-v2-7.onnx",
    checksum: "",
};

const CLASSIFIER_LABELS: Artifact = Artifact {
    name: "imagenet_classes.txt",
    url: "https://raw.githubusercontent.com/pytorch/hub/master/imagenet_classes.txt",
    checksum: "",
};

const MAPPER_MODEL: Artifact = Artifact {
    name: "distilbert_mnli.onnx",
    url: "https://huggingface.co/optimum/distilbert-base-uncased-mnli/resolve/main/model.onnx",
    checksum: "",
};

const MAPPER_TOKENIZER: Artifact = Artifact {
    name: "distilbert_mnli_tokenizer.json",
    url: "https://huggingface.co/typeform/distilbert-base-uncased-mnli/resolve/main/tokenizer.json",
    checksum: "",
};

/// Downloads and tracks the pipeline's model artifacts.
pub struct ModelManager {
    config: Arc<PipelineConfig>,
    models_loaded: Arc<RwLock<HashMap<String, bool>>>,
}

impl ModelManager {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self {
            config,
            models_loaded: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Ensure the model directory exists.
    pub fn ensure_model_dir(&self) -> Result<PathBuf, VisionError> {
        let model_dir = &self.config.model_dir;
        if !model_dir.exists() {
            fs::create_dir_all(model_dir)?;
            info!("Created model directory: {:?}", model_dir);
        }
        Ok(model_dir.clone())
    }

    /// Download an artifact if it is not already present.
    pub async fn ensure_model(
        &self,
        model_name: &str,
        url: &str,
        checksum: &str,
    ) -> Result<PathBuf, VisionError> {
        if model_name.is_empty() || model_name.len() > 255 {
            return Err(VisionError::Model("Invalid model name".to_string()));
        }

        // Prevent path traversal out of the model directory.
        if model_name.contains("..") || model_name.contains('/') || model_name.contains('\\') {
            return Err(VisionError::Model(
                "Model name contains invalid characters".to_string(),
            ));
        }

        if url.is_empty() || url.len() > 2048 {
            return Err(VisionError::Model("Invalid URL".to_string()));
        }

        if !url.starts_with("https://") {
            return Err(VisionError::Model(
                "Only HTTPS URLs are allowed for model downloads".to_string(),
            ));
        }

        self.ensure_model_dir()?;

        let model_path = self.config.model_dir.join(model_name);
        if model_path.exists() {
            info!("Model {} already exists at {:?}", model_name, model_path);
            return Ok(model_path);
        }

        info!("Downloading model {} from {}", model_name, url);

        const MAX_MODEL_SIZE: usize = 2_000_000_000; // 2GB max
        const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::Model(format!(
                "Failed to download model: HTTP {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_MODEL_SIZE as u64 {
                return Err(VisionError::Model(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    content_length, MAX_MODEL_SIZE
                )));
            }
        }

        let bytes = response.bytes().await?;

        if bytes.len() > MAX_MODEL_SIZE {
            return Err(VisionError::Model(format!(
                "Downloaded model too large: {} bytes (max {} bytes)",
                bytes.len(),
                MAX_MODEL_SIZE
            )));
        }

        // A tiny payload is almost certainly an error page, not a model.
        if bytes.len() < 64 {
            return Err(VisionError::Model(
                "Downloaded file too small, likely corrupted".to_string(),
            ));
        }

        if !checksum.is_empty() {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let computed_hash = hex::encode(hasher.finalize());
            if computed_hash != checksum {
                return Err(VisionError::Model(format!(
                    "Checksum mismatch for model {}: expected {}, got {}",
                    model_name, checksum, computed_hash
                )));
            }
            info!("Verified checksum for model {}", model_name);
        } else {
            info!(
                "Downloaded {} bytes for model {} (checksum verification skipped)",
                bytes.len(),
                model_name
            );
        }

        // Write to a temp file first, then rename, so a crashed download never
        // leaves a partial artifact behind.
        let temp_path = model_path.with_extension("tmp");
        fs::write(&temp_path, &bytes)?;
        fs::rename(&temp_path, &model_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            VisionError::Io(e)
        })?;

        info!("Model {} saved to {:?}", model_name, model_path);
        Ok(model_path)
    }

    async fn ensure_artifact(&self, artifact: &Artifact) -> Result<PathBuf, VisionError> {
        self.ensure_model(artifact.name, artifact.url, artifact.checksum)
            .await
    }

    /// Segmentation model path, downloading if needed.
    pub async fn get_segmenter_model(&self) -> Result<PathBuf, VisionError> {
        self.ensure_artifact(&SEGMENTER_MODEL).await
    }

    /// Classifier model path, downloading if needed.
    pub async fn get_classifier_model(&self) -> Result<PathBuf, VisionError> {
        self.ensure_artifact(&CLASSIFIER_MODEL).await
    }

    /// Classifier label file path, downloading if needed.
    pub async fn get_classifier_labels(&self) -> Result<PathBuf, VisionError> {
        self.ensure_artifact(&CLASSIFIER_LABELS).await
    }

    /// Mapping model path, downloading if needed.
    pub async fn get_mapper_model(&self) -> Result<PathBuf, VisionError> {
        self.ensure_artifact(&MAPPER_MODEL).await
    }

    /// Mapper tokenizer path, downloading if needed.
    pub async fn get_mapper_tokenizer(&self) -> Result<PathBuf, VisionError> {
        self.ensure_artifact(&MAPPER_TOKENIZER).await
    }

    /// Mark a model as loaded.
    pub fn mark_loaded(&self, model_name: &str) {
        self.models_loaded.write().insert(model_name.to_string(), true);
    }

    /// Check whether a model has been marked as loaded.
    pub fn is_loaded(&self, model_name: &str) -> bool {
        self.models_loaded
            .read()
            .get(model_name)
            .copied()
            .unwrap_or(false)
    }
}
