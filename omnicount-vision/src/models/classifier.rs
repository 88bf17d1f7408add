//! General-purpose image classification on a ResNet-style ONNX export

use crate::device::Device;
use crate::error::VisionError;
use crate::models::{Classification, RegionClassifier};
use crate::tensor::{apply_imagenet_normalization, image_to_chw_tensor, softmax};
use image::RgbImage;
use ort::{Session, Value};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// ImageNet classifier wrapper.
///
/// Label names come from a one-label-per-line text file shipped next to the
/// model. The input tensor buffer is reused across calls and dropped when
/// the classification stage releases its scratch memory.
pub struct ResNetModel {
    session: Arc<Session>,
    input_size: (u32, u32),
    labels: Vec<String>,
    scratch: Mutex<Vec<f32>>,
}

impl ResNetModel {
    /// Load the classifier and its label file on the given device.
    pub fn new(model_path: &Path, labels_path: &Path, device: Device) -> Result<Self, VisionError> {
        let labels = load_labels(labels_path)?;

        let session = Session::builder()
            .with_execution_providers([device.execution_provider()])
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load classifier model: {}", e)))?;

        info!(
            "Classifier model loaded from {:?} with {} labels ({})",
            model_path,
            labels.len(),
            device
        );

        Ok(Self {
            session: Arc::new(session),
            input_size: (224, 224), // ResNet standard input size
            labels,
            scratch: Mutex::new(Vec::new()),
        })
    }

    fn preprocess(&self, region: &RgbImage) -> Result<Value, VisionError> {
        let mut chw = image_to_chw_tensor(region, self.input_size.0, self.input_size.1)?;
        apply_imagenet_normalization(&mut chw);

        // Reuse the batched buffer across regions within one pass.
        let mut scratch = self.scratch.lock();
        scratch.clear();
        scratch.extend_from_slice(&chw);

        let input_shape = vec![1i64, 3, self.input_size.1 as i64, self.input_size.0 as i64];
        Value::from_array(
            ort::ndarray::Array::from_shape_vec(input_shape.as_slice(), scratch.clone())
                .map_err(|e| VisionError::Ort(format!("Failed to create input array: {}", e)))?,
        )
        .map_err(|e| VisionError::Ort(format!("Failed to create input value: {}", e)))
    }

    fn postprocess(&self, outputs: &[Value]) -> Result<Classification, VisionError> {
        if outputs.is_empty() {
            return Err(VisionError::Ort("No outputs from classifier".to_string()));
        }

        let logits_array = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract logits: {}", e)))?;

        let shape = logits_array.shape();
        if shape.len() < 2 || shape[1] == 0 {
            return Err(VisionError::Processing(format!(
                "Unexpected classifier output shape: {:?}",
                shape
            )));
        }

        let num_classes = shape[1];
        let logits: Vec<f32> = (0..num_classes)
            .map(|i| logits_array.get([0, i]).copied().unwrap_or(f32::NEG_INFINITY))
            .collect();

        let probabilities = softmax(&logits);
        let (best_idx, best_prob) = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| VisionError::Processing("Empty probability vector".to_string()))?;

        let label = self
            .labels
            .get(best_idx)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", best_idx));

        Ok(Classification {
            label,
            confidence: *best_prob,
        })
    }
}

impl RegionClassifier for ResNetModel {
    fn classify(&self, region: &RgbImage) -> Result<Classification, VisionError> {
        let input = self.preprocess(region)?;
        let outputs = self
            .session
            .run(vec![input])
            .map_err(|e| VisionError::Ort(format!("Classifier inference failed: {}", e)))?;
        self.postprocess(&outputs)
    }

    fn release_scratch(&self) {
        let mut scratch = self.scratch.lock();
        scratch.clear();
        scratch.shrink_to_fit();
        debug!("Classifier scratch buffer released");
    }
}

fn load_labels(path: &Path) -> Result<Vec<String>, VisionError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        VisionError::Model(format!("Failed to read label file {:?}: {}", path, e))
    })?;

    let labels: Vec<String> = contents
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if labels.is_empty() {
        return Err(VisionError::Model(format!(
            "Label file {:?} contains no labels",
            path
        )));
    }

    Ok(labels)
}
