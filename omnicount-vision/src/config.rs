//! Configuration for the counting pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default taxonomy the zero-shot mapper projects raw labels onto.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "person",
    "car",
    "bus",
    "bicycle",
    "motorcycle",
    "dog",
    "cat",
    "bird",
    "tree",
    "building",
    "road",
    "sky",
];

/// Pipeline configuration.
///
/// `confidence_threshold` can additionally be overridden per call; the value
/// here is the default echoed back in results when no override is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of highest-area masks retained per image.
    pub top_n: usize,
    /// Default confidence threshold for filtering mapped records.
    pub confidence_threshold: f32,
    /// Minimum pre-filter segment count for a "sufficient" quality rating.
    pub min_segments_for_quality: usize,
    /// Side length of the point-prompt grid fed to the segmentation model.
    pub points_per_side: u32,
    /// Minimum predicted-IoU score for a mask to be kept.
    pub pred_iou_thresh: f32,
    /// Minimum mask area in pixels.
    pub min_mask_region_area: usize,
    /// Candidate category names for zero-shot mapping.
    pub candidate_labels: Vec<String>,
    /// Directory where model artifacts are stored.
    pub model_dir: PathBuf,
    /// Prefer the CUDA execution provider when available.
    pub prefer_cuda: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let model_dir = dirs::home_dir()
            .map(|mut p| {
                p.push(".omnicount");
                p.push("models");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models"));

        Self {
            top_n: 10,
            confidence_threshold: 0.7,
            min_segments_for_quality: 5,
            points_per_side: 16,
            pred_iou_thresh: 0.7,
            min_mask_region_area: 500,
            candidate_labels: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            model_dir,
            prefer_cuda: true,
        }
    }
}

impl PipelineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.top_n == 0 || self.top_n > 100 {
            return Err("top_n must be between 1 and 100".to_string());
        }

        if !(self.confidence_threshold > 0.0 && self.confidence_threshold < 1.0) {
            return Err("Confidence threshold must be strictly between 0 and 1".to_string());
        }

        if !(self.pred_iou_thresh > 0.0 && self.pred_iou_thresh <= 1.0) {
            return Err("pred_iou_thresh must be in (0, 1]".to_string());
        }

        if self.points_per_side == 0 || self.points_per_side > 64 {
            return Err("points_per_side must be between 1 and 64".to_string());
        }

        if self.candidate_labels.is_empty() {
            return Err("At least one candidate label is required".to_string());
        }

        if self.candidate_labels.iter().any(|l| l.trim().is_empty()) {
            return Err("Candidate labels must be non-empty".to_string());
        }

        Ok(())
    }
}
