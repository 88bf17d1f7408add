//! Model wrappers and the backend traits the pipeline is built against.
//!
//! The pipeline only ever talks to the three traits below, so any backend
//! with the same input/output contract can replace the bundled ONNX models.

pub mod classifier;
pub mod manager;
pub mod mapper;
pub mod sam;

pub use classifier::ResNetModel;
pub use manager::ModelManager;
pub use mapper::MnliMapper;
pub use sam::SamModel;

use crate::error::VisionError;
use image::RgbImage;

/// One instance mask at full image resolution.
#[derive(Debug, Clone)]
pub struct InstanceMask {
    pub width: u32,
    pub height: u32,
    /// Per-pixel membership, flattened row-major.
    pub data: Vec<bool>,
    /// Count of member pixels, precomputed at construction.
    pub area: usize,
}

impl InstanceMask {
    /// Build a mask from a membership buffer, computing its area.
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Result<Self, VisionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| VisionError::Processing("Mask dimensions overflow".to_string()))?;
        if data.len() != expected {
            return Err(VisionError::Processing(format!(
                "Mask buffer length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        let area = data.iter().filter(|&&v| v).count();
        Ok(Self {
            width,
            height,
            data,
            area,
        })
    }

    /// Membership at pixel (x, y); out-of-bounds reads are false.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[(y * self.width + x) as usize]
    }
}

/// Top-1 output of the region classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// One scored taxonomy candidate from the zero-shot mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub label: String,
    pub score: f32,
}

/// Promptless instance segmentation backend.
#[cfg_attr(test, mockall::automock)]
pub trait MaskGenerator: Send + Sync {
    /// Generate unordered instance masks for the image.
    fn generate_masks(&self, image: &RgbImage) -> Result<Vec<InstanceMask>, VisionError>;
}

/// General-purpose image classification backend.
#[cfg_attr(test, mockall::automock)]
pub trait RegionClassifier: Send + Sync {
    /// Classify one region crop, returning the top-1 label and probability.
    fn classify(&self, region: &RgbImage) -> Result<Classification, VisionError>;

    /// Release scratch memory held for the current classification pass.
    ///
    /// Called once per pass by the classification stage, on every exit path.
    fn release_scratch(&self) {}
}

/// Zero-shot text-label mapping backend.
#[cfg_attr(test, mockall::automock)]
pub trait LabelMapper: Send + Sync {
    /// Rank the candidate categories for a raw classifier label, best first.
    fn rank(
        &self,
        raw_label: &str,
        candidates: &[String],
    ) -> Result<Vec<CandidateScore>, VisionError>;
}
