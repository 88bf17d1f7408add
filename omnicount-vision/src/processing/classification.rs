//! Region classification stage

use crate::error::VisionError;
use crate::models::RegionClassifier;
use crate::processing::segmentation::Region;
use std::sync::Arc;
use tracing::debug;

/// Top-1 classification of one region, in region order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRecord {
    pub region_index: usize,
    pub raw_label: String,
    pub raw_confidence: f32,
}

/// Runs the classifier over every region of one invocation.
pub struct ClassificationStage {
    model: Arc<dyn RegionClassifier>,
}

/// Releases the classifier's scratch memory when the pass ends, whether it
/// finished, returned early, or unwound.
struct ScratchGuard<'a>(&'a dyn RegionClassifier);

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        self.0.release_scratch();
    }
}

impl ClassificationStage {
    pub fn new(model: Arc<dyn RegionClassifier>) -> Self {
        Self { model }
    }

    /// Classify all regions in order.
    ///
    /// Scratch memory is acquired for the whole pass and released exactly
    /// once at the end of it, never per region, so peak accelerator use does
    /// not grow with the region count.
    pub fn classify_regions(
        &self,
        regions: &[Region],
    ) -> Result<Vec<ClassificationRecord>, VisionError> {
        let _guard = ScratchGuard(self.model.as_ref());

        let mut records = Vec::with_capacity(regions.len());
        for (region_index, region) in regions.iter().enumerate() {
            let classification = self.model.classify(&region.image)?;
            records.push(ClassificationRecord {
                region_index,
                raw_label: classification.label,
                raw_confidence: classification.confidence,
            });
        }

        debug!("Classified {} regions", records.len());
        Ok(records)
    }
}
