//! Category mapping stage

use crate::error::VisionError;
use crate::models::LabelMapper;
use crate::processing::classification::ClassificationRecord;
use std::sync::Arc;
use tracing::debug;

/// A region's final category with its combined confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRecord {
    pub region_index: usize,
    pub category: String,
    pub confidence: f32,
}

/// Maps raw classifier labels onto the fixed taxonomy.
pub struct MappingStage {
    model: Arc<dyn LabelMapper>,
    categories: Vec<String>,
}

impl MappingStage {
    pub fn new(model: Arc<dyn LabelMapper>, categories: Vec<String>) -> Self {
        Self { model, categories }
    }

    /// Map every classification record to its best taxonomy category.
    ///
    /// The combined confidence is the plain arithmetic mean of the
    /// classifier's and the mapper's confidence. That halves the effect of
    /// either stage being miscalibrated without otherwise correcting for it;
    /// a known simplification, kept as-is.
    pub fn map_records(
        &self,
        records: &[ClassificationRecord],
    ) -> Result<Vec<MappedRecord>, VisionError> {
        let mut mapped = Vec::with_capacity(records.len());
        for record in records {
            let ranked = self.model.rank(&record.raw_label, &self.categories)?;
            let top = ranked.first().ok_or_else(|| {
                VisionError::Processing(format!(
                    "Mapper returned no candidates for label {:?}",
                    record.raw_label
                ))
            })?;

            mapped.push(MappedRecord {
                region_index: record.region_index,
                category: top.label.clone(),
                confidence: (record.raw_confidence + top.score) / 2.0,
            });
        }

        debug!("Mapped {} records onto the taxonomy", mapped.len());
        Ok(mapped)
    }
}
