//! Scripted model backends for driving the pipeline without ONNX artifacts.
#![allow(dead_code)]

use image::RgbImage;
use omnicount_vision::error::VisionError;
use omnicount_vision::models::{
    CandidateScore, Classification, InstanceMask, LabelMapper, MaskGenerator, RegionClassifier,
};
use omnicount_vision::{CountingPipeline, PipelineConfig};
use parking_lot::Mutex;
use std::sync::Arc;

/// Produces `count` disjoint one-row masks, one per image row.
pub struct StubMaskGenerator {
    pub count: usize,
}

impl MaskGenerator for StubMaskGenerator {
    fn generate_masks(&self, image: &RgbImage) -> Result<Vec<InstanceMask>, VisionError> {
        let (w, h) = image.dimensions();
        let count = self.count.min(h as usize);
        Ok((0..count)
            .map(|i| {
                let mut data = vec![false; (w * h) as usize];
                for x in 0..w {
                    data[(i as u32 * w + x) as usize] = true;
                }
                InstanceMask::new(w, h, data).expect("stub mask dimensions")
            })
            .collect())
    }
}

/// Replays a fixed script of classifications, one per region in order,
/// cycling back to the start when exhausted so one pipeline can be invoked
/// repeatedly.
pub struct ScriptedClassifier {
    script: Vec<Classification>,
    cursor: Mutex<usize>,
    pub releases: Arc<Mutex<usize>>,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<(&str, f32)>) -> Self {
        Self {
            script: script
                .into_iter()
                .map(|(label, confidence)| Classification {
                    label: label.to_string(),
                    confidence,
                })
                .collect(),
            cursor: Mutex::new(0),
            releases: Arc::new(Mutex::new(0)),
        }
    }
}

impl RegionClassifier for ScriptedClassifier {
    fn classify(&self, _region: &RgbImage) -> Result<Classification, VisionError> {
        if self.script.is_empty() {
            return Err(VisionError::Processing(
                "Scripted classifier has no entries".to_string(),
            ));
        }
        let mut cursor = self.cursor.lock();
        let entry = self.script[*cursor % self.script.len()].clone();
        *cursor += 1;
        Ok(entry)
    }

    fn release_scratch(&self) {
        *self.releases.lock() += 1;
    }
}

/// Maps each raw label to a fixed (category, score) pair.
pub struct ScriptedMapper {
    mapping: Vec<(String, String, f32)>,
}

impl ScriptedMapper {
    pub fn new(mapping: Vec<(&str, &str, f32)>) -> Self {
        Self {
            mapping: mapping
                .into_iter()
                .map(|(raw, category, score)| (raw.to_string(), category.to_string(), score))
                .collect(),
        }
    }
}

impl LabelMapper for ScriptedMapper {
    fn rank(
        &self,
        raw_label: &str,
        candidates: &[String],
    ) -> Result<Vec<CandidateScore>, VisionError> {
        match self.mapping.iter().find(|(raw, _, _)| raw == raw_label) {
            Some((_, category, score)) => Ok(vec![CandidateScore {
                label: category.clone(),
                score: *score,
            }]),
            None => Ok(vec![CandidateScore {
                label: candidates
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                score: 0.0,
            }]),
        }
    }
}

/// Assemble a pipeline from the scripted backends with the default config.
pub fn scripted_pipeline(
    mask_count: usize,
    classifications: Vec<(&str, f32)>,
    mapping: Vec<(&str, &str, f32)>,
) -> CountingPipeline {
    CountingPipeline::from_backends(
        PipelineConfig::default(),
        Arc::new(StubMaskGenerator { count: mask_count }),
        Arc::new(ScriptedClassifier::new(classifications)),
        Arc::new(ScriptedMapper::new(mapping)),
    )
    .expect("default config is valid")
}
