//! Zero-shot label mapping through a natural-language-inference ONNX export

use crate::device::Device;
use crate::error::VisionError;
use crate::models::{CandidateScore, LabelMapper};
use crate::tensor::softmax;
use ort::{Session, Value};
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Index of the entailment logit in the bundled MNLI export's output head
/// (label order: entailment, neutral, contradiction).
const ENTAILMENT_INDEX: usize = 0;

/// Hypothesis template used for every candidate category.
const HYPOTHESIS_TEMPLATE: &str = "This example is {}.";

/// Zero-shot text classifier in the NLI formulation: the raw classifier
/// label is the premise and each candidate category becomes a hypothesis;
/// the entailment logits, softmaxed across candidates, are the mapping
/// scores. Scoring each candidate independently and normalizing across the
/// taxonomy mirrors the reference zero-shot pipeline.
pub struct MnliMapper {
    session: Arc<Session>,
    tokenizer: Tokenizer,
}

impl MnliMapper {
    /// Load the NLI model and its tokenizer on the given device.
    pub fn new(
        model_path: &Path,
        tokenizer_path: &Path,
        device: Device,
    ) -> Result<Self, VisionError> {
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| VisionError::Tokenizer(format!("Failed to load tokenizer: {}", e)))?;

        let session = Session::builder()
            .with_execution_providers([device.execution_provider()])
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load mapping model: {}", e)))?;

        info!("Mapping model loaded from {:?} ({})", model_path, device);

        Ok(Self {
            session: Arc::new(session),
            tokenizer,
        })
    }

    /// Entailment logit for one (premise, hypothesis) pair.
    fn entailment_logit(&self, premise: &str, hypothesis: &str) -> Result<f32, VisionError> {
        let encoding = self
            .tokenizer
            .encode((premise, hypothesis), true)
            .map_err(|e| VisionError::Tokenizer(format!("Failed to encode pair: {}", e)))?;

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&v| v as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&v| v as i64)
            .collect();

        if ids.is_empty() {
            return Err(VisionError::Tokenizer(
                "Tokenizer produced an empty encoding".to_string(),
            ));
        }

        let seq_len = ids.len();
        let shape = vec![1i64, seq_len as i64];

        let id_input = Value::from_array(
            ort::ndarray::Array::from_shape_vec(shape.as_slice(), ids)
                .map_err(|e| VisionError::Ort(format!("Failed to create id array: {}", e)))?,
        )
        .map_err(|e| VisionError::Ort(format!("Failed to create id value: {}", e)))?;

        let mask_input = Value::from_array(
            ort::ndarray::Array::from_shape_vec(shape.as_slice(), mask)
                .map_err(|e| VisionError::Ort(format!("Failed to create mask array: {}", e)))?,
        )
        .map_err(|e| VisionError::Ort(format!("Failed to create mask value: {}", e)))?;

        let outputs = self
            .session
            .run(vec![id_input, mask_input])
            .map_err(|e| VisionError::Ort(format!("Mapping inference failed: {}", e)))?;

        if outputs.is_empty() {
            return Err(VisionError::Ort("No outputs from mapping model".to_string()));
        }

        let logits = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract NLI logits: {}", e)))?;

        let shape = logits.shape();
        if shape.len() < 2 || shape[1] <= ENTAILMENT_INDEX {
            return Err(VisionError::Processing(format!(
                "Unexpected NLI output shape: {:?}",
                shape
            )));
        }

        Ok(logits
            .get([0, ENTAILMENT_INDEX])
            .copied()
            .unwrap_or(f32::NEG_INFINITY))
    }
}

impl LabelMapper for MnliMapper {
    fn rank(
        &self,
        raw_label: &str,
        candidates: &[String],
    ) -> Result<Vec<CandidateScore>, VisionError> {
        if candidates.is_empty() {
            return Err(VisionError::Processing(
                "No candidate categories to rank".to_string(),
            ));
        }

        debug!(
            "Ranking {} candidates for raw label {:?}",
            candidates.len(),
            raw_label
        );

        let mut logits = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let hypothesis = HYPOTHESIS_TEMPLATE.replace("{}", candidate);
            logits.push(self.entailment_logit(raw_label, &hypothesis)?);
        }

        let scores = softmax(&logits);
        let mut ranked: Vec<CandidateScore> = candidates
            .iter()
            .zip(scores)
            .map(|(label, score)| CandidateScore {
                label: label.clone(),
                score,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(ranked)
    }
}
