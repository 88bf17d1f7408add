//! Pipeline orchestration: count-one-category and count-all-categories

use crate::config::PipelineConfig;
use crate::device::Device;
use crate::error::VisionError;
use crate::models::{
    LabelMapper, MaskGenerator, MnliMapper, ModelManager, RegionClassifier, ResNetModel, SamModel,
};
use crate::processing::{
    aggregate_confidences, assess_quality, filter_by_confidence, ClassificationStage,
    MappedRecord, MappingStage, Segmenter,
};
use image::RgbImage;
use omnicount_core::{CategoryBreakdown, CategoryCount, CountResult};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Pipeline states, entered strictly in this order within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loaded,
    Segmented,
    Classified,
    Mapped,
    Filtered,
    Aggregated,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Loaded => "loaded",
            Stage::Segmented => "segmented",
            Stage::Classified => "classified",
            Stage::Mapped => "mapped",
            Stage::Filtered => "filtered",
            Stage::Aggregated => "aggregated",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Best-effort progress reporting.
///
/// Implementations must not block; the pipeline neither waits on nor reacts
/// to the observer, and runs identically without one.
pub trait ProgressObserver: Send + Sync {
    fn on_stage(&self, stage: Stage);
}

struct ModelPaths {
    segmenter: PathBuf,
    classifier: PathBuf,
    classifier_labels: PathBuf,
    mapper: PathBuf,
    mapper_tokenizer: PathBuf,
}

struct Backends {
    mask_generator: Arc<dyn MaskGenerator>,
    classifier: Arc<dyn RegionClassifier>,
    mapper: Arc<dyn LabelMapper>,
}

/// The object-counting pipeline.
///
/// Constructed once (models loaded, device chosen) and then invoked per
/// image. Invocations are synchronous and single-threaded; the loaded models
/// are read-only after construction, so one pipeline may serve concurrent
/// invocations as long as each brings its own image.
pub struct CountingPipeline {
    config: PipelineConfig,
    device: Device,
    segmenter: Segmenter,
    classification: ClassificationStage,
    mapping: MappingStage,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl CountingPipeline {
    /// Download model artifacts as needed, pick a device, and load all
    /// models.
    ///
    /// If setup fails on the accelerator, the entire model sequence is
    /// retried once on the CPU before the error is surfaced; the pipeline
    /// never ends up with models split across devices.
    pub async fn initialize(config: PipelineConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;

        let manager = ModelManager::new(Arc::new(config.clone()));
        let paths = ModelPaths {
            segmenter: manager.get_segmenter_model().await?,
            classifier: manager.get_classifier_model().await?,
            classifier_labels: manager.get_classifier_labels().await?,
            mapper: manager.get_mapper_model().await?,
            mapper_tokenizer: manager.get_mapper_tokenizer().await?,
        };

        let preferred = Device::select(config.prefer_cuda);
        let (backends, device) = match Self::load_backends(&config, &paths, preferred) {
            Ok(backends) => (backends, preferred),
            Err(e) => match preferred.fallback() {
                Some(fallback) => {
                    warn!(
                        "Model setup failed on {} ({}), retrying on {}",
                        preferred, e, fallback
                    );
                    (Self::load_backends(&config, &paths, fallback)?, fallback)
                }
                None => return Err(e),
            },
        };

        for name in ["segmenter", "classifier", "mapper"] {
            manager.mark_loaded(name);
        }
        info!("Pipeline initialized on {}", device);

        Self::assemble(config, device, backends)
    }

    /// Build a pipeline from caller-supplied backends.
    ///
    /// This is the substitution seam: anything satisfying the three model
    /// traits works, which is also how the test suite drives the pipeline
    /// without ONNX artifacts.
    pub fn from_backends(
        config: PipelineConfig,
        mask_generator: Arc<dyn MaskGenerator>,
        classifier: Arc<dyn RegionClassifier>,
        mapper: Arc<dyn LabelMapper>,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Self::assemble(
            config,
            Device::Cpu,
            Backends {
                mask_generator,
                classifier,
                mapper,
            },
        )
    }

    fn assemble(
        config: PipelineConfig,
        device: Device,
        backends: Backends,
    ) -> Result<Self, VisionError> {
        let segmenter = Segmenter::new(backends.mask_generator, config.top_n);
        let classification = ClassificationStage::new(backends.classifier);
        let mapping = MappingStage::new(backends.mapper, config.candidate_labels.clone());

        Ok(Self {
            config,
            device,
            segmenter,
            classification,
            mapping,
            observer: None,
        })
    }

    fn load_backends(
        config: &PipelineConfig,
        paths: &ModelPaths,
        device: Device,
    ) -> Result<Backends, VisionError> {
        let sam = SamModel::new(
            &paths.segmenter,
            device,
            config.points_per_side,
            config.pred_iou_thresh,
            config.min_mask_region_area,
        )?;
        let resnet = ResNetModel::new(&paths.classifier, &paths.classifier_labels, device)?;
        let mnli = MnliMapper::new(&paths.mapper, &paths.mapper_tokenizer, device)?;

        Ok(Backends {
            mask_generator: Arc::new(sam),
            classifier: Arc::new(resnet),
            mapper: Arc::new(mnli),
        })
    }

    /// Attach a progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The device the models were loaded on.
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn notify(&self, stage: Stage) {
        if let Some(observer) = &self.observer {
            observer.on_stage(stage);
        }
    }

    /// Resolve the per-call threshold override against the configured
    /// default. Out-of-range overrides are rejected up front, never clamped.
    fn resolve_threshold(&self, threshold_override: Option<f32>) -> Result<f32, VisionError> {
        match threshold_override {
            Some(t) if t > 0.0 && t < 1.0 => Ok(t),
            Some(t) => Err(VisionError::Config(format!(
                "Confidence threshold must be strictly between 0 and 1, got {}",
                t
            ))),
            None => Ok(self.config.confidence_threshold),
        }
    }

    /// Segment, classify, and map: the stage sequence both entry points
    /// share. Returns the pre-filter segment count with the mapped records.
    fn run_shared(&self, image: &RgbImage) -> Result<(usize, Vec<MappedRecord>), VisionError> {
        self.notify(Stage::Loaded);

        let (_label_map, regions) = self.segmenter.segment(image)?;
        let total_segments = regions.len();
        self.notify(Stage::Segmented);

        let records = self.classification.classify_regions(&regions)?;
        self.notify(Stage::Classified);

        let mapped = self.mapping.map_records(&records)?;
        self.notify(Stage::Mapped);

        Ok((total_segments, mapped))
    }

    /// Count instances of one target category.
    pub fn count_objects(
        &self,
        image: &RgbImage,
        target: &str,
        confidence_threshold: Option<f32>,
    ) -> Result<CountResult, VisionError> {
        let threshold = self.resolve_threshold(confidence_threshold)?;
        let started = Instant::now();

        let (total_segments, mapped) = self.run_shared(image)?;

        let filtered = filter_by_confidence(&mapped, threshold);
        self.notify(Stage::Filtered);

        let confidences: Vec<f32> = filtered.iter().map(|r| r.confidence).collect();
        let confidence_metrics = aggregate_confidences(&confidences);
        self.notify(Stage::Aggregated);

        let quality_assessment = assess_quality(
            confidence_metrics.average_confidence,
            total_segments,
            filtered.len(),
            self.config.min_segments_for_quality,
        );

        let count = filtered.iter().filter(|r| r.category == target).count();
        let all_detected_objects: Vec<String> =
            filtered.iter().map(|r| r.category.clone()).collect();

        let result = CountResult {
            count,
            total_segments,
            filtered_segments: filtered.len(),
            all_detected_objects,
            processing_time: round_seconds(started.elapsed().as_secs_f64()),
            confidence_metrics,
            quality_assessment,
            confidence_threshold_used: threshold,
        };

        self.notify(Stage::Done);
        Ok(result)
    }

    /// Count instances of every detected category.
    pub fn count_all_objects(
        &self,
        image: &RgbImage,
        confidence_threshold: Option<f32>,
    ) -> Result<CategoryBreakdown, VisionError> {
        let threshold = self.resolve_threshold(confidence_threshold)?;
        let started = Instant::now();

        let (total_segments, mapped) = self.run_shared(image)?;

        let filtered = filter_by_confidence(&mapped, threshold);
        self.notify(Stage::Filtered);

        let confidences: Vec<f32> = filtered.iter().map(|r| r.confidence).collect();
        let confidence_metrics = aggregate_confidences(&confidences);
        self.notify(Stage::Aggregated);

        let quality_assessment = assess_quality(
            confidence_metrics.average_confidence,
            total_segments,
            filtered.len(),
            self.config.min_segments_for_quality,
        );

        // Group by category, keeping first-seen order.
        let mut objects: Vec<CategoryCount> = Vec::new();
        for record in &filtered {
            match objects.iter_mut().find(|c| c.category == record.category) {
                Some(existing) => existing.count += 1,
                None => objects.push(CategoryCount {
                    category: record.category.clone(),
                    count: 1,
                }),
            }
        }
        let total_objects = objects.iter().map(|c| c.count).sum();
        let all_detected_objects: Vec<String> =
            filtered.iter().map(|r| r.category.clone()).collect();

        let result = CategoryBreakdown {
            objects,
            total_objects,
            total_segments,
            filtered_segments: filtered.len(),
            all_detected_objects,
            processing_time: round_seconds(started.elapsed().as_secs_f64()),
            confidence_metrics,
            quality_assessment,
            confidence_threshold_used: threshold,
        };

        self.notify(Stage::Done);
        Ok(result)
    }
}

fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
