//! Pipeline stages between the raw models and the orchestrator.

pub mod classification;
pub mod confidence;
pub mod mapping;
pub mod quality;
pub mod segmentation;

pub use classification::{ClassificationRecord, ClassificationStage};
pub use confidence::{aggregate_confidences, filter_by_confidence};
pub use mapping::{MappedRecord, MappingStage};
pub use quality::assess_quality;
pub use segmentation::{LabelMap, Region, Segmenter};
