pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    CategoryBreakdown, CategoryCount, ConfidenceMetrics, ConfidenceQuality, CountResult,
    FilteringQuality, QualityAssessment, SegmentQuality,
};
