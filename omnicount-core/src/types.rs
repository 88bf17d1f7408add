//! Result envelope types shared with the API and storage layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregated confidence statistics over the records that survived filtering.
///
/// All fields are zero when no records survived.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    pub average_confidence: f32,
    pub min_confidence: f32,
    pub max_confidence: f32,
    pub median_confidence: f32,
    pub confidence_std: f32,
}

/// Categorical rating of the average confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceQuality {
    Low,
    Medium,
    High,
}

/// Whether enough segments were found for the estimate to be meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentQuality {
    Insufficient,
    Sufficient,
}

/// Categorical rating of the fraction of segments that survived filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilteringQuality {
    Poor,
    Moderate,
    Good,
}

impl fmt::Display for ConfidenceQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceQuality::Low => write!(f, "low"),
            ConfidenceQuality::Medium => write!(f, "medium"),
            ConfidenceQuality::High => write!(f, "high"),
        }
    }
}

impl fmt::Display for SegmentQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentQuality::Insufficient => write!(f, "insufficient"),
            SegmentQuality::Sufficient => write!(f, "sufficient"),
        }
    }
}

impl fmt::Display for FilteringQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilteringQuality::Poor => write!(f, "poor"),
            FilteringQuality::Moderate => write!(f, "moderate"),
            FilteringQuality::Good => write!(f, "good"),
        }
    }
}

/// Heuristic reliability assessment of one counting run.
///
/// The boolean flags mirror the categorical fields so callers can branch
/// without string comparison. `recommendations` is informational only and
/// never gates the numeric result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub high_confidence: bool,
    pub sufficient_segments: bool,
    pub good_filtering: bool,
    pub confidence_quality: ConfidenceQuality,
    pub segment_quality: SegmentQuality,
    pub filtering_quality: FilteringQuality,
    pub quality_score: f32,
    pub filtering_ratio: f32,
    pub recommendations: Vec<String>,
}

/// Count of one detected category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    #[serde(rename = "type")]
    pub category: String,
    pub count: usize,
}

/// Result of counting a single target category in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountResult {
    pub count: usize,
    pub total_segments: usize,
    pub filtered_segments: usize,
    pub all_detected_objects: Vec<String>,
    /// Wall-clock seconds for the whole run, rounded to 2 decimals.
    pub processing_time: f64,
    pub confidence_metrics: ConfidenceMetrics,
    pub quality_assessment: QualityAssessment,
    pub confidence_threshold_used: f32,
}

/// Result of counting every detected category in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub objects: Vec<CategoryCount>,
    pub total_objects: usize,
    pub total_segments: usize,
    pub filtered_segments: usize,
    pub all_detected_objects: Vec<String>,
    /// Wall-clock seconds for the whole run, rounded to 2 decimals.
    pub processing_time: f64,
    pub confidence_metrics: ConfidenceMetrics,
    pub quality_assessment: QualityAssessment,
    pub confidence_threshold_used: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quality() -> QualityAssessment {
        QualityAssessment {
            high_confidence: true,
            sufficient_segments: true,
            good_filtering: false,
            confidence_quality: ConfidenceQuality::High,
            segment_quality: SegmentQuality::Sufficient,
            filtering_quality: FilteringQuality::Moderate,
            quality_score: 0.82,
            filtering_ratio: 0.6,
            recommendations: vec!["Quality assessment indicates good results".to_string()],
        }
    }

    #[test]
    fn test_category_count_serializes_type_field() {
        let count = CategoryCount {
            category: "car".to_string(),
            count: 3,
        };
        let json = serde_json::to_value(&count).unwrap();
        assert_eq!(json["type"], "car");
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_quality_enums_serialize_lowercase() {
        let json = serde_json::to_value(sample_quality()).unwrap();
        assert_eq!(json["confidence_quality"], "high");
        assert_eq!(json["segment_quality"], "sufficient");
        assert_eq!(json["filtering_quality"], "moderate");
    }

    #[test]
    fn test_confidence_metrics_field_names() {
        let metrics = ConfidenceMetrics {
            average_confidence: 0.8,
            min_confidence: 0.7,
            max_confidence: 0.9,
            median_confidence: 0.8,
            confidence_std: 0.1,
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert!(json.get("average_confidence").is_some());
        assert!(json.get("confidence_std").is_some());
    }

    #[test]
    fn test_count_result_round_trip() {
        let result = CountResult {
            count: 4,
            total_segments: 10,
            filtered_segments: 4,
            all_detected_objects: vec!["car".to_string(); 4],
            processing_time: 1.23,
            confidence_metrics: ConfidenceMetrics::default(),
            quality_assessment: sample_quality(),
            confidence_threshold_used: 0.7,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: CountResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_quality_display() {
        assert_eq!(ConfidenceQuality::Low.to_string(), "low");
        assert_eq!(SegmentQuality::Insufficient.to_string(), "insufficient");
        assert_eq!(FilteringQuality::Good.to_string(), "good");
    }
}
