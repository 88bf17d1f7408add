//! Heuristic quality assessment of one counting run

use omnicount_core::{ConfidenceQuality, FilteringQuality, QualityAssessment, SegmentQuality};

/// Derive quality labels, the scalar quality score, and recommendations from
/// the aggregate confidence, the pre-filter segment count, and the
/// post-filter segment count.
///
/// The recommendations are advisory text only; nothing here changes the
/// numeric result.
pub fn assess_quality(
    average_confidence: f32,
    total_segments: usize,
    filtered_segments: usize,
    min_segments_for_quality: usize,
) -> QualityAssessment {
    let confidence_quality = if average_confidence > 0.8 {
        ConfidenceQuality::High
    } else if average_confidence > 0.6 {
        ConfidenceQuality::Medium
    } else {
        ConfidenceQuality::Low
    };

    let segment_quality = if total_segments >= min_segments_for_quality {
        SegmentQuality::Sufficient
    } else {
        SegmentQuality::Insufficient
    };

    let filtering_ratio = if total_segments > 0 {
        filtered_segments as f32 / total_segments as f32
    } else {
        0.0
    };

    let filtering_quality = if filtering_ratio > 0.7 {
        FilteringQuality::Good
    } else if filtering_ratio > 0.4 {
        FilteringQuality::Moderate
    } else {
        FilteringQuality::Poor
    };

    let segment_term = if segment_quality == SegmentQuality::Sufficient {
        1.0
    } else {
        0.5
    };
    let quality_score = average_confidence * 0.4 + segment_term * 0.3 + filtering_ratio * 0.3;

    QualityAssessment {
        high_confidence: average_confidence > 0.8,
        sufficient_segments: total_segments >= min_segments_for_quality,
        good_filtering: filtering_ratio > 0.7,
        confidence_quality,
        segment_quality,
        filtering_quality,
        quality_score,
        filtering_ratio,
        recommendations: recommendations(confidence_quality, segment_quality, filtering_quality),
    }
}

fn recommendations(
    confidence_quality: ConfidenceQuality,
    segment_quality: SegmentQuality,
    filtering_quality: FilteringQuality,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if confidence_quality == ConfidenceQuality::Low {
        recommendations.push(
            "Consider using higher resolution images or different lighting conditions".to_string(),
        );
    }

    if segment_quality == SegmentQuality::Insufficient {
        recommendations
            .push("Image may have too few distinct objects for reliable counting".to_string());
    }

    if filtering_quality == FilteringQuality::Poor {
        recommendations.push(
            "Many segments were filtered out - consider adjusting confidence threshold"
                .to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push("Quality assessment indicates good results".to_string());
    }

    recommendations
}
