//! Degenerate inputs and boundary behavior.

mod support;

use omnicount_core::{ConfidenceQuality, FilteringQuality, SegmentQuality};
use omnicount_vision::error::VisionError;
use omnicount_vision::{CountingPipeline, PipelineConfig};
use std::sync::Arc;
use support::{scripted_pipeline, ScriptedClassifier, ScriptedMapper, StubMaskGenerator};

/// An image that produces zero masks flows through every stage as a
/// legitimate zero-valued result, not an error.
#[test]
fn test_blank_image_yields_zeroed_result() {
    let pipeline = scripted_pipeline(0, vec![("unused", 0.9)], vec![]);
    let image = image::RgbImage::new(32, 32);

    let result = pipeline.count_objects(&image, "car", None).unwrap();

    assert_eq!(result.count, 0);
    assert_eq!(result.total_segments, 0);
    assert_eq!(result.filtered_segments, 0);
    assert!(result.all_detected_objects.is_empty());

    let metrics = &result.confidence_metrics;
    assert_eq!(metrics.average_confidence, 0.0);
    assert_eq!(metrics.min_confidence, 0.0);
    assert_eq!(metrics.max_confidence, 0.0);
    assert_eq!(metrics.median_confidence, 0.0);
    assert_eq!(metrics.confidence_std, 0.0);

    let quality = &result.quality_assessment;
    assert_eq!(quality.segment_quality, SegmentQuality::Insufficient);
    assert_eq!(quality.confidence_quality, ConfidenceQuality::Low);
    assert_eq!(quality.filtering_quality, FilteringQuality::Poor);
    assert_eq!(quality.filtering_ratio, 0.0);
    // 0.0 * 0.4 + 0.5 * 0.3 + 0.0 * 0.3
    assert!((quality.quality_score - 0.15).abs() < 1e-6);
}

#[test]
fn test_blank_image_count_all() {
    let pipeline = scripted_pipeline(0, vec![("unused", 0.9)], vec![]);
    let image = image::RgbImage::new(32, 32);

    let result = pipeline.count_all_objects(&image, None).unwrap();
    assert!(result.objects.is_empty());
    assert_eq!(result.total_objects, 0);
    assert_eq!(result.total_segments, 0);
}

#[test]
fn test_single_surviving_record_has_zero_std() {
    let pipeline = scripted_pipeline(
        3,
        vec![("sedan", 0.95), ("blur", 0.1), ("blur", 0.1)],
        vec![("sedan", "car", 0.95), ("blur", "sky", 0.1)],
    );
    let image = image::RgbImage::new(16, 16);

    let result = pipeline.count_objects(&image, "car", None).unwrap();
    assert_eq!(result.filtered_segments, 1);
    assert_eq!(result.confidence_metrics.confidence_std, 0.0);
    assert_eq!(result.confidence_metrics.average_confidence, 0.95);
    assert_eq!(
        result.confidence_metrics.min_confidence,
        result.confidence_metrics.max_confidence
    );
}

#[test]
fn test_threshold_override_bounds() {
    let pipeline = scripted_pipeline(1, vec![("sedan", 0.9)], vec![("sedan", "car", 0.9)]);
    let image = image::RgbImage::new(8, 8);

    for invalid in [0.0f32, 1.0, -1.0, 2.0, f32::NAN] {
        let err = pipeline
            .count_objects(&image, "car", Some(invalid))
            .unwrap_err();
        match err {
            VisionError::Config(msg) => assert!(msg.contains("threshold")),
            other => panic!("Expected Config error, got {}", other),
        }
    }

    // Extreme but in-range values are accepted, never clamped.
    assert!(pipeline.count_objects(&image, "car", Some(0.001)).is_ok());
    assert!(pipeline.count_objects(&image, "car", Some(0.999)).is_ok());
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let mut config = PipelineConfig::default();
    config.confidence_threshold = 1.5;

    let result = CountingPipeline::from_backends(
        config,
        Arc::new(StubMaskGenerator { count: 1 }),
        Arc::new(ScriptedClassifier::new(vec![("sedan", 0.9)])),
        Arc::new(ScriptedMapper::new(vec![("sedan", "car", 0.9)])),
    );

    match result {
        Err(VisionError::Config(_)) => {}
        _ => panic!("Expected Config error"),
    }
}

#[test]
fn test_all_records_at_exact_threshold_are_dropped() {
    // Filtering is strictly greater-than, so records at the threshold fall.
    let pipeline = scripted_pipeline(4, vec![("sedan", 0.7); 4], vec![("sedan", "car", 0.7)]);
    let image = image::RgbImage::new(16, 16);

    let result = pipeline.count_objects(&image, "car", None).unwrap();
    assert_eq!(result.total_segments, 4);
    assert_eq!(result.filtered_segments, 0);
    assert_eq!(result.count, 0);
}

#[test]
fn test_unknown_target_category_counts_zero() {
    let pipeline = scripted_pipeline(2, vec![("sedan", 0.9); 2], vec![("sedan", "car", 0.9)]);
    let image = image::RgbImage::new(16, 16);

    let result = pipeline
        .count_objects(&image, "submarine", None)
        .unwrap();
    assert_eq!(result.count, 0);
    // The other detections still show up in the envelope.
    assert_eq!(result.filtered_segments, 2);
    assert_eq!(result.all_detected_objects, vec!["car"; 2]);
}

#[test]
fn test_more_masks_than_top_n_are_truncated() {
    let mut config = PipelineConfig::default();
    config.top_n = 3;

    let pipeline = CountingPipeline::from_backends(
        config,
        Arc::new(StubMaskGenerator { count: 8 }),
        Arc::new(ScriptedClassifier::new(vec![("sedan", 0.9); 8])),
        Arc::new(ScriptedMapper::new(vec![("sedan", "car", 0.9)])),
    )
    .unwrap();

    let image = image::RgbImage::new(16, 16);
    let result = pipeline.count_objects(&image, "car", None).unwrap();
    assert_eq!(result.total_segments, 3);
    assert_eq!(result.count, 3);
}
