//! Confidence filtering and aggregation

use crate::processing::mapping::MappedRecord;
use omnicount_core::ConfidenceMetrics;

/// Keep the records whose confidence is strictly greater than the threshold.
///
/// The comparison is `>`, not `>=`, and retained records keep their input
/// order.
pub fn filter_by_confidence(records: &[MappedRecord], threshold: f32) -> Vec<MappedRecord> {
    records
        .iter()
        .filter(|r| r.confidence > threshold)
        .cloned()
        .collect()
}

/// Summary statistics over a set of confidences.
///
/// An empty input yields all-zero metrics; the standard deviation needs at
/// least two samples and is zero otherwise.
pub fn aggregate_confidences(confidences: &[f32]) -> ConfidenceMetrics {
    if confidences.is_empty() {
        return ConfidenceMetrics::default();
    }

    let n = confidences.len() as f32;
    let sum: f32 = confidences.iter().sum();
    let average = sum / n;

    let min = confidences.iter().copied().fold(f32::INFINITY, f32::min);
    let max = confidences
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);

    let mut sorted = confidences.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };

    // Sample standard deviation (n - 1 denominator).
    let std_dev = if confidences.len() > 1 {
        let variance: f32 = confidences
            .iter()
            .map(|&v| (v - average) * (v - average))
            .sum::<f32>()
            / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    ConfidenceMetrics {
        average_confidence: average,
        min_confidence: min,
        max_confidence: max,
        median_confidence: median,
        confidence_std: std_dev,
    }
}
