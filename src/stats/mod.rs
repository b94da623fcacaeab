//! Statistical helpers for anomaly scoring.
//!
//! Robust statistics (median, MAD) drive most thresholds because packet
//! timing and aim data are heavy-tailed; mean/stddev are kept for the
//! signals that want them. Anomaly scores are mapped into confidence via
//! a sigmoid so unbounded scores land in [0, 1).

/// Median of a slice. Returns 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation, a robust dispersion measure.
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (Bessel-corrected). Returns 0 with fewer
/// than two samples.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_squares: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_squares / (values.len() - 1) as f64).sqrt()
}

/// Clamps a value into [0, 1]. NaN maps to 0.
pub fn bound_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Maps an unbounded anomaly score into a confidence in [0, 1) using
/// `2 / (1 + e^(-score/scale)) - 1`. Non-positive scores, non-positive
/// scales, and NaN all map to 0.
pub fn anomaly_to_confidence(anomaly_score: f64, scale: f64) -> f64 {
    if !(anomaly_score > 0.0) || !(scale > 0.0) {
        return 0.0;
    }
    let exp = (-anomaly_score / scale).exp();
    bound_confidence(2.0 / (1.0 + exp) - 1.0)
}

/// Conservative fusion: the maximum confidence, floored at 0.
pub fn fuse_max(confidences: &[f64]) -> f64 {
    confidences.iter().copied().fold(0.0, f64::max)
}

/// Weighted-average fusion. Returns 0 on length mismatch, empty input,
/// or non-positive total weight.
pub fn fuse_weighted(confidences: &[f64], weights: &[f64]) -> f64 {
    if confidences.is_empty() || confidences.len() != weights.len() {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    for (c, w) in confidences.iter().zip(weights) {
        sum += c * w;
        weight_sum += w;
    }
    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        0.0
    }
}
