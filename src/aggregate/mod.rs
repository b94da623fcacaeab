//! Check result aggregation.
//!
//! Fuses the per-check results of one event into at most one
//! [`Violation`]. The decision gate is conservative max-confidence with
//! dual thresholds: the aggregate confidence AND severity must both
//! clear their minimums before a violation exists at all.

use crate::config::EngineConfig;
use crate::model::{CheckResult, PlayerId, Violation};
use crate::stats;

/// Results below this confidence are ignored entirely.
const SIGNIFICANCE_THRESHOLD: f64 = 0.1;

pub struct Aggregator {
    action_threshold: f64,
    min_severity: f64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            action_threshold: 0.997,
            min_severity: 0.3,
        }
    }

    pub fn configure(&mut self, config: &EngineConfig) {
        self.action_threshold = config.thresholds.action_confidence;
        self.min_severity = config.thresholds.min_severity;
    }

    pub fn action_threshold(&self) -> f64 {
        self.action_threshold
    }

    pub fn min_severity(&self) -> f64 {
        self.min_severity
    }

    /// Aggregates one event's check results. Returns a violation only
    /// when both thresholds are exceeded; the primary category is the
    /// name of the check with the highest confidence.
    pub fn aggregate(
        &self,
        results: Vec<CheckResult>,
        player_id: PlayerId,
        player_name: &str,
        timestamp: i64,
        ping: i64,
    ) -> Option<Violation> {
        if results.is_empty() {
            return None;
        }

        let significant: Vec<CheckResult> = results
            .into_iter()
            .filter(|r| r.confidence > SIGNIFICANCE_THRESHOLD)
            .collect();
        if significant.is_empty() {
            return None;
        }

        let mut max_confidence = 0.0;
        let mut max_severity = 0.0;
        let mut primary_category = String::from("unknown");
        for result in &significant {
            if result.confidence > max_confidence {
                max_confidence = result.confidence;
                primary_category = result.check_name.clone();
            }
            if result.severity > max_severity {
                max_severity = result.severity;
            }
        }

        if max_confidence < self.action_threshold || max_severity < self.min_severity {
            return None;
        }

        Some(Violation::from_results(
            player_id,
            player_name,
            primary_category,
            significant,
            timestamp,
            ping,
        ))
    }

    /// Weighted fusion of check confidences. An alternative to the
    /// max-confidence gate, kept for sensitivity tuning experiments.
    pub fn weighted_confidence(&self, results: &[CheckResult], weights: &[f64]) -> f64 {
        if results.is_empty() || results.len() != weights.len() {
            return 0.0;
        }
        let confidences: Vec<f64> = results.iter().map(|r| r.confidence).collect();
        stats::fuse_weighted(&confidences, weights)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
