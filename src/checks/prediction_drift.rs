use serde_json::json;

use crate::config::EngineConfig;
use crate::constants::GRAVITY_PER_TICK;
use crate::context::PlayerContext;
use crate::error::WardenError;
use crate::model::{CheckResult, Explanation, Features, TelemetryInput};
use crate::stats;

use super::Check;

const NAME: &str = "PredictionDrift";
const CATEGORY: &str = "movement";
const SCALE_FACTOR: f64 = 2.0;

/// Flags sustained deviation from a linear-plus-gravity extrapolation of
/// recent movement.
///
/// A single drifting event proves nothing; lag, knockback, and collisions
/// all produce one-off drift. The check only fires when the drift streak
/// spans at least `min_drift_samples` consecutive events.
pub struct PredictionDriftCheck {
    enabled: bool,
    weight: f64,
    min_drift_samples: usize,
    max_drift_threshold: f64,
}

impl PredictionDriftCheck {
    pub fn new() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            min_drift_samples: 5,
            max_drift_threshold: 0.5,
        }
    }

    /// Counts consecutive recent samples whose gravity-adjusted delta
    /// change exceeds half the drift threshold, newest first, stopping
    /// at the first quiet pair.
    fn count_consecutive_drifts(&self, context: &PlayerContext, threshold: f64) -> usize {
        let history = context.telemetry_history();
        let mut count = 0;
        let mut prev: Option<&TelemetryInput> = None;

        let limit = (self.min_drift_samples * 2).min(history.len());
        for age in 0..limit {
            let Some(current) = history.get(age) else {
                break;
            };
            if let Some(prev) = prev {
                let ddx = current.dx - prev.dx;
                let ddy = current.dy - prev.dy + GRAVITY_PER_TICK;
                let ddz = current.dz - prev.dz;
                let drift = (ddx * ddx + ddy * ddy + ddz * ddz).sqrt();
                if drift > threshold * 0.5 {
                    count += 1;
                } else {
                    break;
                }
            }
            prev = Some(current);
        }
        count
    }
}

impl Default for PredictionDriftCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for PredictionDriftCheck {
    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn configure(&mut self, config: &EngineConfig) {
        let c = &config.checks.prediction_drift;
        self.enabled = c.enabled;
        self.weight = c.weight;
        self.min_drift_samples = c.min_drift_samples;
        self.max_drift_threshold = c.max_drift_threshold;
    }

    fn analyze(
        &self,
        input: &TelemetryInput,
        _features: &Features,
        context: &PlayerContext,
    ) -> Result<CheckResult, WardenError> {
        if !self.enabled {
            return Ok(CheckResult::clean(NAME));
        }
        let history = context.telemetry_history();
        if history.len() < self.min_drift_samples + 2 {
            return Ok(CheckResult::clean(NAME));
        }
        if input.has_special_movement() {
            return Ok(CheckResult::clean(NAME));
        }

        // Mean velocity over the events preceding this one. Age 0 is the
        // current event (already appended); ages 1..=N are its
        // predecessors.
        let mut total = (0.0, 0.0, 0.0);
        let mut sample_count = 0;
        for age in 1..=self.min_drift_samples {
            if let Some(sample) = history.get(age) {
                total.0 += sample.dx;
                total.1 += sample.dy;
                total.2 += sample.dz;
                sample_count += 1;
            }
        }
        if sample_count + 1 < self.min_drift_samples {
            return Ok(CheckResult::clean(NAME));
        }

        let avg_dx = total.0 / sample_count as f64;
        let avg_dy = total.1 / sample_count as f64;
        let avg_dz = total.2 / sample_count as f64;

        // Continue the average velocity, with gravity pulling Y down
        let predicted_dx = avg_dx;
        let predicted_dy = avg_dy - GRAVITY_PER_TICK;
        let predicted_dz = avg_dz;

        let drift_x = input.dx - predicted_dx;
        let drift_y = input.dy - predicted_dy;
        let drift_z = input.dz - predicted_dz;
        let total_drift = (drift_x * drift_x + drift_y * drift_y + drift_z * drift_z).sqrt();

        let ping_factor = 1.0 + context.median_ping() / 300.0;
        let adjusted_threshold = self.max_drift_threshold * ping_factor;

        if total_drift <= adjusted_threshold {
            return Ok(CheckResult::clean(NAME));
        }

        // Sustained-evidence rule: one drifting event is noise
        let consecutive_drifts = self.count_consecutive_drifts(context, adjusted_threshold);
        if consecutive_drifts < self.min_drift_samples {
            return Ok(CheckResult::clean(NAME));
        }

        let drift_excess = (total_drift - adjusted_threshold) / adjusted_threshold;
        let consistency_bonus = (consecutive_drifts - self.min_drift_samples) as f64 * 0.2;
        let anomaly_score = drift_excess + consistency_bonus;

        let confidence = stats::anomaly_to_confidence(anomaly_score, SCALE_FACTOR);
        let severity = (anomaly_score / 2.0).min(1.0);

        if confidence < 0.1 {
            return Ok(CheckResult::clean(NAME));
        }

        let mut explain = Explanation::new();
        explain.insert("totalDrift".into(), json!(total_drift));
        explain.insert("predictedDx".into(), json!(predicted_dx));
        explain.insert("predictedDy".into(), json!(predicted_dy));
        explain.insert("predictedDz".into(), json!(predicted_dz));
        explain.insert("actualDx".into(), json!(input.dx));
        explain.insert("actualDy".into(), json!(input.dy));
        explain.insert("actualDz".into(), json!(input.dz));
        explain.insert("consecutiveDrifts".into(), json!(consecutive_drifts));
        explain.insert("threshold".into(), json!(adjusted_threshold));
        explain.insert("anomalyScore".into(), json!(anomaly_score));

        Ok(CheckResult::violation(NAME, confidence, severity, explain))
    }
}
