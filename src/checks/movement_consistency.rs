use serde_json::json;

use crate::config::EngineConfig;
use crate::context::PlayerContext;
use crate::error::WardenError;
use crate::model::{CheckResult, Explanation, Features, TelemetryInput};
use crate::stats;

use super::Check;

const NAME: &str = "MovementConsistency";
const CATEGORY: &str = "movement";
const SCALE_FACTOR: f64 = 1.5;

/// Detects speed and fly hacks with coarse physics envelopes.
///
/// All limits scale with median ping: a laggy client legitimately sends
/// larger position deltas per packet, so the tolerance must grow with
/// latency or every lag spike becomes a false positive.
pub struct MovementConsistencyCheck {
    enabled: bool,
    weight: f64,
    max_horiz_speed: f64,
    max_vert_speed: f64,
    accel_tolerance: f64,
}

impl MovementConsistencyCheck {
    pub fn new() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_horiz_speed: 0.8,
            max_vert_speed: 0.6,
            accel_tolerance: 1.5,
        }
    }
}

impl Default for MovementConsistencyCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for MovementConsistencyCheck {
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
        let c = &config.checks.movement_consistency;
        self.enabled = c.enabled;
        self.weight = c.weight;
        self.max_horiz_speed = c.max_horiz_speed;
        self.max_vert_speed = c.max_vert_speed;
        self.accel_tolerance = c.accel_tolerance;
    }

    fn analyze(
        &self,
        input: &TelemetryInput,
        features: &Features,
        context: &PlayerContext,
    ) -> Result<CheckResult, WardenError> {
        if !self.enabled {
            return Ok(CheckResult::clean(NAME));
        }
        if context.feature_history().len() < 2 {
            return Ok(CheckResult::clean(NAME));
        }
        if input.has_special_movement() {
            return Ok(CheckResult::clean(NAME));
        }

        let mut anomaly_score = 0.0;
        let mut explain = Explanation::new();

        let ping_factor = 1.0 + context.median_ping() / 500.0;
        let adjusted_max_horiz = self.max_horiz_speed * ping_factor;
        let adjusted_max_vert = self.max_vert_speed * ping_factor;

        // Horizontal speed envelope
        let horiz_speed = features.horiz_speed;
        if horiz_speed > adjusted_max_horiz {
            let excess = (horiz_speed - adjusted_max_horiz) / adjusted_max_horiz;
            anomaly_score += excess;
            explain.insert("horizSpeedExcess".into(), json!(excess));
        }

        // Vertical envelope, doubled when falling (gravity)
        let vert_speed = features.vert_speed.abs();
        let effective_max_vert = if input.dy < 0.0 {
            adjusted_max_vert * 2.0
        } else {
            adjusted_max_vert
        };
        if vert_speed > effective_max_vert {
            let excess = (vert_speed - effective_max_vert) / effective_max_vert;
            anomaly_score += excess;
            explain.insert("vertSpeedExcess".into(), json!(excess));
        }

        // Acceleration envelope, half-weighted since lag causes spikes
        let horiz_accel = features.horiz_accel.abs();
        let max_accel = self.max_horiz_speed * self.accel_tolerance * ping_factor;
        if horiz_accel > max_accel {
            let excess = (horiz_accel - max_accel) / max_accel;
            anomaly_score += excess * 0.5;
            explain.insert("horizAccelExcess".into(), json!(excess));
        }

        // Claiming on-ground while rising
        if input.on_ground && input.dy > 0.1 {
            anomaly_score += 0.5;
            explain.insert("groundStateAnomaly".into(), json!(true));
        }

        // Sudden reversal at speed
        if let Some(prev) = context.feature_history().get(0) {
            let prev_speed = prev.horiz_speed;
            if prev_speed > 0.2 && features.horiz_speed > 0.2 && horiz_accel > prev_speed * 2.0 {
                anomaly_score += 0.3;
                explain.insert("suddenDirectionChange".into(), json!(true));
            }
        }

        let confidence = stats::anomaly_to_confidence(anomaly_score, SCALE_FACTOR);
        let severity = (anomaly_score / 2.0).min(1.0);

        if confidence < 0.1 {
            return Ok(CheckResult::clean(NAME));
        }

        explain.insert("horizSpeed".into(), json!(horiz_speed));
        explain.insert("vertSpeed".into(), json!(features.vert_speed));
        explain.insert("horizAccel".into(), json!(horiz_accel));
        explain.insert("anomalyScore".into(), json!(anomaly_score));
        explain.insert("pingFactor".into(), json!(ping_factor));

        Ok(CheckResult::violation(NAME, confidence, severity, explain))
    }
}
