use serde_json::json;

use crate::config::EngineConfig;
use crate::constants::TICK_MS;
use crate::context::PlayerContext;
use crate::error::WardenError;
use crate::model::{CheckResult, Explanation, Features, TelemetryInput};
use crate::stats;

use super::Check;

const NAME: &str = "PacketTiming";
const CATEGORY: &str = "timing";
const SCALE_FACTOR: f64 = 2.0;

/// Detects timer manipulation, packet bursts, and machine-perfect
/// cadence from packet inter-arrival times.
///
/// Uses the ping-normalized rolling median and MAD so a stable-but-slow
/// connection does not read as manipulation.
pub struct PacketTimingCheck {
    enabled: bool,
    weight: f64,
    min_delta_ms: f64,
    max_jitter_coeff: f64,
}

impl PacketTimingCheck {
    pub fn new() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            min_delta_ms: 5.0,
            max_jitter_coeff: 3.0,
        }
    }
}

impl Default for PacketTimingCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for PacketTimingCheck {
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
        let c = &config.checks.packet_timing;
        self.enabled = c.enabled;
        self.weight = c.weight;
        self.min_delta_ms = c.min_delta_ms;
        self.max_jitter_coeff = c.max_jitter_coefficient;
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
        if context.packet_delta_window().len() < 5 {
            return Ok(CheckResult::clean(NAME));
        }
        if input.has_special_movement() {
            return Ok(CheckResult::clean(NAME));
        }

        let median_delta = context.packet_delta_window().median();
        // All-identical deltas produce MAD 0; floor it so the ratio math
        // below stays finite
        let mad_delta = context.packet_delta_window().mad().max(0.1);

        // Machine-smooth timing: humans always jitter by more than a
        // millisecond
        let mut consistency_anomaly = 0.0;
        if mad_delta < 1.0 && context.packet_delta_window().len() >= 10 {
            consistency_anomaly = 1.0 - mad_delta;
        }

        let deltas = context.packet_delta_window().to_vec();
        let burst_count = deltas.iter().filter(|d| **d < self.min_delta_ms).count();
        let burst_ratio = burst_count as f64 / deltas.len() as f64;

        let ping_adjusted_expected = TICK_MS + context.median_ping() * 0.05;
        let skew = (median_delta - ping_adjusted_expected).abs() / ping_adjusted_expected;

        let mean = context.packet_delta_window().mean();
        let std_dev = context.packet_delta_window().std_dev();
        let jitter_coeff = if mean > 0.0 { std_dev / mean } else { 0.0 };

        let mut anomaly_score = 0.0;

        if burst_ratio > 0.3 {
            anomaly_score += burst_ratio * 2.0;
        }
        if consistency_anomaly > 0.5 {
            anomaly_score += consistency_anomaly;
        }
        if jitter_coeff > self.max_jitter_coeff {
            anomaly_score += (jitter_coeff - self.max_jitter_coeff) / self.max_jitter_coeff;
        }
        if skew > 0.5 {
            anomaly_score += skew;
        }

        let confidence = stats::anomaly_to_confidence(anomaly_score, SCALE_FACTOR);
        let severity = (anomaly_score / 3.0).min(1.0);

        if confidence < 0.1 {
            return Ok(CheckResult::clean(NAME));
        }

        let mut explain = Explanation::new();
        explain.insert("medianDelta".into(), json!(median_delta));
        explain.insert("madDelta".into(), json!(mad_delta));
        explain.insert("burstRatio".into(), json!(burst_ratio));
        explain.insert("jitterCoeff".into(), json!(jitter_coeff));
        explain.insert("skew".into(), json!(skew));
        explain.insert("anomalyScore".into(), json!(anomaly_score));

        Ok(CheckResult::violation(NAME, confidence, severity, explain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NANOS_PER_MILLI;
    use uuid::Uuid;

    fn configured_check() -> PacketTimingCheck {
        let mut check = PacketTimingCheck::new();
        check.configure(&EngineConfig::default());
        check
    }

    fn context_with_deltas(deltas_ms: &[i64], ping: i64) -> PlayerContext {
        let mut ctx = PlayerContext::new(Uuid::new_v4(), "Steve", 64, 20, 0.3);
        let mut nanos = 1;
        ctx.add_telemetry(TelemetryInput {
            ping,
            nano_time: nanos,
            ..Default::default()
        });
        for delta in deltas_ms {
            nanos += delta * NANOS_PER_MILLI;
            ctx.add_telemetry(TelemetryInput {
                ping,
                nano_time: nanos,
                ..Default::default()
            });
        }
        ctx
    }

    fn plain_input() -> TelemetryInput {
        TelemetryInput::default()
    }

    #[test]
    fn test_clean_when_disabled() {
        let mut check = PacketTimingCheck::new();
        let mut config = EngineConfig::default();
        config.checks.packet_timing.enabled = false;
        check.configure(&config);

        let ctx = context_with_deltas(&[1, 1, 1, 1, 1, 1, 1, 1, 1, 1], 20);
        let result = check
            .analyze(&plain_input(), &Features::default(), &ctx)
            .unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_clean_when_under_sampled() {
        let check = configured_check();
        let ctx = context_with_deltas(&[50, 50], 20);
        let result = check
            .analyze(&plain_input(), &Features::default(), &ctx)
            .unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_clean_during_special_movement() {
        let check = configured_check();
        let ctx = context_with_deltas(&[1, 1, 1, 1, 1, 1, 1, 1, 1, 1], 20);
        let input = TelemetryInput {
            gliding: true,
            ..Default::default()
        };
        let result = check.analyze(&input, &Features::default(), &ctx).unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_normal_timing_is_clean() {
        let check = configured_check();
        // Human-ish jitter around the 50ms tick
        let ctx = context_with_deltas(&[48, 53, 47, 55, 49, 52, 46, 54, 51, 50], 20);
        let result = check
            .analyze(&plain_input(), &Features::default(), &ctx)
            .unwrap();
        assert_eq!(result.confidence, 0.0);
        assert!(result.explain.is_empty());
    }

    #[test]
    fn test_burst_pattern_flagged() {
        let check = configured_check();
        // Majority of packets arriving in under 5ms
        let ctx = context_with_deltas(&[1, 2, 1, 1, 2, 1, 1, 2, 1, 1, 50, 50], 20);
        let result = check
            .analyze(&plain_input(), &Features::default(), &ctx)
            .unwrap();
        assert!(result.confidence > 0.5);
        assert!(result.explain.contains_key("burstRatio"));
    }

    #[test]
    fn test_machine_perfect_cadence_scores() {
        let check = configured_check();
        // Exactly 50ms every packet: MAD floors at 0.1, consistency fires
        let ctx = context_with_deltas(&[50; 12], 20);
        let result = check
            .analyze(&plain_input(), &Features::default(), &ctx)
            .unwrap();
        assert!(result.confidence > 0.1);
        assert!(result.confidence < 0.5);
    }

    #[test]
    fn test_heavy_skew_flagged() {
        let check = configured_check();
        // Sustained 10ms cadence: timer running at 5x speed
        let ctx = context_with_deltas(&[10, 11, 10, 9, 10, 11, 10, 9, 10, 11], 20);
        let result = check
            .analyze(&plain_input(), &Features::default(), &ctx)
            .unwrap();
        assert!(result.confidence > 0.15);
        assert!(result.explain.contains_key("skew"));
    }

    #[test]
    fn test_confidence_bounds() {
        let check = configured_check();
        let ctx = context_with_deltas(&[1; 19], 20);
        let result = check
            .analyze(&plain_input(), &Features::default(), &ctx)
            .unwrap();
        assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
        assert!(result.severity >= 0.0 && result.severity <= 1.0);
    }
}
