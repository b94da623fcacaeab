//! Feature extraction.
//!
//! Pure derivation of [`Features`] from a telemetry event and the
//! player's history. The extractor never mutates the context; the engine
//! appends the result afterwards.

use crate::constants::{NANOS_PER_MILLI, TICK_MS};
use crate::context::PlayerContext;
use crate::model::{Features, TelemetryInput};

/// Tick deltas above this mark the player as lagging.
const LAG_TICK_DELTA_NANOS: i64 = 200 * NANOS_PER_MILLI;

/// Ping spikes beyond median + this many MADs mark the player as lagging.
const LAG_PING_MAD_FACTOR: f64 = 3.0;

/// Jitter is computed over at most this many recent samples.
const JITTER_SAMPLE_LIMIT: usize = 10;

/// Derives per-event features from raw telemetry and player history.
#[derive(Debug, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, input: &TelemetryInput, context: &PlayerContext) -> Features {
        let horiz_speed = input.horizontal_speed();
        let vert_speed = input.dy;
        let speed_3d = input.speed_3d();

        // Acceleration needs a prior feature sample
        let (horiz_accel, vert_accel) = match context.feature_history().peek() {
            Some(prev) => (horiz_speed - prev.horiz_speed, vert_speed - prev.vert_speed),
            None => (0.0, 0.0),
        };

        let rotation_speed = ((input.delta_yaw * input.delta_yaw
            + input.delta_pitch * input.delta_pitch) as f64)
            .sqrt();
        // The current event is already in history at age 0; its
        // predecessor is at age 1
        let (yaw_accel, pitch_accel) = match context.telemetry_history().get(1) {
            Some(prev) => (
                (input.delta_yaw - prev.delta_yaw) as f64,
                (input.delta_pitch - prev.delta_pitch) as f64,
            ),
            None => (0.0, 0.0),
        };

        let ping_normalized = if context.ping_ewma().is_initialized() {
            context.ping_ewma().get() as i64
        } else {
            input.ping
        };

        Features {
            horiz_speed,
            vert_speed,
            speed_3d,
            horiz_accel,
            vert_accel,
            rotation_speed,
            yaw_accel,
            pitch_accel,
            jitter_score: jitter_score(context),
            timing_skew: timing_skew(context),
            ping_normalized,
            is_lagging: detect_lag(input, context),
            sample_count: context.telemetry_history().len(),
        }
    }
}

/// Root-mean-square of consecutive horizontal-speed differences over the
/// newest samples. Needs at least 5 samples to be meaningful.
fn jitter_score(context: &PlayerContext) -> f64 {
    let history = context.telemetry_history();
    if history.len() < 5 {
        return 0.0;
    }

    let skip = history.len().saturating_sub(JITTER_SAMPLE_LIMIT);
    let mut sum_sq_diff = 0.0;
    let mut prev_speed = 0.0;
    let mut count = 0usize;
    for input in history.iter().skip(skip) {
        let speed = input.horizontal_speed();
        if count > 0 {
            let diff = speed - prev_speed;
            sum_sq_diff += diff * diff;
        }
        prev_speed = speed;
        count += 1;
    }

    if count > 1 {
        (sum_sq_diff / count as f64).sqrt()
    } else {
        0.0
    }
}

/// Relative deviation of the median packet delta from the ping-adjusted
/// tick interval.
fn timing_skew(context: &PlayerContext) -> f64 {
    if context.packet_delta_window().is_empty() {
        return 0.0;
    }
    let median_delta = context.packet_delta_window().median();
    let expected = TICK_MS + context.median_ping() * 0.02;
    (median_delta - expected).abs() / expected
}

fn detect_lag(input: &TelemetryInput, context: &PlayerContext) -> bool {
    if context.packet_delta_window().len() >= 3 {
        let ping_mad = context.ping_mad();
        if ping_mad > 0.0 && (input.ping as f64) > context.median_ping() + ping_mad * LAG_PING_MAD_FACTOR
        {
            return true;
        }
    }
    input.tick_delta > LAG_TICK_DELTA_NANOS
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn context() -> PlayerContext {
        PlayerContext::new(Uuid::new_v4(), "Steve", 64, 20, 0.3)
    }

    fn moving(nanos: i64, dx: f64, ping: i64) -> TelemetryInput {
        TelemetryInput {
            dx,
            ping,
            nano_time: nanos,
            tick_delta: 50 * NANOS_PER_MILLI,
            ..Default::default()
        }
    }

    #[test]
    fn test_speeds_and_sample_count() {
        let extractor = FeatureExtractor::new();
        let mut ctx = context();
        let input = TelemetryInput {
            dx: 0.3,
            dy: 0.1,
            dz: 0.4,
            ..Default::default()
        };
        ctx.add_telemetry(input.clone());

        let features = extractor.extract(&input, &ctx);
        assert!((features.horiz_speed - 0.5).abs() < 1e-9);
        assert!((features.vert_speed - 0.1).abs() < 1e-9);
        assert_eq!(features.sample_count, 1);
    }

    #[test]
    fn test_acceleration_zero_without_history() {
        let extractor = FeatureExtractor::new();
        let ctx = context();
        let features = extractor.extract(&moving(0, 0.5, 20), &ctx);
        assert_eq!(features.horiz_accel, 0.0);
        assert_eq!(features.vert_accel, 0.0);
    }

    #[test]
    fn test_acceleration_from_previous_features() {
        let extractor = FeatureExtractor::new();
        let mut ctx = context();
        let first = moving(0, 0.2, 20);
        ctx.add_telemetry(first.clone());
        let f1 = extractor.extract(&first, &ctx);
        ctx.add_features(f1);

        let second = moving(50 * NANOS_PER_MILLI, 0.5, 20);
        ctx.add_telemetry(second.clone());
        let f2 = extractor.extract(&second, &ctx);
        assert!((f2.horiz_accel - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_jitter_needs_five_samples() {
        let extractor = FeatureExtractor::new();
        let mut ctx = context();
        for i in 0..4 {
            ctx.add_telemetry(moving(i * 50 * NANOS_PER_MILLI, 0.3, 20));
        }
        let features = extractor.extract(&moving(300 * NANOS_PER_MILLI, 0.3, 20), &ctx);
        assert_eq!(features.jitter_score, 0.0);
    }

    #[test]
    fn test_steady_speed_has_low_jitter() {
        let extractor = FeatureExtractor::new();
        let mut ctx = context();
        for i in 0..10 {
            ctx.add_telemetry(moving(i * 50 * NANOS_PER_MILLI, 0.3, 20));
        }
        let features = extractor.extract(&moving(500 * NANOS_PER_MILLI, 0.3, 20), &ctx);
        assert!(features.jitter_score < 0.15);
    }

    #[test]
    fn test_lag_from_tick_delta() {
        let extractor = FeatureExtractor::new();
        let ctx = context();
        let input = TelemetryInput {
            tick_delta: 300 * NANOS_PER_MILLI,
            ..Default::default()
        };
        let features = extractor.extract(&input, &ctx);
        assert!(features.is_lagging);
    }

    #[test]
    fn test_lag_from_ping_spike() {
        let extractor = FeatureExtractor::new();
        let mut ctx = context();
        for (i, ping) in [20, 22, 19, 21, 20, 23].iter().enumerate() {
            ctx.add_telemetry(moving(i as i64 * 50 * NANOS_PER_MILLI, 0.1, *ping));
        }
        let spiked = moving(350 * NANOS_PER_MILLI, 0.1, 400);
        let features = extractor.extract(&spiked, &ctx);
        assert!(features.is_lagging);
    }

    #[test]
    fn test_steady_ping_not_lagging() {
        let extractor = FeatureExtractor::new();
        let mut ctx = context();
        for i in 0..6 {
            ctx.add_telemetry(moving(i * 50 * NANOS_PER_MILLI, 0.1, 20 + (i % 3)));
        }
        let features = extractor.extract(&moving(300 * NANOS_PER_MILLI, 0.1, 21), &ctx);
        assert!(!features.is_lagging);
    }

    #[test]
    fn test_timing_skew_zero_without_deltas() {
        let extractor = FeatureExtractor::new();
        let ctx = context();
        let features = extractor.extract(&moving(0, 0.1, 20), &ctx);
        assert_eq!(features.timing_skew, 0.0);
    }

    #[test]
    fn test_ping_normalized_prefers_ewma() {
        let extractor = FeatureExtractor::new();
        let mut ctx = context();
        // No EWMA yet: raw ping passes through
        let features = extractor.extract(&moving(0, 0.0, 77), &ctx);
        assert_eq!(features.ping_normalized, 77);

        for i in 0..5 {
            ctx.add_telemetry(moving(i * 50 * NANOS_PER_MILLI, 0.0, 20));
        }
        let features = extractor.extract(&moving(250 * NANOS_PER_MILLI, 0.0, 500), &ctx);
        // Smoothed value, not the instantaneous spike
        assert!(features.ping_normalized < 100);
    }
}
