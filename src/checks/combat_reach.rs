use serde_json::json;

use crate::config::EngineConfig;
use crate::constants::VANILLA_REACH;
use crate::context::CombatContext;
use crate::error::WardenError;
use crate::model::{CheckResult, CombatInput, Explanation};
use crate::stats;

use super::CombatCheck;

const NAME: &str = "CombatReach";
const CATEGORY: &str = "combat";
const SCALE_FACTOR: f64 = 2.0;

/// Extra reach allowed per millisecond of ping. Interpolation moves the
/// target's server-side position behind its client-side one.
const PING_COMPENSATION_FACTOR: f64 = 0.001;

/// Detects reach hacks from attack distances.
///
/// Only hits are analyzed; a miss carries no reliable distance. Beyond
/// the direct over-reach test, the statistical window catches players
/// who sit exactly at the edge of vanilla reach on every single hit,
/// which honest melee never does.
pub struct CombatReachCheck {
    enabled: bool,
    weight: f64,
    max_reach: f64,
    reach_buffer: f64,
    min_samples: usize,
}

impl CombatReachCheck {
    pub fn new() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_reach: 3.0,
            reach_buffer: 0.3,
            min_samples: 10,
        }
    }
}

impl Default for CombatReachCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatCheck for CombatReachCheck {
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
        let c = &config.checks.combat;
        self.enabled = c.reach.enabled;
        self.weight = c.reach.weight;
        self.max_reach = c.reach.max_reach;
        self.reach_buffer = c.reach.reach_buffer;
        self.min_samples = c.min_samples;
    }

    fn analyze(
        &self,
        input: &CombatInput,
        context: &CombatContext,
    ) -> Result<CheckResult, WardenError> {
        if !self.enabled {
            return Ok(CheckResult::clean(NAME));
        }
        if !input.hit {
            return Ok(CheckResult::clean(NAME));
        }

        let mut anomaly_score = 0.0;
        let mut explain = Explanation::new();

        let actual_reach = input.distance_to_target();
        let horizontal_reach = input.horizontal_distance_to_target();

        let ping_compensation = input.ping as f64 * PING_COMPENSATION_FACTOR;
        let adjusted_max_reach = self.max_reach + self.reach_buffer + ping_compensation;

        // Direct over-reach on this hit
        if actual_reach > adjusted_max_reach {
            let reach_excess = actual_reach - adjusted_max_reach;
            let reach_anomaly = reach_excess / adjusted_max_reach;
            anomaly_score += reach_anomaly * 3.0;
            explain.insert("reachExcess".into(), json!(reach_excess));
            explain.insert("directReachAnomaly".into(), json!(reach_anomaly));
        }

        // Horizontal-only abuse
        if horizontal_reach > VANILLA_REACH + ping_compensation + 0.5 {
            let h_excess = horizontal_reach - (VANILLA_REACH + ping_compensation);
            anomaly_score += (h_excess / VANILLA_REACH) * 2.0;
            explain.insert("horizontalReachExcess".into(), json!(h_excess));
        }

        // Statistical pattern over the window
        if context.reach_window().len() >= self.min_samples {
            let median_reach = context.reach_window().median();
            let reach_mad = context.reach_window().mad();
            let max_recorded_reach = context.reach_window().max();

            // Consistently hitting at the edge of vanilla reach
            if median_reach > VANILLA_REACH - 0.3 && reach_mad < 0.3 {
                let edge_anomaly = (median_reach - (VANILLA_REACH - 0.5)) / 0.5;
                if edge_anomaly > 0.0 {
                    anomaly_score += edge_anomaly * 0.5;
                    explain.insert("consistentMaxReach".into(), json!(true));
                    explain.insert("medianReach".into(), json!(median_reach));
                }
            }

            if max_recorded_reach > adjusted_max_reach {
                let max_anomaly = (max_recorded_reach - adjusted_max_reach) / adjusted_max_reach;
                anomaly_score += max_anomaly;
                explain.insert("maxRecordedReach".into(), json!(max_recorded_reach));
            }

            explain.insert("reachMad".into(), json!(reach_mad));
        }

        // Hitting at a large vertical offset with extended reach
        let y_diff = (input.target_y - input.attacker_y).abs();
        if y_diff > 2.0 && actual_reach > VANILLA_REACH {
            let y_anomaly = (y_diff - 2.0) * (actual_reach - VANILLA_REACH);
            if y_anomaly > 0.0 {
                anomaly_score += y_anomaly * 0.3;
                explain.insert("yDifference".into(), json!(y_diff));
                explain.insert("yReachAnomaly".into(), json!(y_anomaly));
            }
        }

        let confidence = stats::anomaly_to_confidence(anomaly_score, SCALE_FACTOR);
        let severity = (anomaly_score / 3.0).min(1.0);

        if confidence < 0.1 {
            return Ok(CheckResult::clean(NAME));
        }

        explain.insert("anomalyScore".into(), json!(anomaly_score));
        explain.insert("actualReach".into(), json!(actual_reach));
        explain.insert("horizontalReach".into(), json!(horizontal_reach));
        explain.insert("pingCompensation".into(), json!(ping_compensation));
        explain.insert("adjustedMaxReach".into(), json!(adjusted_max_reach));

        Ok(CheckResult::violation(NAME, confidence, severity, explain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NANOS_PER_MILLI;
    use uuid::Uuid;

    fn configured_check() -> CombatReachCheck {
        let mut check = CombatReachCheck::new();
        check.configure(&EngineConfig::default());
        check
    }

    fn context() -> CombatContext {
        CombatContext::new(Uuid::new_v4(), "Steve", 64, 20, 0.3)
    }

    fn hit_at_distance(index: i64, distance: f64, ping: i64) -> CombatInput {
        CombatInput {
            target_z: distance,
            nano_time: (index + 1) * 600 * NANOS_PER_MILLI,
            hit: true,
            ping,
            ..Default::default()
        }
    }

    #[test]
    fn test_misses_are_ignored() {
        let check = configured_check();
        let ctx = context();
        let mut input = hit_at_distance(0, 9.0, 20);
        input.hit = false;
        let result = check.analyze(&input, &ctx).unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_normal_reach_is_clean() {
        let check = configured_check();
        let mut ctx = context();
        for i in 0..15 {
            let d = 2.0 + (i % 4) as f64 * 0.25;
            ctx.add_combat_input(hit_at_distance(i, d, 20));
        }
        let result = check.analyze(&hit_at_distance(15, 2.4, 20), &ctx).unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_blatant_over_reach_flagged() {
        let check = configured_check();
        let ctx = context();
        // 7 world units with 20ms ping: over double the adjusted cap
        let result = check.analyze(&hit_at_distance(0, 7.0, 20), &ctx).unwrap();
        assert!(result.confidence > 0.8);
        assert!(result.explain.contains_key("reachExcess"));
        assert!(result.explain.contains_key("horizontalReachExcess"));
    }

    #[test]
    fn test_edge_of_reach_pattern_flagged() {
        let check = configured_check();
        let mut ctx = context();
        // Every hit within a hair of vanilla max reach
        for i in 0..15 {
            ctx.add_combat_input(hit_at_distance(i, 2.95 + (i % 2) as f64 * 0.04, 20));
        }
        let result = check.analyze(&hit_at_distance(15, 2.97, 20), &ctx).unwrap();
        assert!(result.explain.contains_key("consistentMaxReach"));
    }

    #[test]
    fn test_ping_compensation_extends_cap() {
        let check = configured_check();
        let ctx = context();
        // Same 4.2-unit hit reads as a smaller excess at 300ms ping
        let low_ping = check.analyze(&hit_at_distance(0, 4.2, 20), &ctx).unwrap();
        let high_ping = check.analyze(&hit_at_distance(0, 4.2, 300), &ctx).unwrap();
        assert!(low_ping.confidence > high_ping.confidence);
    }

    #[test]
    fn test_vertical_abuse_signal() {
        let check = configured_check();
        let ctx = context();
        let input = CombatInput {
            target_y: 4.0,
            target_z: 2.0,
            hit: true,
            ping: 20,
            ..Default::default()
        };
        // Reach ~4.47 at a 4-block height difference
        let result = check.analyze(&input, &ctx).unwrap();
        assert!(result.explain.contains_key("yReachAnomaly"));
    }

    #[test]
    fn test_result_bounds() {
        let check = configured_check();
        let mut ctx = context();
        for i in 0..20 {
            ctx.add_combat_input(hit_at_distance(i, 8.0, 0));
        }
        let result = check.analyze(&hit_at_distance(20, 10.0, 0), &ctx).unwrap();
        assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
        assert!(result.severity >= 0.0 && result.severity <= 1.0);
    }
}
