use serde_json::json;

use crate::config::EngineConfig;
use crate::constants::MAX_HUMAN_SNAP_PER_TICK;
use crate::context::CombatContext;
use crate::error::WardenError;
use crate::model::{CheckResult, CombatInput, Explanation};
use crate::stats;

use super::CombatCheck;

const NAME: &str = "CombatAimbot";
const CATEGORY: &str = "combat";
const SCALE_FACTOR: f64 = 1.5;

/// Aim error below this many degrees counts as a perfect snap landing.
const PERFECT_AIM_THRESHOLD: f64 = 2.0;

/// Aim-error MAD below this is robotic; human wrists jitter more.
const HUMAN_MIN_AIM_JITTER: f64 = 0.5;

/// Detects aimbots and aim assist from rotation patterns during combat.
///
/// Human aim is noisy: snaps overshoot, error varies shot to shot, and
/// rotation speed is capped by the pointing device. Each signal looks
/// for the absence of that noise.
pub struct CombatAimbotCheck {
    enabled: bool,
    weight: f64,
    max_snap_angle: f64,
    min_aim_variance: f64,
    max_aim_perfection: f64,
    min_samples: usize,
}

impl CombatAimbotCheck {
    pub fn new() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_snap_angle: 45.0,
            min_aim_variance: 1.0,
            max_aim_perfection: 3.0,
            min_samples: 10,
        }
    }
}

impl Default for CombatAimbotCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatCheck for CombatAimbotCheck {
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
        self.enabled = c.aimbot.enabled;
        self.weight = c.aimbot.weight;
        self.max_snap_angle = c.aimbot.max_snap_angle;
        self.min_aim_variance = c.aimbot.min_aim_variance;
        self.max_aim_perfection = c.aimbot.max_aim_perfection;
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
        if context.aim_error_window().len() < self.min_samples {
            return Ok(CheckResult::clean(NAME));
        }

        let mut anomaly_score = 0.0;
        let mut explain = Explanation::new();

        // Snap-to-target: large instant rotation that lands dead-on
        let snap_angle = input.snap_angle();
        if snap_angle > self.max_snap_angle {
            let aim_error = input.aim_error();
            if aim_error < PERFECT_AIM_THRESHOLD {
                let snap_anomaly =
                    (snap_angle / self.max_snap_angle) * (1.0 - aim_error / PERFECT_AIM_THRESHOLD);
                anomaly_score += snap_anomaly;
                explain.insert("snapAngle".into(), json!(snap_angle));
                explain.insert("snapAnomaly".into(), json!(snap_anomaly));
            }
        }

        // Over-consistent aim: too accurate with too little variance
        let aim_variance = context.aim_error_window().std_dev();
        let mean_aim_error = context.aim_error_window().mean();
        if aim_variance < self.min_aim_variance && mean_aim_error < self.max_aim_perfection {
            let consistency_anomaly = (1.0 - aim_variance / self.min_aim_variance)
                * (1.0 - mean_aim_error / self.max_aim_perfection);
            anomaly_score += consistency_anomaly;
            explain.insert("aimVariance".into(), json!(aim_variance));
            explain.insert("meanAimError".into(), json!(mean_aim_error));
            explain.insert("consistencyAnomaly".into(), json!(consistency_anomaly));
        }

        // Robotic precision: near-zero MAD over a long window
        let aim_mad = context.aim_error_window().mad();
        if aim_mad < HUMAN_MIN_AIM_JITTER && context.aim_error_window().len() >= self.min_samples * 2
        {
            let robotic_anomaly = 1.0 - aim_mad / HUMAN_MIN_AIM_JITTER;
            anomaly_score += robotic_anomaly * 0.5;
            explain.insert("aimMad".into(), json!(aim_mad));
            explain.insert("roboticAnomaly".into(), json!(robotic_anomaly));
        }

        // Target-switch snap: instant retarget with perfect aim
        if let (Some(target), Some(last_target)) = (input.target_id, context.last_target_id()) {
            if target != last_target
                && snap_angle > 30.0
                && input.aim_error() < PERFECT_AIM_THRESHOLD
            {
                let switch_anomaly = (snap_angle / 90.0) * 0.5;
                anomaly_score += switch_anomaly;
                explain.insert("targetSwitchSnap".into(), json!(snap_angle));
            }
        }

        // Impossible rotation speed for the interval between attacks
        if input.time_since_last_attack > 0 {
            let time_seconds = input.time_since_last_attack as f64 / 1_000_000_000.0;
            let rotation_speed = snap_angle / time_seconds;
            let rotation_per_tick = snap_angle / (time_seconds * 20.0);
            if rotation_per_tick > MAX_HUMAN_SNAP_PER_TICK {
                let speed_anomaly =
                    (rotation_per_tick - MAX_HUMAN_SNAP_PER_TICK) / MAX_HUMAN_SNAP_PER_TICK;
                anomaly_score += speed_anomaly * 0.3;
                explain.insert("rotationSpeed".into(), json!(rotation_speed));
                explain.insert("rotationPerTick".into(), json!(rotation_per_tick));
            }
        }

        let confidence = stats::anomaly_to_confidence(anomaly_score, SCALE_FACTOR);
        let severity = (anomaly_score / 2.5).min(1.0);

        if confidence < 0.1 {
            return Ok(CheckResult::clean(NAME));
        }

        explain.insert("anomalyScore".into(), json!(anomaly_score));
        explain.insert("currentAimError".into(), json!(input.aim_error()));
        explain.insert("hitRate".into(), json!(context.recent_hit_rate()));

        Ok(CheckResult::violation(NAME, confidence, severity, explain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EYE_HEIGHT, NANOS_PER_MILLI};
    use uuid::Uuid;

    fn configured_check() -> CombatAimbotCheck {
        let mut check = CombatAimbotCheck::new();
        check.configure(&EngineConfig::default());
        check
    }

    fn context() -> CombatContext {
        CombatContext::new(Uuid::new_v4(), "Steve", 64, 20, 0.3)
    }

    /// A hit on a target straight ahead, with controllable aim offset and
    /// pre-attack rotation.
    fn hit(index: i64, yaw_offset: f32, pre_yaw: f32, target: Option<Uuid>) -> CombatInput {
        CombatInput {
            target_id: target,
            target_x: 0.0,
            target_y: EYE_HEIGHT,
            target_z: 2.5,
            attacker_yaw: yaw_offset,
            attacker_pitch: 0.0,
            pre_attack_yaw: pre_yaw,
            pre_attack_pitch: 0.0,
            nano_time: (index + 1) * 500 * NANOS_PER_MILLI,
            time_since_last_attack: 500 * NANOS_PER_MILLI,
            hit: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_when_under_sampled() {
        let check = configured_check();
        let mut ctx = context();
        for i in 0..5 {
            ctx.add_combat_input(hit(i, 5.0, 4.0, None));
        }
        let result = check.analyze(&hit(5, 0.1, 60.0, None), &ctx).unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_human_aim_is_clean() {
        let check = configured_check();
        let mut ctx = context();
        // Wandering aim error between 2 and 11 degrees
        for i in 0..15 {
            let offset = 2.0 + (i % 5) as f32 * 1.8 + (i % 3) as f32 * 0.7;
            ctx.add_combat_input(hit(i, offset, offset - 3.0, None));
        }
        let input = hit(15, 6.0, 4.0, None);
        let result = check.analyze(&input, &ctx).unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_perfect_snapping_aim_flagged() {
        let check = configured_check();
        let mut ctx = context();
        // Every attack: looking 130 degrees away, then snapping dead-on
        for i in 0..25 {
            let offset = 0.1 + (i % 3) as f32 * 0.1;
            ctx.add_combat_input(hit(i, offset, 130.0, None));
        }
        let input = hit(25, 0.15, 130.0, None);
        let result = check.analyze(&input, &ctx).unwrap();
        assert!(result.confidence > 0.8);
        assert!(result.explain.contains_key("snapAnomaly"));
        assert!(result.explain.contains_key("consistencyAnomaly"));
        assert!(result.explain.contains_key("roboticAnomaly"));
    }

    #[test]
    fn test_target_switch_snap_signal() {
        let check = configured_check();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut ctx = context();
        for i in 0..12 {
            ctx.add_combat_input(hit(i, 0.2, 40.0, Some(a)));
        }
        let input = hit(12, 0.2, 80.0, Some(b));
        let result = check.analyze(&input, &ctx).unwrap();
        assert!(result.explain.contains_key("targetSwitchSnap"));
    }

    #[test]
    fn test_impossible_rotation_signal() {
        let check = configured_check();
        let mut ctx = context();
        for i in 0..12 {
            ctx.add_combat_input(hit(i, 0.2, 100.0, None));
        }
        // 170-degree snap inside 10ms: far past any human rotation rate
        let mut input = hit(12, 0.2, 170.0, None);
        input.time_since_last_attack = 10 * NANOS_PER_MILLI;
        let result = check.analyze(&input, &ctx).unwrap();
        assert!(result.explain.contains_key("rotationSpeed"));
        assert!(result.explain.contains_key("rotationPerTick"));
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn test_result_bounds() {
        let check = configured_check();
        let mut ctx = context();
        for i in 0..30 {
            ctx.add_combat_input(hit(i, 0.05, 170.0, Some(Uuid::new_v4())));
        }
        let mut input = hit(30, 0.05, 179.0, Some(Uuid::new_v4()));
        input.time_since_last_attack = NANOS_PER_MILLI;
        let result = check.analyze(&input, &ctx).unwrap();
        assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
        assert!(result.severity >= 0.0 && result.severity <= 1.0);
    }
}
