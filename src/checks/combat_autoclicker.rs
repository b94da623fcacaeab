use serde_json::json;

use crate::config::EngineConfig;
use crate::constants::{NANOS_PER_MILLI, SUSPICIOUS_CPS};
use crate::context::CombatContext;
use crate::error::WardenError;
use crate::model::{CheckResult, CombatInput, Explanation, PlayerId};
use crate::stats;

use super::CombatCheck;

const NAME: &str = "CombatAutoClicker";
const CATEGORY: &str = "combat";
const SCALE_FACTOR: f64 = 1.8;

/// Sustained total hit rate above this, over enough attacks, points at
/// an aura rather than a good player.
const SUSTAINED_HIT_RATE_THRESHOLD: f64 = 0.90;

/// Detects auto-clickers and killaura from attack cadence and hit
/// patterns.
///
/// Auto-clickers betray themselves twice: intervals too fast for a human
/// hand, and intervals too regular for one. Killaura adds hits the
/// player was not even looking at.
pub struct CombatAutoClickerCheck {
    enabled: bool,
    weight: f64,
    max_hit_rate: f64,
    min_attack_interval: f64,
    max_interval_consistency: f64,
    min_samples: usize,
}

impl CombatAutoClickerCheck {
    pub fn new() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_hit_rate: 0.85,
            min_attack_interval: 50.0,
            max_interval_consistency: 0.05,
            min_samples: 10,
        }
    }

    /// Counts target switches within the last `lookback` attacks whose
    /// gap to the previous attack was under `threshold_ms`.
    fn count_quick_target_switches(
        &self,
        context: &CombatContext,
        lookback: usize,
        threshold_ms: i64,
    ) -> usize {
        let history = context.combat_history();
        let count = lookback.min(history.len());
        let mut quick_switches = 0;
        let mut last_target: Option<PlayerId> = None;
        let mut last_time = 0i64;

        for age in 0..count {
            let Some(event) = history.get(age) else {
                break;
            };
            if let Some(target) = event.target_id {
                if let Some(last) = last_target {
                    if last != target {
                        let gap_ms = (event.nano_time - last_time).abs() / NANOS_PER_MILLI;
                        if gap_ms < threshold_ms {
                            quick_switches += 1;
                        }
                    }
                }
                last_target = Some(target);
                last_time = event.nano_time;
            }
        }
        quick_switches
    }
}

impl Default for CombatAutoClickerCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatCheck for CombatAutoClickerCheck {
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
        self.enabled = c.auto_clicker.enabled;
        self.weight = c.auto_clicker.weight;
        self.max_hit_rate = c.auto_clicker.max_hit_rate;
        self.min_attack_interval = c.auto_clicker.min_attack_interval_ms;
        self.max_interval_consistency = c.auto_clicker.max_interval_consistency;
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
        if context.combat_history().len() < self.min_samples {
            return Ok(CheckResult::clean(NAME));
        }

        let mut anomaly_score = 0.0;
        let mut explain = Explanation::new();

        // Hit rate over the rolling window
        let recent_hit_rate = context.recent_hit_rate();
        let total_hit_rate = context.total_hit_rate();

        if recent_hit_rate > self.max_hit_rate
            && context.hit_rate_window().len() >= self.min_samples
        {
            let excess = recent_hit_rate - self.max_hit_rate;
            let hit_rate_anomaly = excess / (1.0 - self.max_hit_rate);
            anomaly_score += hit_rate_anomaly * 2.0;
            explain.insert("recentHitRate".into(), json!(recent_hit_rate));
            explain.insert("hitRateAnomaly".into(), json!(hit_rate_anomaly));
        }

        if total_hit_rate > SUSTAINED_HIT_RATE_THRESHOLD
            && context.total_attacks() as usize >= self.min_samples * 3
        {
            let sustained_anomaly = (total_hit_rate - SUSTAINED_HIT_RATE_THRESHOLD) * 2.0;
            anomaly_score += sustained_anomaly;
            explain.insert("totalHitRate".into(), json!(total_hit_rate));
            explain.insert("sustainedHighHitRate".into(), json!(true));
        }

        // Click cadence
        if context.attack_interval_window().len() >= self.min_samples {
            let mean_interval = context.attack_interval_window().mean();
            let cps = if mean_interval > 0.0 {
                1000.0 / mean_interval
            } else {
                0.0
            };

            if cps > SUSPICIOUS_CPS {
                let cps_anomaly = (cps - SUSPICIOUS_CPS) / SUSPICIOUS_CPS;
                anomaly_score += cps_anomaly * 2.5;
                explain.insert("cps".into(), json!(cps));
                explain.insert("cpsAnomaly".into(), json!(cps_anomaly));
            }

            let min_interval = context.attack_interval_window().min();
            if min_interval < self.min_attack_interval {
                let cooldown_violation =
                    (self.min_attack_interval - min_interval) / self.min_attack_interval;
                anomaly_score += cooldown_violation;
                explain.insert("minInterval".into(), json!(min_interval));
                explain.insert("cooldownViolation".into(), json!(cooldown_violation));
            }

            explain.insert("meanAttackInterval".into(), json!(mean_interval));
        }

        // Interval over-consistency over a longer window
        if context.attack_interval_window().len() >= self.min_samples * 2 {
            let interval_mad = context.attack_interval_window().mad();
            let mean_interval = context.attack_interval_window().mean();
            let interval_cv = if mean_interval > 0.0 {
                interval_mad / mean_interval
            } else {
                0.0
            };

            if interval_cv < self.max_interval_consistency {
                let consistency_anomaly =
                    (self.max_interval_consistency - interval_cv) / self.max_interval_consistency;
                anomaly_score += consistency_anomaly * 1.5;
                explain.insert("intervalConsistency".into(), json!(interval_cv));
                explain.insert("consistencyAnomaly".into(), json!(consistency_anomaly));
            }
        }

        // Hits the player was not looking at
        let aim_error = input.aim_error();
        if input.hit && aim_error > 90.0 {
            let look_away_anomaly = (aim_error - 90.0) / 90.0;
            anomaly_score += look_away_anomaly * 3.0;
            explain.insert("aimError".into(), json!(aim_error));
            explain.insert("lookAwayHit".into(), json!(true));
        } else if input.hit && aim_error > 45.0 {
            let edge_hit_anomaly = (aim_error - 45.0) / 45.0;
            anomaly_score += edge_hit_anomaly * 0.5;
            explain.insert("edgeAimError".into(), json!(aim_error));
        }

        // Rapid retargeting
        if context.combat_history().len() >= 3 {
            let quick_switches = self.count_quick_target_switches(context, 5, 500);
            if quick_switches >= 3 {
                anomaly_score += quick_switches as f64 * 0.3;
                explain.insert("quickTargetSwitches".into(), json!(quick_switches));
            }
        }

        // Critical over-rate
        let crit_rate = context.critical_rate();
        if crit_rate > 0.7 && context.total_hits() as usize >= self.min_samples {
            let crit_anomaly = (crit_rate - 0.5) * 1.5;
            if crit_anomaly > 0.0 {
                anomaly_score += crit_anomaly;
                explain.insert("criticalRate".into(), json!(crit_rate));
            }
        }

        let confidence = stats::anomaly_to_confidence(anomaly_score, SCALE_FACTOR);
        let severity = (anomaly_score / 3.0).min(1.0);

        if confidence < 0.1 {
            return Ok(CheckResult::clean(NAME));
        }

        explain.insert("anomalyScore".into(), json!(anomaly_score));
        explain.insert("totalAttacks".into(), json!(context.total_attacks()));

        Ok(CheckResult::violation(NAME, confidence, severity, explain))
    }
}
