//! Engine configuration.
//!
//! Strongly-shaped configuration tree mirroring the on-disk JSON layout.
//! Every field has a default, unknown fields are tolerated, and
//! [`EngineConfig::normalize`] clamps numeric values into their legal
//! ranges so a hand-edited file cannot push thresholds out of [0, 1] or
//! shrink buffers to zero.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::WardenError;
use crate::model::PlayerId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ThresholdsConfig,
    pub windows: WindowsConfig,
    pub history: HistoryConfig,
    pub stats: StatsConfig,
    pub checks: ChecksConfig,
    pub actions: ActionsConfig,
    pub exemptions: ExemptionsConfig,
    pub analytics: AnalyticsConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Minimum aggregated confidence for a violation to be emitted.
    pub action_confidence: f64,
    /// Minimum aggregated severity for a violation to be emitted.
    pub min_severity: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            action_confidence: 0.997,
            min_severity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsConfig {
    /// Short exemption after transient events (teleport clear, etc).
    pub exemption_ms: u64,
    /// Minimum interval between consecutive violations per player.
    pub cooldown_ms: u64,
    /// Longer grace after a detected lag spike.
    pub lag_grace_ms: u64,
    /// Grace period after joining the server.
    pub join_exemption_ms: u64,
    /// Grace period after a teleport.
    pub teleport_exemption_ms: u64,
    /// Grace period after a world change.
    pub world_change_exemption_ms: u64,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            exemption_ms: 250,
            cooldown_ms: 1500,
            lag_grace_ms: 500,
            join_exemption_ms: 1000,
            teleport_exemption_ms: 500,
            world_change_exemption_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Capacity of the telemetry and feature ring buffers.
    pub size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { size: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Capacity of the rolling statistics windows.
    pub median_window: usize,
    /// EWMA smoothing factor, clamped into (0, 1].
    pub ewma_alpha: f64,
    pub use_ewma: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            median_window: 20,
            ewma_alpha: 0.3,
            use_ewma: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub packet_timing: PacketTimingConfig,
    pub movement_consistency: MovementConsistencyConfig,
    pub prediction_drift: PredictionDriftConfig,
    pub combat: CombatChecksConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketTimingConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Deltas below this many milliseconds count as burst packets.
    pub min_delta_ms: f64,
    /// Maximum tolerated stddev/mean ratio of packet deltas.
    pub max_jitter_coefficient: f64,
}

impl Default for PacketTimingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            min_delta_ms: 5.0,
            max_jitter_coefficient: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConsistencyConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Maximum horizontal speed in world units per tick.
    pub max_horiz_speed: f64,
    /// Maximum vertical speed in world units per tick.
    pub max_vert_speed: f64,
    /// Acceleration ceiling as a multiple of max horizontal speed.
    pub accel_tolerance: f64,
}

impl Default for MovementConsistencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_horiz_speed: 0.8,
            max_vert_speed: 0.6,
            accel_tolerance: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionDriftConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Samples averaged for the velocity prediction, and the minimum
    /// consecutive-drift streak required before flagging.
    pub min_drift_samples: usize,
    /// Base drift threshold in world units, before ping adjustment.
    pub max_drift_threshold: f64,
}

impl Default for PredictionDriftConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            min_drift_samples: 5,
            max_drift_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatChecksConfig {
    /// Minimum samples before any combat statistic is trusted.
    pub min_samples: usize,
    pub aimbot: CombatAimbotConfig,
    pub reach: CombatReachConfig,
    pub auto_clicker: CombatAutoClickerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatAimbotConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Instant rotation beyond this many degrees is a snap.
    pub max_snap_angle: f64,
    /// Aim-error stddev below this is suspiciously consistent.
    pub min_aim_variance: f64,
    /// Mean aim error below this is suspiciously accurate.
    pub max_aim_perfection: f64,
}

impl Default for CombatAimbotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_snap_angle: 45.0,
            min_aim_variance: 1.0,
            max_aim_perfection: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatReachConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Maximum allowed reach in world units.
    pub max_reach: f64,
    /// Extra slack on top of max reach before ping compensation.
    pub reach_buffer: f64,
}

impl Default for CombatReachConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_reach: 3.0,
            reach_buffer: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatAutoClickerConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Rolling hit rate above this is suspicious.
    pub max_hit_rate: f64,
    /// Minimum milliseconds between attacks.
    pub min_attack_interval_ms: f64,
    /// Interval MAD/mean ratio below this is machine-like clicking.
    pub max_interval_consistency: f64,
}

impl Default for CombatAutoClickerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            max_hit_rate: 0.85,
            min_attack_interval_ms: 50.0,
            max_interval_consistency: 0.05,
        }
    }
}

impl Default for CombatChecksConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            aimbot: CombatAimbotConfig::default(),
            reach: CombatReachConfig::default(),
            auto_clicker: CombatAutoClickerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    pub alerts: AlertsConfig,
    pub punishment: PunishmentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    /// Also log alerts to the server console.
    pub console_log: bool,
    /// Message template. Tokens: {player} {category} {confidence}
    /// {severity} {explanation}.
    pub format: String,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console_log: true,
            format: "[warden] {player} flagged for {category} (conf: {confidence}, sev: {severity})"
                .into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PunishmentConfig {
    pub enabled: bool,
    /// One of KICK, TEMP_MUTE, FLAG_ONLY. Invalid values fall back to
    /// FLAG_ONLY with a warning.
    #[serde(rename = "type")]
    pub kind: String,
    /// Minimum confidence before punishment is considered.
    pub threshold: f64,
    /// Delay before the punishment executes, after the alert.
    pub delay_ms: u64,
}

impl Default for PunishmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: "FLAG_ONLY".into(),
            threshold: 0.999,
            delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExemptionsConfig {
    /// Player ids that are never checked. Invalid entries are skipped
    /// with a warning.
    pub whitelist: Vec<String>,
    pub bypass_permission: String,
    pub exempt_creative: bool,
    pub exempt_spectator: bool,
}

impl Default for ExemptionsConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            bypass_permission: "warden.bypass".into(),
            exempt_creative: true,
            exempt_spectator: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".into(),
            port: 9099,
            connect_timeout_ms: 3000,
            reconnect_delay_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub debug: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { debug: false }
    }
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn clamp_weight(value: f64) -> f64 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 10.0)
    }
}

impl EngineConfig {
    /// Parses configuration from a JSON string. Unknown fields are
    /// tolerated; the result is normalized.
    pub fn from_json(json: &str) -> Result<Self, WardenError> {
        let mut config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| WardenError::config(format!("invalid config JSON: {e}")))?;
        config.normalize();
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, WardenError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            WardenError::config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&text)
    }

    /// Clamps every numeric field into its legal range.
    pub fn normalize(&mut self) {
        self.thresholds.action_confidence = clamp01(self.thresholds.action_confidence);
        self.thresholds.min_severity = clamp01(self.thresholds.min_severity);

        self.history.size = self.history.size.max(1);
        self.stats.median_window = self.stats.median_window.max(1);
        if !(self.stats.ewma_alpha > 0.0) || self.stats.ewma_alpha > 1.0 {
            warn!(
                alpha = self.stats.ewma_alpha,
                "ewma_alpha outside (0, 1], using default 0.3"
            );
            self.stats.ewma_alpha = 0.3;
        }

        self.checks.packet_timing.weight = clamp_weight(self.checks.packet_timing.weight);
        self.checks.movement_consistency.weight =
            clamp_weight(self.checks.movement_consistency.weight);
        self.checks.prediction_drift.weight = clamp_weight(self.checks.prediction_drift.weight);
        self.checks.combat.aimbot.weight = clamp_weight(self.checks.combat.aimbot.weight);
        self.checks.combat.reach.weight = clamp_weight(self.checks.combat.reach.weight);
        self.checks.combat.auto_clicker.weight =
            clamp_weight(self.checks.combat.auto_clicker.weight);

        self.checks.prediction_drift.min_drift_samples =
            self.checks.prediction_drift.min_drift_samples.max(1);
        self.checks.combat.min_samples = self.checks.combat.min_samples.max(1);

        self.actions.punishment.threshold = clamp01(self.actions.punishment.threshold);
    }

    /// Parses the whitelist into player ids, skipping invalid entries
    /// with a warning.
    pub fn parsed_whitelist(&self) -> HashSet<PlayerId> {
        let mut out = HashSet::with_capacity(self.exemptions.whitelist.len());
        for entry in &self.exemptions.whitelist {
            match Uuid::parse_str(entry) {
                Ok(id) => {
                    out.insert(id);
                }
                Err(_) => warn!(entry = %entry, "skipping malformed whitelist entry"),
            }
        }
        out
    }

    /// Exemption window in nanoseconds.
    pub fn exemption_nanos(&self) -> i64 {
        (self.windows.exemption_ms as i64) * crate::constants::NANOS_PER_MILLI
    }

    /// Cooldown window in nanoseconds.
    pub fn cooldown_nanos(&self) -> i64 {
        (self.windows.cooldown_ms as i64) * crate::constants::NANOS_PER_MILLI
    }

    /// Lag grace window in nanoseconds.
    pub fn lag_grace_nanos(&self) -> i64 {
        (self.windows.lag_grace_ms as i64) * crate::constants::NANOS_PER_MILLI
    }
}
