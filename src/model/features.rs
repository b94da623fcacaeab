use serde::{Deserialize, Serialize};

/// Derived metrics computed from raw telemetry for check analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    // Speed in world units per event
    pub horiz_speed: f64,
    pub vert_speed: f64,
    pub speed_3d: f64,

    // Change in speed since the previous event
    pub horiz_accel: f64,
    pub vert_accel: f64,

    // Rotation
    pub rotation_speed: f64,
    pub yaw_accel: f64,
    pub pitch_accel: f64,

    /// Irregularity of recent horizontal speed changes.
    pub jitter_score: f64,
    /// Relative deviation of packet timing from the ping-adjusted tick
    /// interval.
    pub timing_skew: f64,

    /// EWMA-smoothed ping when available, raw ping otherwise.
    pub ping_normalized: i64,
    /// True when the player appears to be lagging; checks are skipped
    /// for the event.
    pub is_lagging: bool,
    /// Telemetry history size at extraction time.
    pub sample_count: usize,
}
