use serde::{Deserialize, Serialize};

/// Normalized telemetry from one player movement event.
///
/// Deltas are relative to the previous event; rotation deltas are
/// normalized into [-180, 180] degrees by the host glue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryInput {
    // Movement deltas in world units
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,

    // Rotation
    pub yaw: f32,
    pub pitch: f32,
    pub delta_yaw: f32,
    pub delta_pitch: f32,

    // State flags
    pub on_ground: bool,
    pub in_vehicle: bool,
    pub teleporting: bool,
    pub swimming: bool,
    pub gliding: bool,
    pub climbing: bool,

    /// Round-trip latency in milliseconds as reported by the host.
    pub ping: i64,

    /// Monotonic timestamp of this event in nanoseconds.
    pub nano_time: i64,
    /// Nanoseconds since the previous event for this player (0 for the
    /// first event).
    pub tick_delta: i64,
}

impl TelemetryInput {
    /// Horizontal (XZ plane) speed in world units per event.
    pub fn horizontal_speed(&self) -> f64 {
        (self.dx * self.dx + self.dz * self.dz).sqrt()
    }

    /// 3D speed magnitude.
    pub fn speed_3d(&self) -> f64 {
        (self.dx * self.dx + self.dy * self.dy + self.dz * self.dz).sqrt()
    }

    /// True when any physics-overriding movement state is active.
    /// `on_ground` is ordinary movement and does not count.
    pub fn has_special_movement(&self) -> bool {
        self.in_vehicle || self.teleporting || self.swimming || self.gliding || self.climbing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_speed() {
        let input = TelemetryInput {
            dx: 3.0,
            dz: 4.0,
            ..Default::default()
        };
        assert!((input.horizontal_speed() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_3d() {
        let input = TelemetryInput {
            dx: 1.0,
            dy: 2.0,
            dz: 2.0,
            ..Default::default()
        };
        assert!((input.speed_3d() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_special_movement_excludes_on_ground() {
        let grounded = TelemetryInput {
            on_ground: true,
            ..Default::default()
        };
        assert!(!grounded.has_special_movement());

        let gliding = TelemetryInput {
            gliding: true,
            ..Default::default()
        };
        assert!(gliding.has_special_movement());
    }
}
