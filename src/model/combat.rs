use serde::{Deserialize, Serialize};

use super::PlayerId;
use crate::constants::EYE_HEIGHT;

/// Normalized telemetry from one player attack event.
///
/// Carries the attacker's rotation both at the attack frame and one frame
/// earlier; the difference is the snap angle used by aim analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatInput {
    pub attacker_id: Option<PlayerId>,
    pub attacker_name: String,

    /// Target entity id; None when the swing hit nothing identifiable.
    pub target_id: Option<PlayerId>,
    pub target_x: f64,
    pub target_y: f64,
    pub target_z: f64,

    pub attacker_x: f64,
    pub attacker_y: f64,
    pub attacker_z: f64,
    pub attacker_yaw: f32,
    pub attacker_pitch: f32,

    /// Rotation one frame before the attack, for snap detection.
    pub pre_attack_yaw: f32,
    pub pre_attack_pitch: f32,

    pub nano_time: i64,
    /// Nanoseconds since this player's previous attack.
    pub time_since_last_attack: i64,

    pub hit: bool,
    pub damage: f64,
    pub critical: bool,

    pub ping: i64,
}

impl CombatInput {
    /// 3D distance from attacker to target at attack time.
    pub fn distance_to_target(&self) -> f64 {
        let dx = self.target_x - self.attacker_x;
        let dy = self.target_y - self.attacker_y;
        let dz = self.target_z - self.attacker_z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// XZ-plane distance from attacker to target.
    pub fn horizontal_distance_to_target(&self) -> f64 {
        let dx = self.target_x - self.attacker_x;
        let dz = self.target_z - self.attacker_z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Magnitude of the rotation change between the pre-attack frame and
    /// the attack frame, in degrees.
    pub fn snap_angle(&self) -> f64 {
        let mut yaw_diff = (self.attacker_yaw - self.pre_attack_yaw).abs();
        if yaw_diff > 180.0 {
            yaw_diff = 360.0 - yaw_diff;
        }
        let pitch_diff = (self.attacker_pitch - self.pre_attack_pitch).abs();
        ((yaw_diff * yaw_diff + pitch_diff * pitch_diff) as f64).sqrt()
    }

    /// Yaw that would face the target's center, in degrees.
    pub fn expected_yaw(&self) -> f32 {
        let dx = self.target_x - self.attacker_x;
        let dz = self.target_z - self.attacker_z;
        (-dx).atan2(dz).to_degrees() as f32
    }

    /// Pitch that would face the target's center from eye height, in
    /// degrees.
    pub fn expected_pitch(&self) -> f32 {
        let dx = self.target_x - self.attacker_x;
        let dy = self.target_y - (self.attacker_y + EYE_HEIGHT);
        let dz = self.target_z - self.attacker_z;
        let horizontal = (dx * dx + dz * dz).sqrt();
        (-dy.atan2(horizontal).to_degrees()) as f32
    }

    /// Angular distance in degrees between the actual view direction and
    /// the direction that would face the target. 0 = perfect aim.
    pub fn aim_error(&self) -> f64 {
        let mut yaw_error = (self.attacker_yaw - self.expected_yaw()).abs();
        if yaw_error > 180.0 {
            yaw_error = 360.0 - yaw_error;
        }
        let pitch_error = (self.attacker_pitch - self.expected_pitch()).abs();
        ((yaw_error * yaw_error + pitch_error * pitch_error) as f64).sqrt()
    }
}
