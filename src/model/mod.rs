//! Event and result types flowing through the detection pipeline.
//!
//! Inputs ([`TelemetryInput`], [`CombatInput`]) are immutable snapshots
//! built by the host glue; everything derived from them
//! ([`Features`], [`CheckResult`], [`Violation`], [`Decision`]) is also
//! immutable. Mutable per-player state lives in [`crate::context`].

mod combat;
mod decision;
mod features;
mod result;
mod telemetry;
mod violation;

pub use combat::CombatInput;
pub use decision::{Action, Decision};
pub use features::Features;
pub use result::{CheckResult, Explanation};
pub use telemetry::TelemetryInput;
pub use violation::Violation;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque 128-bit player identity. Display names are informational only;
/// all indexing is by id.
pub type PlayerId = Uuid;

/// Host-reported gamemode, used for exemption gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gamemode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl Default for Gamemode {
    fn default() -> Self {
        Self::Survival
    }
}

/// Snapshot of player identity and host-side state supplied with each
/// ingested event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    pub player_name: String,
    pub gamemode: Gamemode,
    /// Whether the host reports the player holds the configured bypass
    /// capability.
    pub has_bypass: bool,
}

impl PlayerProfile {
    pub fn new(player_id: PlayerId, player_name: impl Into<String>) -> Self {
        Self {
            player_id,
            player_name: player_name.into(),
            gamemode: Gamemode::Survival,
            has_bypass: false,
        }
    }
}
