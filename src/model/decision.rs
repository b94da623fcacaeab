use serde::{Deserialize, Serialize};

use super::Violation;

/// Action selected by the mitigation policy for a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// No action: violation below threshold, exempt, or on cooldown.
    None,
    /// Flag for review without immediate action.
    Flag,
    /// Alert staff only.
    Alert,
    /// Punish the player.
    Punish,
}

/// Final outcome of the mitigation policy for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// Present for every action except [`Action::None`].
    pub violation: Option<Violation>,
    pub reason: String,
}

impl Decision {
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            action: Action::None,
            violation: None,
            reason: reason.into(),
        }
    }

    pub fn alert(violation: Violation) -> Self {
        Self {
            action: Action::Alert,
            violation: Some(violation),
            reason: "confidence exceeded alert threshold".into(),
        }
    }

    pub fn punish(violation: Violation) -> Self {
        Self {
            action: Action::Punish,
            violation: Some(violation),
            reason: "confidence exceeded punishment threshold".into(),
        }
    }

    pub fn flag(violation: Violation) -> Self {
        Self {
            action: Action::Flag,
            violation: Some(violation),
            reason: "flagged for manual review".into(),
        }
    }

    pub fn requires_action(&self) -> bool {
        self.action != Action::None
    }
}
