//! Detection checks.
//!
//! Every check turns one event plus player history into a
//! [`CheckResult`]: a confidence in [0, 1], a severity in [0, 1], and a
//! map of diagnostic signals. Checks return a clean result when disabled,
//! under-sampled, or in a skip condition; they never error the pipeline
//! for ordinary missing data.
//!
//! Movement checks see `(TelemetryInput, Features, PlayerContext)`;
//! combat checks see `(CombatInput, CombatContext)`.

mod combat_aimbot;
mod combat_autoclicker;
mod combat_reach;
mod movement_consistency;
mod packet_timing;
mod prediction_drift;

pub use combat_aimbot::CombatAimbotCheck;
pub use combat_autoclicker::CombatAutoClickerCheck;
pub use combat_reach::CombatReachCheck;
pub use movement_consistency::MovementConsistencyCheck;
pub use packet_timing::PacketTimingCheck;
pub use prediction_drift::PredictionDriftCheck;

use crate::config::EngineConfig;
use crate::context::{CombatContext, PlayerContext};
use crate::error::WardenError;
use crate::model::{CheckResult, CombatInput, Features, TelemetryInput};

/// A movement/timing check over the telemetry stream.
pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;

    /// Broad grouping: "movement", "timing".
    fn category(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    /// Weight for experimental weighted fusion.
    fn weight(&self) -> f64;

    /// Applies configuration. Called at initialization and on reload.
    fn configure(&mut self, config: &EngineConfig);

    /// Analyzes one event. Failure is reported through the error variant,
    /// never by panicking; the engine drops failed results and continues.
    fn analyze(
        &self,
        input: &TelemetryInput,
        features: &Features,
        context: &PlayerContext,
    ) -> Result<CheckResult, WardenError>;
}

/// A combat check over the attack stream.
pub trait CombatCheck: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn weight(&self) -> f64;

    fn configure(&mut self, config: &EngineConfig);

    fn analyze(
        &self,
        input: &CombatInput,
        context: &CombatContext,
    ) -> Result<CheckResult, WardenError>;
}

/// Registry of movement checks. Owns the built-in set; custom checks can
/// be registered as long as their names are unique.
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self {
            checks: vec![
                Box::new(PacketTimingCheck::new()),
                Box::new(MovementConsistencyCheck::new()),
                Box::new(PredictionDriftCheck::new()),
            ],
        }
    }

    pub fn configure(&mut self, config: &EngineConfig) {
        for check in &mut self.checks {
            check.configure(config);
        }
    }

    /// Currently enabled checks, in registration order.
    pub fn enabled(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.as_ref())
    }

    pub fn enabled_count(&self) -> usize {
        self.checks.iter().filter(|c| c.is_enabled()).count()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&dyn Check> {
        self.checks
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn register(&mut self, check: Box<dyn Check>) {
        if self.get_by_name(check.name()).is_none() {
            self.checks.push(check);
        }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of combat checks.
pub struct CombatCheckRegistry {
    checks: Vec<Box<dyn CombatCheck>>,
}

impl CombatCheckRegistry {
    pub fn new() -> Self {
        Self {
            checks: vec![
                Box::new(CombatAimbotCheck::new()),
                Box::new(CombatReachCheck::new()),
                Box::new(CombatAutoClickerCheck::new()),
            ],
        }
    }

    pub fn configure(&mut self, config: &EngineConfig) {
        for check in &mut self.checks {
            check.configure(config);
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &dyn CombatCheck> {
        self.checks
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.as_ref())
    }

    pub fn enabled_count(&self) -> usize {
        self.checks.iter().filter(|c| c.is_enabled()).count()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&dyn CombatCheck> {
        self.checks
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn register(&mut self, check: Box<dyn CombatCheck>) {
        if self.get_by_name(check.name()).is_none() {
            self.checks.push(check);
        }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CombatCheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}
