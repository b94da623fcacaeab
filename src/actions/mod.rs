//! Alert publishing, punishment execution, and whitelisting.
//!
//! The engine talks to the host game through the [`AlertSink`] and
//! [`PunishExecutor`] traits; everything here is a thin formatting and
//! routing layer. Dispatch failures are logged and swallowed so engine
//! state is never affected by a broken chat pipe.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::engine::TaskScheduler;
use crate::error::WardenError;
use crate::mitigation::PunishmentKind;
use crate::model::{Action, Decision, PlayerId, Violation};

/// Host-side alert transport (staff chat broadcast).
pub trait AlertSink: Send + Sync {
    fn broadcast(&self, message: &str) -> Result<(), WardenError>;
}

/// Host-side punishment transport.
pub trait PunishExecutor: Send + Sync {
    fn kick(&self, player_id: PlayerId, player_name: &str, reason: &str)
        -> Result<(), WardenError>;

    fn mute(&self, player_id: PlayerId, player_name: &str, reason: &str)
        -> Result<(), WardenError>;
}

/// Formats violations and routes them to the console and the alert sink.
pub struct AlertPublisher {
    enabled: bool,
    console_log: bool,
    format: String,
    sink: Option<Arc<dyn AlertSink>>,
}

impl AlertPublisher {
    pub fn new() -> Self {
        let defaults = crate::config::AlertsConfig::default();
        Self {
            enabled: defaults.enabled,
            console_log: defaults.console_log,
            format: defaults.format,
            sink: None,
        }
    }

    pub fn configure(&mut self, config: &EngineConfig) {
        self.enabled = config.actions.alerts.enabled;
        self.console_log = config.actions.alerts.console_log;
        self.format = config.actions.alerts.format.clone();
    }

    pub fn set_sink(&mut self, sink: Arc<dyn AlertSink>) {
        self.sink = Some(sink);
    }

    /// Publishes one violation alert. Failures are logged, never
    /// propagated.
    pub fn publish(&self, violation: &Violation) {
        if !self.enabled {
            return;
        }

        let message = self.format_message(violation);

        if self.console_log {
            warn!(
                player = %violation.player_name,
                category = %violation.category,
                confidence = violation.confidence,
                "{message}"
            );
        }

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.broadcast(&message) {
                warn!(error = %e, "alert broadcast failed");
            }
        }
    }

    fn format_message(&self, violation: &Violation) -> String {
        self.format
            .replace("{player}", &violation.player_name)
            .replace("{category}", &violation.category)
            .replace("{confidence}", &format!("{:.4}", violation.confidence))
            .replace("{severity}", &format!("{:.2}", violation.severity))
            .replace("{explanation}", &violation.formatted_explanation())
    }
}

impl Default for AlertPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes punishments for decisions that crossed the punishment
/// threshold, optionally after a configured delay.
pub struct PunishmentHandler {
    enabled: bool,
    kind: PunishmentKind,
    threshold: f64,
    delay: Duration,
    executor: Option<Arc<dyn PunishExecutor>>,
}

impl PunishmentHandler {
    pub fn new() -> Self {
        Self {
            enabled: false,
            kind: PunishmentKind::FlagOnly,
            threshold: 0.999,
            delay: Duration::ZERO,
            executor: None,
        }
    }

    pub fn configure(&mut self, config: &EngineConfig) {
        self.enabled = config.actions.punishment.enabled;
        self.threshold = config.actions.punishment.threshold;
        self.delay = Duration::from_millis(config.actions.punishment.delay_ms);
        self.kind = match PunishmentKind::parse(&config.actions.punishment.kind) {
            Some(kind) => kind,
            None => {
                warn!(
                    kind = %config.actions.punishment.kind,
                    "invalid punishment type, defaulting to FLAG_ONLY"
                );
                PunishmentKind::FlagOnly
            }
        };
    }

    pub fn set_executor(&mut self, executor: Arc<dyn PunishExecutor>) {
        self.executor = Some(executor);
    }

    /// Executes the punishment for a PUNISH decision. The alert for the
    /// same violation has already been dispatched by the caller.
    pub fn execute(&self, decision: &Decision, scheduler: &dyn TaskScheduler) {
        if !self.enabled || decision.action != Action::Punish {
            return;
        }
        let Some(violation) = &decision.violation else {
            return;
        };
        if violation.confidence < self.threshold {
            return;
        }
        let Some(executor) = self.executor.clone() else {
            info!(
                player = %violation.player_name,
                "no punish executor attached, flagging only"
            );
            return;
        };

        let kind = self.kind;
        let violation = violation.clone();
        let apply = move || apply_punishment(kind, &executor, &violation);

        if self.delay.is_zero() {
            apply();
        } else {
            scheduler.schedule(self.delay, Box::new(apply));
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

fn apply_punishment(kind: PunishmentKind, executor: &Arc<dyn PunishExecutor>, violation: &Violation) {
    let result = match kind {
        PunishmentKind::Kick => {
            let reason = format!(
                "You have been kicked for suspicious activity.\nCategory: {}\nIf you believe this is an error, please contact server staff.",
                violation.category
            );
            executor.kick(violation.player_id, &violation.player_name, &reason)
        }
        PunishmentKind::TempMute => executor.mute(
            violation.player_id,
            &violation.player_name,
            "You have been muted for suspicious activity.",
        ),
        PunishmentKind::FlagOnly => {
            info!(
                player = %violation.player_name,
                category = %violation.category,
                confidence = violation.confidence,
                "flagged for review"
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(player = %violation.player_name, error = %e, "punishment dispatch failed");
    }
}

impl Default for PunishmentHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Player exemption sets: the configured permanent whitelist plus
/// temporary exemptions granted by admin commands.
///
/// Safe for concurrent mutation from admin commands while the ingest
/// loop reads it.
pub struct WhitelistManager {
    whitelist: RwLock<HashSet<PlayerId>>,
    temporary: RwLock<HashSet<PlayerId>>,
}

impl WhitelistManager {
    pub fn new() -> Self {
        Self {
            whitelist: RwLock::new(HashSet::new()),
            temporary: RwLock::new(HashSet::new()),
        }
    }

    /// Replaces the permanent whitelist from configuration. Temporary
    /// exemptions are unaffected.
    pub fn configure(&self, config: &EngineConfig) {
        *self.whitelist.write() = config.parsed_whitelist();
    }

    pub fn add_to_whitelist(&self, player_id: PlayerId) {
        self.whitelist.write().insert(player_id);
    }

    pub fn remove_from_whitelist(&self, player_id: PlayerId) {
        self.whitelist.write().remove(&player_id);
    }

    pub fn is_whitelisted(&self, player_id: PlayerId) -> bool {
        self.whitelist.read().contains(&player_id)
    }

    pub fn add_temporary_exemption(&self, player_id: PlayerId) {
        self.temporary.write().insert(player_id);
    }

    pub fn remove_temporary_exemption(&self, player_id: PlayerId) {
        self.temporary.write().remove(&player_id);
    }

    /// True when the player is whitelisted or temporarily exempt; the
    /// ingest path skips all work for such players.
    pub fn is_exempt(&self, player_id: PlayerId) -> bool {
        self.whitelist.read().contains(&player_id) || self.temporary.read().contains(&player_id)
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.read().len()
    }
}

impl Default for WhitelistManager {
    fn default() -> Self {
        Self::new()
    }
}
