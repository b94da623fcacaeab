//! Engine orchestrator.
//!
//! Wires the ingest callbacks through feature extraction, the check
//! registries, the aggregator, and the mitigation policy, then
//! dispatches the resulting decisions. Also owns the player lifecycle
//! hooks (join/quit/teleport/world change) and the admin surface
//! (status/reload/exempt).
//!
//! Concurrency model: each player has a single ingest owner at a time;
//! the engine only synchronizes the id-to-context map and the component
//! configuration. The hot path never blocks on I/O; alerts, punishments,
//! and scheduled flag clears are handed to the [`TaskScheduler`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::actions::{AlertPublisher, AlertSink, PunishExecutor, PunishmentHandler, WhitelistManager};
use crate::aggregate::Aggregator;
use crate::analytics::AnalyticsClient;
use crate::checks::{CheckRegistry, CombatCheckRegistry};
use crate::clock::MonoClock;
use crate::config::EngineConfig;
use crate::context::HistoryStore;
use crate::error::WardenError;
use crate::features::FeatureExtractor;
use crate::mitigation::MitigationPolicy;
use crate::model::{
    Action, CheckResult, CombatInput, Decision, PlayerId, PlayerProfile, TelemetryInput,
};

/// Deferred-execution hook into the host's scheduler (main-thread
/// executor or equivalent). Scheduled tasks must be idempotent: a task
/// that fires after its player quit is a no-op.
pub trait TaskScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>);
}

/// Scheduler backed by a tokio runtime.
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

/// Snapshot of engine state for the admin `status` command.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub running: bool,
    pub tracked_players: usize,
    pub enabled_checks: usize,
    pub action_confidence: f64,
}

/// The detection engine.
pub struct Engine {
    scheduler: Arc<dyn TaskScheduler>,

    config: RwLock<EngineConfig>,
    store: Arc<HistoryStore>,
    extractor: FeatureExtractor,
    checks: RwLock<CheckRegistry>,
    combat_checks: RwLock<CombatCheckRegistry>,
    aggregator: RwLock<Aggregator>,
    mitigation: Arc<RwLock<MitigationPolicy>>,
    alerts: RwLock<AlertPublisher>,
    punishments: RwLock<PunishmentHandler>,
    whitelist: WhitelistManager,
    analytics: Mutex<Option<AnalyticsClient>>,

    running: AtomicBool,
}

impl Engine {
    /// Creates an engine with the given configuration and wiring. All
    /// components are configured immediately; call [`Engine::start`] to
    /// begin processing.
    pub fn new(
        mut config: EngineConfig,
        clock: Arc<dyn MonoClock>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        config.normalize();

        let engine = Self {
            scheduler,
            config: RwLock::new(config),
            store: Arc::new(HistoryStore::new()),
            extractor: FeatureExtractor::new(),
            checks: RwLock::new(CheckRegistry::new()),
            combat_checks: RwLock::new(CombatCheckRegistry::new()),
            aggregator: RwLock::new(Aggregator::new()),
            mitigation: Arc::new(RwLock::new(MitigationPolicy::new(clock))),
            alerts: RwLock::new(AlertPublisher::new()),
            punishments: RwLock::new(PunishmentHandler::new()),
            whitelist: WhitelistManager::new(),
            analytics: Mutex::new(None),
            running: AtomicBool::new(false),
        };
        engine.configure_components();

        let enabled =
            engine.checks.read().enabled_count() + engine.combat_checks.read().enabled_count();
        info!(enabled_checks = enabled, "engine initialized");
        engine
    }

    fn configure_components(&self) {
        let config = self.config.read();
        self.store.configure(&config);
        self.checks.write().configure(&config);
        self.combat_checks.write().configure(&config);
        self.aggregator.write().configure(&config);
        self.mitigation.write().configure(&config);
        self.alerts.write().configure(&config);
        self.punishments.write().configure(&config);
        self.whitelist.configure(&config);
    }

    /// Attaches the host alert transport.
    pub fn set_alert_sink(&self, sink: Arc<dyn AlertSink>) {
        self.alerts.write().set_sink(sink);
    }

    /// Attaches the host punishment transport.
    pub fn set_punish_executor(&self, executor: Arc<dyn PunishExecutor>) {
        self.punishments.write().set_executor(executor);
    }

    /// Starts processing. Idempotent.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("engine already running, ignoring start");
            return;
        }

        let analytics_config = self.config.read().analytics.clone();
        if analytics_config.enabled {
            let client = AnalyticsClient::new(analytics_config);
            client.start();
            *self.analytics.lock() = Some(client);
        }

        info!("engine started");
    }

    /// Stops processing, clears all player state, and joins the
    /// analytics worker. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("engine already stopped, ignoring stop");
            return;
        }

        if let Some(client) = self.analytics.lock().take() {
            client.stop();
        }
        self.store.clear();

        info!("engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Applies a new configuration to every component without a restart.
    pub fn reload(&self, mut config: EngineConfig) {
        config.normalize();
        *self.config.write() = config;
        self.configure_components();
        info!("configuration reloaded");
    }

    /// Re-reads configuration from a JSON file and applies it.
    pub fn reload_from_path(&self, path: impl AsRef<std::path::Path>) -> Result<(), WardenError> {
        let config = EngineConfig::load_from_path(path)?;
        self.reload(config);
        Ok(())
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.is_running(),
            tracked_players: self.store.len(),
            enabled_checks: self.checks.read().enabled_count()
                + self.combat_checks.read().enabled_count(),
            action_confidence: self.aggregator.read().action_threshold(),
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Analytics drop counter, when the uplink is running.
    pub fn analytics_dropped(&self) -> Option<u64> {
        self.analytics.lock().as_ref().map(|c| c.dropped_count())
    }

    // ------------------------------------------------------------------
    // Ingest path
    // ------------------------------------------------------------------

    /// Processes one movement event for a player. This is the hot path;
    /// it performs no I/O and never blocks.
    pub fn process_telemetry(&self, profile: &PlayerProfile, input: TelemetryInput) -> Decision {
        if !self.is_running() {
            return Decision::none("engine not running");
        }
        if self.whitelist.is_exempt(profile.player_id) {
            return Decision::none("player exempt");
        }

        let context_ref = self
            .store
            .get_or_create(profile.player_id, &profile.player_name);
        let mut context = context_ref.lock();

        context.add_telemetry(input.clone());
        let features = self.extractor.extract(&input, &context);
        context.add_features(features.clone());

        if features.is_lagging {
            self.mitigation.read().mark_lag_exempt(&mut context);
            debug!(player = %profile.player_name, "lag detected, grace window armed");
            return Decision::none("lag grace window");
        }

        let mut results = Vec::new();
        for check in self.checks.read().enabled() {
            match catch_unwind(AssertUnwindSafe(|| {
                check.analyze(&input, &features, &context)
            })) {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => warn!(check = check.name(), error = %e, "check failed"),
                Err(_) => warn!(check = check.name(), "check panicked"),
            }
        }

        let Some(violation) = self.aggregator.read().aggregate(
            results,
            profile.player_id,
            &profile.player_name,
            input.nano_time,
            input.ping,
        ) else {
            return Decision::none("no violation");
        };

        let decision = self
            .mitigation
            .read()
            .evaluate(violation, &mut context, profile);
        drop(context);

        self.dispatch(&decision);
        decision
    }

    /// Processes one attack event for a player. Mitigation state
    /// (cooldowns, exemption windows) is shared with the movement path.
    pub fn process_combat(&self, profile: &PlayerProfile, input: CombatInput) -> Decision {
        if !self.is_running() {
            return Decision::none("engine not running");
        }
        if self.whitelist.is_exempt(profile.player_id) {
            return Decision::none("player exempt");
        }

        let combat_ref = self
            .store
            .get_or_create_combat(profile.player_id, &profile.player_name);
        let results: Vec<CheckResult> = {
            let mut combat = combat_ref.lock();
            combat.add_combat_input(input.clone());

            let mut results = Vec::new();
            for check in self.combat_checks.read().enabled() {
                match catch_unwind(AssertUnwindSafe(|| check.analyze(&input, &combat))) {
                    Ok(Ok(result)) => results.push(result),
                    Ok(Err(e)) => warn!(check = check.name(), error = %e, "check failed"),
                    Err(_) => warn!(check = check.name(), "check panicked"),
                }
            }
            results
        };

        let Some(violation) = self.aggregator.read().aggregate(
            results,
            profile.player_id,
            &profile.player_name,
            input.nano_time,
            input.ping,
        ) else {
            return Decision::none("no violation");
        };

        let context_ref = self
            .store
            .get_or_create(profile.player_id, &profile.player_name);
        let mut context = context_ref.lock();
        let decision = self
            .mitigation
            .read()
            .evaluate(violation, &mut context, profile);
        drop(context);

        self.dispatch(&decision);
        decision
    }

    fn dispatch(&self, decision: &Decision) {
        let Some(violation) = &decision.violation else {
            return;
        };

        match decision.action {
            Action::Alert => {
                self.alerts.read().publish(violation);
            }
            Action::Punish => {
                self.alerts.read().publish(violation);
                self.punishments
                    .read()
                    .execute(decision, self.scheduler.as_ref());
            }
            Action::Flag => {
                debug!(
                    player = %violation.player_name,
                    category = %violation.category,
                    "flagged"
                );
            }
            Action::None => return,
        }

        if let Some(client) = self.analytics.lock().as_ref() {
            client.send_violation(violation);
        }
    }

    // ------------------------------------------------------------------
    // Player lifecycle
    // ------------------------------------------------------------------

    /// Player joined: create context and arm the join grace period.
    pub fn on_player_join(&self, player_id: PlayerId, player_name: &str) {
        let context_ref = self.store.get_or_create(player_id, player_name);
        self.mitigation
            .read()
            .set_recent_join(&mut context_ref.lock(), true);

        let delay = Duration::from_millis(self.config.read().windows.join_exemption_ms);
        let store = Arc::clone(&self.store);
        let mitigation = Arc::clone(&self.mitigation);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                // Player may have quit in the meantime
                if let Some(ctx) = store.get(player_id) {
                    mitigation.read().set_recent_join(&mut ctx.lock(), false);
                }
            }),
        );
    }

    /// Player quit: destroy all state.
    pub fn on_player_quit(&self, player_id: PlayerId) {
        self.store.remove(player_id);
    }

    /// Player teleported: suppress detection until the landing settles.
    pub fn on_player_teleport(&self, player_id: PlayerId) {
        let Some(context_ref) = self.store.get(player_id) else {
            return;
        };
        self.mitigation
            .read()
            .set_teleporting(&mut context_ref.lock(), true);

        let delay = Duration::from_millis(self.config.read().windows.teleport_exemption_ms);
        let store = Arc::clone(&self.store);
        let mitigation = Arc::clone(&self.mitigation);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(ctx) = store.get(player_id) {
                    mitigation.read().set_teleporting(&mut ctx.lock(), false);
                }
            }),
        );
    }

    /// Player changed worlds: old-world history is meaningless, so reset
    /// it and suppress detection through the transition.
    pub fn on_world_change(&self, player_id: PlayerId) {
        let Some(context_ref) = self.store.get(player_id) else {
            return;
        };
        {
            let mut context = context_ref.lock();
            context.reset();
            self.mitigation.read().set_world_changing(&mut context, true);
        }

        let delay = Duration::from_millis(self.config.read().windows.world_change_exemption_ms);
        let store = Arc::clone(&self.store);
        let mitigation = Arc::clone(&self.mitigation);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(ctx) = store.get(player_id) {
                    mitigation.read().set_world_changing(&mut ctx.lock(), false);
                }
            }),
        );
    }

    // ------------------------------------------------------------------
    // Admin surface
    // ------------------------------------------------------------------

    /// Permanently exempts a player from all checks.
    pub fn exempt_player(&self, player_id: PlayerId) {
        self.whitelist.add_to_whitelist(player_id);
    }

    /// Removes a player's exemption.
    pub fn unexempt_player(&self, player_id: PlayerId) {
        self.whitelist.remove_from_whitelist(player_id);
    }

    pub fn whitelist(&self) -> &WhitelistManager {
        &self.whitelist
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}
