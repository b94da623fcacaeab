//! Mitigation policy.
//!
//! The last gate before anything reaches a player or a moderator.
//! Exemptions are checked in a fixed order and the first match wins;
//! only a violation that survives every gate advances the cooldown and
//! the violation counters. This ordering is what keeps the cooldown from
//! being consumed by events that would have been exempt anyway.

use std::collections::HashSet;
use std::sync::Arc;

use crate::clock::MonoClock;
use crate::config::EngineConfig;
use crate::context::PlayerContext;
use crate::model::{Decision, Gamemode, PlayerId, PlayerProfile, Violation};

/// Punishment modes supported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishmentKind {
    Kick,
    TempMute,
    FlagOnly,
}

impl PunishmentKind {
    /// Parses the configured punishment type, falling back to FlagOnly
    /// on unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "KICK" => Some(Self::Kick),
            "TEMP_MUTE" => Some(Self::TempMute),
            "FLAG_ONLY" => Some(Self::FlagOnly),
            _ => None,
        }
    }
}

/// Applies exemptions, cooldowns, and punishment thresholds to produce
/// the final [`Decision`] for a violation.
pub struct MitigationPolicy {
    clock: Arc<dyn MonoClock>,

    exemption_nanos: i64,
    cooldown_nanos: i64,
    lag_grace_nanos: i64,
    whitelist: HashSet<PlayerId>,
    exempt_creative: bool,
    exempt_spectator: bool,
    punishment_threshold: f64,
    punishment_enabled: bool,
    punishment_kind: PunishmentKind,
}

impl MitigationPolicy {
    pub fn new(clock: Arc<dyn MonoClock>) -> Self {
        Self {
            clock,
            exemption_nanos: 250_000_000,
            cooldown_nanos: 1_500_000_000,
            lag_grace_nanos: 500_000_000,
            whitelist: HashSet::new(),
            exempt_creative: true,
            exempt_spectator: true,
            punishment_threshold: 0.999,
            punishment_enabled: false,
            punishment_kind: PunishmentKind::FlagOnly,
        }
    }

    pub fn configure(&mut self, config: &EngineConfig) {
        self.exemption_nanos = config.exemption_nanos();
        self.cooldown_nanos = config.cooldown_nanos();
        self.lag_grace_nanos = config.lag_grace_nanos();
        self.whitelist = config.parsed_whitelist();
        self.exempt_creative = config.exemptions.exempt_creative;
        self.exempt_spectator = config.exemptions.exempt_spectator;
        self.punishment_threshold = config.actions.punishment.threshold;
        self.punishment_enabled = config.actions.punishment.enabled;
        self.punishment_kind =
            PunishmentKind::parse(&config.actions.punishment.kind).unwrap_or(PunishmentKind::FlagOnly);
    }

    /// Evaluates a violation against every exemption gate, in order.
    /// Only a pass-through mutates cooldown state and counters.
    pub fn evaluate(
        &self,
        violation: Violation,
        context: &mut PlayerContext,
        profile: &PlayerProfile,
    ) -> Decision {
        let now = self.clock.nano_time();

        if self.whitelist.contains(&profile.player_id) {
            return Decision::none("player whitelisted");
        }

        if profile.has_bypass {
            return Decision::none("player has bypass permission");
        }

        if self.exempt_creative && profile.gamemode == Gamemode::Creative {
            return Decision::none("player in creative mode");
        }
        if self.exempt_spectator && profile.gamemode == Gamemode::Spectator {
            return Decision::none("player in spectator mode");
        }

        if context.is_exempt(now) {
            return Decision::none("player in exemption window");
        }

        if context.is_on_cooldown(now) {
            return Decision::none("alert on cooldown");
        }

        context.set_cooldown_until_nanos(now + self.cooldown_nanos);
        context.set_last_alert_nanos(now);
        context.increment_violations();

        if self.punishment_enabled && violation.confidence >= self.punishment_threshold {
            if self.punishment_kind == PunishmentKind::FlagOnly {
                return Decision::flag(violation);
            }
            return Decision::punish(violation);
        }

        Decision::alert(violation)
    }

    /// Arms the short exemption window, absorbing transient noise after
    /// teleports and similar disruptions.
    pub fn mark_exempt(&self, context: &mut PlayerContext) {
        let now = self.clock.nano_time();
        context.set_exempt_until_nanos(now + self.exemption_nanos);
    }

    /// Arms the longer lag-grace window.
    pub fn mark_lag_exempt(&self, context: &mut PlayerContext) {
        let now = self.clock.nano_time();
        context.set_exempt_until_nanos(now + self.lag_grace_nanos);
    }

    /// Sets or clears the teleporting flag; clearing arms the exemption
    /// window so the landing packets stay quiet.
    pub fn set_teleporting(&self, context: &mut PlayerContext, teleporting: bool) {
        context.set_teleporting(teleporting);
        if !teleporting {
            self.mark_exempt(context);
        }
    }

    /// Sets or clears the world-changing flag; clearing arms the
    /// exemption window.
    pub fn set_world_changing(&self, context: &mut PlayerContext, changing: bool) {
        context.set_world_changing(changing);
        if !changing {
            self.mark_exempt(context);
        }
    }

    /// Sets or clears the recent-join flag; setting arms the exemption
    /// window for connection stabilization.
    pub fn set_recent_join(&self, context: &mut PlayerContext, recent_join: bool) {
        context.set_recent_join(recent_join);
        if recent_join {
            self.mark_exempt(context);
        }
    }

    pub fn cooldown_nanos(&self) -> i64 {
        self.cooldown_nanos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::model::{CheckResult, Explanation};
    use uuid::Uuid;

    fn violation_for(id: PlayerId, confidence: f64) -> Violation {
        Violation::from_results(
            id,
            "Steve",
            "MovementConsistency",
            vec![CheckResult::violation(
                "MovementConsistency",
                confidence,
                0.8,
                Explanation::new(),
            )],
            0,
            20,
        )
    }

    fn setup() -> (Arc<MockClock>, MitigationPolicy, PlayerContext, PlayerProfile) {
        let clock = Arc::new(MockClock::new(1_000_000_000));
        let policy = MitigationPolicy::new(clock.clone());
        let id = Uuid::new_v4();
        let context = PlayerContext::new(id, "Steve", 64, 20, 0.3);
        let profile = PlayerProfile::new(id, "Steve");
        (clock, policy, context, profile)
    }

    #[test]
    fn test_clean_pass_through_alerts() {
        let (_, policy, mut ctx, profile) = setup();
        let decision = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(decision.action, crate::model::Action::Alert);
        assert_eq!(ctx.total_violations(), 1);
        assert!(ctx.cooldown_until_nanos() > 0);
    }

    #[test]
    fn test_whitelist_blocks() {
        let (_, mut policy, mut ctx, profile) = setup();
        let mut config = EngineConfig::default();
        config.exemptions.whitelist = vec![profile.player_id.to_string()];
        policy.configure(&config);

        let decision = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(decision.action, crate::model::Action::None);
        assert_eq!(decision.reason, "player whitelisted");
        assert_eq!(ctx.total_violations(), 0);
    }

    #[test]
    fn test_bypass_permission_blocks() {
        let (_, policy, mut ctx, mut profile) = setup();
        profile.has_bypass = true;
        let decision = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(decision.action, crate::model::Action::None);
    }

    #[test]
    fn test_gamemode_exemptions() {
        let (_, policy, mut ctx, mut profile) = setup();
        profile.gamemode = Gamemode::Creative;
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::None);

        profile.gamemode = Gamemode::Spectator;
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::None);

        profile.gamemode = Gamemode::Survival;
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::Alert);
    }

    #[test]
    fn test_exemption_window_blocks_without_consuming_cooldown() {
        let (_, policy, mut ctx, profile) = setup();
        policy.mark_exempt(&mut ctx);
        let decision = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(decision.action, crate::model::Action::None);
        assert_eq!(decision.reason, "player in exemption window");
        assert_eq!(ctx.cooldown_until_nanos(), 0);
        assert_eq!(ctx.total_violations(), 0);
    }

    #[test]
    fn test_lifecycle_flags_block() {
        let (_, policy, mut ctx, profile) = setup();
        policy.set_teleporting(&mut ctx, true);
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::None);
    }

    #[test]
    fn test_clearing_teleport_arms_exemption_window() {
        let (clock, policy, mut ctx, profile) = setup();
        policy.set_teleporting(&mut ctx, true);
        policy.set_teleporting(&mut ctx, false);
        // Still inside the 250ms post-teleport window
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::None);

        clock.advance_millis(300);
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::Alert);
    }

    #[test]
    fn test_cooldown_sequencing() {
        let (clock, policy, mut ctx, profile) = setup();
        let first = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(first.action, crate::model::Action::Alert);

        clock.advance_millis(500);
        let second = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(second.action, crate::model::Action::None);
        assert_eq!(second.reason, "alert on cooldown");

        clock.advance_millis(1100);
        let third = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(third.action, crate::model::Action::Alert);
        assert_eq!(ctx.total_violations(), 2);
    }

    #[test]
    fn test_punishment_over_threshold() {
        let (_, mut policy, mut ctx, profile) = setup();
        let mut config = EngineConfig::default();
        config.actions.punishment.enabled = true;
        config.actions.punishment.kind = "KICK".into();
        policy.configure(&config);

        let d = policy.evaluate(violation_for(profile.player_id, 0.9995), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::Punish);
    }

    #[test]
    fn test_flag_only_punishment_emits_flag() {
        let (_, mut policy, mut ctx, profile) = setup();
        let mut config = EngineConfig::default();
        config.actions.punishment.enabled = true;
        config.actions.punishment.kind = "FLAG_ONLY".into();
        policy.configure(&config);

        let d = policy.evaluate(violation_for(profile.player_id, 0.9995), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::Flag);
    }

    #[test]
    fn test_punishment_disabled_alerts_instead() {
        let (_, policy, mut ctx, profile) = setup();
        let d = policy.evaluate(violation_for(profile.player_id, 0.9999), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::Alert);
    }

    #[test]
    fn test_lag_grace_longer_than_exemption() {
        let (clock, policy, mut ctx, profile) = setup();
        policy.mark_lag_exempt(&mut ctx);
        clock.advance_millis(300);
        // 300ms in: past the 250ms exemption but inside the 500ms grace
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::None);

        clock.advance_millis(300);
        let d = policy.evaluate(violation_for(profile.player_id, 0.998), &mut ctx, &profile);
        assert_eq!(d.action, crate::model::Action::Alert);
    }

    #[test]
    fn test_punishment_kind_parse() {
        assert_eq!(PunishmentKind::parse("KICK"), Some(PunishmentKind::Kick));
        assert_eq!(
            PunishmentKind::parse("TEMP_MUTE"),
            Some(PunishmentKind::TempMute)
        );
        assert_eq!(
            PunishmentKind::parse("FLAG_ONLY"),
            Some(PunishmentKind::FlagOnly)
        );
        assert_eq!(PunishmentKind::parse("BANHAMMER"), None);
    }
}
