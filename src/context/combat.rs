use crate::constants::NANOS_PER_MILLI;
use crate::history::{Ewma, RingBuffer, RollingWindow};
use crate::model::{CombatInput, PlayerId};

/// Mutable per-player combat state: attack history, aim/reach/timing
/// windows, and hit accounting.
///
/// Aim error and reach are only sampled on hits; misses carry no reliable
/// geometry. Snap angle and the hit-rate window are sampled on every
/// attack.
pub struct CombatContext {
    player_id: PlayerId,
    player_name: String,

    combat_history: RingBuffer<CombatInput>,
    aim_error_window: RollingWindow,
    snap_angle_window: RollingWindow,
    reach_window: RollingWindow,
    attack_interval_window: RollingWindow,
    hit_rate_window: RollingWindow,

    aim_error_ewma: Ewma,
    snap_angle_ewma: Ewma,
    reach_ewma: Ewma,
    attack_interval_ewma: Ewma,

    total_attacks: u32,
    total_hits: u32,
    total_criticals: u32,
    last_attack_nanos: i64,
    last_alert_nanos: i64,
    exempt_until_nanos: i64,

    recent_hits: u32,
    recent_attacks: u32,

    last_target_id: Option<PlayerId>,
    consecutive_target_hits: u32,
}

impl CombatContext {
    pub fn new(
        player_id: PlayerId,
        player_name: impl Into<String>,
        history_size: usize,
        window_size: usize,
        ewma_alpha: f64,
    ) -> Self {
        Self {
            player_id,
            player_name: player_name.into(),
            combat_history: RingBuffer::new(history_size),
            aim_error_window: RollingWindow::new(window_size),
            snap_angle_window: RollingWindow::new(window_size),
            reach_window: RollingWindow::new(window_size),
            attack_interval_window: RollingWindow::new(window_size),
            hit_rate_window: RollingWindow::new(window_size),
            aim_error_ewma: Ewma::new(ewma_alpha),
            snap_angle_ewma: Ewma::new(ewma_alpha),
            reach_ewma: Ewma::new(ewma_alpha),
            attack_interval_ewma: Ewma::new(ewma_alpha),
            total_attacks: 0,
            total_hits: 0,
            total_criticals: 0,
            last_attack_nanos: 0,
            last_alert_nanos: 0,
            exempt_until_nanos: 0,
            recent_hits: 0,
            recent_attacks: 0,
            last_target_id: None,
            consecutive_target_hits: 0,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn combat_history(&self) -> &RingBuffer<CombatInput> {
        &self.combat_history
    }

    pub fn aim_error_window(&self) -> &RollingWindow {
        &self.aim_error_window
    }

    pub fn snap_angle_window(&self) -> &RollingWindow {
        &self.snap_angle_window
    }

    pub fn reach_window(&self) -> &RollingWindow {
        &self.reach_window
    }

    pub fn attack_interval_window(&self) -> &RollingWindow {
        &self.attack_interval_window
    }

    pub fn hit_rate_window(&self) -> &RollingWindow {
        &self.hit_rate_window
    }

    pub fn aim_error_ewma(&self) -> &Ewma {
        &self.aim_error_ewma
    }

    pub fn reach_ewma(&self) -> &Ewma {
        &self.reach_ewma
    }

    pub fn total_attacks(&self) -> u32 {
        self.total_attacks
    }

    pub fn total_hits(&self) -> u32 {
        self.total_hits
    }

    pub fn total_criticals(&self) -> u32 {
        self.total_criticals
    }

    pub fn last_attack_nanos(&self) -> i64 {
        self.last_attack_nanos
    }

    pub fn last_alert_nanos(&self) -> i64 {
        self.last_alert_nanos
    }

    pub fn set_last_alert_nanos(&mut self, nanos: i64) {
        self.last_alert_nanos = nanos;
    }

    pub fn exempt_until_nanos(&self) -> i64 {
        self.exempt_until_nanos
    }

    pub fn set_exempt_until_nanos(&mut self, nanos: i64) {
        self.exempt_until_nanos = nanos;
    }

    pub fn is_exempt(&self, current_nanos: i64) -> bool {
        current_nanos < self.exempt_until_nanos
    }

    pub fn recent_hits(&self) -> u32 {
        self.recent_hits
    }

    pub fn recent_attacks(&self) -> u32 {
        self.recent_attacks
    }

    pub fn last_target_id(&self) -> Option<PlayerId> {
        self.last_target_id
    }

    pub fn consecutive_target_hits(&self) -> u32 {
        self.consecutive_target_hits
    }

    /// Records an attack event and updates every derived statistic.
    pub fn add_combat_input(&mut self, input: CombatInput) {
        self.total_attacks += 1;
        self.recent_attacks += 1;

        if input.hit {
            self.total_hits += 1;
            self.recent_hits += 1;
            if input.critical {
                self.total_criticals += 1;
            }

            let aim_error = input.aim_error();
            self.aim_error_window.add(aim_error);
            self.aim_error_ewma.update(aim_error);

            let reach = input.distance_to_target();
            self.reach_window.add(reach);
            self.reach_ewma.update(reach);
        }

        let snap_angle = input.snap_angle();
        self.snap_angle_window.add(snap_angle);
        self.snap_angle_ewma.update(snap_angle);

        if self.last_attack_nanos > 0 && input.nano_time > self.last_attack_nanos {
            let interval_ms =
                (input.nano_time - self.last_attack_nanos) as f64 / NANOS_PER_MILLI as f64;
            self.attack_interval_window.add(interval_ms);
            self.attack_interval_ewma.update(interval_ms);
        }

        if input.hit {
            if let Some(target) = input.target_id {
                if self.last_target_id == Some(target) {
                    self.consecutive_target_hits += 1;
                } else {
                    self.consecutive_target_hits = 1;
                    self.last_target_id = Some(target);
                }
            }
        }

        self.hit_rate_window.add(if input.hit { 1.0 } else { 0.0 });

        self.last_attack_nanos = input.nano_time;
        self.combat_history.push(input);
    }

    /// Hit rate over the rolling window.
    pub fn recent_hit_rate(&self) -> f64 {
        self.hit_rate_window.mean()
    }

    /// Hit rate over the whole session.
    pub fn total_hit_rate(&self) -> f64 {
        if self.total_attacks > 0 {
            self.total_hits as f64 / self.total_attacks as f64
        } else {
            0.0
        }
    }

    /// Criticals as a fraction of hits.
    pub fn critical_rate(&self) -> f64 {
        if self.total_hits > 0 {
            self.total_criticals as f64 / self.total_hits as f64
        } else {
            0.0
        }
    }

    pub fn reset_recent_stats(&mut self) {
        self.recent_hits = 0;
        self.recent_attacks = 0;
    }

    /// Clears all history and counters.
    pub fn reset(&mut self) {
        self.combat_history.clear();
        self.aim_error_window.clear();
        self.snap_angle_window.clear();
        self.reach_window.clear();
        self.attack_interval_window.clear();
        self.hit_rate_window.clear();
        self.aim_error_ewma.reset();
        self.snap_angle_ewma.reset();
        self.reach_ewma.reset();
        self.attack_interval_ewma.reset();
        self.total_attacks = 0;
        self.total_hits = 0;
        self.total_criticals = 0;
        self.last_attack_nanos = 0;
        self.last_alert_nanos = 0;
        self.recent_hits = 0;
        self.recent_attacks = 0;
        self.last_target_id = None;
        self.consecutive_target_hits = 0;
    }
}
