use crate::constants::NANOS_PER_MILLI;
use crate::history::{Ewma, RingBuffer, RollingWindow};
use crate::model::{Features, PlayerId, TelemetryInput};

/// Mutable per-player movement state: history buffers, smoothed
/// statistics, exemption flags, and violation counters.
///
/// Owned exclusively by the store; mutation is serialized by the single
/// ingest owner for the player.
pub struct PlayerContext {
    player_id: PlayerId,
    player_name: String,

    // History buffers
    telemetry_history: RingBuffer<TelemetryInput>,
    feature_history: RingBuffer<Features>,
    ping_window: RollingWindow,
    packet_delta_window: RollingWindow,

    // EWMA trackers
    ping_ewma: Ewma,
    speed_ewma: Ewma,
    accel_ewma: Ewma,

    // Timing scalars (monotonic nanoseconds)
    last_telemetry_nanos: i64,
    last_alert_nanos: i64,
    exempt_until_nanos: i64,
    cooldown_until_nanos: i64,

    // Exemption flags
    teleporting: bool,
    world_changing: bool,
    recent_join: bool,

    // Violation counters
    total_violations: u32,
    recent_violations: u32,
}

impl PlayerContext {
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
            telemetry_history: RingBuffer::new(history_size),
            feature_history: RingBuffer::new(history_size),
            ping_window: RollingWindow::new(window_size),
            packet_delta_window: RollingWindow::new(window_size),
            ping_ewma: Ewma::new(ewma_alpha),
            speed_ewma: Ewma::new(ewma_alpha),
            accel_ewma: Ewma::new(ewma_alpha),
            last_telemetry_nanos: 0,
            last_alert_nanos: 0,
            exempt_until_nanos: 0,
            cooldown_until_nanos: 0,
            teleporting: false,
            world_changing: false,
            recent_join: false,
            total_violations: 0,
            recent_violations: 0,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn telemetry_history(&self) -> &RingBuffer<TelemetryInput> {
        &self.telemetry_history
    }

    pub fn feature_history(&self) -> &RingBuffer<Features> {
        &self.feature_history
    }

    pub fn ping_window(&self) -> &RollingWindow {
        &self.ping_window
    }

    pub fn packet_delta_window(&self) -> &RollingWindow {
        &self.packet_delta_window
    }

    pub fn ping_ewma(&self) -> &Ewma {
        &self.ping_ewma
    }

    pub fn speed_ewma(&self) -> &Ewma {
        &self.speed_ewma
    }

    pub fn accel_ewma(&self) -> &Ewma {
        &self.accel_ewma
    }

    pub fn last_telemetry_nanos(&self) -> i64 {
        self.last_telemetry_nanos
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

    pub fn cooldown_until_nanos(&self) -> i64 {
        self.cooldown_until_nanos
    }

    pub fn set_cooldown_until_nanos(&mut self, nanos: i64) {
        self.cooldown_until_nanos = nanos;
    }

    pub fn is_teleporting(&self) -> bool {
        self.teleporting
    }

    pub fn set_teleporting(&mut self, teleporting: bool) {
        self.teleporting = teleporting;
    }

    pub fn is_world_changing(&self) -> bool {
        self.world_changing
    }

    pub fn set_world_changing(&mut self, world_changing: bool) {
        self.world_changing = world_changing;
    }

    pub fn is_recent_join(&self) -> bool {
        self.recent_join
    }

    pub fn set_recent_join(&mut self, recent_join: bool) {
        self.recent_join = recent_join;
    }

    pub fn total_violations(&self) -> u32 {
        self.total_violations
    }

    pub fn recent_violations(&self) -> u32 {
        self.recent_violations
    }

    pub fn increment_violations(&mut self) {
        self.total_violations += 1;
        self.recent_violations += 1;
    }

    pub fn reset_recent_violations(&mut self) {
        self.recent_violations = 0;
    }

    /// True while any exemption source is active: the timed window or
    /// one of the lifecycle flags.
    pub fn is_exempt(&self, current_nanos: i64) -> bool {
        current_nanos < self.exempt_until_nanos
            || self.teleporting
            || self.world_changing
            || self.recent_join
    }

    /// True while alerts for this player are on cooldown.
    pub fn is_on_cooldown(&self, current_nanos: i64) -> bool {
        current_nanos < self.cooldown_until_nanos
    }

    /// Records a telemetry event: pushes history, feeds the ping window
    /// and EWMA, and derives the packet-delta sample from successive
    /// timestamps.
    pub fn add_telemetry(&mut self, input: TelemetryInput) {
        self.ping_window.add(input.ping as f64);
        self.ping_ewma.update(input.ping as f64);

        if self.last_telemetry_nanos > 0 && input.nano_time > self.last_telemetry_nanos {
            let delta_nanos = input.nano_time - self.last_telemetry_nanos;
            self.packet_delta_window
                .add(delta_nanos as f64 / NANOS_PER_MILLI as f64);
        }
        self.last_telemetry_nanos = input.nano_time;
        self.telemetry_history.push(input);
    }

    /// Records extracted features and feeds the speed/accel EWMAs.
    pub fn add_features(&mut self, features: Features) {
        self.speed_ewma.update(features.horiz_speed);
        self.accel_ewma.update(features.horiz_accel);
        self.feature_history.push(features);
    }

    pub fn median_ping(&self) -> f64 {
        self.ping_window.median()
    }

    pub fn ping_mad(&self) -> f64 {
        self.ping_window.mad()
    }

    /// Clears all history and state. Used on world change, where the new
    /// world's physics make the old samples meaningless.
    pub fn reset(&mut self) {
        self.telemetry_history.clear();
        self.feature_history.clear();
        self.ping_window.clear();
        self.packet_delta_window.clear();
        self.ping_ewma.reset();
        self.speed_ewma.reset();
        self.accel_ewma.reset();
        self.last_telemetry_nanos = 0;
        self.total_violations = 0;
        self.recent_violations = 0;
        self.teleporting = false;
        self.world_changing = false;
        self.recent_join = false;
    }
}
