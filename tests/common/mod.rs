//! Shared scaffolding for the end-to-end tests: a controllable clock, a
//! manually-pumped scheduler, and telemetry builders.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use warden_core::clock::{MockClock, MonoClock};
use warden_core::config::EngineConfig;
use warden_core::engine::{Engine, TaskScheduler};
use warden_core::model::{CombatInput, PlayerProfile, TelemetryInput};

pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Scheduler that holds tasks until the test pumps it, keyed off the
/// mock clock.
pub struct ManualScheduler {
    clock: Arc<MockClock>,
    tasks: Mutex<Vec<(i64, Box<dyn FnOnce() + Send>)>>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<MockClock>) -> Self {
        Self {
            clock,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Runs every task whose delay has elapsed on the mock clock.
    pub fn run_due(&self) {
        let now = self.clock.nano_time();
        let mut tasks = self.tasks.lock();
        let mut remaining = Vec::new();
        let mut due = Vec::new();
        for (at, task) in tasks.drain(..) {
            if at <= now {
                due.push(task);
            } else {
                remaining.push((at, task));
            }
        }
        *tasks = remaining;
        drop(tasks);
        for task in due {
            task();
        }
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) {
        let due = self.clock.nano_time() + delay.as_nanos() as i64;
        self.tasks.lock().push((due, task));
    }
}

pub struct Harness {
    pub clock: Arc<MockClock>,
    pub scheduler: Arc<ManualScheduler>,
    pub engine: Engine,
    pub profile: PlayerProfile,
}

impl Harness {
    pub fn new(config: EngineConfig) -> Self {
        let clock = Arc::new(MockClock::new(1_000_000_000));
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let engine = Engine::new(config, clock.clone(), scheduler.clone());
        engine.start();
        Self {
            clock,
            scheduler,
            engine,
            profile: PlayerProfile::new(Uuid::new_v4(), "Steve"),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Advances the clock and delivers one movement event with the given
    /// deltas. The inter-event gap jitters around the 50ms tick so the
    /// cadence reads as human.
    pub fn walk_event(&self, index: u64, dx: f64, dy: f64, on_ground: bool) -> TelemetryInput {
        let gap = 48 + (index % 5) as i64;
        self.clock.advance_millis(gap);
        TelemetryInput {
            dx,
            dy,
            on_ground,
            ping: 20,
            nano_time: self.clock.nano_time(),
            tick_delta: gap * NANOS_PER_MILLI,
            ..Default::default()
        }
    }

    pub fn ingest(&self, input: TelemetryInput) -> warden_core::model::Decision {
        self.engine.process_telemetry(&self.profile, input)
    }

    /// Delivers `count` quiet walking events.
    pub fn warm_up(&self, count: u64) {
        for i in 0..count {
            let input = self.walk_event(i, 0.1, 0.0, true);
            self.ingest(input);
        }
    }

    /// A combat hit on a target dead ahead at the given distance, with a
    /// controllable pre-attack rotation for snap patterns.
    pub fn combat_hit(
        &self,
        gap_ms: i64,
        distance: f64,
        yaw_offset: f32,
        pre_yaw: f32,
        target: Option<Uuid>,
    ) -> CombatInput {
        self.clock.advance_millis(gap_ms);
        CombatInput {
            attacker_id: Some(self.profile.player_id),
            attacker_name: self.profile.player_name.clone(),
            target_id: target,
            target_x: 0.0,
            target_y: 1.62,
            target_z: distance,
            attacker_yaw: yaw_offset,
            attacker_pitch: 0.0,
            pre_attack_yaw: pre_yaw,
            pre_attack_pitch: 0.0,
            nano_time: self.clock.nano_time(),
            time_since_last_attack: gap_ms * NANOS_PER_MILLI,
            hit: true,
            ping: 20,
            ..Default::default()
        }
    }
}
