//! Shared physics and timing constants.
//!
//! Movement limits live in the configuration; these are the fixed facts of
//! the simulation the checks reason against.

/// Nanoseconds per millisecond.
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Nominal server tick interval in milliseconds (20 TPS).
pub const TICK_MS: f64 = 50.0;

/// Downward acceleration applied per tick, in world units.
pub const GRAVITY_PER_TICK: f64 = 0.08;

/// Velocity retained per tick while airborne.
pub const DRAG_PER_TICK: f64 = 0.98;

/// Vertical offset from feet to eyes, used for aim geometry.
pub const EYE_HEIGHT: f64 = 1.62;

/// Vanilla melee reach in world units.
pub const VANILLA_REACH: f64 = 3.0;

/// Rotation beyond this many degrees in a single tick is not humanly
/// producible with a pointing device.
pub const MAX_HUMAN_SNAP_PER_TICK: f64 = 180.0;

/// Sustained clicks-per-second above this is auto-clicker territory.
pub const SUSPICIOUS_CPS: f64 = 20.0;
