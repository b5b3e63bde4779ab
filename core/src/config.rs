//! Solver tuning constants. These are compatibility-relevant: changing any of
//! them changes simulation behavior measurably.

use std::f32::consts::PI;

/// Tolerated linear constraint violation. Contacts settle at this penetration.
pub const LINEAR_SLOP: f32 = 0.005;

/// Tolerated angular constraint violation for joint limits.
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// Cap on positional correction applied in a single solver iteration.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Cap on angular correction applied in a single solver iteration.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Closing speed below which restitution is ignored (resting contact).
pub const RESTITUTION_THRESHOLD: f32 = 1.0;

/// Seconds a body must stay within the sleep tolerances before the
/// population can be put to sleep.
pub const TIME_TO_SLEEP: f32 = 0.5;

/// Linear speed tolerance for sleep accounting.
pub const SLEEP_LINEAR_TOLERANCE: f32 = 0.5;

/// Angular speed tolerance for sleep accounting.
pub const SLEEP_ANGULAR_TOLERANCE: f32 = 2.0 / 180.0 * PI;

/// Suggested step defaults.
pub const DEFAULT_VELOCITY_ITERATIONS: usize = 8;
pub const DEFAULT_POSITION_ITERATIONS: usize = 3;
