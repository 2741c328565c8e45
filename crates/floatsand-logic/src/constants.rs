//! Tuning constants of the human behavior state machine.
//!
//! Velocities are in m/s; "frames" are simulation steps.

/// Nominal human height (m) that walks at [`HUMAN_WALKING_SPEED_AT_NOMINAL_HEIGHT`].
pub const HUMAN_NOMINAL_HEIGHT: f32 = 1.65;
/// Base walking speed (m/s) of a human of nominal height.
pub const HUMAN_WALKING_SPEED_AT_NOMINAL_HEIGHT: f32 = 1.0;
/// Upper bound of the total walking speed adjustment, panic included.
pub const MAX_TOTAL_WALKING_SPEED_ADJUSTMENT: f32 = 2.5;

/// Mesh-relative speed above which equilibrium cannot be held.
pub const MAX_RELATIVE_VELOCITY_MAGNITUDE_FOR_EQUILIBRIUM: f32 = 3.0;
/// Speed along the walking direction above which walking gives up.
pub const MAX_WALKING_RELATIVE_VELOCITY: f32 = 5.0;
/// Speed below which a fallen human counts as resting.
pub const MAX_RESTING_VELOCITY: f32 = 0.5;

/// Along-floor speed above which a touching aerial human is falling, not rising.
pub const AERIAL_SLIDING_VELOCITY: f32 = 0.05;

/// Head-above-feet direction `y` below which the dynamic check applies.
pub const EQUILIBRIUM_STATIC_DIRECTION_Y: f32 = 0.84;
/// Radial velocity tolerated while rising.
pub const EQUILIBRIUM_RISING_MAX_RADIAL_VELOCITY: f32 = 1.056;
/// Tolerance on the feet-to-head vertical alignment for completing a rise.
pub const RISING_ALIGNMENT_TOLERANCE: f32 = 0.004;
/// Head-below-feet direction `y` at which a knocked-out human is stuck upside-down.
pub const UPSIDE_DOWN_DIRECTION_Y: f32 = -0.7;

/// Panic level below which a new stimulus also reverses the walking direction.
pub const PANIC_FLIP_THRESHOLD: f32 = 0.6;
/// Per-frame decay fraction of the on-fire panic.
pub const ON_FIRE_PANIC_DECAY: f32 = 0.01;
/// Per-frame decay fraction of the bomb-proximity panic.
pub const BOMB_PANIC_DECAY: f32 = 0.0025;
/// Per-frame decay fraction of the disturbance attraction timer.
pub const ATTRACTION_DECAY: f32 = 0.01;

pub mod rates {
    //! Convergence rates per frame.

    pub const AERIAL_TO_FALLING: f32 = 0.75;
    pub const AERIAL_TO_RISING: f32 = 0.5;
    pub const FALLING_TO_AERIAL: f32 = 0.35;
    pub const KNOCKED_OUT_TO_AERIAL: f32 = 0.2;
    pub const PRE_RISING_TO_AERIAL: f32 = 0.2;
    pub const EQUILIBRIUM_TO_WALKING: f32 = 0.12;
    pub const EQUILIBRIUM_TO_WALKING_PANIC: f32 = 0.12;
    pub const SOFT_TERMINATION: f32 = 0.25;
    pub const SOFT_TERMINATION_MIN: f32 = 0.1;
    pub const CONSTRAINED_TO_SWIMMING: f32 = 0.01;
    pub const FREE_TO_KNOCKED_OUT: f32 = 0.2;
    pub const FREE_KNOCKED_OUT_TO_AERIAL: f32 = 0.2;
    pub const FREE_TO_SWIMMING: f32 = 0.12;
    pub const WALK_FLIP: f32 = 0.1;
    pub const WALK_MAGNITUDE: f32 = 0.10;
    pub const WALK_MAGNITUDE_PANIC: f32 = 0.08;
}

pub mod thresholds {
    //! Frame counts and progress levels at which states complete.

    pub const FALLING_TO_PRE_RISING_FRAMES: f32 = 20.0;
    pub const FALLING_TO_PRE_RISING_PANIC_FRAMES: f32 = 10.0;
    pub const KNOCKED_OUT_TO_PRE_RISING_FRAMES: f32 = 40.0;
    pub const KNOCKED_OUT_SEED_FRAMES: f32 = 10.0;
    pub const PRE_RISING_TO_RISING_FRAMES: f32 = 13.0;
    pub const PRE_RISING_SEED_FRAMES: f32 = 3.0;
    pub const ELECTRIFIED_TO_KNOCKED_OUT_FRAMES: f32 = 8.0;
    pub const CONSTRAINED_SWIMMING: f32 = 0.98;
    pub const FREE_SWIMMING: f32 = 0.9;
    pub const WALK_FLIP_DECISION: f32 = 0.95;
    pub const WALK_AGREEMENT: f32 = 0.025;
    pub const CONSTRAINED_IN_WATER_WATERNESS: f32 = 0.5;
    pub const CONSTRAINED_OUT_OF_WATER_WATERNESS: f32 = 0.25;
    pub const FREE_KNOCKED_OUT_VELOCITY: f32 = 0.1;
    pub const FREE_AERIAL_VELOCITY: f32 = 0.5;
    pub const FREE_SWIMMING_MAX_ROTATION: f32 = 2.0;
    pub const RISING_HEAD_IMPACT: f32 = 0.4;
    pub const EQUILIBRIUM_HEAD_IMPACT: f32 = 1.5;
    pub const WALKING_FEET_IMPACT_SLOPE: f32 = 0.85;
    pub const WALKING_HEAD_IMPACT_SLOPE: f32 = 0.5;
}
