//! Structural constants for the prediction engine
//!
//! Values here define the shape of the algorithm (buffer caps, grid
//! resolution, numeric guards) and are not expected to be tuned per
//! deployment. Knobs that trade accuracy for cost live in
//! [`PredictionConfig`](super::config::PredictionConfig) instead.

/// Shared numeric guard for near-zero comparisons (world units / seconds).
pub const EPSILON: f32 = 1e-4;

// ============================================================
// Movement sampling
// ============================================================
pub mod sampling {
    /// Minimum spacing between movement samples (seconds, ~33 Hz).
    pub const SAMPLE_INTERVAL: f32 = 0.03;

    /// Ring-buffer cap for per-target movement history.
    pub const HISTORY_CAP: usize = 100;

    /// Below this many samples behavior estimates are considered sparse.
    pub const MIN_SAMPLES_FOR_BEHAVIOR: usize = 10;

    /// Pattern analysis runs every Nth accepted sample.
    pub const PATTERN_ANALYSIS_STRIDE: usize = 20;

    /// Speeds below this are treated as sensor noise (units/s).
    pub const NOISE_SPEED: f32 = 10.0;
}

// ============================================================
// Behavior probability grid
// ============================================================
pub mod grid {
    /// Grid edge length in cells (grid is SIZE x SIZE).
    pub const SIZE: usize = 32;

    /// Gaussian deposition kernel: standard deviation in cells.
    pub const KERNEL_SIGMA: f32 = 1.5;

    /// Gaussian deposition kernel: radius in cells.
    pub const KERNEL_RADIUS: i32 = 2;

    /// Minimum half-extent of grid coverage (world units).
    pub const MIN_COVER_RADIUS: f32 = 400.0;

    /// Margin multiplier on expected displacement when sizing the grid.
    pub const COVER_MARGIN: f32 = 1.2;

    /// Samples considered when centering and filling the grid.
    pub const CENTROID_SAMPLE_CAP: usize = 30;

    /// Per-frame cache: prediction-time similarity tolerance (seconds).
    pub const CACHE_TIME_TOLERANCE: f32 = 0.05;

    /// Per-frame cache: move-speed similarity tolerance (units/s).
    pub const CACHE_SPEED_TOLERANCE: f32 = 20.0;
}

// ============================================================
// Reachability / kinematics
// ============================================================
pub mod physics {
    /// Boundary discretization of the reachable disk.
    pub const BOUNDARY_POINTS: usize = 32;

    /// Default acceleration toward max move speed (units/s^2).
    pub const DEFAULT_ACCELERATION: f32 = 1500.0;

    /// Projectile speeds at or above this are treated as instant.
    pub const INSTANT_SPEED_CUTOFF: f32 = f32::MAX / 2.0;

    /// Radii below this are degenerate for intersection math.
    pub const MIN_RADIUS: f32 = 1e-6;
}

// ============================================================
// Dodge pattern detection
// ============================================================
pub mod pattern {
    /// Lateral classification threshold on the cross product (frequencies).
    pub const LATERAL_THRESHOLD: f32 = 0.1;

    /// Lateral classification threshold for juke-sequence symbols.
    pub const SEQUENCE_LATERAL_THRESHOLD: f32 = 0.15;

    /// Forward/backward classification threshold on the dot product.
    pub const FORWARD_THRESHOLD: f32 = 0.5;

    /// Direction change counted when turn angle exceeds this (radians, ~30 deg).
    pub const DIRECTION_CHANGE_ANGLE: f32 = 0.5;

    /// Maximum juke-sequence length retained for detection.
    pub const MAX_SEQUENCE_LENGTH: usize = 8;

    /// Detected patterns expire after this much sample inactivity (seconds).
    pub const PATTERN_EXPIRY: f32 = 3.0;

    /// Cap on alternating-pattern confidence.
    pub const MAX_PATTERN_CONFIDENCE: f32 = 0.9;

    /// Fixed confidence for a repeating half/half sequence.
    pub const REPEATING_CONFIDENCE: f32 = 0.85;

    /// Default learned reaction delay (milliseconds).
    pub const DEFAULT_REACTION_DELAY_MS: f32 = 200.0;

    /// Cap on stored post-action movement-onset delays.
    pub const REACTION_SAMPLE_CAP: usize = 20;

    /// Post-action delays longer than this are discarded (seconds).
    pub const REACTION_DELAY_MAX: f32 = 1.0;
}

// ============================================================
// Confidence scoring
// ============================================================
pub mod confidence {
    /// Exponential decay per world unit of caster-to-target distance.
    pub const DISTANCE_DECAY: f32 = 0.0005;

    /// Exponential decay per second of network round-trip latency.
    pub const LATENCY_FACTOR: f32 = 2.0;

    /// Multiplier for instant effects.
    pub const INSTANT_BONUS: f32 = 1.2;

    /// Projectiles slower than this take the slow penalty (units/s).
    pub const SLOW_PROJECTILE_SPEED: f32 = 1000.0;

    /// Multiplier for slow projectiles.
    pub const SLOW_PROJECTILE_PENALTY: f32 = 0.9;

    /// Move speed normalizer for the mobility penalty.
    pub const MOBILITY_REFERENCE_SPEED: f32 = 500.0;

    /// Mobility penalty clamp (divisor, never zero).
    pub const MOBILITY_MIN: f32 = 0.5;
    pub const MOBILITY_MAX: f32 = 1.5;

    /// Additional multiplier when the target is animation locked.
    pub const ANIMATION_LOCK_BOOST: f32 = 0.3;

    /// Fixed confidence for obvious-hit states.
    pub const OBVIOUS_HIT: f32 = 0.95;

    /// Consecutive samples required for the straight-line obvious hit.
    pub const STRAIGHT_LINE_SAMPLES: usize = 5;

    /// Straight-line tolerance: 1 - cos(angle), ~5.7 degrees.
    pub const STRAIGHT_LINE_TOLERANCE: f32 = 0.1;

    /// Final clamp.
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 1.0;
}

// ============================================================
// Stationary-target hit-chance floor
// ============================================================
pub mod stationary {
    /// Velocity magnitude below which a target counts as stationary (units/s).
    pub const SPEED_THRESHOLD: f32 = 10.0;

    /// Stillness duration where the floor starts (seconds).
    pub const FLOOR_START: f32 = 0.5;

    /// Stillness duration where the floor saturates (seconds).
    pub const FLOOR_FULL: f32 = 1.0;

    /// Floor value at FLOOR_START.
    pub const FLOOR_MIN: f32 = 0.50;

    /// Floor value at and beyond FLOOR_FULL.
    pub const FLOOR_MAX: f32 = 0.75;
}

// ============================================================
// Opportunity windows
// ============================================================
pub mod opportunity {
    /// Rolling window time span (seconds).
    pub const WINDOW_DURATION: f32 = 3.0;

    /// Hard cap on stored samples (guards against lag-spike floods).
    pub const HISTORY_CAP: usize = 200;

    /// Peak older than this is recomputed from the window (seconds).
    pub const PEAK_STALE: f32 = 2.0;

    /// Minimum samples before trend detection is meaningful.
    pub const MIN_TREND_SAMPLES: usize = 5;

    /// Current value must exceed the recent average by this factor.
    pub const LOCAL_MAX_MARGIN: f32 = 1.05;

    /// Peak must reach this fraction of the adaptive threshold.
    pub const QUALITY_FRACTION: f32 = 0.90;

    /// Threshold decay starts after this window age (seconds).
    pub const THRESHOLD_DECAY_START: f32 = 3.0;

    /// Threshold decay completes at this window age (seconds).
    pub const THRESHOLD_DECAY_END: f32 = 8.0;

    /// Threshold never drops below this fraction of the base.
    pub const THRESHOLD_FLOOR_FRACTION: f32 = 0.7;

    /// Patience window derivation from spell cooldown.
    pub const PATIENCE_COOLDOWN_FACTOR: f32 = 0.3;
    pub const PATIENCE_MIN: f32 = 1.5;
    pub const PATIENCE_MAX: f32 = 3.0;

    /// Hit chance below this fraction of the previous sample suggests a cast.
    pub const RESET_DROP_FRACTION: f32 = 0.5;

    /// Windows younger than this never reset (seconds).
    pub const RESET_MIN_AGE: f32 = 1.0;

    /// Fallback base threshold when the spell declares none.
    pub const DEFAULT_BASE_THRESHOLD: f32 = 0.65;
}

// ============================================================
// Tracker lifecycle
// ============================================================
pub mod tracker {
    /// Trackers for unresolvable targets are kept this long after their last
    /// sample, preserving learned patterns across fog or brief despawns.
    pub const TIMEOUT: f32 = 5.0;
}

// ============================================================
// Contextual grid biases
// ============================================================
pub mod context {
    /// Weight of the current-position deposit while animation locked.
    pub const ANIMATION_LOCK_WEIGHT: f32 = 2.0;

    /// Search radius for farmable low-health minions (world units).
    pub const CS_SEARCH_RADIUS: f32 = 500.0;

    /// Minions above attack_damage * this are not farm candidates.
    pub const CS_KILLABLE_AUTOS: f32 = 3.0;

    /// Minimum combined confidence for a farm opportunity to register.
    pub const CS_MIN_CONFIDENCE: f32 = 0.3;
}

// ============================================================
// Stasis exit timing
// ============================================================
pub mod stasis {
    /// Arrival may differ from the stasis exit by this much and still count
    /// as coinciding (seconds).
    pub const TIMING_TOLERANCE: f32 = 0.05;
}
