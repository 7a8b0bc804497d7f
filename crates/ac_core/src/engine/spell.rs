//! Caller-supplied spell descriptors

use serde::{Deserialize, Serialize};

use super::constants::physics::INSTANT_SPEED_CUTOFF;

/// Effect geometry of a spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellShape {
    /// Point-and-click; cannot miss a targetable unit.
    Point,
    /// Circular area centered on the cast position.
    Circular,
    /// Capsule from the caster toward the cast position.
    Linear,
    /// Circular sector originating at the caster.
    Cone,
    /// Fixed-length segment placed between two cast positions.
    Vector,
}

/// Everything the engine needs to know about the spell being evaluated.
///
/// Supplied by the caller per request; the engine never inspects host spell
/// data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellDescriptor {
    /// Host spell slot; keys the per-spell opportunity window.
    pub slot: i32,
    pub shape: SpellShape,
    /// Maximum travel distance, or segment length for vector shapes.
    pub range: f32,
    /// Maximum distance of the first cast position for vector shapes
    /// (0 means "same as range").
    pub cast_range: f32,
    /// Effect radius (capsule half-width for linear/vector shapes).
    pub radius: f32,
    /// Cast/windup delay before the effect starts traveling (seconds).
    pub delay: f32,
    /// Travel speed in units/s; `f32::INFINITY` (or anything above the
    /// instant cutoff) means the effect lands at the end of the delay.
    pub projectile_speed: f32,
    /// Declared cone spread in degrees; nonzero forces cone dispatch.
    pub cone_angle: f32,
    /// Cooldown in seconds; drives opportunity-window patience.
    pub cooldown: f32,
    /// Hit chance at which the caller intends to act. Used as the base for
    /// the adaptive opportunity threshold, never to gate the result.
    pub expected_hit_chance: f32,
}

impl SpellDescriptor {
    /// Whether the effect lands with no travel time.
    pub fn is_instant(&self) -> bool {
        !self.projectile_speed.is_finite() || self.projectile_speed >= INSTANT_SPEED_CUTOFF
    }

    /// First-cast reach for vector shapes, defaulting to `range`.
    pub fn first_cast_range(&self) -> f32 {
        if self.cast_range > 0.0 {
            self.cast_range
        } else {
            self.range
        }
    }
}
