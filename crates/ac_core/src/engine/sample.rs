//! Movement samples
//!
//! A sample is an immutable timestamped snapshot of one target's kinematic
//! and status state. The tracker appends one roughly every 30 ms; everything
//! the behavior model learns is derived from sequences of these.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::constants::EPSILON;
use super::world::UnitSnapshot;

/// One timestamped observation of a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementSample {
    pub position: Vector3<f32>,
    /// Game time the sample was taken (seconds).
    pub timestamp: f32,
    /// Finite-difference velocity against the previous sample; zero for the
    /// first sample of a history.
    pub velocity: Vector3<f32>,
    pub is_auto_attacking: bool,
    pub is_casting: bool,
    pub is_dashing: bool,
    pub is_crowd_controlled: bool,
    /// Remaining health in [0, 100].
    pub hp_percent: f32,
}

impl MovementSample {
    /// Build a sample from a unit snapshot; velocity starts at zero and is
    /// filled in by [`velocity_between`] once a predecessor exists.
    pub fn from_unit(unit: &UnitSnapshot, timestamp: f32) -> Self {
        Self {
            position: unit.position,
            timestamp,
            velocity: Vector3::zeros(),
            is_auto_attacking: unit.is_auto_attacking,
            is_casting: unit.is_casting,
            is_dashing: unit.is_dashing,
            is_crowd_controlled: unit.is_crowd_controlled,
            hp_percent: unit.health_percent(),
        }
    }

    /// The target cannot move until its current action completes.
    pub fn is_animation_locked(&self) -> bool {
        self.is_auto_attacking || self.is_casting || self.is_crowd_controlled
    }
}

/// Finite-difference velocity between consecutive samples; zero when the
/// spacing is degenerate.
pub fn velocity_between(prev: &MovementSample, curr: &MovementSample) -> Vector3<f32> {
    let dt = curr.timestamp - prev.timestamp;
    if dt < EPSILON {
        Vector3::zeros()
    } else {
        (curr.position - prev.position) / dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(x: f32, t: f32) -> MovementSample {
        MovementSample {
            position: Vector3::new(x, 0.0, 0.0),
            timestamp: t,
            velocity: Vector3::zeros(),
            is_auto_attacking: false,
            is_casting: false,
            is_dashing: false,
            is_crowd_controlled: false,
            hp_percent: 100.0,
        }
    }

    #[test]
    fn test_velocity_between() {
        let a = sample_at(0.0, 1.0);
        let b = sample_at(10.0, 1.1);
        let v = velocity_between(&a, &b);
        assert!((v.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_velocity_degenerate_dt() {
        let a = sample_at(0.0, 1.0);
        let b = sample_at(10.0, 1.0);
        assert_eq!(velocity_between(&a, &b), Vector3::zeros());
    }
}
