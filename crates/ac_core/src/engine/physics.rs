//! Reachability model
//!
//! Pure kinematics: given a time budget, how far can the target possibly be?
//! The reachable set is a disk because the target domain has instantaneous
//! turning. All functions are pure and total; degenerate inputs produce
//! zero-size regions instead of NaN.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::constants::physics::{BOUNDARY_POINTS, INSTANT_SPEED_CUTOFF, MIN_RADIUS};
use super::constants::EPSILON;
use super::coordinates::{flat_distance, flat_length};

/// Disk of positions a target could occupy within a time budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachableRegion {
    pub center: Vector3<f32>,
    pub max_radius: f32,
    /// Regular polygon around the boundary, for geometry and visualization.
    pub boundary_points: Vec<Vector3<f32>>,
    pub area: f32,
}

/// Maximum reachable disk under a two-phase kinematic model: accelerate from
/// the current speed toward `max_speed`, then cruise for the remainder.
///
/// `turn_rate` is accepted but unused: the target domain turns instantly. A
/// domain with turning constraints would replace the disk with a cone-shaped
/// region.
pub fn compute_reachable_region(
    position: &Vector3<f32>,
    velocity: &Vector3<f32>,
    time_budget: f32,
    max_speed: f32,
    _turn_rate: f32,
    acceleration: f32,
) -> ReachableRegion {
    if time_budget < EPSILON {
        return ReachableRegion {
            center: *position,
            max_radius: 0.0,
            boundary_points: Vec::new(),
            area: 0.0,
        };
    }

    let current_speed = flat_length(velocity);
    let speed_deficit = max_speed - current_speed;

    let max_distance = if speed_deficit > 0.0 && acceleration > 0.0 {
        // Phase 1: d = v0*t + a*t^2/2 until max speed (or budget) is reached.
        let accel_time = (speed_deficit / acceleration).min(time_budget);
        let accel_distance =
            current_speed * accel_time + 0.5 * acceleration * accel_time * accel_time;
        // Phase 2: cruise at max speed.
        let cruise_time = time_budget - accel_time;
        accel_distance + max_speed * cruise_time
    } else {
        max_speed * time_budget
    };

    let boundary_points = (0..BOUNDARY_POINTS)
        .map(|i| {
            let angle = 2.0 * PI * i as f32 / BOUNDARY_POINTS as f32;
            Vector3::new(
                position.x + max_distance * angle.cos(),
                position.y,
                position.z + max_distance * angle.sin(),
            )
        })
        .collect();

    ReachableRegion {
        center: *position,
        max_radius: max_distance,
        boundary_points,
        area: PI * max_distance * max_distance,
    }
}

/// Cast delay plus projectile travel time; instant effects collapse to the
/// delay alone.
pub fn compute_arrival_time(
    source: &Vector3<f32>,
    target: &Vector3<f32>,
    projectile_speed: f32,
    cast_delay: f32,
) -> f32 {
    if projectile_speed < EPSILON || projectile_speed >= INSTANT_SPEED_CUTOFF {
        return cast_delay;
    }
    cast_delay + flat_distance(source, target) / projectile_speed
}

/// Straight-line extrapolation of a position.
pub fn predict_linear_position(
    position: &Vector3<f32>,
    velocity: &Vector3<f32>,
    time: f32,
) -> Vector3<f32> {
    position + velocity * time
}

/// Lens area of two intersecting circles, with degeneracy guards.
pub fn circle_circle_intersection_area(
    c1: &Vector3<f32>,
    r1: f32,
    c2: &Vector3<f32>,
    r2: f32,
) -> f32 {
    if r1 < MIN_RADIUS || r2 < MIN_RADIUS {
        return 0.0;
    }

    let d = flat_distance(c1, c2);
    let smaller = r1.min(r2);

    if d >= r1 + r2 {
        return 0.0;
    }
    // Containment, or coincident centers where the lens formula divides by d.
    if d <= (r1 - r2).abs() || d < MIN_RADIUS {
        return PI * smaller * smaller;
    }

    let d2 = d * d;
    let r1_2 = r1 * r1;
    let r2_2 = r2 * r2;

    let alpha = (((d2 + r1_2 - r2_2) / (2.0 * d * r1)).clamp(-1.0, 1.0)).acos();
    let beta = (((d2 + r2_2 - r1_2) / (2.0 * d * r2)).clamp(-1.0, 1.0)).acos();

    let mut area = r1_2 * alpha + r2_2 * beta;

    // Heron-style term; floating error can push it slightly negative.
    let sqrt_term = (r1 + r2 - d) * (r1 - r2 + d) * (-r1 + r2 + d) * (r1 + r2 + d);
    if sqrt_term > 0.0 {
        area -= 0.5 * sqrt_term.sqrt();
    }

    area
}

/// Fraction of the reachable region covered by a circular effect at
/// `aim_point`, clamped to [0, 1].
pub fn physics_hit_probability(
    aim_point: &Vector3<f32>,
    effect_radius: f32,
    region: &ReachableRegion,
) -> f32 {
    if region.area < EPSILON {
        // Zero-size region: the target cannot move, so the only question is
        // whether the effect covers the point it is standing on.
        let dist = flat_distance(aim_point, &region.center);
        return if dist <= effect_radius { 1.0 } else { 0.0 };
    }

    let intersection =
        circle_circle_intersection_area(aim_point, effect_radius, &region.center, region.max_radius);
    (intersection / region.area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_budget_is_zero_region() {
        let region = compute_reachable_region(
            &Vector3::zeros(),
            &Vector3::new(300.0, 0.0, 0.0),
            0.0,
            350.0,
            0.0,
            1500.0,
        );
        assert_eq!(region.max_radius, 0.0);
        assert_eq!(region.area, 0.0);
        assert!(region.boundary_points.is_empty());
    }

    #[test]
    fn test_cruise_only_when_at_max_speed() {
        let region = compute_reachable_region(
            &Vector3::zeros(),
            &Vector3::new(350.0, 0.0, 0.0),
            1.0,
            350.0,
            0.0,
            1500.0,
        );
        assert!((region.max_radius - 350.0).abs() < 1e-3);
        assert_eq!(region.boundary_points.len(), BOUNDARY_POINTS);
    }

    #[test]
    fn test_acceleration_phase_shortens_distance() {
        // Starting from rest the target covers less ground than at full speed.
        let from_rest = compute_reachable_region(
            &Vector3::zeros(),
            &Vector3::zeros(),
            1.0,
            350.0,
            0.0,
            1500.0,
        );
        assert!(from_rest.max_radius < 350.0);
        assert!(from_rest.max_radius > 0.0);
    }

    #[test]
    fn test_arrival_time_instant() {
        let a = Vector3::zeros();
        let b = Vector3::new(1000.0, 0.0, 0.0);
        assert_eq!(compute_arrival_time(&a, &b, f32::INFINITY, 0.25), 0.25);
        assert_eq!(compute_arrival_time(&a, &b, f32::MAX, 0.25), 0.25);
    }

    #[test]
    fn test_arrival_time_projectile() {
        let a = Vector3::zeros();
        let b = Vector3::new(1000.0, 0.0, 0.0);
        let t = compute_arrival_time(&a, &b, 2000.0, 0.25);
        assert!((t - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_intersection_disjoint_is_zero() {
        let a = Vector3::zeros();
        let b = Vector3::new(300.0, 0.0, 0.0);
        assert_eq!(circle_circle_intersection_area(&a, 100.0, &b, 100.0), 0.0);
    }

    #[test]
    fn test_intersection_contained_is_smaller_area() {
        let a = Vector3::zeros();
        let b = Vector3::new(10.0, 0.0, 0.0);
        let area = circle_circle_intersection_area(&a, 200.0, &b, 50.0);
        assert!((area - PI * 50.0 * 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_intersection_continuous_at_tangency() {
        let a = Vector3::zeros();
        // Just inside and just outside external tangency.
        let inside = circle_circle_intersection_area(
            &a,
            100.0,
            &Vector3::new(199.9, 0.0, 0.0),
            100.0,
        );
        let outside = circle_circle_intersection_area(
            &a,
            100.0,
            &Vector3::new(200.1, 0.0, 0.0),
            100.0,
        );
        assert_eq!(outside, 0.0);
        assert!(inside < 20.0); // A sliver, continuous with zero.
    }

    #[test]
    fn test_physics_probability_zero_region() {
        let region = compute_reachable_region(
            &Vector3::zeros(),
            &Vector3::zeros(),
            0.0,
            350.0,
            0.0,
            1500.0,
        );
        assert_eq!(physics_hit_probability(&Vector3::zeros(), 100.0, &region), 1.0);
        let far = Vector3::new(500.0, 0.0, 0.0);
        assert_eq!(physics_hit_probability(&far, 100.0, &region), 0.0);
    }

    proptest! {
        /// Radius is non-decreasing in the time budget.
        #[test]
        fn prop_radius_monotonic_in_time(
            t1 in 0.0f32..2.0,
            dt in 0.0f32..2.0,
            speed in 50.0f32..600.0,
            start_speed in 0.0f32..600.0,
        ) {
            let vel = Vector3::new(start_speed, 0.0, 0.0);
            let r1 = compute_reachable_region(&Vector3::zeros(), &vel, t1, speed, 0.0, 1500.0);
            let r2 = compute_reachable_region(&Vector3::zeros(), &vel, t1 + dt, speed, 0.0, 1500.0);
            prop_assert!(r2.max_radius >= r1.max_radius - 1e-3);
        }

        /// Radius is non-decreasing in max speed.
        #[test]
        fn prop_radius_monotonic_in_speed(
            speed in 50.0f32..600.0,
            ds in 0.0f32..300.0,
            t in 0.05f32..2.0,
        ) {
            let vel = Vector3::zeros();
            let r1 = compute_reachable_region(&Vector3::zeros(), &vel, t, speed, 0.0, 1500.0);
            let r2 = compute_reachable_region(&Vector3::zeros(), &vel, t, speed + ds, 0.0, 1500.0);
            prop_assert!(r2.max_radius >= r1.max_radius - 1e-3);
        }

        /// Intersection area never exceeds the smaller circle and never goes
        /// negative.
        #[test]
        fn prop_intersection_bounded(
            d in 0.0f32..500.0,
            r1 in 0.001f32..200.0,
            r2 in 0.001f32..200.0,
        ) {
            let a = Vector3::zeros();
            let b = Vector3::new(d, 0.0, 0.0);
            let area = circle_circle_intersection_area(&a, r1, &b, r2);
            let smaller = r1.min(r2);
            prop_assert!(area >= 0.0);
            prop_assert!(area <= PI * smaller * smaller + 1e-2);
        }
    }
}
