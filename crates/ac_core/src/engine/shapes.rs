//! Shape containment and disk integration
//!
//! Capsule and cone geometry for non-circular effects. Disk-vs-capsule and
//! disk-vs-cone overlap have no simple closed form, so physics overlap is
//! integrated with deterministic low-discrepancy (Fermat spiral) sampling;
//! behavior mass is summed exactly from the normalized grid.

use nalgebra::Vector3;
use std::f32::consts::PI;

use super::constants::EPSILON;
use super::coordinates::flat_dot;
use super::grid::BehaviorGrid;
use super::physics::ReachableRegion;

/// Point inside a ground-plane capsule (segment plus radius).
pub fn point_in_capsule(
    point: &Vector3<f32>,
    start: &Vector3<f32>,
    end: &Vector3<f32>,
    radius: f32,
) -> bool {
    let segment = end - start;
    let to_point = point - start;
    let radius_sq = radius * radius;

    let segment_len_sq = segment.x * segment.x + segment.z * segment.z;
    if segment_len_sq < EPSILON {
        // Degenerate segment: plain circle test.
        let dist_sq = to_point.x * to_point.x + to_point.z * to_point.z;
        return dist_sq <= radius_sq;
    }

    let t = (flat_dot(&to_point, &segment) / segment_len_sq).clamp(0.0, 1.0);
    let closest = start + segment * t;
    let dx = point.x - closest.x;
    let dz = point.z - closest.z;
    dx * dx + dz * dz <= radius_sq
}

/// Point inside a ground-plane circular sector.
pub fn point_in_cone(
    point: &Vector3<f32>,
    origin: &Vector3<f32>,
    direction: &Vector3<f32>,
    half_angle: f32,
    range: f32,
) -> bool {
    let to_point = point - origin;
    let dist_sq = to_point.x * to_point.x + to_point.z * to_point.z;

    if dist_sq > range * range {
        return false;
    }
    let dist = dist_sq.sqrt();
    if dist < EPSILON {
        return true;
    }

    // angle <= half_angle  <=>  cos(angle) >= cos(half_angle)
    let cos_angle = flat_dot(&to_point, direction) / dist;
    cos_angle >= half_angle.cos()
}

/// Deterministic low-discrepancy coverage of a disk: radius grows with
/// sqrt(i/n) for uniform area density, angle winds by a factor coprime with
/// the sample count.
pub fn fermat_disk_points(
    center: Vector3<f32>,
    radius: f32,
    samples: usize,
) -> impl Iterator<Item = Vector3<f32>> {
    const SPIRAL_FACTOR: f32 = 7.0;
    let n = samples.max(1) as f32;
    (0..samples.max(1)).map(move |i| {
        let r = radius * (i as f32 / n).sqrt();
        let theta = 2.0 * PI * i as f32 / n * SPIRAL_FACTOR;
        Vector3::new(
            center.x + r * theta.cos(),
            center.y,
            center.z + r * theta.sin(),
        )
    })
}

/// Fraction of the reachable disk covered by a capsule, by spiral sampling.
pub fn capsule_region_overlap(
    start: &Vector3<f32>,
    direction: &Vector3<f32>,
    length: f32,
    radius: f32,
    region: &ReachableRegion,
    samples: usize,
) -> f32 {
    if region.area < EPSILON {
        let end = start + direction * length;
        return if point_in_capsule(&region.center, start, &end, radius) {
            1.0
        } else {
            0.0
        };
    }

    let end = start + direction * length;
    let hits = fermat_disk_points(region.center, region.max_radius, samples)
        .filter(|p| point_in_capsule(p, start, &end, radius))
        .count();
    hits as f32 / samples.max(1) as f32
}

/// Fraction of the reachable disk covered by a cone, by spiral sampling.
pub fn cone_region_overlap(
    origin: &Vector3<f32>,
    direction: &Vector3<f32>,
    half_angle: f32,
    range: f32,
    region: &ReachableRegion,
    samples: usize,
) -> f32 {
    if region.area < EPSILON {
        return if point_in_cone(&region.center, origin, direction, half_angle, range) {
            1.0
        } else {
            0.0
        };
    }

    let hits = fermat_disk_points(region.center, region.max_radius, samples)
        .filter(|p| point_in_cone(p, origin, direction, half_angle, range))
        .count();
    hits as f32 / samples.max(1) as f32
}

/// Behavior mass inside a capsule; neutral 1.0 when the grid has no data so
/// sparse histories fall back to physics-only estimates.
pub fn capsule_behavior_probability(
    start: &Vector3<f32>,
    direction: &Vector3<f32>,
    length: f32,
    radius: f32,
    grid: &BehaviorGrid,
) -> f32 {
    if !grid.has_data() {
        return 1.0;
    }
    let end = start + direction * length;
    grid.mass_where(|cell| point_in_capsule(cell, start, &end, radius))
}

/// Behavior mass inside a cone; neutral 1.0 when the grid has no data.
pub fn cone_behavior_probability(
    origin: &Vector3<f32>,
    direction: &Vector3<f32>,
    half_angle: f32,
    range: f32,
    grid: &BehaviorGrid,
) -> f32 {
    if !grid.has_data() {
        return 1.0;
    }
    grid.mass_where(|cell| point_in_cone(cell, origin, direction, half_angle, range))
}

/// Behavior mass inside a circle; neutral 1.0 when the grid has no data.
pub fn circle_behavior_probability(
    center: &Vector3<f32>,
    radius: f32,
    grid: &BehaviorGrid,
) -> f32 {
    if !grid.has_data() {
        return 1.0;
    }
    grid.mass_in_circle(center, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::compute_reachable_region;

    fn region_at(center: Vector3<f32>, radius_time: f32) -> ReachableRegion {
        compute_reachable_region(
            &center,
            &Vector3::new(350.0, 0.0, 0.0),
            radius_time,
            350.0,
            0.0,
            1500.0,
        )
    }

    #[test]
    fn test_point_in_capsule_basic() {
        let start = Vector3::zeros();
        let end = Vector3::new(1000.0, 0.0, 0.0);
        assert!(point_in_capsule(&Vector3::new(500.0, 0.0, 50.0), &start, &end, 60.0));
        assert!(!point_in_capsule(&Vector3::new(500.0, 0.0, 80.0), &start, &end, 60.0));
        // Past the far cap.
        assert!(!point_in_capsule(&Vector3::new(1100.0, 0.0, 0.0), &start, &end, 60.0));
        assert!(point_in_capsule(&Vector3::new(1050.0, 0.0, 0.0), &start, &end, 60.0));
    }

    #[test]
    fn test_point_in_capsule_degenerate_segment() {
        let p = Vector3::new(10.0, 0.0, 0.0);
        assert!(point_in_capsule(&p, &Vector3::zeros(), &Vector3::zeros(), 20.0));
        assert!(!point_in_capsule(&p, &Vector3::zeros(), &Vector3::zeros(), 5.0));
    }

    #[test]
    fn test_point_in_cone_basic() {
        let origin = Vector3::zeros();
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let half = 30.0f32.to_radians();
        assert!(point_in_cone(&Vector3::new(400.0, 0.0, 100.0), &origin, &dir, half, 600.0));
        assert!(!point_in_cone(&Vector3::new(400.0, 0.0, 300.0), &origin, &dir, half, 600.0));
        assert!(!point_in_cone(&Vector3::new(700.0, 0.0, 0.0), &origin, &dir, half, 600.0));
        // The apex is inside.
        assert!(point_in_cone(&origin, &origin, &dir, half, 600.0));
    }

    #[test]
    fn test_spiral_covers_disk_uniformly() {
        let points: Vec<_> = fermat_disk_points(Vector3::zeros(), 100.0, 128).collect();
        assert_eq!(points.len(), 128);
        for p in &points {
            let d = (p.x * p.x + p.z * p.z).sqrt();
            assert!(d <= 100.0 + 1e-3);
        }
        // Roughly a quarter of uniform samples land in the half-radius disk.
        let inner = points
            .iter()
            .filter(|p| (p.x * p.x + p.z * p.z).sqrt() <= 50.0)
            .count();
        assert!((inner as f32 / 128.0 - 0.25).abs() < 0.08);
    }

    #[test]
    fn test_capsule_overlap_full_and_none() {
        let region = region_at(Vector3::new(500.0, 0.0, 0.0), 0.2); // radius 70
        // Capsule swallowing the whole disk.
        let full = capsule_region_overlap(
            &Vector3::zeros(),
            &Vector3::new(1.0, 0.0, 0.0),
            1000.0,
            300.0,
            &region,
            128,
        );
        assert!((full - 1.0).abs() < 1e-6);
        // Capsule aimed away.
        let none = capsule_region_overlap(
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 1.0),
            1000.0,
            60.0,
            &region,
            128,
        );
        assert_eq!(none, 0.0);
    }

    #[test]
    fn test_behavior_probability_neutral_without_data() {
        let grid = BehaviorGrid::default();
        let p = capsule_behavior_probability(
            &Vector3::zeros(),
            &Vector3::new(1.0, 0.0, 0.0),
            1000.0,
            60.0,
            &grid,
        );
        assert_eq!(p, 1.0);
        assert_eq!(circle_behavior_probability(&Vector3::zeros(), 100.0, &grid), 1.0);
    }

    #[test]
    fn test_cone_behavior_probability_sums_mass() {
        let mut grid = BehaviorGrid::new(Vector3::new(400.0, 0.0, 0.0), 20.0);
        grid.add_weighted_sample(&Vector3::new(400.0, 0.0, 0.0), 1.0);
        grid.normalize();
        let toward = cone_behavior_probability(
            &Vector3::zeros(),
            &Vector3::new(1.0, 0.0, 0.0),
            25.0f32.to_radians(),
            800.0,
            &grid,
        );
        let away = cone_behavior_probability(
            &Vector3::zeros(),
            &Vector3::new(-1.0, 0.0, 0.0),
            25.0f32.to_radians(),
            800.0,
            &grid,
        );
        assert!(toward > 0.9);
        assert!(away < 0.05);
    }
}
