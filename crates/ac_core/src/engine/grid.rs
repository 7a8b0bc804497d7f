//! Behavior probability grid
//!
//! A fixed 32x32 discretized probability density over ground positions,
//! centered on a per-request origin with a per-request cell size. The public
//! contract is three operations: Gaussian-kernel deposition, normalization,
//! and bilinear sampling. Every behavior bias (dodge samples, farm
//! opportunities, animation locks) is expressed as deposits followed by one
//! normalize.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::constants::grid::{KERNEL_RADIUS, KERNEL_SIGMA, SIZE};
use super::constants::EPSILON;

/// Normalized 2-D probability density over the XZ plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorGrid {
    /// Cell mass, indexed `[x][z]`.
    #[serde(with = "serde_cells")]
    cells: [[f32; SIZE]; SIZE],
    /// World position of the grid center.
    pub origin: Vector3<f32>,
    /// Cell edge length in world units.
    pub cell_size: f32,
    /// Sum of all cells as of the last [`normalize`](Self::normalize):
    /// 1.0 for a usable grid, ~0 for "no data".
    pub total_probability: f32,
}

impl Default for BehaviorGrid {
    fn default() -> Self {
        Self {
            cells: [[0.0; SIZE]; SIZE],
            origin: Vector3::zeros(),
            cell_size: 50.0,
            total_probability: 0.0,
        }
    }
}

impl BehaviorGrid {
    pub fn new(origin: Vector3<f32>, cell_size: f32) -> Self {
        Self {
            origin,
            cell_size: cell_size.max(EPSILON),
            ..Self::default()
        }
    }

    /// Whether the grid holds a normalized distribution.
    pub fn has_data(&self) -> bool {
        self.total_probability > EPSILON
    }

    /// Fractional grid coordinates of a world position.
    fn grid_coords(&self, pos: &Vector3<f32>) -> (f32, f32) {
        let half = SIZE as f32 / 2.0;
        let gx = (pos.x - self.origin.x) / self.cell_size + half;
        let gz = (pos.z - self.origin.z) / self.cell_size + half;
        (gx, gz)
    }

    /// World position of a cell center.
    pub fn cell_center(&self, x: usize, z: usize) -> Vector3<f32> {
        let half = SIZE as f32 / 2.0;
        Vector3::new(
            self.origin.x + (x as f32 - half + 0.5) * self.cell_size,
            self.origin.y,
            self.origin.z + (z as f32 - half + 0.5) * self.cell_size,
        )
    }

    /// Density at a world position via bilinear interpolation over the four
    /// neighboring cells; 0 outside the grid.
    pub fn sample(&self, pos: &Vector3<f32>) -> f32 {
        let (gx, gz) = self.grid_coords(pos);
        let x0 = gx.floor();
        let z0 = gz.floor();
        if x0 < 0.0 || x0 >= SIZE as f32 || z0 < 0.0 || z0 >= SIZE as f32 {
            return 0.0;
        }
        let (xi, zi) = (x0 as usize, z0 as usize);
        let (fx, fz) = (gx - x0, gz - z0);

        let at = |x: usize, z: usize| -> f32 {
            if x < SIZE && z < SIZE {
                self.cells[x][z]
            } else {
                0.0
            }
        };

        let v00 = at(xi, zi);
        let v10 = at(xi + 1, zi);
        let v01 = at(xi, zi + 1);
        let v11 = at(xi + 1, zi + 1);

        let v0 = v00 * (1.0 - fx) + v10 * fx;
        let v1 = v01 * (1.0 - fx) + v11 * fx;
        v0 * (1.0 - fz) + v1 * fz
    }

    /// Deposit a Gaussian kernel centered on the cell containing `pos`,
    /// accumulating into every cell within the kernel radius. Mass landing
    /// outside the grid is dropped.
    pub fn add_weighted_sample(&mut self, pos: &Vector3<f32>, weight: f32) {
        let (gx, gz) = self.grid_coords(pos);
        let cx = gx.floor() as i32;
        let cz = gz.floor() as i32;

        let two_sigma_sq = 2.0 * KERNEL_SIGMA * KERNEL_SIGMA;
        for i in -KERNEL_RADIUS..=KERNEL_RADIUS {
            for j in -KERNEL_RADIUS..=KERNEL_RADIUS {
                let x = cx + i;
                let z = cz + j;
                if x < 0 || x >= SIZE as i32 || z < 0 || z >= SIZE as i32 {
                    continue;
                }
                let dist_sq = (i * i + j * j) as f32;
                let kernel = (-dist_sq / two_sigma_sq).exp();
                self.cells[x as usize][z as usize] += weight * kernel;
            }
        }
    }

    /// Scale the grid so it sums to 1. A grid whose total mass is below
    /// epsilon is left untouched and reads as "no data".
    pub fn normalize(&mut self) {
        let total: f32 = self
            .cells
            .iter()
            .map(|col| col.iter().sum::<f32>())
            .sum();
        self.total_probability = total;

        if total > EPSILON {
            let scale = 1.0 / total;
            for col in self.cells.iter_mut() {
                for cell in col.iter_mut() {
                    *cell *= scale;
                }
            }
            self.total_probability = 1.0;
        }
    }

    /// Sum of the mass in cells whose centers satisfy `contains`. Exact once
    /// the grid is normalized.
    pub fn mass_where(&self, contains: impl Fn(&Vector3<f32>) -> bool) -> f32 {
        let mut mass = 0.0;
        for x in 0..SIZE {
            for z in 0..SIZE {
                if self.cells[x][z] > 0.0 && contains(&self.cell_center(x, z)) {
                    mass += self.cells[x][z];
                }
            }
        }
        mass.clamp(0.0, 1.0)
    }

    /// Mass within a circle around `center`.
    pub fn mass_in_circle(&self, center: &Vector3<f32>, radius: f32) -> f32 {
        let radius_sq = radius * radius;
        self.mass_where(|cell| {
            let dx = cell.x - center.x;
            let dz = cell.z - center.z;
            dx * dx + dz * dz <= radius_sq
        })
    }
}

/// Serde adapter for the fixed 2-D cell array (serialized as a flat vec).
mod serde_cells {
    use super::SIZE;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        cells: &[[f32; SIZE]; SIZE],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let flat: Vec<f32> = cells.iter().flat_map(|col| col.iter().copied()).collect();
        serializer.collect_seq(flat)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[[f32; SIZE]; SIZE], D::Error> {
        let flat = Vec::<f32>::deserialize(deserializer)?;
        if flat.len() != SIZE * SIZE {
            return Err(D::Error::invalid_length(flat.len(), &"SIZE*SIZE floats"));
        }
        let mut cells = [[0.0; SIZE]; SIZE];
        for (i, value) in flat.into_iter().enumerate() {
            cells[i / SIZE][i % SIZE] = value;
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_grid_reads_zero() {
        let grid = BehaviorGrid::default();
        assert!(!grid.has_data());
        assert_eq!(grid.sample(&Vector3::zeros()), 0.0);
    }

    #[test]
    fn test_out_of_bounds_sample_is_zero() {
        let mut grid = BehaviorGrid::new(Vector3::zeros(), 10.0);
        grid.add_weighted_sample(&Vector3::zeros(), 1.0);
        grid.normalize();
        let far = Vector3::new(10_000.0, 0.0, 0.0);
        assert_eq!(grid.sample(&far), 0.0);
    }

    #[test]
    fn test_deposit_peaks_at_center() {
        let mut grid = BehaviorGrid::new(Vector3::zeros(), 10.0);
        grid.add_weighted_sample(&Vector3::zeros(), 1.0);
        grid.normalize();
        let center = grid.sample(&Vector3::zeros());
        let off = grid.sample(&Vector3::new(25.0, 0.0, 0.0));
        assert!(center > off);
        assert!(off > 0.0);
    }

    #[test]
    fn test_all_zero_grid_stays_zero_after_normalize() {
        let mut grid = BehaviorGrid::new(Vector3::zeros(), 10.0);
        grid.normalize();
        assert!(!grid.has_data());
        for x in 0..SIZE {
            for z in 0..SIZE {
                assert_eq!(grid.cells[x][z], 0.0);
            }
        }
    }

    #[test]
    fn test_mass_in_circle_covers_everything_with_huge_radius() {
        let mut grid = BehaviorGrid::new(Vector3::zeros(), 10.0);
        grid.add_weighted_sample(&Vector3::new(30.0, 0.0, -20.0), 2.0);
        grid.add_weighted_sample(&Vector3::new(-50.0, 0.0, 40.0), 1.0);
        grid.normalize();
        let mass = grid.mass_in_circle(&Vector3::zeros(), 10_000.0);
        assert!((mass - 1.0).abs() < 1e-4);
    }

    proptest! {
        /// Any non-degenerate deposit sequence normalizes to total 1.
        #[test]
        fn prop_normalize_sums_to_one(
            samples in prop::collection::vec((-150.0f32..150.0, -150.0f32..150.0, 0.01f32..5.0), 1..40)
        ) {
            let mut grid = BehaviorGrid::new(Vector3::zeros(), 10.0);
            for (x, z, w) in samples {
                grid.add_weighted_sample(&Vector3::new(x, 0.0, z), w);
            }
            grid.normalize();
            prop_assert!(grid.has_data());
            let total: f32 = grid.cells.iter().map(|c| c.iter().sum::<f32>()).sum();
            prop_assert!((total - 1.0).abs() < 1e-3);
        }

        /// Bilinear sampling never reads negative or non-finite density.
        #[test]
        fn prop_sample_is_finite_nonnegative(
            x in -500.0f32..500.0,
            z in -500.0f32..500.0,
        ) {
            let mut grid = BehaviorGrid::new(Vector3::zeros(), 10.0);
            grid.add_weighted_sample(&Vector3::new(20.0, 0.0, 20.0), 1.0);
            grid.normalize();
            let v = grid.sample(&Vector3::new(x, 0.0, z));
            prop_assert!(v.is_finite());
            prop_assert!(v >= 0.0);
        }
    }
}
