//! Prediction engine configuration
//!
//! Centralizes every knob that trades accuracy for per-call cost, plus the
//! behavior toggles a host surfaces in its menu. Structural values (history
//! caps, grid resolution) are deliberately not configurable; see
//! [`constants`](super::constants).
//!
//! ## Usage
//!
//! ```rust
//! use ac_core::engine::config::PredictionConfig;
//!
//! // Default profile
//! let config = PredictionConfig::default();
//!
//! // Cheaper searches for crowded frames
//! let performance = PredictionConfig::performance();
//!
//! // From environment variable
//! let from_env = PredictionConfig::from_env_or_default();
//! ```
//!
//! ## Environment Variables
//!
//! - `AC_PRED_PROFILE`: select preset (`performance`, `thorough`, `default`)

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration load/parse failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid prediction config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How the cone half-angle is derived from the caller-supplied spell fields.
///
/// Host SDKs disagree on what the `radius` of a cone spell encodes. The
/// interpretation is an explicit choice validated against reference shapes,
/// never guessed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConeAngleMode {
    /// `radius` is the width at maximum range: half-angle = atan2(radius, range).
    WidthAtMaxRange,
    /// `cone_angle` is the total spread in degrees.
    TotalSpreadDegrees,
    /// `cone_angle` is already the half-angle in degrees.
    HalfAngleDegrees,
}

/// Aim-point and orientation search budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Lattice edge for the coarse circular-shape search (cells).
    pub grid_search_size: usize,
    /// Fermat-spiral sample count for capsule/cone disk integration.
    pub spiral_samples: usize,
    /// Candidate orientations for two-point (vector) shapes.
    pub vector_orientations: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid_search_size: 16,
            spiral_samples: 128,
            vector_orientations: 20,
        }
    }
}

/// Physics/behavior fusion weighting.
///
/// The breakpoints are tuned values, not invariants: the physics weight ramps
/// from 1.0 with an empty history down to `physics_weight_floor` once
/// `rich_history_samples` samples have accumulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub physics_weight_floor: f32,
    pub rich_history_samples: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            physics_weight_floor: 0.5,
            rich_history_samples: 60,
        }
    }
}

/// Exponential history-decay rates, selected by how fast the target is
/// currently moving. Mobile targets invalidate old samples faster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    pub slow_rate: f32,
    pub normal_rate: f32,
    pub fast_rate: f32,
    /// Speeds below this use `slow_rate` (units/s).
    pub slow_speed: f32,
    /// Speeds above this use `fast_rate` (units/s).
    pub fast_speed: f32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            slow_rate: 0.95,
            normal_rate: 0.90,
            fast_rate: 0.85,
            slow_speed: 150.0,
            fast_speed: 400.0,
        }
    }
}

impl DecayConfig {
    /// Decay rate for the given current speed.
    pub fn rate_for_speed(&self, speed: f32) -> f32 {
        if speed <= self.slow_speed {
            self.slow_rate
        } else if speed >= self.fast_speed {
            self.fast_rate
        } else {
            self.normal_rate
        }
    }
}

/// Top-level prediction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Predict at dash endpoints instead of rejecting dashing targets.
    pub enable_dash_prediction: bool,
    /// Assemble human-readable reasoning strings (string work is measurable
    /// at per-frame call rates; hosts without diagnostics turn this off).
    pub enable_reasoning: bool,
    /// Cone half-angle derivation; see [`ConeAngleMode`].
    pub cone_angle_mode: ConeAngleMode,
    pub search: SearchConfig,
    pub fusion: FusionConfig,
    pub decay: DecayConfig,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            enable_dash_prediction: true,
            enable_reasoning: true,
            cone_angle_mode: ConeAngleMode::WidthAtMaxRange,
            search: SearchConfig::default(),
            fusion: FusionConfig::default(),
            decay: DecayConfig::default(),
        }
    }
}

impl PredictionConfig {
    /// Performance preset: cheaper searches, no reasoning strings.
    pub fn performance() -> Self {
        Self {
            enable_reasoning: false,
            search: SearchConfig {
                grid_search_size: 12,
                spiral_samples: 64,
                vector_orientations: 12,
            },
            ..Self::default()
        }
    }

    /// Thorough preset: denser searches for offline analysis.
    pub fn thorough() -> Self {
        Self {
            search: SearchConfig {
                grid_search_size: 24,
                spiral_samples: 256,
                vector_orientations: 32,
            },
            ..Self::default()
        }
    }

    /// Select a preset via `AC_PRED_PROFILE`, falling back to defaults.
    pub fn from_env_or_default() -> Self {
        match env::var("AC_PRED_PROFILE").as_deref() {
            Ok("performance") => Self::performance(),
            Ok("thorough") => Self::thorough(),
            _ => Self::default(),
        }
    }

    /// Parse from a JSON document, validating the search budgets.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.search.grid_search_size < 2 {
            return Err(ConfigError::Invalid {
                field: "search.grid_search_size",
                reason: format!("{} is below the minimum of 2", self.search.grid_search_size),
            });
        }
        if self.search.spiral_samples == 0 {
            return Err(ConfigError::Invalid {
                field: "search.spiral_samples",
                reason: "must be nonzero".into(),
            });
        }
        if self.search.vector_orientations == 0 {
            return Err(ConfigError::Invalid {
                field: "search.vector_orientations",
                reason: "must be nonzero".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.fusion.physics_weight_floor) {
            return Err(ConfigError::Invalid {
                field: "fusion.physics_weight_floor",
                reason: format!("{} outside [0, 1]", self.fusion.physics_weight_floor),
            });
        }
        Ok(())
    }

    /// Resolve the cone half-angle in radians from the spell's declared
    /// fields under the configured interpretation.
    pub fn cone_half_angle(&self, declared_angle_deg: f32, radius: f32, range: f32) -> f32 {
        match self.cone_angle_mode {
            ConeAngleMode::WidthAtMaxRange => radius.atan2(range.max(1.0)),
            ConeAngleMode::TotalSpreadDegrees => (declared_angle_deg * 0.5).to_radians(),
            ConeAngleMode::HalfAngleDegrees => declared_angle_deg.to_radians(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PredictionConfig::default().validate().is_ok());
        assert!(PredictionConfig::performance().validate().is_ok());
        assert!(PredictionConfig::thorough().validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let config = PredictionConfig::thorough();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = PredictionConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.search.spiral_samples, 256);
        assert_eq!(parsed.cone_angle_mode, ConeAngleMode::WidthAtMaxRange);
    }

    #[test]
    fn test_invalid_search_budget_rejected() {
        let json = r#"{
            "enable_dash_prediction": true,
            "enable_reasoning": true,
            "cone_angle_mode": "width_at_max_range",
            "search": {"grid_search_size": 0, "spiral_samples": 64, "vector_orientations": 8},
            "fusion": {"physics_weight_floor": 0.5, "rich_history_samples": 60},
            "decay": {"slow_rate": 0.95, "normal_rate": 0.9, "fast_rate": 0.85,
                      "slow_speed": 150.0, "fast_speed": 400.0}
        }"#;
        assert!(PredictionConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_cone_half_angle_modes() {
        let mut config = PredictionConfig::default();
        // Width at max range: atan2(100, 400) ~ 14 degrees.
        let half = config.cone_half_angle(0.0, 100.0, 400.0);
        assert!((half - (100.0f32).atan2(400.0)).abs() < 1e-6);

        config.cone_angle_mode = ConeAngleMode::TotalSpreadDegrees;
        assert!((config.cone_half_angle(50.0, 0.0, 0.0) - 25.0f32.to_radians()).abs() < 1e-6);

        config.cone_angle_mode = ConeAngleMode::HalfAngleDegrees;
        assert!((config.cone_half_angle(25.0, 0.0, 0.0) - 25.0f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_decay_rate_tiers() {
        let decay = DecayConfig::default();
        assert_eq!(decay.rate_for_speed(100.0), 0.95);
        assert_eq!(decay.rate_for_speed(300.0), 0.90);
        assert_eq!(decay.rate_for_speed(450.0), 0.85);
    }
}
