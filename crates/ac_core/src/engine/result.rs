//! Prediction results

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Everything the engine returns for one prediction request.
///
/// `reasoning` is for humans and logs only; callers must branch on the typed
/// fields, never on the text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridPrediction {
    pub is_valid: bool,
    /// Where to aim (second cast position for vector shapes).
    pub cast_position: Vector3<f32>,
    /// First cast position, vector shapes only.
    pub first_cast_position: Option<Vector3<f32>>,
    /// Fused hit probability in [0, 1].
    pub hit_chance: f32,
    /// Kinematic reachability term that went into the fusion.
    pub physics_contribution: f32,
    /// Learned-behavior term that went into the fusion.
    pub behavior_contribution: f32,
    /// Data-quality confidence in [0, 1].
    pub confidence: f32,
    pub reasoning: String,
    /// The hit chance just peaked and is now declining; act if acting at all.
    pub is_peak_opportunity: bool,
    /// Current hit chance relative to the recent peak.
    pub opportunity_score: f32,
    /// Threshold the caller should compare against, decayed by window age.
    pub adaptive_threshold: f32,
}

impl Default for HybridPrediction {
    fn default() -> Self {
        Self {
            is_valid: false,
            cast_position: Vector3::zeros(),
            first_cast_position: None,
            hit_chance: 0.0,
            physics_contribution: 0.0,
            behavior_contribution: 0.0,
            confidence: 0.0,
            reasoning: String::new(),
            is_peak_opportunity: false,
            opportunity_score: 0.0,
            adaptive_threshold: 0.0,
        }
    }
}

impl HybridPrediction {
    /// Rejected request with a human-readable reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            reasoning: reason.into(),
            ..Self::default()
        }
    }

    /// Certain hit at a known position (stasis exits, channel interrupts).
    pub fn guaranteed(cast_position: Vector3<f32>, reason: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            cast_position,
            hit_chance: 1.0,
            physics_contribution: 1.0,
            behavior_contribution: 1.0,
            confidence: 1.0,
            reasoning: reason.into(),
            ..Self::default()
        }
    }
}
