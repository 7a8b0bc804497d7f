//! Edge-case analysis contract
//!
//! Special target states (stasis, channels, dashes, clones, wind walls)
//! override or modulate normal prediction. Detecting them requires deep host
//! knowledge (buff tables, spell names), so detection lives outside the
//! engine; the engine only consumes the resulting [`EdgeCaseReport`].

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::spell::SpellDescriptor;
use super::world::{GameWorld, UnitSnapshot};

/// Target is untargetable-but-returning at a known time and place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StasisState {
    /// Game time at which the target becomes hittable again.
    pub ends_at: f32,
    /// Where the target will be standing at that moment.
    pub exit_position: Vector3<f32>,
    /// Human-readable source ("stasis item", "revive", ...), diagnostics only.
    pub kind: String,
}

/// What kind of stationary channel the target is locked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Channel,
    Recall,
}

/// Target is channeling and stationary until `ends_at` or interrupted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelState {
    pub kind: ChannelKind,
    pub ends_at: f32,
    pub position: Vector3<f32>,
}

/// Target is mid-dash along a fixed path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashState {
    pub end_position: Vector3<f32>,
    /// Game time at which the dash completes.
    pub ends_at: f32,
}

/// Result of external edge-case analysis for one (source, target, spell).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeCaseReport {
    /// Target is an illusion; never worth a cast.
    pub is_clone: bool,
    /// A projectile-blocking wall sits between source and target.
    pub blocked_by_wind_wall: bool,
    pub stasis: Option<StasisState>,
    pub channel: Option<ChannelState>,
    pub dash: Option<DashState>,
    pub is_slowed: bool,
    pub has_spell_shield: bool,
    pub in_fog_of_war: bool,
    /// Aggregate multiplier applied to confidence and hit chance.
    pub confidence_multiplier: f32,
}

impl Default for EdgeCaseReport {
    fn default() -> Self {
        Self {
            is_clone: false,
            blocked_by_wind_wall: false,
            stasis: None,
            channel: None,
            dash: None,
            is_slowed: false,
            has_spell_shield: false,
            in_fog_of_war: false,
            confidence_multiplier: 1.0,
        }
    }
}

/// External classifier of special target states.
///
/// The host wires its own implementation into the
/// [`PredictionManager`](super::manager::PredictionManager); the engine ships
/// only the neutral default.
pub trait EdgeCaseAnalyzer {
    fn analyze(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
    ) -> EdgeCaseReport;
}

/// Reports every target as unremarkable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralEdgeCases;

impl EdgeCaseAnalyzer for NeutralEdgeCases {
    fn analyze(
        &self,
        _world: &dyn GameWorld,
        _source: &UnitSnapshot,
        _target: &UnitSnapshot,
        _spell: &SpellDescriptor,
    ) -> EdgeCaseReport {
        EdgeCaseReport::default()
    }
}
