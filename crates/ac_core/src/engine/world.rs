//! Host-game collaborator contracts
//!
//! The engine never talks to a game client directly. The host supplies
//! per-frame snapshots of units and answers the few queries the engine
//! needs (clock, latency, minion scan) through the [`GameWorld`] trait.
//! Everything here is plain data the engine treats as ground truth.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Stable per-unit identity (the host's network id).
pub type UnitId = u32;

/// Snapshot of one unit as of the current frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub team: u32,
    pub position: Vector3<f32>,
    /// Host-reported velocity; the tracker derives its own from samples.
    pub velocity: Vector3<f32>,
    /// Maximum move speed stat (units/s), not current speed.
    pub move_speed: f32,
    pub bounding_radius: f32,
    pub is_auto_attacking: bool,
    pub is_casting: bool,
    pub is_dashing: bool,
    pub is_crowd_controlled: bool,
    pub is_targetable: bool,
    pub health: f32,
    pub max_health: f32,
    /// Basic-attack damage, used by the farm-opportunity scan.
    pub attack_damage: f32,
    pub attack_range: f32,
    /// Endpoint of the unit's current movement order, if the host exposes it.
    pub path_end: Option<Vector3<f32>>,
}

impl UnitSnapshot {
    /// Remaining health as a percentage in [0, 100].
    pub fn health_percent(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health) * 100.0
        } else {
            100.0
        }
    }
}

/// Snapshot of a nearby minion, for farm-opportunity scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinionSnapshot {
    pub team: u32,
    pub position: Vector3<f32>,
    pub health: f32,
    pub max_health: f32,
}

/// Read-only view of the host game state.
///
/// Implementations must be cheap: every method may be called several times
/// per prediction and many times per frame.
pub trait GameWorld {
    /// Monotonic game time in seconds.
    fn game_time(&self) -> f32;

    /// Estimated network round-trip latency in seconds.
    fn round_trip_latency(&self) -> f32;

    /// Resolve a unit by identity; `None` when dead, despawned, or unknown.
    fn unit(&self, id: UnitId) -> Option<UnitSnapshot>;

    /// All minions within `radius` of `center`, any team.
    fn minions_near(&self, center: &Vector3<f32>, radius: f32) -> Vec<MinionSnapshot>;
}
