//! Shared fixtures for engine tests

use fxhash::FxHashMap;
use nalgebra::Vector3;

use super::spell::{SpellDescriptor, SpellShape};
use super::world::{GameWorld, MinionSnapshot, UnitId, UnitSnapshot};

/// A unit standing still.
pub fn still_unit(id: UnitId, position: Vector3<f32>) -> UnitSnapshot {
    UnitSnapshot {
        id,
        team: 200,
        position,
        velocity: Vector3::zeros(),
        move_speed: 350.0,
        bounding_radius: 65.0,
        is_auto_attacking: false,
        is_casting: false,
        is_dashing: false,
        is_crowd_controlled: false,
        is_targetable: true,
        health: 1000.0,
        max_health: 1000.0,
        attack_damage: 60.0,
        attack_range: 550.0,
        path_end: None,
    }
}

/// A unit mid-walk with the given velocity.
pub fn walking_unit(id: UnitId, position: Vector3<f32>, velocity: Vector3<f32>) -> UnitSnapshot {
    UnitSnapshot {
        velocity,
        ..still_unit(id, position)
    }
}

/// Minimal in-memory world for driving the engine in tests and benches.
#[derive(Default)]
pub struct TestWorld {
    pub time: f32,
    pub latency: f32,
    pub units: FxHashMap<UnitId, UnitSnapshot>,
    pub minions: Vec<MinionSnapshot>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: UnitSnapshot) {
        self.units.insert(unit.id, unit);
    }

    pub fn remove(&mut self, id: UnitId) {
        self.units.remove(&id);
    }

    /// Advance the clock and move a unit along its velocity.
    pub fn step(&mut self, dt: f32, id: UnitId) {
        self.time += dt;
        if let Some(unit) = self.units.get_mut(&id) {
            let velocity = unit.velocity;
            unit.position += velocity * dt;
        }
    }
}

impl GameWorld for TestWorld {
    fn game_time(&self) -> f32 {
        self.time
    }

    fn round_trip_latency(&self) -> f32 {
        self.latency
    }

    fn unit(&self, id: UnitId) -> Option<UnitSnapshot> {
        self.units.get(&id).cloned()
    }

    fn minions_near(&self, center: &Vector3<f32>, radius: f32) -> Vec<MinionSnapshot> {
        self.minions
            .iter()
            .filter(|m| {
                let dx = m.position.x - center.x;
                let dz = m.position.z - center.z;
                (dx * dx + dz * dz).sqrt() <= radius
            })
            .cloned()
            .collect()
    }
}

/// Circular skillshot with sensible defaults.
pub fn circular_spell() -> SpellDescriptor {
    SpellDescriptor {
        slot: 0,
        shape: SpellShape::Circular,
        range: 900.0,
        cast_range: 0.0,
        radius: 180.0,
        delay: 0.25,
        projectile_speed: f32::INFINITY,
        cone_angle: 0.0,
        cooldown: 8.0,
        expected_hit_chance: 0.65,
    }
}

/// Linear skillshot with a travel-time projectile.
pub fn linear_spell() -> SpellDescriptor {
    SpellDescriptor {
        slot: 1,
        shape: SpellShape::Linear,
        range: 1100.0,
        cast_range: 0.0,
        radius: 70.0,
        delay: 0.25,
        projectile_speed: 1600.0,
        cone_angle: 0.0,
        cooldown: 10.0,
        expected_hit_chance: 0.65,
    }
}
