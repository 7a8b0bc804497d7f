//! Prediction manager
//!
//! The sole entry point external callers use. Owns the tracker set keyed by
//! target identity with a defined lifecycle: lazy creation on first
//! reference, per-frame ticking, timeout-based eviction, and a full reset on
//! session teardown. The host owns the manager and passes it explicitly;
//! there is no ambient global instance.

use fxhash::FxHashMap;
use tracing::debug;

use super::config::PredictionConfig;
use super::constants::tracker::TIMEOUT;
use super::edge_cases::{EdgeCaseAnalyzer, NeutralEdgeCases};
use super::fusion::FusionEngine;
use super::result::HybridPrediction;
use super::spell::SpellDescriptor;
use super::tracker::TargetBehaviorTracker;
use super::world::{GameWorld, UnitId};

/// Owns all per-target trackers and drives the fusion engine.
pub struct PredictionManager {
    engine: FusionEngine,
    analyzer: Box<dyn EdgeCaseAnalyzer + Send>,
    trackers: FxHashMap<UnitId, TargetBehaviorTracker>,
}

impl PredictionManager {
    pub fn new(config: PredictionConfig) -> Self {
        Self {
            engine: FusionEngine::new(config),
            analyzer: Box::new(NeutralEdgeCases),
            trackers: FxHashMap::default(),
        }
    }

    /// Replace the edge-case analyzer (the host wires its own in).
    pub fn with_analyzer(mut self, analyzer: Box<dyn EdgeCaseAnalyzer + Send>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn config(&self) -> &PredictionConfig {
        self.engine.config()
    }

    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    /// Per-frame tick: feed every tracker its target's current state, expire
    /// stale patterns, and evict trackers whose targets are gone for good.
    ///
    /// Trackers with history survive a resolution gap of up to the timeout
    /// window so learned patterns persist through fog or brief despawns;
    /// trackers that never collected data go immediately.
    pub fn update(&mut self, world: &dyn GameWorld) {
        let now = world.game_time();

        for tracker in self.trackers.values_mut() {
            if let Some(unit) = world.unit(tracker.target_id()) {
                tracker.update(&unit, now);
            }
            tracker.expire_stale_pattern(now);
        }

        self.trackers.retain(|id, tracker| {
            if world.unit(*id).is_some() {
                return true;
            }
            match tracker.last_sample_timestamp() {
                Some(last) => {
                    let keep = now - last <= TIMEOUT;
                    if !keep {
                        debug!(target_id = *id, "evicting tracker after timeout");
                    }
                    keep
                }
                None => {
                    debug!(target_id = *id, "evicting empty tracker");
                    false
                }
            }
        });
    }

    /// Get or lazily create the tracker for a target that currently resolves.
    pub fn tracker_mut(
        &mut self,
        world: &dyn GameWorld,
        target: UnitId,
    ) -> Option<&mut TargetBehaviorTracker> {
        world.unit(target)?;
        Some(
            self.trackers
                .entry(target)
                .or_insert_with(|| TargetBehaviorTracker::new(target)),
        )
    }

    /// Full prediction for one request. Returns an invalid result when
    /// either unit cannot be resolved.
    pub fn predict(
        &mut self,
        world: &dyn GameWorld,
        source: UnitId,
        target: UnitId,
        spell: &SpellDescriptor,
    ) -> HybridPrediction {
        let Some(source_unit) = world.unit(source) else {
            return HybridPrediction::invalid("Source cannot be resolved");
        };
        let Some(target_unit) = world.unit(target) else {
            return HybridPrediction::invalid("Target cannot be resolved");
        };

        let edge = self
            .analyzer
            .analyze(world, &source_unit, &target_unit, spell);

        let engine = &self.engine;
        let tracker = self
            .trackers
            .entry(target)
            .or_insert_with(|| TargetBehaviorTracker::new(target));

        engine.compute_hybrid_prediction(world, &source_unit, &target_unit, spell, tracker, &edge)
    }

    /// Drop every tracker (session teardown).
    pub fn clear(&mut self) {
        self.trackers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{circular_spell, still_unit, walking_unit, TestWorld};
    use nalgebra::Vector3;

    const DT: f32 = 0.04;

    fn manager() -> PredictionManager {
        PredictionManager::new(PredictionConfig::default())
    }

    #[test]
    fn test_tracker_created_lazily_on_predict() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));
        world.insert(still_unit(2, Vector3::new(600.0, 0.0, 0.0)));

        let mut manager = manager();
        assert_eq!(manager.tracker_count(), 0);
        let result = manager.predict(&world, 1, 2, &circular_spell());
        assert!(result.is_valid);
        assert_eq!(manager.tracker_count(), 1);
    }

    #[test]
    fn test_unresolvable_units_rejected() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));

        let mut manager = manager();
        let no_target = manager.predict(&world, 1, 99, &circular_spell());
        assert!(!no_target.is_valid);
        let no_source = manager.predict(&world, 98, 1, &circular_spell());
        assert!(!no_source.is_valid);
        assert_eq!(manager.tracker_count(), 0);
    }

    #[test]
    fn test_update_feeds_trackers() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));
        world.insert(walking_unit(
            2,
            Vector3::new(500.0, 0.0, 0.0),
            Vector3::new(300.0, 0.0, 0.0),
        ));

        let mut manager = manager();
        manager.predict(&world, 1, 2, &circular_spell());
        for _ in 0..20 {
            world.step(DT, 2);
            manager.update(&world);
        }
        let tracker = manager.tracker_mut(&world, 2).unwrap();
        assert!(tracker.sample_count() >= 19);
    }

    #[test]
    fn test_empty_tracker_evicted_immediately() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));
        world.insert(still_unit(2, Vector3::new(600.0, 0.0, 0.0)));

        let mut manager = manager();
        manager.predict(&world, 1, 2, &circular_spell());
        assert_eq!(manager.tracker_count(), 1);

        // Target vanishes before any update sampled it.
        world.remove(2);
        manager.update(&world);
        assert_eq!(manager.tracker_count(), 0);
    }

    #[test]
    fn test_tracker_with_history_survives_brief_loss() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));
        world.insert(walking_unit(
            2,
            Vector3::new(500.0, 0.0, 0.0),
            Vector3::new(300.0, 0.0, 0.0),
        ));

        let mut manager = manager();
        manager.predict(&world, 1, 2, &circular_spell());
        for _ in 0..10 {
            world.step(DT, 2);
            manager.update(&world);
        }

        // Fog: unresolvable, but recent history keeps the tracker alive.
        world.remove(2);
        world.time += 1.0;
        manager.update(&world);
        assert_eq!(manager.tracker_count(), 1);

        // Gone past the timeout: evicted.
        world.time += TIMEOUT + 1.0;
        manager.update(&world);
        assert_eq!(manager.tracker_count(), 0);
    }

    #[test]
    fn test_pattern_expires_while_target_unresolvable() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));

        // Zigzag long enough to detect a pattern.
        let mut pos = Vector3::new(400.0, 0.0, 0.0);
        world.insert(walking_unit(2, pos, Vector3::zeros()));
        let mut manager = manager();
        manager.predict(&world, 1, 2, &circular_spell());
        for i in 0..45 {
            let side = if i % 2 == 0 { 150.0 } else { -150.0 };
            let velocity = Vector3::new(300.0, 0.0, side);
            pos += velocity * DT;
            world.time += DT;
            world.insert(walking_unit(2, pos, velocity));
            manager.update(&world);
        }
        assert!(manager
            .tracker_mut(&world, 2)
            .unwrap()
            .dodge_pattern()
            .has_pattern);

        // Target disappears; pattern must expire during ticks even though
        // the tracker itself is retained.
        world.remove(2);
        world.time += 3.5;
        manager.update(&world);
        let tracker = manager.trackers.get(&2).expect("retained within timeout");
        assert!(!tracker.dodge_pattern().has_pattern);
    }

    #[test]
    fn test_repeated_predictions_drive_opportunity_signals() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));
        world.insert(walking_unit(
            2,
            Vector3::new(600.0, 0.0, 0.0),
            Vector3::new(250.0, 0.0, 0.0),
        ));

        let mut manager = manager();
        let spell = circular_spell();
        let mut last = None;
        for _ in 0..30 {
            world.step(DT, 2);
            manager.update(&world);
            last = Some(manager.predict(&world, 1, 2, &spell));
        }
        let result = last.unwrap();
        assert!(result.is_valid);
        assert!(result.adaptive_threshold > 0.0);
        assert!(result.opportunity_score > 0.0);
        assert!(result.opportunity_score <= 1.0 + 1e-5);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut world = TestWorld::new();
        world.insert(still_unit(1, Vector3::zeros()));
        world.insert(still_unit(2, Vector3::new(600.0, 0.0, 0.0)));
        world.insert(still_unit(3, Vector3::new(800.0, 0.0, 0.0)));

        let mut manager = manager();
        manager.predict(&world, 1, 2, &circular_spell());
        manager.predict(&world, 1, 3, &circular_spell());
        assert_eq!(manager.tracker_count(), 2);
        manager.clear();
        assert_eq!(manager.tracker_count(), 0);
    }
}
