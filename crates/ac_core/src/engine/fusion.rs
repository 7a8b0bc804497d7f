//! Hybrid fusion engine
//!
//! Orchestrates one prediction request: edge-case short-circuits, dispatch to
//! the shape-specific estimator, fusion of the kinematic and learned-behavior
//! probabilities, the optimal aim-point search, and the opportunity signals
//! that time delayed casts.
//!
//! Every estimator follows the same pipeline: arrival time -> reachable
//! region -> behavior grid -> confidence -> aim-point search -> fuse. They
//! differ only in the search and the containment test.

use nalgebra::Vector3;
use std::f32::consts::PI;
use tracing::debug;

use super::config::PredictionConfig;
use super::constants::confidence as conf;
use super::constants::context::{
    ANIMATION_LOCK_WEIGHT, CS_KILLABLE_AUTOS, CS_MIN_CONFIDENCE, CS_SEARCH_RADIUS,
};
use super::constants::opportunity::{
    DEFAULT_BASE_THRESHOLD, PATIENCE_COOLDOWN_FACTOR, PATIENCE_MAX, PATIENCE_MIN,
    RESET_DROP_FRACTION, RESET_MIN_AGE,
};
use super::constants::physics::DEFAULT_ACCELERATION;
use super::constants::sampling::{MIN_SAMPLES_FOR_BEHAVIOR, NOISE_SPEED};
use super::constants::{stasis, EPSILON};
use super::coordinates::{flat_distance, flat_dot, flat_length, flat_normalize};
use super::edge_cases::{ChannelKind, EdgeCaseReport};
use super::grid::BehaviorGrid;
use super::physics::{
    compute_arrival_time, compute_reachable_region, physics_hit_probability, ReachableRegion,
};
use super::result::HybridPrediction;
use super::shapes::{
    capsule_behavior_probability, capsule_region_overlap, circle_behavior_probability,
    cone_behavior_probability, cone_region_overlap,
};
use super::spell::{SpellDescriptor, SpellShape};
use super::tracker::TargetBehaviorTracker;
use super::world::{GameWorld, UnitSnapshot};

/// A low-health minion the target is likely walking toward.
#[derive(Debug, Clone)]
pub struct FarmOpportunity {
    /// Where the target will stand to last-hit it.
    pub predicted_position: Vector3<f32>,
    pub confidence: f32,
    /// Rough seconds until the last hit.
    pub eta: f32,
}

/// Common pipeline state shared by the shape estimators.
struct Pipeline {
    arrival_time: f32,
    region: ReachableRegion,
    grid: BehaviorGrid,
    confidence: f32,
}

/// Stateless computation core; all per-target state lives in the tracker.
pub struct FusionEngine {
    config: PredictionConfig,
}

impl FusionEngine {
    pub fn new(config: PredictionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Full prediction for one (source, target, spell) request.
    pub fn compute_hybrid_prediction(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> HybridPrediction {
        let now = world.game_time();

        // ------------------------------------------------------------
        // Edge-case short circuits
        // ------------------------------------------------------------
        if edge.is_clone {
            return HybridPrediction::invalid("Target is a clone");
        }
        if edge.blocked_by_wind_wall {
            return HybridPrediction::invalid("Projectile would be blocked by a wind wall");
        }

        if let Some(st) = &edge.stasis {
            let arrival = compute_arrival_time(
                &source.position,
                &target.position,
                spell.projectile_speed,
                spell.delay,
            );
            let time_to_exit = st.ends_at - now;
            let cast_slack = time_to_exit - arrival;

            if cast_slack < -stasis::TIMING_TOLERANCE {
                return HybridPrediction::invalid(
                    "Stasis timing impossible - effect arrives after the exit",
                );
            }
            if cast_slack > stasis::TIMING_TOLERANCE {
                return HybridPrediction::invalid(format!(
                    "Wait {:.2}s to time the {} exit",
                    cast_slack, st.kind
                ));
            }
            // Arrival coincides with the exit: guaranteed hit.
            return HybridPrediction::guaranteed(
                st.exit_position,
                format!("Cast now - effect lands exactly as {} ends", st.kind),
            );
        }

        if let Some(channel) = &edge.channel {
            let arrival = compute_arrival_time(
                &source.position,
                &target.position,
                spell.projectile_speed,
                spell.delay,
            );
            if now + arrival > channel.ends_at {
                return HybridPrediction::invalid("Channel finishes before the effect arrives");
            }
            let action = match channel.kind {
                ChannelKind::Channel => "channel",
                ChannelKind::Recall => "recall",
            };
            return HybridPrediction::guaranteed(
                channel.position,
                format!("Target is locked into a {action} - guaranteed interrupt"),
            );
        }

        let mut dash_note = None;
        let mut dash_confidence_penalty = 1.0;
        if let Some(dash) = &edge.dash {
            if self.config.enable_dash_prediction {
                let endpoint_distance = flat_distance(&source.position, &dash.end_position);
                if endpoint_distance > spell.range {
                    return HybridPrediction::invalid("Dash endpoint is out of range");
                }

                let arrival = compute_arrival_time(
                    &source.position,
                    &dash.end_position,
                    spell.projectile_speed,
                    spell.delay,
                );
                if now + arrival < dash.ends_at {
                    // Effect lands while the dash is still in flight; the
                    // endpoint aim is a guess about post-dash position.
                    dash_note = Some("[DASH: effect arrives before the dash ends]");
                    dash_confidence_penalty = 0.3;
                } else {
                    dash_note = Some("[DASH: aiming at the dash endpoint]");
                }
            }
        }

        // ------------------------------------------------------------
        // Shape dispatch (a declared cone angle wins over the shape tag)
        // ------------------------------------------------------------
        let mut result = if spell.cone_angle > 0.0 || spell.shape == SpellShape::Cone {
            self.estimate_cone(world, source, target, spell, tracker, edge)
        } else {
            match spell.shape {
                SpellShape::Point => self.estimate_point(world, source, target, spell, tracker, edge),
                SpellShape::Circular => {
                    self.estimate_circular(world, source, target, spell, tracker, edge)
                }
                SpellShape::Linear => {
                    self.estimate_linear(world, source, target, spell, tracker, edge)
                }
                SpellShape::Cone => unreachable!("cone handled above"),
                SpellShape::Vector => {
                    self.estimate_vector(world, source, target, spell, tracker, edge)
                }
            }
        };

        // ------------------------------------------------------------
        // Post-processing: edge multipliers, stationary floor, notes
        // ------------------------------------------------------------
        if result.is_valid {
            result.confidence *= edge.confidence_multiplier * dash_confidence_penalty;
            result.hit_chance *= edge.confidence_multiplier;

            let floor = tracker.stationary_floor(now);
            if floor > 0.0 {
                result.hit_chance = result.hit_chance.max(floor);
            }

            result.confidence = result.confidence.clamp(0.0, 1.0);
            result.hit_chance = result.hit_chance.clamp(0.0, 1.0);

            if self.config.enable_reasoning {
                if edge.is_slowed {
                    result.reasoning.push_str("\n[SLOWED: easier to lead]");
                }
                if edge.has_spell_shield {
                    result.reasoning.push_str("\n[SPELL SHIELD: effect will be absorbed]");
                }
                if let Some(note) = dash_note {
                    result.reasoning.push('\n');
                    result.reasoning.push_str(note);
                }
                if edge.in_fog_of_war {
                    result
                        .reasoning
                        .push_str("\n[FOG OF WAR: target cannot see the cast]");
                }
                if floor > 0.0 {
                    result.reasoning.push_str(&format!(
                        "\n[STATIONARY: {:.1}s still, hit chance floored at {:.0}%]",
                        tracker.stationary_duration(now),
                        floor * 100.0
                    ));
                }
                let farm = detect_farm_opportunities(world, target);
                if let Some(best) = farm
                    .iter()
                    .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
                {
                    if best.confidence >= CS_MIN_CONFIDENCE {
                        result.reasoning.push_str(&format!(
                            "\n[FARM: target likely last-hitting, {:.0}% in ~{:.1}s]",
                            best.confidence * 100.0,
                            best.eta
                        ));
                    }
                }
            }
        }

        debug!(
            target_id = target.id,
            shape = ?spell.shape,
            hit_chance = result.hit_chance,
            confidence = result.confidence,
            valid = result.is_valid,
            "prediction computed"
        );

        result
    }

    // ----------------------------------------------------------------
    // Shared pipeline prelude
    // ----------------------------------------------------------------

    fn prepare(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> Pipeline {
        let now = world.game_time();

        let arrival_time = compute_arrival_time(
            &source.position,
            &target.position,
            spell.projectile_speed,
            spell.delay,
        );

        let region = compute_reachable_region(
            &target.position,
            &tracker.current_velocity(),
            arrival_time,
            target.move_speed,
            0.0,
            DEFAULT_ACCELERATION,
        );

        let mut grid = tracker.build_behavior_grid(arrival_time, target.move_speed, now, &self.config);
        self.apply_contextual_biases(world, target, tracker, &mut grid);

        let confidence = self.confidence_score(world, source, target, spell, tracker, edge);

        Pipeline {
            arrival_time,
            region,
            grid,
            confidence,
        }
    }

    /// Behavior biases that need world context: animation locks pin the
    /// target, and farmable minions pull it toward last-hit positions.
    fn apply_contextual_biases(
        &self,
        world: &dyn GameWorld,
        target: &UnitSnapshot,
        tracker: &TargetBehaviorTracker,
        grid: &mut BehaviorGrid,
    ) {
        if tracker.is_animation_locked() {
            if let Some(latest) = tracker.history().back() {
                grid.add_weighted_sample(&latest.position, ANIMATION_LOCK_WEIGHT);
                grid.normalize();
            }
        }

        let farm = detect_farm_opportunities(world, target);
        let mut deposited = false;
        for opportunity in &farm {
            if opportunity.confidence >= CS_MIN_CONFIDENCE {
                grid.add_weighted_sample(
                    &opportunity.predicted_position,
                    1.0 + opportunity.confidence,
                );
                deposited = true;
            }
        }
        if deposited {
            grid.normalize();
        }
    }

    // ----------------------------------------------------------------
    // Shape estimators
    // ----------------------------------------------------------------

    fn estimate_point(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> HybridPrediction {
        if !target.is_targetable {
            return HybridPrediction::invalid("Target is untargetable");
        }

        let mut result = HybridPrediction {
            is_valid: true,
            cast_position: target.position,
            hit_chance: 1.0,
            physics_contribution: 1.0,
            behavior_contribution: 1.0,
            confidence: self.confidence_score(world, source, target, spell, tracker, edge),
            ..HybridPrediction::default()
        };
        if self.config.enable_reasoning {
            result.reasoning =
                "Point-click effect - lands unless the target becomes untargetable".into();
        }
        result
    }

    fn estimate_circular(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> HybridPrediction {
        let now = world.game_time();
        let p = self.prepare(world, source, target, spell, tracker, edge);

        let aim = self.find_optimal_cast_position(&p.region, &p.grid, spell.radius, p.confidence);

        let physics = physics_hit_probability(&aim, spell.radius, &p.region);
        let behavior = circle_behavior_probability(&aim, spell.radius, &p.grid);

        let samples = tracker.sample_count();
        let hit_chance = self.fuse(physics, behavior, p.confidence, samples);

        let mut result = HybridPrediction {
            is_valid: true,
            cast_position: aim,
            hit_chance,
            physics_contribution: physics,
            behavior_contribution: behavior,
            confidence: p.confidence,
            ..HybridPrediction::default()
        };
        if self.config.enable_reasoning {
            result.reasoning = format!(
                "Hybrid analysis (circular):\n  arrival {:.2}s\n  reachable radius {:.0}\n  \
                 physics {:.0}%  behavior {:.0}%  confidence {:.0}%\n  hit chance {:.0}%",
                p.arrival_time,
                p.region.max_radius,
                physics * 100.0,
                behavior * 100.0,
                p.confidence * 100.0,
                hit_chance * 100.0
            );
        }
        self.update_opportunity_signals(&mut result, now, spell, tracker);
        result
    }

    fn estimate_linear(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> HybridPrediction {
        let now = world.game_time();

        if flat_distance(&source.position, &target.position) < 1.0 {
            return HybridPrediction::invalid("Target on top of the caster - no aim direction");
        }

        let p = self.prepare(world, source, target, spell, tracker, edge);

        // Aim down the predicted center of mass.
        let to_center = p.region.center - source.position;
        let direction = if flat_length(&to_center) > 1.0 {
            flat_normalize(&to_center)
        } else {
            flat_normalize(&(target.position - source.position))
        };

        let physics = capsule_region_overlap(
            &source.position,
            &direction,
            spell.range,
            spell.radius,
            &p.region,
            self.config.search.spiral_samples,
        );
        let behavior = capsule_behavior_probability(
            &source.position,
            &direction,
            spell.range,
            spell.radius,
            &p.grid,
        );

        let samples = tracker.sample_count();
        let hit_chance = self.fuse(physics, behavior, p.confidence, samples);

        let mut result = HybridPrediction {
            is_valid: true,
            cast_position: source.position + direction * spell.range,
            hit_chance,
            physics_contribution: physics,
            behavior_contribution: behavior,
            confidence: p.confidence,
            ..HybridPrediction::default()
        };
        if self.config.enable_reasoning {
            result.reasoning = format!(
                "Hybrid analysis (linear):\n  arrival {:.2}s\n  reachable radius {:.0}\n  \
                 capsule {:.0}x{:.0}\n  physics {:.0}%  behavior {:.0}%  confidence {:.0}%\n  \
                 hit chance {:.0}%",
                p.arrival_time,
                p.region.max_radius,
                spell.range,
                spell.radius * 2.0,
                physics * 100.0,
                behavior * 100.0,
                p.confidence * 100.0,
                hit_chance * 100.0
            );
        }
        self.update_opportunity_signals(&mut result, now, spell, tracker);
        result
    }

    fn estimate_cone(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> HybridPrediction {
        let now = world.game_time();

        if flat_distance(&source.position, &target.position) < 1.0 {
            return HybridPrediction::invalid("Target on top of the caster - no aim direction");
        }

        let p = self.prepare(world, source, target, spell, tracker, edge);

        let half_angle = self
            .config
            .cone_half_angle(spell.cone_angle, spell.radius, spell.range);

        let to_center = p.region.center - source.position;
        let direction = if flat_length(&to_center) > 1.0 {
            flat_normalize(&to_center)
        } else {
            flat_normalize(&(target.position - source.position))
        };

        let physics = cone_region_overlap(
            &source.position,
            &direction,
            half_angle,
            spell.range,
            &p.region,
            self.config.search.spiral_samples,
        );
        let behavior = cone_behavior_probability(
            &source.position,
            &direction,
            half_angle,
            spell.range,
            &p.grid,
        );

        let samples = tracker.sample_count();
        let hit_chance = self.fuse(physics, behavior, p.confidence, samples);

        let mut result = HybridPrediction {
            is_valid: true,
            cast_position: source.position + direction * spell.range,
            hit_chance,
            physics_contribution: physics,
            behavior_contribution: behavior,
            confidence: p.confidence,
            ..HybridPrediction::default()
        };
        if self.config.enable_reasoning {
            result.reasoning = format!(
                "Hybrid analysis (cone):\n  arrival {:.2}s\n  reachable radius {:.0}\n  \
                 half-angle {:.1} deg, range {:.0}\n  physics {:.0}%  behavior {:.0}%  \
                 confidence {:.0}%\n  hit chance {:.0}%",
                p.arrival_time,
                p.region.max_radius,
                half_angle.to_degrees(),
                spell.range,
                physics * 100.0,
                behavior * 100.0,
                p.confidence * 100.0,
                hit_chance * 100.0
            );
        }
        self.update_opportunity_signals(&mut result, now, spell, tracker);
        result
    }

    fn estimate_vector(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> HybridPrediction {
        let now = world.game_time();
        let p = self.prepare(world, source, target, spell, tracker, edge);
        let samples = tracker.sample_count();

        let best = self.optimize_vector_orientation(
            &source.position,
            &p.region.center,
            &p.region,
            &p.grid,
            spell,
            p.confidence,
            samples,
        );

        let mut result = HybridPrediction {
            is_valid: true,
            cast_position: best.second_cast,
            first_cast_position: Some(best.first_cast),
            hit_chance: best.hit_chance,
            physics_contribution: best.physics,
            behavior_contribution: best.behavior,
            confidence: p.confidence,
            ..HybridPrediction::default()
        };
        if self.config.enable_reasoning {
            result.reasoning = format!(
                "Hybrid analysis (vector):\n  arrival {:.2}s\n  reachable radius {:.0}\n  \
                 segment {:.0}x{:.0}\n  physics {:.0}%  behavior {:.0}%  confidence {:.0}%\n  \
                 hit chance {:.0}%",
                p.arrival_time,
                p.region.max_radius,
                spell.range,
                spell.radius * 2.0,
                best.physics * 100.0,
                best.behavior * 100.0,
                p.confidence * 100.0,
                best.hit_chance * 100.0
            );
        }
        self.update_opportunity_signals(&mut result, now, spell, tracker);
        result
    }

    // ----------------------------------------------------------------
    // Fusion law
    // ----------------------------------------------------------------

    /// Physics weight as a function of history size: 1.0 with no data,
    /// ramping down to the configured floor once the history is rich.
    fn physics_weight(&self, samples: usize) -> f32 {
        let fusion = &self.config.fusion;
        if samples >= fusion.rich_history_samples {
            return fusion.physics_weight_floor;
        }
        let t = samples as f32 / fusion.rich_history_samples as f32;
        1.0 - (1.0 - fusion.physics_weight_floor) * t
    }

    /// Weighted geometric fusion: sparse history trusts kinematics, rich
    /// history trusts learned behavior, and a near-zero term on either side
    /// keeps the product honest.
    pub fn fuse(&self, physics: f32, behavior: f32, confidence: f32, samples: usize) -> f32 {
        let w = self.physics_weight(samples);
        let p = physics.clamp(0.0, 1.0);
        let b = behavior.clamp(0.0, 1.0);
        (p.powf(w) * b.powf(1.0 - w) * confidence).clamp(0.0, 1.0)
    }

    // ----------------------------------------------------------------
    // Confidence
    // ----------------------------------------------------------------

    /// Target states where normal confidence penalties would only hurt:
    /// animation locks, channels, or a demonstrably straight walk.
    fn is_obvious_hit(&self, tracker: &TargetBehaviorTracker, edge: &EdgeCaseReport) -> bool {
        if tracker.is_animation_locked() {
            return true;
        }
        if edge.channel.is_some() {
            return true;
        }

        let history = tracker.history();
        if history.len() < conf::STRAIGHT_LINE_SAMPLES {
            return false;
        }

        let latest = history.back().expect("non-empty history");
        let base_speed = flat_length(&latest.velocity);
        if base_speed <= NOISE_SPEED {
            return false;
        }
        let base_dir = flat_normalize(&latest.velocity);

        history
            .iter()
            .rev()
            .take(conf::STRAIGHT_LINE_SAMPLES)
            .skip(1)
            .all(|sample| {
                let speed = flat_length(&sample.velocity);
                speed > NOISE_SPEED
                    && flat_dot(&base_dir, &flat_normalize(&sample.velocity))
                        >= 1.0 - conf::STRAIGHT_LINE_TOLERANCE
            })
    }

    fn confidence_score(
        &self,
        world: &dyn GameWorld,
        source: &UnitSnapshot,
        target: &UnitSnapshot,
        spell: &SpellDescriptor,
        tracker: &TargetBehaviorTracker,
        edge: &EdgeCaseReport,
    ) -> f32 {
        if self.is_obvious_hit(tracker, edge) {
            return conf::OBVIOUS_HIT;
        }

        let mut confidence = 1.0f32;

        let distance = flat_distance(&source.position, &target.position);
        confidence *= (-distance * conf::DISTANCE_DECAY).exp();

        confidence *= (-world.round_trip_latency() * conf::LATENCY_FACTOR).exp();

        if spell.is_instant() {
            confidence *= conf::INSTANT_BONUS;
        } else if spell.projectile_speed < conf::SLOW_PROJECTILE_SPEED {
            confidence *= conf::SLOW_PROJECTILE_PENALTY;
        }

        let mobility = (target.move_speed / conf::MOBILITY_REFERENCE_SPEED)
            .clamp(conf::MOBILITY_MIN, conf::MOBILITY_MAX);
        confidence /= mobility;

        let samples = tracker.sample_count();
        if samples < MIN_SAMPLES_FOR_BEHAVIOR {
            confidence *= samples as f32 / MIN_SAMPLES_FOR_BEHAVIOR as f32;
        }

        if tracker.is_animation_locked() {
            confidence *= 1.0 + conf::ANIMATION_LOCK_BOOST;
        }

        confidence.clamp(conf::MIN, conf::MAX)
    }

    // ----------------------------------------------------------------
    // Aim-point search (circular shapes)
    // ----------------------------------------------------------------

    fn evaluate_point(
        &self,
        point: &Vector3<f32>,
        region: &ReachableRegion,
        grid: &BehaviorGrid,
        effect_radius: f32,
        confidence: f32,
    ) -> f32 {
        let physics = physics_hit_probability(point, effect_radius, region);
        let behavior = circle_behavior_probability(point, effect_radius, grid);
        physics * behavior * confidence
    }

    /// Two-phase search: a coarse lattice over the reachable disk, then two
    /// rounds of gradient ascent with angular probes.
    fn find_optimal_cast_position(
        &self,
        region: &ReachableRegion,
        grid: &BehaviorGrid,
        effect_radius: f32,
        confidence: f32,
    ) -> Vector3<f32> {
        const GRADIENT_STEP: f32 = 10.0;
        const GRADIENT_PROBES: usize = 8;
        const GRADIENT_ROUNDS: usize = 2;

        let lattice = self.config.search.grid_search_size as i32;
        let mut best_position = region.center;
        let mut best_score = -1.0f32;

        let step = region.max_radius * 2.0 / lattice as f32;
        for i in 0..lattice {
            for j in 0..lattice {
                let candidate = Vector3::new(
                    region.center.x + (i - lattice / 2) as f32 * step,
                    region.center.y,
                    region.center.z + (j - lattice / 2) as f32 * step,
                );
                let score = self.evaluate_point(&candidate, region, grid, effect_radius, confidence);
                if score > best_score {
                    best_score = score;
                    best_position = candidate;
                }
            }
        }

        for _ in 0..GRADIENT_ROUNDS {
            let mut gradient = Vector3::zeros();
            for i in 0..GRADIENT_PROBES {
                let angle = 2.0 * PI * i as f32 / GRADIENT_PROBES as f32;
                let probe = Vector3::new(
                    best_position.x + GRADIENT_STEP * angle.cos(),
                    best_position.y,
                    best_position.z + GRADIENT_STEP * angle.sin(),
                );
                let delta =
                    self.evaluate_point(&probe, region, grid, effect_radius, confidence) - best_score;
                gradient.x += delta * angle.cos();
                gradient.z += delta * angle.sin();
            }

            if flat_length(&gradient) > EPSILON {
                best_position += flat_normalize(&gradient) * (GRADIENT_STEP * 0.5);
                best_score =
                    self.evaluate_point(&best_position, region, grid, effect_radius, confidence);
            }
        }

        best_position
    }

    // ----------------------------------------------------------------
    // Vector (two-point) orientation search
    // ----------------------------------------------------------------

    fn optimize_vector_orientation(
        &self,
        source_pos: &Vector3<f32>,
        predicted: &Vector3<f32>,
        region: &ReachableRegion,
        grid: &BehaviorGrid,
        spell: &SpellDescriptor,
        confidence: f32,
        samples: usize,
    ) -> VectorPlacement {
        let length = spell.range;
        let width = spell.radius;
        let first_cast_range = spell.first_cast_range();
        let orientations = self.config.search.vector_orientations;
        let spiral = self.config.search.spiral_samples;

        let to_predicted = predicted - source_pos;
        let dist_to_predicted = flat_length(&to_predicted);

        let mut best = VectorPlacement::default();

        for i in 0..orientations {
            let angle = 2.0 * PI * i as f32 / orientations as f32;
            let direction = Vector3::new(angle.cos(), 0.0, angle.sin());

            // Segment centered on the predicted position.
            let mut first_cast = predicted - direction * (length * 0.5);
            let mut second_cast = predicted + direction * (length * 0.5);

            // Clamp the near endpoint into the caster's allowed reach.
            if flat_distance(&first_cast, source_pos) > first_cast_range {
                if dist_to_predicted > EPSILON {
                    let toward = flat_normalize(&to_predicted);
                    first_cast = source_pos + toward * first_cast_range;
                } else {
                    first_cast =
                        source_pos + direction * first_cast_range.min(length * 0.5);
                }
                second_cast = first_cast + direction * length;
            }

            let physics =
                capsule_region_overlap(&first_cast, &direction, length, width, region, spiral);
            let behavior =
                capsule_behavior_probability(&first_cast, &direction, length, width, grid);
            let hit_chance = self.fuse(physics, behavior, confidence, samples);

            if hit_chance > best.hit_chance {
                best = VectorPlacement {
                    first_cast,
                    second_cast,
                    hit_chance,
                    physics,
                    behavior,
                };
            }
        }

        // Nothing scored: aim straight at the prediction with low confidence.
        if best.hit_chance < EPSILON {
            let direction = if dist_to_predicted > EPSILON {
                flat_normalize(&to_predicted)
            } else {
                Vector3::new(1.0, 0.0, 0.0)
            };
            let first_cast = source_pos + direction * first_cast_range.min(length * 0.5);
            best = VectorPlacement {
                first_cast,
                second_cast: first_cast + direction * length,
                hit_chance: 0.1,
                physics: 0.1,
                behavior: 1.0,
            };
        }

        best
    }

    // ----------------------------------------------------------------
    // Opportunity signals
    // ----------------------------------------------------------------

    fn update_opportunity_signals(
        &self,
        result: &mut HybridPrediction,
        now: f32,
        spell: &SpellDescriptor,
        tracker: &mut TargetBehaviorTracker,
    ) {
        // Longer cooldowns deserve more patience before taking a peak.
        let patience = (spell.cooldown * PATIENCE_COOLDOWN_FACTOR).clamp(PATIENCE_MIN, PATIENCE_MAX);

        let base_threshold = if spell.expected_hit_chance > 0.0 {
            spell.expected_hit_chance
        } else {
            DEFAULT_BASE_THRESHOLD
        };

        let mut reset = false;
        {
            let window = tracker.opportunity_window_mut(spell.slot, now);
            window.record(now, result.hit_chance);
            let elapsed = window.elapsed(now);

            result.opportunity_score = window.opportunity_score(result.hit_chance);
            result.adaptive_threshold = window.adaptive_threshold(base_threshold, elapsed);
            result.is_peak_opportunity = window.is_peak_opportunity(
                now,
                result.hit_chance,
                result.adaptive_threshold,
                elapsed,
                patience,
            );

            // A collapse of the estimate usually means the spell went out;
            // start the next window fresh.
            if result.hit_chance < window.last_hit_chance * RESET_DROP_FRACTION
                && elapsed > RESET_MIN_AGE
            {
                reset = true;
            } else {
                window.last_hit_chance = result.hit_chance;
            }
        }
        if reset {
            tracker.reset_opportunity_window(spell.slot, now);
        }
    }
}

/// Result of the vector orientation search.
#[derive(Debug, Clone)]
struct VectorPlacement {
    first_cast: Vector3<f32>,
    second_cast: Vector3<f32>,
    hit_chance: f32,
    physics: f32,
    behavior: f32,
}

impl Default for VectorPlacement {
    fn default() -> Self {
        Self {
            first_cast: Vector3::zeros(),
            second_cast: Vector3::zeros(),
            hit_chance: 0.0,
            physics: 0.0,
            behavior: 0.0,
        }
    }
}

/// Scan for low-health opposing minions the target is plausibly walking
/// toward, with a confidence blend of remaining hits, proximity, and
/// path/velocity alignment.
pub fn detect_farm_opportunities(
    world: &dyn GameWorld,
    target: &UnitSnapshot,
) -> Vec<FarmOpportunity> {
    let mut opportunities = Vec::new();
    if target.attack_damage <= 0.0 {
        return opportunities;
    }

    let kill_threshold = target.attack_damage * CS_KILLABLE_AUTOS;

    for minion in world.minions_near(&target.position, CS_SEARCH_RADIUS) {
        if minion.team == target.team {
            continue;
        }
        if minion.health > kill_threshold {
            continue;
        }

        let hp_confidence = if minion.health <= target.attack_damage * 1.2 {
            0.8
        } else if minion.health <= target.attack_damage * 2.0 {
            0.5
        } else {
            0.3
        };

        let distance = flat_distance(&target.position, &minion.position);
        let distance_confidence = (1.0 - distance / CS_SEARCH_RADIUS).clamp(0.0, 1.0);

        // Path endpoint beats velocity as an intent signal when available.
        let mut path_confidence = 0.0f32;
        if let Some(path_end) = &target.path_end {
            let end_to_minion = flat_distance(path_end, &minion.position);
            if end_to_minion <= target.attack_range + 50.0 {
                path_confidence = 0.85;
            } else if end_to_minion <= target.attack_range + 150.0 {
                path_confidence = 0.5;
            }
        }
        if path_confidence < 0.5 {
            let to_minion = flat_normalize(&(minion.position - target.position));
            let speed = flat_length(&target.velocity);
            if speed > NOISE_SPEED {
                let alignment = flat_dot(&to_minion, &flat_normalize(&target.velocity));
                if alignment > 0.7 {
                    path_confidence = path_confidence.max(0.6);
                } else if alignment > 0.3 {
                    path_confidence = path_confidence.max(0.4);
                }
            }
        }
        if path_confidence < CS_MIN_CONFIDENCE {
            continue;
        }

        let confidence = hp_confidence * 0.5 + distance_confidence * 0.2 + path_confidence * 0.3;

        // The target will stand at attack range on its side of the minion.
        let from_minion = flat_normalize(&(target.position - minion.position));
        let predicted_position = minion.position + from_minion * target.attack_range;

        let autos_needed = (minion.health / target.attack_damage).max(1.0);

        opportunities.push(FarmOpportunity {
            predicted_position,
            confidence,
            eta: autos_needed,
        });
    }

    opportunities
}
