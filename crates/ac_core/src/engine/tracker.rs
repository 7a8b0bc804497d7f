//! Per-target behavior tracking
//!
//! One tracker owns everything the engine has learned about a single target:
//! the rolling movement history, the dodge pattern derived from it, the
//! stationary-state timer, the per-spell opportunity windows, and a
//! single-frame cache of the behavior probability grid.

use std::collections::VecDeque;

use fxhash::FxHashMap;
use nalgebra::Vector3;
use tracing::trace;

use super::config::PredictionConfig;
use super::constants::grid::{
    CACHE_SPEED_TOLERANCE, CACHE_TIME_TOLERANCE, CENTROID_SAMPLE_CAP, COVER_MARGIN,
    MIN_COVER_RADIUS, SIZE,
};
use super::constants::pattern::{
    DEFAULT_REACTION_DELAY_MS, PATTERN_EXPIRY, REACTION_DELAY_MAX, REACTION_SAMPLE_CAP,
};
use super::constants::sampling::{
    HISTORY_CAP, MIN_SAMPLES_FOR_BEHAVIOR, NOISE_SPEED, PATTERN_ANALYSIS_STRIDE, SAMPLE_INTERVAL,
};
use super::constants::{stationary, EPSILON};
use super::coordinates::{flat_length, flat_normalize, perpendicular};
use super::grid::BehaviorGrid;
use super::opportunity::OpportunityWindow;
use super::pattern::{self, DirectionChanges, DodgePattern};
use super::physics::predict_linear_position;
use super::sample::{velocity_between, MovementSample};
use super::world::{UnitId, UnitSnapshot};

/// Single-frame behavior-grid cache, invalidated by parameter tolerance.
#[derive(Debug, Clone)]
struct GridCache {
    grid: BehaviorGrid,
    prediction_time: f32,
    move_speed: f32,
    timestamp: f32,
}

/// Rolling movement model for one target.
#[derive(Debug)]
pub struct TargetBehaviorTracker {
    target_id: UnitId,
    history: VecDeque<MovementSample>,
    dodge_pattern: DodgePattern,
    direction_changes: DirectionChanges,
    /// Observed delays between an action start and movement onset (seconds).
    post_action_delays: Vec<f32>,
    last_action_start: f32,
    last_sample_time: f32,
    accepted_samples: usize,
    stationary_since: Option<f32>,
    grid_cache: Option<GridCache>,
    opportunity_windows: FxHashMap<i32, OpportunityWindow>,
}

impl TargetBehaviorTracker {
    pub fn new(target_id: UnitId) -> Self {
        Self {
            target_id,
            history: VecDeque::with_capacity(HISTORY_CAP),
            dodge_pattern: DodgePattern::default(),
            direction_changes: DirectionChanges::default(),
            post_action_delays: Vec::new(),
            last_action_start: 0.0,
            last_sample_time: f32::NEG_INFINITY,
            accepted_samples: 0,
            stationary_since: None,
            grid_cache: None,
            opportunity_windows: FxHashMap::default(),
        }
    }

    pub fn target_id(&self) -> UnitId {
        self.target_id
    }

    pub fn history(&self) -> &VecDeque<MovementSample> {
        &self.history
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    pub fn dodge_pattern(&self) -> &DodgePattern {
        &self.dodge_pattern
    }

    /// Timestamp of the newest sample, if any.
    pub fn last_sample_timestamp(&self) -> Option<f32> {
        self.history.back().map(|s| s.timestamp)
    }

    /// Ingest the current frame's unit state. Samples are spaced at least
    /// [`SAMPLE_INTERVAL`] apart; calls in between are no-ops.
    pub fn update(&mut self, unit: &UnitSnapshot, now: f32) {
        if now - self.last_sample_time < SAMPLE_INTERVAL {
            return;
        }

        let mut sample = MovementSample::from_unit(unit, now);

        if let Some(prev) = self.history.back() {
            sample.velocity = velocity_between(prev, &sample);

            // Action-start edges feed the reaction-delay model.
            let action_started = (sample.is_auto_attacking && !prev.is_auto_attacking)
                || (sample.is_casting && !prev.is_casting);
            if action_started {
                self.last_action_start = now;
            }

            // Movement onset after an action: how long did the target take
            // to start moving again?
            let speed = flat_length(&sample.velocity);
            let prev_speed = flat_length(&prev.velocity);
            if self.last_action_start > 0.0 && speed > NOISE_SPEED && prev_speed < NOISE_SPEED {
                let delay = now - self.last_action_start;
                if delay < REACTION_DELAY_MAX {
                    self.post_action_delays.push(delay);
                    if self.post_action_delays.len() > REACTION_SAMPLE_CAP {
                        self.post_action_delays.remove(0);
                    }
                }
            }

            // Continuous-stillness timer.
            if speed < stationary::SPEED_THRESHOLD {
                if self.stationary_since.is_none() {
                    self.stationary_since = Some(now);
                }
            } else {
                self.stationary_since = None;
            }
        }

        self.history.push_back(sample);
        if self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        self.last_sample_time = now;
        self.accepted_samples += 1;

        if self.history.len() >= MIN_SAMPLES_FOR_BEHAVIOR
            && self.accepted_samples % PATTERN_ANALYSIS_STRIDE == 0
        {
            self.analyze_patterns(now);
        }
    }

    /// Recompute the dodge pattern from the current history.
    fn analyze_patterns(&mut self, now: f32) {
        let history = self.history.make_contiguous();

        let counts = pattern::classify_transitions(history);
        if counts.total > 0 {
            let inv = 1.0 / counts.total as f32;
            self.dodge_pattern.left_frequency = counts.left as f32 * inv;
            self.dodge_pattern.right_frequency = counts.right as f32 * inv;
            self.dodge_pattern.forward_frequency = counts.forward as f32 * inv;
            self.dodge_pattern.backward_frequency = counts.backward as f32 * inv;
            self.dodge_pattern.linear_continuation = counts.forward as f32 * inv;
        }

        self.dodge_pattern.reaction_delay_ms = if self.post_action_delays.is_empty() {
            DEFAULT_REACTION_DELAY_MS
        } else {
            let sum: f32 = self.post_action_delays.iter().sum();
            (sum / self.post_action_delays.len() as f32) * 1000.0
        };

        let sequence = pattern::build_juke_sequence(history);
        let latest_velocity = history.last().map(|s| s.velocity).unwrap_or_else(Vector3::zeros);

        let detection =
            pattern::detect_alternating(&sequence).or_else(|| pattern::detect_repeating(&sequence));
        self.dodge_pattern.juke_sequence = sequence;

        match detection {
            Some((confidence, next)) => {
                self.dodge_pattern.has_pattern = true;
                self.dodge_pattern.confidence = confidence;
                self.dodge_pattern.predicted_direction = next.direction_from(&latest_velocity);
                self.dodge_pattern.last_detection_time = now;
                trace!(
                    target_id = self.target_id,
                    confidence,
                    "dodge pattern detected"
                );
            }
            None => {
                self.dodge_pattern.has_pattern = false;
                self.dodge_pattern.confidence = 0.0;
                self.dodge_pattern.predicted_direction = Vector3::zeros();
            }
        }

        self.direction_changes = pattern::direction_changes(history);
        if let Some((mean, variance)) = pattern::interval_stats(&self.direction_changes.times) {
            self.dodge_pattern.juke_interval_mean = mean;
            self.dodge_pattern.juke_interval_variance = variance;
        }

        self.expire_stale_pattern(now);
    }

    /// Drop a detected pattern once the sample feed has been silent too
    /// long. Called from the per-frame tick so patterns expire even while
    /// the target is unresolvable.
    pub fn expire_stale_pattern(&mut self, now: f32) {
        if !self.dodge_pattern.has_pattern {
            return;
        }
        let stale = match self.history.back() {
            Some(last) => now - last.timestamp > PATTERN_EXPIRY,
            None => true,
        };
        if stale {
            self.dodge_pattern.clear_detection();
        }
    }

    /// The latest sample shows an uninterruptible action.
    pub fn is_animation_locked(&self) -> bool {
        self.history
            .back()
            .map(|s| s.is_animation_locked())
            .unwrap_or(false)
    }

    /// Velocity of the newest sample.
    pub fn current_velocity(&self) -> Vector3<f32> {
        self.history
            .back()
            .map(|s| s.velocity)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Seconds of continuous stillness, 0 while moving.
    pub fn stationary_duration(&self, now: f32) -> f32 {
        self.stationary_since.map(|t| now - t).unwrap_or(0.0)
    }

    /// Minimum hit chance earned by standing still: 0 below 0.5 s, ramping
    /// linearly to 0.75 at 1.0 s and capped there. Applied as a floor, not a
    /// multiplier.
    pub fn stationary_floor(&self, now: f32) -> f32 {
        let duration = self.stationary_duration(now);
        if duration < stationary::FLOOR_START {
            return 0.0;
        }
        if duration >= stationary::FLOOR_FULL {
            return stationary::FLOOR_MAX;
        }
        let t = (duration - stationary::FLOOR_START)
            / (stationary::FLOOR_FULL - stationary::FLOOR_START);
        stationary::FLOOR_MIN + t * (stationary::FLOOR_MAX - stationary::FLOOR_MIN)
    }

    /// Exponential-decay weighted centroid of forward-projected history
    /// positions; zero with no history.
    pub fn predict_position(&self, prediction_time: f32, config: &PredictionConfig) -> Vector3<f32> {
        let Some(latest) = self.history.back() else {
            return Vector3::zeros();
        };

        let decay = config.decay.rate_for_speed(flat_length(&latest.velocity));
        let mut weighted = Vector3::zeros();
        let mut total_weight = 0.0;

        for (i, sample) in self.history.iter().rev().take(20).enumerate() {
            let weight = decay.powi(i as i32);
            weighted += (sample.position + sample.velocity * prediction_time) * weight;
            total_weight += weight;
        }

        if total_weight > EPSILON {
            weighted / total_weight
        } else {
            predict_linear_position(&latest.position, &latest.velocity, prediction_time)
        }
    }

    /// Build (or reuse) the behavior probability grid for this prediction.
    ///
    /// The cache is keyed by frame time plus prediction-time and move-speed
    /// tolerances so one tick's multiple spell evaluations share a single
    /// build.
    pub fn build_behavior_grid(
        &mut self,
        prediction_time: f32,
        move_speed: f32,
        now: f32,
        config: &PredictionConfig,
    ) -> BehaviorGrid {
        if let Some(cache) = &self.grid_cache {
            let same_frame = (now - cache.timestamp).abs() < EPSILON;
            let similar_time = (prediction_time - cache.prediction_time).abs() < CACHE_TIME_TOLERANCE;
            let similar_speed = (move_speed - cache.move_speed).abs() < CACHE_SPEED_TOLERANCE;
            if same_frame && similar_time && similar_speed && cache.grid.has_data() {
                return cache.grid.clone();
            }
        }

        let Some(latest) = self.history.back().cloned() else {
            return BehaviorGrid::default();
        };

        // Size the grid so it comfortably covers the reachable displacement.
        // The move-speed stat is used instead of current velocity, which can
        // be zero mid-cast.
        let cover_radius = (move_speed * prediction_time * COVER_MARGIN).max(MIN_COVER_RADIUS);
        let cell_size = cover_radius * 2.0 / SIZE as f32;

        // Animation locks pin the target: all mass at the current position.
        if latest.is_crowd_controlled || latest.is_casting {
            let mut grid = BehaviorGrid::new(latest.position, cell_size);
            grid.add_weighted_sample(&latest.position, 1.0);
            grid.normalize();
            return grid;
        }

        let decay = config.decay.rate_for_speed(flat_length(&latest.velocity));

        // First pass: center the grid on the weighted average of projected
        // positions so direction changes do not push mass off the edge.
        let mut center = Vector3::zeros();
        let mut total_weight = 0.0;
        for (i, sample) in self.history.iter().rev().take(CENTROID_SAMPLE_CAP).enumerate() {
            let weight = decay.powi(i as i32);
            center += (sample.position + sample.velocity * prediction_time) * weight;
            total_weight += weight;
        }
        let center = if total_weight > EPSILON {
            center / total_weight
        } else {
            predict_linear_position(&latest.position, &latest.velocity, prediction_time)
        };

        let mut grid = BehaviorGrid::new(center, cell_size);

        // Second pass: deposit the projected positions.
        for (i, sample) in self.history.iter().rev().take(CENTROID_SAMPLE_CAP).enumerate() {
            let weight = decay.powi(i as i32);
            grid.add_weighted_sample(&(sample.position + sample.velocity * prediction_time), weight);
        }

        // Lateral dodge bias, gated on the target having had time to react.
        let speed = flat_length(&latest.velocity);
        let can_react = prediction_time >= self.dodge_pattern.reaction_delay_ms / 1000.0;
        if speed > NOISE_SPEED && can_react {
            let velocity_dir = flat_normalize(&latest.velocity);
            let perp = perpendicular(&velocity_dir);
            let forward = latest.velocity * prediction_time;

            let lateral = pattern::lateral_factor(&self.direction_changes.angles);
            let dodge_distance = speed * prediction_time * lateral;
            let side = perp * dodge_distance;

            let cadence = pattern::juke_cadence_weight(
                prediction_time,
                self.dodge_pattern.juke_interval_mean,
                self.dodge_pattern.juke_interval_variance,
            );

            if self.dodge_pattern.left_frequency > 0.3 {
                let pos = latest.position + forward + side;
                grid.add_weighted_sample(&pos, self.dodge_pattern.left_frequency * 0.5 * cadence);
            }
            if self.dodge_pattern.right_frequency > 0.3 {
                let pos = latest.position + forward - side;
                grid.add_weighted_sample(&pos, self.dodge_pattern.right_frequency * 0.5 * cadence);
            }

            // A detected pattern dominates: one heavy deposit where the
            // pattern says the next juke lands.
            if self.dodge_pattern.has_pattern && self.dodge_pattern.confidence > 0.6 {
                let pattern_pos = latest.position
                    + forward
                    + self.dodge_pattern.predicted_direction * dodge_distance;
                grid.add_weighted_sample(&pattern_pos, self.dodge_pattern.confidence * 2.5);
            }
        }

        grid.normalize();

        self.grid_cache = Some(GridCache {
            grid: grid.clone(),
            prediction_time,
            move_speed,
            timestamp: now,
        });

        grid
    }

    /// Get or create the opportunity window for a spell slot. Creation is an
    /// explicit mutation, not a side effect of a read.
    pub fn opportunity_window_mut(&mut self, slot: i32, now: f32) -> &mut OpportunityWindow {
        self.opportunity_windows
            .entry(slot)
            .or_insert_with(|| OpportunityWindow::new(now))
    }

    /// Replace a slot's window after a suspected cast.
    pub fn reset_opportunity_window(&mut self, slot: i32, now: f32) {
        self.opportunity_windows.insert(slot, OpportunityWindow::new(now));
    }
}
