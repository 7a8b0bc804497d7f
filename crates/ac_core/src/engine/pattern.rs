//! Dodge-pattern analysis
//!
//! Derives movement tendencies from a target's sample history: lateral and
//! forward transition frequencies, direction-change cadence, and short
//! repeating or alternating juke sequences. All functions here are pure -
//! they take history slices as input and return statistics. This allows easy
//! unit testing without a full tracker.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::constants::pattern::{
    DEFAULT_REACTION_DELAY_MS, DIRECTION_CHANGE_ANGLE, FORWARD_THRESHOLD, LATERAL_THRESHOLD,
    MAX_PATTERN_CONFIDENCE, MAX_SEQUENCE_LENGTH, REPEATING_CONFIDENCE,
    SEQUENCE_LATERAL_THRESHOLD,
};
use super::constants::sampling::NOISE_SPEED;
use super::constants::EPSILON;
use super::coordinates::{flat_cross, flat_dot, flat_length, flat_normalize, perpendicular};
use super::sample::MovementSample;

/// Lateral classification of one velocity-direction transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JukeSign {
    Left,
    Straight,
    Right,
}

impl JukeSign {
    pub fn opposite(self) -> Self {
        match self {
            JukeSign::Left => JukeSign::Right,
            JukeSign::Right => JukeSign::Left,
            JukeSign::Straight => JukeSign::Straight,
        }
    }

    /// World direction of this juke relative to a velocity. Left is the
    /// counterclockwise perpendicular.
    pub fn direction_from(self, velocity: &Vector3<f32>) -> Vector3<f32> {
        let perp = perpendicular(&flat_normalize(velocity));
        match self {
            JukeSign::Left => perp,
            JukeSign::Right => -perp,
            JukeSign::Straight => Vector3::zeros(),
        }
    }
}

/// Learned per-target movement summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DodgePattern {
    /// Transition fractions; each in [0, 1], lateral pair sums <= 1.
    pub left_frequency: f32,
    pub right_frequency: f32,
    pub forward_frequency: f32,
    pub backward_frequency: f32,
    /// Probability the target keeps walking its current line.
    pub linear_continuation: f32,
    /// Learned reaction delay in milliseconds.
    pub reaction_delay_ms: f32,
    /// Cadence of significant direction changes (seconds).
    pub juke_interval_mean: f32,
    pub juke_interval_variance: f32,
    pub has_pattern: bool,
    /// Pattern confidence in [0, 0.9].
    pub confidence: f32,
    /// Predicted next lateral direction in world space (zero when none).
    pub predicted_direction: Vector3<f32>,
    /// Recent lateral symbols, newest last, capped at 8.
    pub juke_sequence: Vec<JukeSign>,
    /// Game time of the last successful pattern detection.
    pub last_detection_time: f32,
}

impl Default for DodgePattern {
    fn default() -> Self {
        Self {
            left_frequency: 0.0,
            right_frequency: 0.0,
            forward_frequency: 0.0,
            backward_frequency: 0.0,
            linear_continuation: 0.0,
            reaction_delay_ms: DEFAULT_REACTION_DELAY_MS,
            juke_interval_mean: 0.0,
            juke_interval_variance: 0.0,
            has_pattern: false,
            confidence: 0.0,
            predicted_direction: Vector3::zeros(),
            juke_sequence: Vec::new(),
            last_detection_time: 0.0,
        }
    }
}

impl DodgePattern {
    /// Drop a detected pattern, keeping the learned frequencies.
    pub fn clear_detection(&mut self) {
        self.has_pattern = false;
        self.confidence = 0.0;
        self.predicted_direction = Vector3::zeros();
        self.juke_sequence.clear();
    }
}

/// Counts of classified velocity-direction transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransitionCounts {
    pub left: usize,
    pub right: usize,
    pub forward: usize,
    pub backward: usize,
    pub total: usize,
}

/// Classify consecutive velocity pairs into lateral (cross sign) and
/// longitudinal (dot sign) transitions. Pairs where either sample moves
/// slower than the noise floor are skipped.
pub fn classify_transitions(history: &[MovementSample]) -> TransitionCounts {
    let mut counts = TransitionCounts::default();
    if history.len() < 3 {
        return counts;
    }

    for pair in history.windows(2).skip(1) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if flat_length(&prev.velocity) < NOISE_SPEED || flat_length(&curr.velocity) < NOISE_SPEED {
            continue;
        }

        let prev_dir = flat_normalize(&prev.velocity);
        let curr_dir = flat_normalize(&curr.velocity);

        let cross = flat_cross(&prev_dir, &curr_dir);
        let dot = flat_dot(&prev_dir, &curr_dir);

        if cross > LATERAL_THRESHOLD {
            counts.left += 1;
        } else if cross < -LATERAL_THRESHOLD {
            counts.right += 1;
        }

        if dot > FORWARD_THRESHOLD {
            counts.forward += 1;
        } else if dot < -FORWARD_THRESHOLD {
            counts.backward += 1;
        }

        counts.total += 1;
    }

    counts
}

/// Lateral symbols of the most recent transitions, newest last, at most
/// [`MAX_SEQUENCE_LENGTH`] entries.
pub fn build_juke_sequence(history: &[MovementSample]) -> Vec<JukeSign> {
    let mut sequence = Vec::new();
    if history.len() < 2 {
        return sequence;
    }

    let start = history.len().saturating_sub(MAX_SEQUENCE_LENGTH + 1);
    for pair in history[start..].windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if flat_length(&prev.velocity) < NOISE_SPEED || flat_length(&curr.velocity) < NOISE_SPEED {
            continue;
        }

        let cross = flat_cross(&flat_normalize(&prev.velocity), &flat_normalize(&curr.velocity));
        let sign = if cross > SEQUENCE_LATERAL_THRESHOLD {
            JukeSign::Left
        } else if cross < -SEQUENCE_LATERAL_THRESHOLD {
            JukeSign::Right
        } else {
            JukeSign::Straight
        };
        sequence.push(sign);
    }

    sequence
}

/// Detect strict left/right alternation among the non-straight symbols.
/// Returns (confidence, predicted next sign).
pub fn detect_alternating(sequence: &[JukeSign]) -> Option<(f32, JukeSign)> {
    if sequence.len() < 4 {
        return None;
    }

    let laterals: Vec<JukeSign> = sequence
        .iter()
        .copied()
        .filter(|s| *s != JukeSign::Straight)
        .collect();
    if laterals.len() < 3 {
        return None;
    }

    let mut alternations = 0;
    for pair in laterals.windows(2) {
        if pair[1] != pair[0].opposite() {
            return None;
        }
        alternations += 1;
    }

    if alternations < 2 {
        return None;
    }

    let confidence = (0.6 + alternations as f32 * 0.1).min(MAX_PATTERN_CONFIDENCE);
    let next = laterals.last().copied().map(JukeSign::opposite)?;
    Some((confidence, next))
}

/// Detect a first-half/second-half repetition and predict the symbol that
/// continues the cycle. Returns (confidence, predicted next sign).
pub fn detect_repeating(sequence: &[JukeSign]) -> Option<(f32, JukeSign)> {
    if sequence.len() < 6 {
        return None;
    }

    let half = sequence.len() / 2;
    for i in 0..half {
        if sequence[i] != sequence[i + half] {
            return None;
        }
    }

    let next = sequence[sequence.len() % half];
    if next == JukeSign::Straight {
        return None;
    }
    Some((REPEATING_CONFIDENCE, next))
}

/// Timestamps and magnitudes of significant direction changes.
#[derive(Debug, Default, Clone)]
pub struct DirectionChanges {
    pub times: Vec<f32>,
    /// Turn angles in radians.
    pub angles: Vec<f32>,
}

/// Extract direction changes sharper than ~30 degrees from the history.
pub fn direction_changes(history: &[MovementSample]) -> DirectionChanges {
    let mut changes = DirectionChanges::default();
    if history.len() < 3 {
        return changes;
    }

    for window in history.windows(3) {
        let (prev, curr) = (&window[0], &window[2]);
        if flat_length(&prev.velocity) < NOISE_SPEED || flat_length(&curr.velocity) < NOISE_SPEED {
            continue;
        }

        let dot = flat_dot(&flat_normalize(&prev.velocity), &flat_normalize(&curr.velocity));
        let angle = dot.clamp(-1.0, 1.0).acos();
        if angle > DIRECTION_CHANGE_ANGLE {
            changes.times.push(curr.timestamp);
            changes.angles.push(angle);
        }
    }

    changes
}

/// Mean and variance of the gaps between direction changes.
pub fn interval_stats(times: &[f32]) -> Option<(f32, f32)> {
    if times.len() < 2 {
        return None;
    }

    let intervals: Vec<f32> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = intervals.iter().sum::<f32>() / intervals.len() as f32;
    let variance = intervals
        .iter()
        .map(|i| (i - mean) * (i - mean))
        .sum::<f32>()
        / intervals.len() as f32;
    Some((mean, variance))
}

/// Average absolute lateral displacement fraction observed in direction
/// changes, clamped to a sane band; 0.5 when too few observations.
pub fn lateral_factor(angles: &[f32]) -> f32 {
    if angles.len() < 3 {
        return 0.5;
    }
    let total: f32 = angles.iter().map(|a| a.sin().abs()).sum();
    (total / angles.len() as f32).clamp(0.2, 0.9)
}

/// Gaussian cadence weight: how likely a juke is at `prediction_time` given
/// the learned interval distribution. 1.0 when the cadence is unknown.
pub fn juke_cadence_weight(prediction_time: f32, mean: f32, variance: f32) -> f32 {
    if variance < EPSILON {
        return 1.0;
    }
    let diff = prediction_time - mean;
    let weight = (-0.5 * diff * diff / variance).exp();
    weight.clamp(0.3, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving_sample(t: f32, vx: f32, vz: f32) -> MovementSample {
        MovementSample {
            position: Vector3::new(t * 100.0, 0.0, 0.0),
            timestamp: t,
            velocity: Vector3::new(vx, 0.0, vz),
            is_auto_attacking: false,
            is_casting: false,
            is_dashing: false,
            is_crowd_controlled: false,
            hp_percent: 100.0,
        }
    }

    /// History with velocities swinging left/right around +X.
    fn zigzag_history(n: usize) -> Vec<MovementSample> {
        (0..n)
            .map(|i| {
                let side = if i % 2 == 0 { 150.0 } else { -150.0 };
                moving_sample(i as f32 * 0.1, 300.0, side)
            })
            .collect()
    }

    #[test]
    fn test_classify_straight_walk_is_forward() {
        let history: Vec<_> = (0..10).map(|i| moving_sample(i as f32 * 0.1, 300.0, 0.0)).collect();
        let counts = classify_transitions(&history);
        assert_eq!(counts.left, 0);
        assert_eq!(counts.right, 0);
        assert_eq!(counts.forward, counts.total);
        assert!(counts.total > 0);
    }

    #[test]
    fn test_classify_skips_slow_samples() {
        let history: Vec<_> = (0..10).map(|i| moving_sample(i as f32 * 0.1, 1.0, 0.0)).collect();
        assert_eq!(classify_transitions(&history).total, 0);
    }

    #[test]
    fn test_zigzag_produces_alternating_sequence() {
        let history = zigzag_history(10);
        let sequence = build_juke_sequence(&history);
        assert!(sequence.len() >= 4);
        let (confidence, next) = detect_alternating(&sequence).expect("alternating");
        assert!(confidence > 0.6);
        assert!(confidence <= MAX_PATTERN_CONFIDENCE);
        assert_eq!(next, sequence.iter().rev().find(|s| **s != JukeSign::Straight).unwrap().opposite());
    }

    #[test]
    fn test_alternating_confidence_capped() {
        let sequence = vec![
            JukeSign::Left,
            JukeSign::Right,
            JukeSign::Left,
            JukeSign::Right,
            JukeSign::Left,
            JukeSign::Right,
            JukeSign::Left,
            JukeSign::Right,
        ];
        let (confidence, _) = detect_alternating(&sequence).unwrap();
        assert!(confidence <= MAX_PATTERN_CONFIDENCE + 1e-6);
    }

    #[test]
    fn test_repeating_sequence_detected() {
        let sequence = vec![
            JukeSign::Left,
            JukeSign::Left,
            JukeSign::Right,
            JukeSign::Left,
            JukeSign::Left,
            JukeSign::Right,
        ];
        let (confidence, next) = detect_repeating(&sequence).expect("repeating");
        assert_eq!(confidence, REPEATING_CONFIDENCE);
        // len % half = 0 -> the cycle continues with Left.
        assert_eq!(next, JukeSign::Left);
    }

    #[test]
    fn test_non_repeating_rejected() {
        let sequence = vec![
            JukeSign::Left,
            JukeSign::Right,
            JukeSign::Right,
            JukeSign::Left,
            JukeSign::Left,
            JukeSign::Right,
        ];
        assert!(detect_repeating(&sequence).is_none());
    }

    #[test]
    fn test_direction_changes_and_interval_stats() {
        let history = zigzag_history(12);
        let changes = direction_changes(&history);
        assert!(changes.times.len() >= 2);
        let (mean, variance) = interval_stats(&changes.times).unwrap();
        assert!(mean > 0.0);
        assert!(variance >= 0.0);
    }

    #[test]
    fn test_lateral_factor_bounds() {
        assert_eq!(lateral_factor(&[]), 0.5);
        let big = vec![std::f32::consts::FRAC_PI_2; 8];
        assert!(lateral_factor(&big) <= 0.9);
        let tiny = vec![0.01; 8];
        assert!(lateral_factor(&tiny) >= 0.2);
    }

    #[test]
    fn test_cadence_weight_peaks_at_mean() {
        let at_mean = juke_cadence_weight(0.8, 0.8, 0.04);
        let off_mean = juke_cadence_weight(2.0, 0.8, 0.04);
        assert!(at_mean > off_mean);
        assert!(off_mean >= 0.3);
        assert_eq!(juke_cadence_weight(1.0, 0.0, 0.0), 1.0);
    }

    #[test]
    fn test_juke_direction_is_perpendicular() {
        let vel = Vector3::new(300.0, 0.0, 0.0);
        let left = JukeSign::Left.direction_from(&vel);
        assert!((left.z - 1.0).abs() < 1e-5);
        let right = JukeSign::Right.direction_from(&vel);
        assert!((right.z + 1.0).abs() < 1e-5);
    }
}
