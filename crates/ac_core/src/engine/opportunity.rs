//! Opportunity windows
//!
//! A rolling record of recent hit-chance values for one (target, spell slot)
//! pair. Used to time delayed casts: flag the moment the estimate peaks and
//! starts a sustained decline instead of firing on the first decent value.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::constants::opportunity::{
    HISTORY_CAP, LOCAL_MAX_MARGIN, MIN_TREND_SAMPLES, PEAK_STALE, QUALITY_FRACTION,
    THRESHOLD_DECAY_END, THRESHOLD_DECAY_START, THRESHOLD_FLOOR_FRACTION, WINDOW_DURATION,
};
use super::constants::EPSILON;

/// Rolling hit-chance record for one spell slot against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityWindow {
    /// (timestamp, hit chance) samples, oldest first.
    history: VecDeque<(f32, f32)>,
    /// Game time this window started accumulating.
    pub started_at: f32,
    pub peak_hit_chance: f32,
    pub peak_timestamp: f32,
    /// Most recent hit chance, for cast-drop detection.
    pub last_hit_chance: f32,
}

impl OpportunityWindow {
    pub fn new(started_at: f32) -> Self {
        Self {
            history: VecDeque::new(),
            started_at,
            peak_hit_chance: 0.0,
            peak_timestamp: started_at,
            last_hit_chance: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Seconds since this window started.
    pub fn elapsed(&self, now: f32) -> f32 {
        now - self.started_at
    }

    /// Append a sample, enforce the size and time-span caps, and maintain
    /// the running peak (recomputing it once it goes stale).
    pub fn record(&mut self, now: f32, hit_chance: f32) {
        self.history.push_back((now, hit_chance));

        // Size cap guards against lag spikes flooding the window.
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
        while let Some(&(t, _)) = self.history.front() {
            if now - t > WINDOW_DURATION {
                self.history.pop_front();
            } else {
                break;
            }
        }

        if hit_chance > self.peak_hit_chance {
            self.peak_hit_chance = hit_chance;
            self.peak_timestamp = now;
        }

        // A stale peak no longer describes the current fight; recompute from
        // what is still in the window.
        if now - self.peak_timestamp > PEAK_STALE {
            self.peak_hit_chance = 0.0;
            self.peak_timestamp = now;
            for &(t, chance) in &self.history {
                if chance > self.peak_hit_chance {
                    self.peak_hit_chance = chance;
                    self.peak_timestamp = t;
                }
            }
        }
    }

    /// Base threshold decayed by window age: full for 3 s, linearly down to
    /// 70 % by 8 s, floored there.
    pub fn adaptive_threshold(&self, base_threshold: f32, elapsed: f32) -> f32 {
        if elapsed < THRESHOLD_DECAY_START {
            return base_threshold;
        }
        if elapsed < THRESHOLD_DECAY_END {
            let span = THRESHOLD_DECAY_END - THRESHOLD_DECAY_START;
            let progress = (elapsed - THRESHOLD_DECAY_START) / span;
            let decay = 1.0 - progress * (1.0 - THRESHOLD_FLOOR_FRACTION);
            return base_threshold * decay;
        }
        base_threshold * THRESHOLD_FLOOR_FRACTION
    }

    /// Whether the current sample is a locally optimal moment to cast.
    ///
    /// Requires: the patience window to have elapsed, enough samples for a
    /// trend, the value to be near the adaptive threshold, the value to sit
    /// above the last-second average, and a sustained (3-step) decline
    /// confirming the peak is behind us.
    pub fn is_peak_opportunity(
        &self,
        now: f32,
        hit_chance: f32,
        adaptive_threshold: f32,
        elapsed: f32,
        patience_window: f32,
    ) -> bool {
        if elapsed < patience_window {
            return false;
        }
        if self.history.len() < MIN_TREND_SAMPLES {
            return false;
        }
        if hit_chance < adaptive_threshold * QUALITY_FRACTION {
            return false;
        }

        // Local maximum: compare to the last second of samples.
        let mut recent_sum = 0.0;
        let mut recent_count = 0;
        for &(t, chance) in self.history.iter().rev() {
            if now - t >= 1.0 {
                break;
            }
            recent_sum += chance;
            recent_count += 1;
        }
        if recent_count < 3 {
            return false;
        }
        let recent_avg = recent_sum / recent_count as f32;
        if hit_chance < recent_avg * LOCAL_MAX_MARGIN {
            return false;
        }

        // Sustained decline: three consecutive drops, not a single blip.
        if self.history.len() >= 4 {
            let n = self.history.len();
            let s4 = self.history[n - 4].1;
            let s3 = self.history[n - 3].1;
            let s2 = self.history[n - 2].1;
            let s1 = self.history[n - 1].1;
            if s1 < s2 && s2 < s3 && s3 < s4 {
                return true;
            }
        }

        false
    }

    /// How good this moment is relative to the recent peak, in [0, 1]-ish.
    pub fn opportunity_score(&self, hit_chance: f32) -> f32 {
        if self.peak_hit_chance > EPSILON {
            hit_chance / self.peak_hit_chance
        } else {
            1.0
        }
    }
}
