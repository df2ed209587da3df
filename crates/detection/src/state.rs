//! Dwell-time bookkeeping for walking detection.

use contracts::MotionClassification;

/// Rolling walking/stationary timestamps and the trigger threshold
///
/// Both timestamps only move forward, except on [`DetectionState::reset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionState {
    pub last_walking_at: f64,
    pub last_stationary_at: f64,
    pub trigger_threshold_secs: u32,
    /// Mirror of the recorder's phase at the last evaluation
    pub recording: bool,
}

impl DetectionState {
    pub fn new(trigger_threshold_secs: u32, now: f64) -> Self {
        Self {
            last_walking_at: now,
            last_stationary_at: now,
            trigger_threshold_secs,
            recording: false,
        }
    }

    /// Set both timestamps to `now`
    pub fn reset(&mut self, now: f64) {
        self.last_walking_at = now;
        self.last_stationary_at = now;
    }

    /// Fold a high-confidence reading into the timestamps
    ///
    /// Returns whether a timestamp was updated. Readings without a walking
    /// opinion are ignored.
    pub fn observe(&mut self, classification: &MotionClassification) -> bool {
        let at = classification.observed_at;
        match classification.walking {
            Some(true) => {
                self.last_walking_at = self.last_walking_at.max(at);
                true
            }
            Some(false) => {
                self.last_stationary_at = self.last_stationary_at.max(at);
                true
            }
            None => false,
        }
    }

    /// Length of the current walking run
    pub fn walking_dwell(&self) -> f64 {
        self.last_walking_at - self.last_stationary_at
    }

    /// Length of the current stationary run
    pub fn stationary_dwell(&self) -> f64 {
        self.last_stationary_at - self.last_walking_at
    }

    /// Idle and walked for longer than the threshold
    pub fn should_start(&self) -> bool {
        !self.recording && self.walking_dwell() > f64::from(self.trigger_threshold_secs)
    }

    /// Recording and stood still for longer than the threshold
    pub fn should_stop(&self) -> bool {
        self.recording && self.stationary_dwell() > f64::from(self.trigger_threshold_secs)
    }
}
