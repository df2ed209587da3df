//! MotionClassification - motion classifier output
//!
//! Ephemeral activity readings that drive walking detection.

use serde::{Deserialize, Serialize};

/// Classifier confidence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// A single activity classification
///
/// `walking == Some(false)` means the classifier reported the user as not
/// walking (stationary signal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionClassification {
    /// Walking flag (None = classifier had no opinion)
    pub walking: Option<bool>,

    /// Stationary flag
    pub stationary: Option<bool>,

    /// Other activity (e.g. automotive)
    pub other_activity: Option<bool>,

    /// Confidence of this reading
    pub confidence: Confidence,

    /// Observation time (seconds since epoch)
    pub observed_at: f64,
}

impl MotionClassification {
    /// Walking reading
    pub fn walking(observed_at: f64, confidence: Confidence) -> Self {
        Self {
            walking: Some(true),
            stationary: Some(false),
            other_activity: Some(false),
            confidence,
            observed_at,
        }
    }

    /// Stationary reading
    pub fn stationary(observed_at: f64, confidence: Confidence) -> Self {
        Self {
            walking: Some(false),
            stationary: Some(true),
            other_activity: Some(false),
            confidence,
            observed_at,
        }
    }

    /// Reading with no walking opinion
    pub fn unknown(observed_at: f64, confidence: Confidence) -> Self {
        Self {
            walking: None,
            stationary: None,
            other_activity: None,
            confidence,
            observed_at,
        }
    }

    /// Whether this reading may drive a detection transition
    pub fn is_decisive(&self) -> bool {
        self.confidence == Confidence::High
    }
}
