//! SessionRecord - terminal output of a walking session
//!
//! A finished session plus the hazard report attached to it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Location, SessionChunkKey};

/// Hazard categories a user can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardCategory {
    ChangeInFloorLevels,
    UnevenSurface,
    DebrisOrObstacles,
    Slippery,
    Slope,
    PoorLighting,
}

impl HazardCategory {
    pub const ALL: [HazardCategory; 6] = [
        HazardCategory::ChangeInFloorLevels,
        HazardCategory::UnevenSurface,
        HazardCategory::DebrisOrObstacles,
        HazardCategory::Slippery,
        HazardCategory::Slope,
        HazardCategory::PoorLighting,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            HazardCategory::ChangeInFloorLevels => "Change in Floor Levels",
            HazardCategory::UnevenSurface => "Uneven Surface",
            HazardCategory::DebrisOrObstacles => "Debris or Obstacles",
            HazardCategory::Slippery => "Slippery",
            HazardCategory::Slope => "Slope",
            HazardCategory::PoorLighting => "Poor Lighting",
        }
    }
}

/// Reported hazard intensity
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HazardIntensity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl HazardIntensity {
    /// Numeric level (0-3)
    pub fn level(&self) -> u8 {
        match self {
            HazardIntensity::None => 0,
            HazardIntensity::Low => 1,
            HazardIntensity::Medium => 2,
            HazardIntensity::High => 3,
        }
    }
}

/// Hazard report attached to a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardReport {
    /// Intensity per category (every category present)
    pub hazards: BTreeMap<HazardCategory, HazardIntensity>,

    /// Uploaded photo id, if any
    #[serde(default)]
    pub image_id: Option<String>,
}

impl HazardReport {
    /// Zero-intensity report (no hazard observed)
    pub fn none() -> Self {
        Self {
            hazards: HazardCategory::ALL
                .iter()
                .map(|c| (*c, HazardIntensity::None))
                .collect(),
            image_id: None,
        }
    }

    /// Set the intensity of one category
    pub fn with(mut self, category: HazardCategory, intensity: HazardIntensity) -> Self {
        self.hazards.insert(category, intensity);
        self
    }

    pub fn with_image(mut self, image_id: impl Into<String>) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    /// True when no category has a non-zero intensity
    pub fn is_empty(&self) -> bool {
        self.hazards.values().all(|i| *i == HazardIntensity::None)
    }
}

impl Default for HazardReport {
    fn default() -> Self {
        Self::none()
    }
}

/// Finished session as handed to the record sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Record identifier (`yyyyMMdd-HHmmss` of the end time, UTC)
    pub record_id: String,

    /// Session start (seconds since epoch)
    pub started_at: f64,

    /// Session end (seconds since epoch)
    pub ended_at: f64,

    /// Location at start
    pub start_location: Location,

    /// Location of the last buffered sample (UNKNOWN if none)
    pub last_location: Location,

    /// Ordered chunk keys
    pub chunk_keys: Vec<SessionChunkKey>,

    /// Attached report
    pub report: HazardReport,

    /// Detection threshold in effect when the session ended
    pub detection_threshold_secs: u32,

    /// Whether the session was cancelled rather than reported
    pub cancelled: bool,
}

/// Format a record id from an epoch timestamp
pub fn record_id_for(timestamp: f64) -> String {
    let secs = timestamp.floor() as i64;
    let nanos = ((timestamp - timestamp.floor()) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .unwrap_or_default()
        .format("%Y%m%d-%H%M%S")
        .to_string()
}
