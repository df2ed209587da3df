//! WalkerConfig - Config Loader output
//!
//! Runtime configuration for detection, recording, reassembly, notifications
//! and the chunk store. Every field has a default so an empty file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default flush threshold: 2000 samples is ~40 s at 50 Hz
pub const DEFAULT_FLUSH_THRESHOLD: usize = 2000;

/// Default detection dwell time (seconds)
pub const DEFAULT_TRIGGER_THRESHOLD_SECS: u32 = 60;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct WalkerConfig {
    /// Walking detection
    #[serde(default)]
    #[validate(nested)]
    pub detection: DetectionConfig,

    /// Session recording and chunk flushing
    #[serde(default)]
    #[validate(nested)]
    pub recorder: RecorderConfig,

    /// Chunk reassembly
    #[serde(default)]
    #[validate(nested)]
    pub reassembly: ReassemblyConfig,

    /// User notifications
    #[serde(default)]
    #[validate(nested)]
    pub notifications: NotificationConfig,

    /// Chunk store backend
    #[serde(default)]
    pub store: StoreConfig,
}

/// Walking detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DetectionConfig {
    /// Dwell time a walking/stationary run must exceed before a transition
    #[validate(range(min = 1))]
    pub trigger_threshold_secs: u32,

    /// Whether detection starts enabled
    pub enabled: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            trigger_threshold_secs: DEFAULT_TRIGGER_THRESHOLD_SECS,
            enabled: true,
        }
    }
}

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecorderConfig {
    /// Buffer length at which a chunk is flushed
    #[validate(range(min = 1))]
    pub flush_threshold: usize,

    /// What to do with buffered samples on cancel
    pub cancel_policy: CancelPolicy,

    /// Deadline for a single chunk write (milliseconds)
    #[validate(range(min = 1))]
    pub write_timeout_ms: u64,

    /// Nominal sensor rate (Hz), used for summaries
    #[validate(range(min = 1.0))]
    pub sample_rate_hz: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            cancel_policy: CancelPolicy::default(),
            write_timeout_ms: 10_000,
            sample_rate_hz: 50.0,
        }
    }
}

/// Handling of buffered samples when a session is cancelled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Flush the remainder as a final chunk
    #[default]
    PersistRemainder,
    /// Drop the remainder without writing
    DiscardRemainder,
}

/// Reassembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReassemblyConfig {
    /// Deadline for a single chunk fetch (milliseconds)
    #[validate(range(min = 1))]
    pub fetch_timeout_ms: u64,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 15_000,
        }
    }
}

/// Notification preferences
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notify when detection starts/stops a session
    pub detection_events: bool,

    /// Notify on blocked auto-start and sensor disconnects
    pub errors: bool,

    /// Minimum interval between repeated "cannot start" advisories (seconds)
    #[validate(range(min = 1))]
    pub advisory_rate_limit_secs: u64,

    /// Minimum interval between repeated disconnect advisories (seconds)
    #[validate(range(min = 1))]
    pub disconnect_rate_limit_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            detection_events: false,
            errors: true,
            advisory_rate_limit_secs: 180,
            disconnect_rate_limit_secs: 60,
        }
    }
}

/// Chunk store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend kind
    pub kind: StoreKind,

    /// Base directory (file store only)
    pub base_path: Option<PathBuf>,
}

/// Chunk store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

/// Detection sensitivity presets (dwell time in seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Testing,
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl Sensitivity {
    pub const ALL: [Sensitivity; 6] = [
        Sensitivity::Testing,
        Sensitivity::VeryHigh,
        Sensitivity::High,
        Sensitivity::Medium,
        Sensitivity::Low,
        Sensitivity::VeryLow,
    ];

    /// Dwell time for this preset
    pub fn threshold_secs(&self) -> u32 {
        match self {
            Sensitivity::Testing => 5,
            Sensitivity::VeryHigh => 15,
            Sensitivity::High => 30,
            Sensitivity::Medium => 60,
            Sensitivity::Low => 120,
            Sensitivity::VeryLow => 180,
        }
    }

    /// Preset matching an exact dwell time
    pub fn from_threshold_secs(secs: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.threshold_secs() == secs)
    }
}
