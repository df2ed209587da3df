//! DetectionStateMachine - starts and stops recording from motion readings
//!
//! Decision layer over [`SessionRecorder`]: the recorder's phase is the source
//! of truth for Idle/Recording, this machine only decides when to flip it.

use std::collections::VecDeque;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    DetectionConfig, HazardReport, LocationProvider, MotionClassification, NotificationConfig,
    NotificationSink, RecordSink, SensorStream,
};
use recorder::{RecorderError, SessionRecorder};

use crate::advisory::{Advisory, DetectionEvent, Notifier};
use crate::state::DetectionState;

/// Classifications kept for inspection
const HISTORY_LEN: usize = 64;

/// Everything the machine acts on
pub struct Collaborators<K> {
    pub recorder: Arc<SessionRecorder>,
    pub sensor: Arc<dyn SensorStream>,
    pub location: Arc<dyn LocationProvider>,
    pub records: Arc<K>,
    pub notifications: Arc<dyn NotificationSink>,
}

/// Result of feeding one classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Below high confidence, disabled, not yet initialized, or no opinion
    Recorded,
    /// Timestamps updated, no transition due
    Unchanged,
    /// Recording started
    Started,
    /// Recording stopped and the session submitted
    Stopped,
    /// Start was due but a precondition failed
    Blocked(Advisory),
}

/// Counters kept by the machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionStats {
    pub classifications: u64,
    pub low_confidence: u64,
    pub started: u64,
    pub stopped: u64,
    pub blocked: u64,
    pub submit_failures: u64,
}

/// Point-in-time view of the machine
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSnapshot {
    pub state: DetectionState,
    pub enabled: bool,
    pub initialized: bool,
    pub stats: DetectionStats,
    pub recent: Vec<MotionClassification>,
}

/// Walking detection state machine
pub struct DetectionStateMachine<K> {
    state: DetectionState,
    enabled: bool,
    initialized: bool,
    recorder: Arc<SessionRecorder>,
    sensor: Arc<dyn SensorStream>,
    location: Arc<dyn LocationProvider>,
    records: Arc<K>,
    notifier: Notifier,
    history: VecDeque<MotionClassification>,
    stats: DetectionStats,
}

impl<K: RecordSink> DetectionStateMachine<K> {
    pub fn new(
        config: &DetectionConfig,
        notifications: NotificationConfig,
        collaborators: Collaborators<K>,
    ) -> Self {
        Self {
            state: DetectionState::new(config.trigger_threshold_secs, 0.0),
            enabled: config.enabled,
            initialized: false,
            recorder: collaborators.recorder,
            sensor: collaborators.sensor,
            location: collaborators.location,
            records: collaborators.records,
            notifier: Notifier::new(collaborators.notifications, notifications),
            history: VecDeque::with_capacity(HISTORY_LEN),
            stats: DetectionStats::default(),
        }
    }

    /// Start listening; later calls are ignored
    #[instrument(name = "detection_initialize", skip(self))]
    pub fn initialize(&mut self, now: f64) {
        if self.initialized {
            return;
        }
        self.state.reset(now);
        self.location.start_updating();
        self.initialized = true;
        info!(
            threshold_secs = self.state.trigger_threshold_secs,
            enabled = self.enabled,
            "Walking detection initialized"
        );
    }

    /// Set both timestamps to `now`
    pub fn reset(&mut self, now: f64) {
        self.state.reset(now);
        debug!(now, "Detection timestamps reset");
    }

    /// Pause or resume detection
    ///
    /// Re-enabling resets the timestamps so a pause does not count as dwell.
    pub fn set_enabled(&mut self, enabled: bool, now: f64) {
        if enabled && !self.enabled {
            self.state.reset(now);
        }
        self.enabled = enabled;
        info!(enabled, "Walking detection toggled");
    }

    /// Change the dwell threshold
    pub fn set_threshold(&mut self, secs: u32) {
        let secs = secs.max(1);
        info!(
            from = self.state.trigger_threshold_secs,
            to = secs,
            "Detection threshold changed"
        );
        self.state.trigger_threshold_secs = secs;
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> DetectionStats {
        self.stats
    }

    pub fn snapshot(&self) -> DetectionSnapshot {
        DetectionSnapshot {
            state: self.state,
            enabled: self.enabled,
            initialized: self.initialized,
            stats: self.stats,
            recent: self.history.iter().copied().collect(),
        }
    }

    /// Feed one motion classification
    #[instrument(
        name = "detection_classification",
        skip(self, classification),
        fields(
            walking = ?classification.walking,
            confidence = classification.confidence.as_str(),
            at = classification.observed_at
        )
    )]
    pub async fn on_classification(&mut self, classification: MotionClassification) -> Outcome {
        self.stats.classifications += 1;
        counter!(
            "walksense_detection_classifications_total",
            "confidence" => classification.confidence.as_str()
        )
        .increment(1);

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(classification);

        if !self.initialized {
            debug!("Classification before initialize, not evaluated");
            return Outcome::Recorded;
        }
        if !classification.is_decisive() {
            self.stats.low_confidence += 1;
            return Outcome::Recorded;
        }
        if !self.enabled {
            return Outcome::Recorded;
        }
        if !self.state.observe(&classification) {
            return Outcome::Recorded;
        }

        let now = classification.observed_at;
        self.state.recording = self.recorder.is_recording();

        if self.state.should_stop() {
            self.auto_stop(now).await
        } else if self.state.should_start() {
            self.auto_start(now)
        } else {
            Outcome::Unchanged
        }
    }

    /// Sensor dropped its connection
    pub fn on_sensor_disconnected(&mut self, now: f64) -> bool {
        let recording = self.recorder.is_recording();
        warn!(recording, "Sensor disconnected");
        self.notifier
            .advisory(Advisory::SensorLost { recording }, now)
    }

    fn auto_start(&mut self, now: f64) -> Outcome {
        let blocked = if !self.sensor.is_connected() {
            Some(Advisory::SensorDisconnected)
        } else if !self.location.is_permission_granted() {
            Some(Advisory::LocationUnavailable)
        } else {
            None
        };
        if let Some(advisory) = blocked {
            self.stats.blocked += 1;
            warn!(reason = ?advisory, "Cannot start session");
            self.notifier.advisory(advisory, now);
            return Outcome::Blocked(advisory);
        }

        match self.recorder.start() {
            Ok(()) | Err(RecorderError::AlreadyRecording) => {}
            Err(e) => {
                error!(error = %e, "Auto-start failed");
                return Outcome::Unchanged;
            }
        }

        info!(dwell = self.state.walking_dwell(), "Walking start detected");
        self.stats.started += 1;
        counter!("walksense_detection_transitions_total", "to" => "recording").increment(1);
        self.notifier.event(DetectionEvent::RecordingStarted);
        self.state.recording = true;
        self.state.reset(now);
        Outcome::Started
    }

    async fn auto_stop(&mut self, now: f64) -> Outcome {
        self.notifier.event(DetectionEvent::RecordingStopped);
        info!(dwell = self.state.stationary_dwell(), "Walking stopped detected");

        match self.recorder.stop() {
            Ok(()) | Err(RecorderError::NotRecording) => {}
            Err(e) => error!(error = %e, "Auto-stop failed"),
        }

        let threshold = self.state.trigger_threshold_secs;
        match self.recorder.finish(HazardReport::none(), threshold).await {
            Ok(record) => {
                if let Err(e) = self.records.submit(&record).await {
                    self.stats.submit_failures += 1;
                    error!(record_id = %record.record_id, error = %e, "Session record submit failed");
                } else {
                    debug!(
                        record_id = %record.record_id,
                        chunks = record.chunk_keys.len(),
                        "Session record submitted"
                    );
                }
            }
            Err(e) => {
                self.stats.submit_failures += 1;
                error!(error = %e, "Session finalize failed");
            }
        }

        self.stats.stopped += 1;
        counter!("walksense_detection_transitions_total", "to" => "idle").increment(1);
        self.state.recording = false;
        self.state.reset(now);
        Outcome::Stopped
    }
}
