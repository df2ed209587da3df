//! Best-effort user notices: detection events and rate-limited advisories

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{NotificationConfig, NotificationSink};
use tracing::{debug, trace};

/// Precondition failures and sensor alerts surfaced to the user
///
/// These never propagate as errors; detection runs unattended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Walking detected but the IMU is not connected
    SensorDisconnected,
    /// Walking detected but location permission is missing
    LocationUnavailable,
    /// The IMU dropped its connection
    SensorLost { recording: bool },
}

impl Advisory {
    /// Rate-limiter key
    pub fn rate_limit_id(&self) -> &'static str {
        match self {
            Advisory::SensorDisconnected => "cannotStartSessionSensorDisconnected",
            Advisory::LocationUnavailable => "cannotStartSessionLocationDisabled",
            Advisory::SensorLost { .. } => "sensorDisconnectAlert",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Advisory::SensorDisconnected | Advisory::LocationUnavailable => {
                "Cannot Start Recording"
            }
            Advisory::SensorLost { .. } => "Sensor Disconnected",
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            Advisory::SensorDisconnected => {
                "Walking detected, but the sensor isn't connected. \
                 Please connect to an IMU sensor on the app."
            }
            Advisory::LocationUnavailable => {
                "Walking detected, but location services are disabled. \
                 Please enable location services to record your walking sessions."
            }
            Advisory::SensorLost { recording: true } => {
                "Ongoing walking session temporarily suspended. \
                 Please reconnect to your IMU sensor on the app."
            }
            Advisory::SensorLost { recording: false } => {
                "Walking detection is not available while disconnected. \
                 Please reconnect to your IMU sensor on the app."
            }
        }
    }
}

/// Detection state change announced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionEvent {
    RecordingStarted,
    RecordingStopped,
}

impl DetectionEvent {
    pub fn title(&self) -> &'static str {
        match self {
            DetectionEvent::RecordingStarted => "Recording Started",
            DetectionEvent::RecordingStopped => "Recording Stopped",
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            DetectionEvent::RecordingStarted => "Walking detected, starting recording.",
            DetectionEvent::RecordingStopped => "Walking stopped detected, stopping recording.",
        }
    }
}

/// Per-id minimum re-fire interval
#[derive(Debug, Default)]
pub struct RateLimiter {
    last_sent: HashMap<&'static str, f64>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` may fire at `now`; records the firing if so
    pub fn try_acquire(&mut self, id: &'static str, interval_secs: u64, now: f64) -> bool {
        if let Some(&last) = self.last_sent.get(id) {
            if last + interval_secs as f64 >= now {
                return false;
            }
        }
        self.last_sent.insert(id, now);
        true
    }
}

/// Routes notices to the notification sink according to user preferences
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    prefs: NotificationConfig,
    limiter: RateLimiter,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, prefs: NotificationConfig) -> Self {
        Self {
            sink,
            prefs,
            limiter: RateLimiter::new(),
        }
    }

    pub fn prefs(&self) -> &NotificationConfig {
        &self.prefs
    }

    /// Announce a start/stop; returns whether it was delivered
    pub fn event(&self, event: DetectionEvent) -> bool {
        if !self.prefs.detection_events {
            trace!(?event, "Detection notifications disabled");
            return false;
        }
        self.sink.notify(event.title(), event.body());
        true
    }

    /// Surface an advisory subject to preferences and rate limiting
    pub fn advisory(&mut self, advisory: Advisory, now: f64) -> bool {
        if !self.prefs.errors {
            trace!(?advisory, "Error notifications disabled");
            return false;
        }

        let interval = match advisory {
            Advisory::SensorLost { .. } => self.prefs.disconnect_rate_limit_secs,
            _ => self.prefs.advisory_rate_limit_secs,
        };
        if !self.limiter.try_acquire(advisory.rate_limit_id(), interval, now) {
            debug!(id = advisory.rate_limit_id(), "Advisory rate limited");
            return false;
        }

        self.sink.notify(advisory.title(), advisory.body());
        true
    }
}
