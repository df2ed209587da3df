//! DetectionHandle - runs the state machine on its own worker task
//!
//! The motion classifier and the UI deliver events from arbitrary contexts;
//! the worker applies them one at a time so detection state is never touched
//! concurrently.
//!
//! Control commands carry the time they were issued. The plain methods stamp
//! them with [`unix_now`]; a classifier reporting `observed_at` on another
//! clock must use the `*_at` variants with that clock.

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use contracts::{MotionClassification, RecordSink, unix_now};

use crate::error::{DetectionError, Result};
use crate::machine::{DetectionSnapshot, DetectionStateMachine, DetectionStats, Outcome};

/// Transition outcomes kept for a receiver before new ones are dropped
pub const OUTCOME_CAPACITY: usize = 64;

/// Commands accepted by the detection worker
///
/// Timestamps are on the same clock as classification `observed_at`.
pub enum DetectionCommand {
    Classification(MotionClassification),
    Initialize { now: f64 },
    Reset { now: f64 },
    SetEnabled { enabled: bool, now: f64 },
    SetThreshold(u32),
    SensorDisconnected { now: f64 },
    Snapshot(oneshot::Sender<DetectionSnapshot>),
}

/// Callback handed to a motion classifier
pub type ClassificationCallback = Arc<dyn Fn(MotionClassification) + Send + Sync>;

/// Handle to a running detection worker
pub struct DetectionHandle {
    tx: Sender<DetectionCommand>,
    outcomes: Option<Receiver<Outcome>>,
    worker_handle: JoinHandle<DetectionStats>,
}

impl DetectionHandle {
    /// Spawn the worker task that owns `machine`
    pub fn spawn<K>(machine: DetectionStateMachine<K>) -> Self
    where
        K: RecordSink + Send + Sync + 'static,
    {
        let (tx, rx) = async_channel::unbounded();
        let (outcome_tx, outcome_rx) = async_channel::bounded(OUTCOME_CAPACITY);

        let worker_handle = tokio::spawn(detection_worker(machine, rx, outcome_tx));

        Self {
            tx,
            outcomes: Some(outcome_rx),
            worker_handle,
        }
    }

    /// Take the stream of transition outcomes (once)
    ///
    /// Only `Started`, `Stopped` and `Blocked` outcomes are published. At most
    /// [`OUTCOME_CAPACITY`] unread outcomes are kept; later ones are dropped.
    pub fn take_outcomes(&mut self) -> Option<Receiver<Outcome>> {
        self.outcomes.take()
    }

    /// Non-blocking enqueue of a classification
    pub fn submit(&self, classification: MotionClassification) -> Result<()> {
        self.send_now(DetectionCommand::Classification(classification))
    }

    /// Callback that feeds classifications into this worker
    pub fn classification_callback(&self) -> ClassificationCallback {
        let tx = self.tx.clone();
        Arc::new(move |classification| {
            if tx
                .try_send(DetectionCommand::Classification(classification))
                .is_err()
            {
                warn!("Detection worker closed, classification dropped");
            }
        })
    }

    pub fn initialize(&self) -> Result<()> {
        self.initialize_at(unix_now())
    }

    pub fn initialize_at(&self, now: f64) -> Result<()> {
        self.send_now(DetectionCommand::Initialize { now })
    }

    pub fn reset(&self) -> Result<()> {
        self.reset_at(unix_now())
    }

    pub fn reset_at(&self, now: f64) -> Result<()> {
        self.send_now(DetectionCommand::Reset { now })
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.set_enabled_at(enabled, unix_now())
    }

    pub fn set_enabled_at(&self, enabled: bool, now: f64) -> Result<()> {
        self.send_now(DetectionCommand::SetEnabled { enabled, now })
    }

    pub fn set_threshold(&self, secs: u32) -> Result<()> {
        self.send_now(DetectionCommand::SetThreshold(secs))
    }

    pub fn sensor_disconnected(&self) -> Result<()> {
        self.sensor_disconnected_at(unix_now())
    }

    pub fn sensor_disconnected_at(&self, now: f64) -> Result<()> {
        self.send_now(DetectionCommand::SensorDisconnected { now })
    }

    /// State after every previously queued command has been applied
    pub async fn snapshot(&self) -> Result<DetectionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(DetectionCommand::Snapshot(reply_tx))
            .await
            .map_err(|_| DetectionError::WorkerClosed)?;
        reply_rx.await.map_err(|_| DetectionError::WorkerClosed)
    }

    /// Drain pending commands and stop the worker
    #[instrument(name = "detection_handle_shutdown", skip(self))]
    pub async fn shutdown(self) -> Result<DetectionStats> {
        self.tx.close();
        match self.worker_handle.await {
            Ok(stats) => {
                debug!(?stats, "DetectionHandle shutdown complete");
                Ok(stats)
            }
            Err(e) => {
                error!(error = ?e, "Detection worker panicked");
                Err(DetectionError::WorkerClosed)
            }
        }
    }

    fn send_now(&self, command: DetectionCommand) -> Result<()> {
        self.tx
            .try_send(command)
            .map_err(|_| DetectionError::WorkerClosed)
    }
}

#[instrument(name = "detection_worker_loop", skip_all)]
async fn detection_worker<K: RecordSink>(
    mut machine: DetectionStateMachine<K>,
    rx: Receiver<DetectionCommand>,
    outcomes: Sender<Outcome>,
) -> DetectionStats {
    debug!("Detection worker started");

    while let Ok(command) = rx.recv().await {
        match command {
            DetectionCommand::Classification(classification) => {
                let outcome = machine.on_classification(classification).await;
                if matches!(
                    outcome,
                    Outcome::Started | Outcome::Stopped | Outcome::Blocked(_)
                ) {
                    // Nobody listening, or nobody reading, is fine
                    if outcomes.try_send(outcome).is_err() {
                        trace!(?outcome, "Outcome dropped, receiver full or gone");
                    }
                }
            }
            DetectionCommand::Initialize { now } => machine.initialize(now),
            DetectionCommand::Reset { now } => machine.reset(now),
            DetectionCommand::SetEnabled { enabled, now } => machine.set_enabled(enabled, now),
            DetectionCommand::SetThreshold(secs) => machine.set_threshold(secs),
            DetectionCommand::SensorDisconnected { now } => {
                machine.on_sensor_disconnected(now);
            }
            DetectionCommand::Snapshot(reply) => {
                let _ = reply.send(machine.snapshot());
            }
        }
    }

    debug!(stats = ?machine.stats(), "Detection worker stopped");
    machine.stats()
}
