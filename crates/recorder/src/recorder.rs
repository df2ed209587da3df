//! SessionRecorder - walking session lifecycle over the sensor stream
//!
//! The sensor callback, `start`/`stop` and the finalize path all go through a
//! single state mutex. The mutex is never held across an await; the final
//! chunk is sealed under the lock and written after it is released.
//!
//! `start` and `stop` additionally hold a lifecycle mutex for their whole
//! duration, so sensor subscription and location updates always match the
//! phase they were issued for.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use metrics::counter;
use tracing::{debug, error, info, instrument, trace, warn};

use contracts::{
    CancelPolicy, ChunkStore, FusedSample, HazardReport, Location, LocationProvider, RawSample,
    RawSampleCallback, RecorderConfig, SensorStream, SessionChunkKey, SessionRecord,
    WalkingSession, record_id_for, unix_now,
};

use crate::error::{RecorderError, Result};
use crate::metrics::RecorderMetrics;
use crate::persistor::ChunkPersistor;
use crate::writer::{ChunkWriteFailure, ChunkWriter};

/// Recorder lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderPhase {
    Idle,
    Active,
}

/// Observer of phase changes, invoked outside the recorder's lock
pub type PhaseListener = Arc<dyn Fn(RecorderPhase) + Send + Sync>;

/// A session whose remainder has been flushed
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSession {
    pub started_at: f64,
    pub ended_at: f64,
    pub start_location: Location,
    /// Location of the last appended sample
    pub last_location: Location,
    pub chunk_keys: Vec<SessionChunkKey>,
    /// Samples appended over the whole session
    pub sample_count: u64,
}

impl FinishedSession {
    /// Build the record handed to a record sink
    pub fn into_record(
        self,
        report: HazardReport,
        detection_threshold_secs: u32,
        cancelled: bool,
    ) -> SessionRecord {
        SessionRecord {
            record_id: record_id_for(self.ended_at),
            started_at: self.started_at,
            ended_at: self.ended_at,
            start_location: self.start_location,
            last_location: self.last_location,
            chunk_keys: self.chunk_keys,
            report,
            detection_threshold_secs,
            cancelled,
        }
    }
}

struct RecorderState {
    phase: RecorderPhase,
    session: Option<WalkingSession>,
    persistor: ChunkPersistor,
    last_location: Location,
    sample_count: u64,
    ended_at: Option<f64>,
    /// Remainder already flushed (or discarded) for the current session
    finalized: bool,
    /// Flushes that could not be queued
    pending_failures: Vec<ChunkWriteFailure>,
}

impl RecorderState {
    fn finished(&self) -> Option<FinishedSession> {
        let session = self.session.as_ref()?;
        Some(FinishedSession {
            started_at: session.started_at,
            ended_at: self.ended_at.unwrap_or_else(unix_now),
            start_location: session.start_location,
            last_location: self.last_location,
            chunk_keys: session.chunk_keys.clone(),
            sample_count: self.sample_count,
        })
    }
}

/// State reachable from the sensor callback
struct RecorderShared {
    state: Mutex<RecorderState>,
    location: Arc<dyn LocationProvider>,
    metrics: Arc<RecorderMetrics>,
}

impl RecorderShared {
    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_sample(&self, raw: RawSample) {
        let location = self.location.current_location();

        let mut guard = self.lock();
        let state = &mut *guard;
        if state.phase != RecorderPhase::Active {
            self.metrics.record_ignored();
            trace!(timestamp = raw.timestamp, "Sample ignored while idle");
            return;
        }
        let Some(session) = state.session.as_mut() else {
            return;
        };

        let sample = FusedSample::fuse(raw, location);
        state.last_location = location;
        state.sample_count += 1;

        match state.persistor.append(sample, &mut session.chunk_keys) {
            Ok(Some(key)) => {
                self.metrics.record_flush();
                debug!(
                    key = %key,
                    chunk_index = session.chunk_keys.len() - 1,
                    "Chunk handed to writer"
                );
            }
            Ok(None) => {}
            Err(RecorderError::ChunkWriteFailed { key, message }) => {
                self.metrics.record_flush();
                error!(key = %key, error = %message, "Chunk could not be queued");
                state
                    .pending_failures
                    .push(ChunkWriteFailure { key, message });
            }
            Err(e) => error!(error = %e, "Flush failed"),
        }

        self.metrics.record_appended();
        counter!("walksense_samples_appended_total").increment(1);
    }
}

/// Walking session recorder
///
/// Idle until `start()`; while Active every sensor sample is fused with the
/// current location and buffered, and full buffers are flushed as chunks.
pub struct SessionRecorder {
    shared: Arc<RecorderShared>,
    sensor: Arc<dyn SensorStream>,
    writer: Arc<ChunkWriter>,
    config: RecorderConfig,
    listeners: Mutex<Vec<PhaseListener>>,
    lifecycle: Mutex<()>,
}

impl SessionRecorder {
    /// Create a recorder over an existing writer
    pub fn new(
        config: RecorderConfig,
        sensor: Arc<dyn SensorStream>,
        location: Arc<dyn LocationProvider>,
        writer: Arc<ChunkWriter>,
    ) -> Self {
        let state = RecorderState {
            phase: RecorderPhase::Idle,
            session: None,
            persistor: ChunkPersistor::new(config.flush_threshold, Arc::clone(&writer)),
            last_location: Location::UNKNOWN,
            sample_count: 0,
            ended_at: None,
            finalized: false,
            pending_failures: Vec::new(),
        };

        Self {
            shared: Arc::new(RecorderShared {
                state: Mutex::new(state),
                location,
                metrics: Arc::new(RecorderMetrics::new()),
            }),
            sensor,
            writer,
            config,
            listeners: Mutex::new(Vec::new()),
            lifecycle: Mutex::new(()),
        }
    }

    /// Create a recorder and spawn a writer for `store`
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_store<S>(
        config: RecorderConfig,
        sensor: Arc<dyn SensorStream>,
        location: Arc<dyn LocationProvider>,
        store: Arc<S>,
    ) -> Self
    where
        S: ChunkStore + Send + Sync + 'static,
    {
        let writer = Arc::new(ChunkWriter::spawn(
            store,
            Duration::from_millis(config.write_timeout_ms),
        ));
        Self::new(config, sensor, location, writer)
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<RecorderMetrics> {
        &self.shared.metrics
    }

    pub fn writer(&self) -> &Arc<ChunkWriter> {
        &self.writer
    }

    /// Register a phase-change observer
    pub fn on_phase_change(&self, listener: PhaseListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Begin a new session
    ///
    /// Unflushed samples left by a previous, never-finalized session are dropped.
    #[instrument(name = "recorder_start", skip(self))]
    pub fn start(&self) -> Result<()> {
        let lifecycle = self.lifecycle();
        let started_at = {
            let mut state = self.shared.lock();
            if state.phase == RecorderPhase::Active {
                warn!("start() while already recording");
                return Err(RecorderError::AlreadyRecording);
            }

            let dropped = state.persistor.discard();
            if dropped > 0 {
                warn!(dropped, "Dropping unflushed samples of previous session");
                self.shared.metrics.record_discarded(dropped);
            }

            self.shared.location.start_updating();
            let started_at = unix_now();
            let start_location = self.shared.location.current_location();

            state.session = Some(WalkingSession::begin(started_at, start_location));
            state.phase = RecorderPhase::Active;
            state.last_location = Location::UNKNOWN;
            state.sample_count = 0;
            state.ended_at = None;
            state.finalized = false;
            state.pending_failures.clear();
            started_at
        };

        let shared = Arc::clone(&self.shared);
        let callback: RawSampleCallback = Arc::new(move |raw| shared.on_sample(raw));
        self.sensor.subscribe(callback);
        drop(lifecycle);

        self.shared.metrics.record_session_started();
        info!(started_at, "Recording started");
        self.notify(RecorderPhase::Active);
        Ok(())
    }

    /// Feed one raw sample (no-op while idle)
    pub fn on_sample(&self, raw: RawSample) {
        self.shared.on_sample(raw);
    }

    /// Stop feeding the session; buffered samples are kept until finalized
    #[instrument(name = "recorder_stop", skip(self))]
    pub fn stop(&self) -> Result<()> {
        let lifecycle = self.lifecycle();
        {
            let mut state = self.shared.lock();
            if state.phase != RecorderPhase::Active {
                return Err(RecorderError::NotRecording);
            }
            state.phase = RecorderPhase::Idle;
            state.ended_at = Some(unix_now());
            if let Some(session) = state.session.as_mut() {
                session.active = false;
            }
        }

        self.sensor.unsubscribe();
        self.shared.location.stop_updating();
        drop(lifecycle);

        info!("Recording stopped");
        self.notify(RecorderPhase::Idle);
        Ok(())
    }

    /// Stop and dispose of the remainder according to the cancel policy
    ///
    /// A second cancel (or a cancel after `stop()`) reports `NotRecording`
    /// without flushing again.
    #[instrument(name = "recorder_cancel", skip(self), fields(policy = ?self.config.cancel_policy))]
    pub async fn cancel(&self) -> Result<FinishedSession> {
        self.stop()?;

        match self.config.cancel_policy {
            CancelPolicy::PersistRemainder => self.finalize_session().await,
            CancelPolicy::DiscardRemainder => {
                let mut state = self.shared.lock();
                let dropped = state.persistor.discard();
                self.shared.metrics.record_discarded(dropped);
                state.finalized = true;
                info!(dropped, "Cancelled session remainder discarded");
                state.finished().ok_or(RecorderError::NotRecording)
            }
        }
    }

    /// Flush the remainder as the final chunk and return the full key list
    pub async fn finalize_and_flush(&self) -> Result<Vec<SessionChunkKey>> {
        Ok(self.finalize_session().await?.chunk_keys)
    }

    /// Finalize and build the session record carrying `report`
    pub async fn finish(
        &self,
        report: HazardReport,
        detection_threshold_secs: u32,
    ) -> Result<SessionRecord> {
        let finished = self.finalize_session().await?;
        Ok(finished.into_record(report, detection_threshold_secs, false))
    }

    /// Finalize the current session
    ///
    /// Stops an active session first. A session that was already finalized is
    /// returned as-is without writing. Any chunk of the session that failed to
    /// persist is reported as `ChunkWriteFailed`; its key stays in the list.
    #[instrument(name = "recorder_finalize", skip(self))]
    pub async fn finalize_session(&self) -> Result<FinishedSession> {
        if self.is_recording() {
            match self.stop() {
                Ok(()) | Err(RecorderError::NotRecording) => {}
                Err(e) => return Err(e),
            }
        }

        let (sealed, finished, mut failures) = {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            if state.phase == RecorderPhase::Active {
                // A new session started between stop() and here
                return Err(RecorderError::AlreadyRecording);
            }
            if state.finalized {
                return state.finished().ok_or(RecorderError::NotRecording);
            }
            let Some(session) = state.session.as_mut() else {
                return Err(RecorderError::NotRecording);
            };

            let sealed = state.persistor.seal_final(&mut session.chunk_keys);
            state.finalized = true;
            self.shared.metrics.record_flush();
            let failures = std::mem::take(&mut state.pending_failures);
            let finished = state.finished().ok_or(RecorderError::NotRecording)?;
            (sealed, finished, failures)
        };

        debug!(
            key = %sealed.key,
            samples = sealed.samples.len(),
            chunks = finished.chunk_keys.len(),
            "Writing final chunk"
        );
        self.writer.write(sealed.key, sealed.samples).await?;
        failures.extend(self.writer.take_failures().await?);

        // The writer is shared across sessions; failures of earlier sessions'
        // chunks are not this session's to report
        let (own, stale): (Vec<_>, Vec<_>) = failures
            .into_iter()
            .partition(|f| finished.chunk_keys.contains(&f.key));
        for failure in &stale {
            warn!(key = %failure.key, error = %failure.message, "Write failure from an earlier session");
        }
        let failures = own;

        if let Some(first) = failures.first() {
            error!(failed = failures.len(), key = %first.key, "Session has unpersisted chunks");
            return Err(first.clone().into());
        }

        info!(
            chunks = finished.chunk_keys.len(),
            samples = finished.sample_count,
            "Session finalized"
        );
        Ok(finished)
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().phase == RecorderPhase::Active
    }

    pub fn phase(&self) -> RecorderPhase {
        self.shared.lock().phase
    }

    /// Chunk keys of the current (or last) session, in flush order
    pub fn chunk_keys_of_current_session(&self) -> Vec<SessionChunkKey> {
        self.shared
            .lock()
            .session
            .as_ref()
            .map(|s| s.chunk_keys.clone())
            .unwrap_or_default()
    }

    pub fn current_session(&self) -> Option<WalkingSession> {
        self.shared.lock().session.clone()
    }

    /// Samples buffered but not yet flushed
    pub fn buffered_samples(&self) -> usize {
        self.shared.lock().persistor.buffered()
    }

    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, phase: RecorderPhase) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(phase);
        }
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        if self.sensor.is_subscribed() {
            self.sensor.unsubscribe();
        }
    }
}
