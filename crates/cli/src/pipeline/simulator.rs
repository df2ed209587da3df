//! Simulation orchestrator - coordinates detection, recorder, store and reassembly.
//!
//! Time is simulated: each scripted second sends one high-confidence
//! classification, waits for the detection worker to apply it, moves the mock
//! location, then emits one second of samples. A long script runs in well
//! under a second of wall time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chunk_store::{ConfiguredStore, FileRecordSink, MemoryRecordSink};
use contracts::{
    unix_now, Confidence, HazardReport, Location, MotionClassification, NotificationSink,
    Orientation, RawSample, RecordSink, WalkerConfig,
};
use detection::{Collaborators, DetectionHandle, DetectionStateMachine, Outcome};
use observability::{record_advisory, record_buffer_depth, record_session_metrics};
use reassembly::{ChunkReassembler, SessionSummary};
use recorder::{MockSensorStream, SessionRecorder, StaticLocationProvider};
use tracing::{debug, info, instrument, warn};

use super::{LogNotificationSink, SessionOutcome, SimulationStats};
use crate::error::CliError;

/// Metres per degree of latitude
const METRES_PER_DEGREE: f64 = 111_320.0;

/// What the classifier reports during a script step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Walking,
    Stationary,
}

/// One step of the scripted walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStep {
    pub activity: Activity,
    pub secs: u64,
}

/// Stand, walk, stand
pub fn standard_script(idle_before: u64, walk: u64, idle_after: u64) -> Vec<ScriptStep> {
    [
        (Activity::Stationary, idle_before),
        (Activity::Walking, walk),
        (Activity::Stationary, idle_after),
    ]
    .into_iter()
    .filter(|(_, secs)| *secs > 0)
    .map(|(activity, secs)| ScriptStep { activity, secs })
    .collect()
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub walker: WalkerConfig,

    pub script: Vec<ScriptStep>,

    pub start_location: Location,

    /// Walking speed (metres per second)
    pub speed_mps: f64,

    /// Location permission reported by the mock provider
    pub location_permission: bool,

    /// Also write finished records to this directory
    pub record_dir: Option<PathBuf>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Scripted end-to-end run
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Run the script to completion, then reassemble every recorded session
    #[instrument(name = "simulation_run", skip(self), fields(steps = self.config.script.len()))]
    pub async fn run(self) -> Result<SimulationStats> {
        let wall_start = Instant::now();
        let walker = &self.config.walker;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let store = Arc::new(ConfiguredStore::open(&walker.store).context("Failed to open chunk store")?);
        let sensor = Arc::new(MockSensorStream::new());
        let location = Arc::new(StaticLocationProvider::new(self.config.start_location));
        location.set_permission(self.config.location_permission);

        let recorder = Arc::new(SessionRecorder::with_store(
            walker.recorder.clone(),
            sensor.clone(),
            location.clone(),
            Arc::clone(&store),
        ));
        let records = Arc::new(MemoryRecordSink::new());
        let notifications: Arc<dyn NotificationSink> = Arc::new(LogNotificationSink);

        let machine = DetectionStateMachine::new(
            &walker.detection,
            walker.notifications.clone(),
            Collaborators {
                recorder: Arc::clone(&recorder),
                sensor: sensor.clone(),
                location: location.clone(),
                records: Arc::clone(&records),
                notifications,
            },
        );
        let mut detection = DetectionHandle::spawn(machine);
        let outcomes = detection
            .take_outcomes()
            .ok_or_else(|| CliError::simulation("detection outcomes already taken"))?;
        detection.initialize()?;

        info!(
            store = %store_name(&store),
            threshold_secs = walker.detection.trigger_threshold_secs,
            flush_threshold = walker.recorder.flush_threshold,
            "Simulation components ready"
        );

        let rate = walker.recorder.sample_rate_hz.round().max(1.0) as u64;
        let step_deg = self.config.speed_mps / METRES_PER_DEGREE;
        let mut position = self.config.start_location;
        let mut elapsed = 0u64;
        let base = unix_now();

        for step in &self.config.script {
            debug!(activity = ?step.activity, secs = step.secs, "Script step");
            for _ in 0..step.secs {
                let now = base + elapsed as f64;
                let classification = match step.activity {
                    Activity::Walking => MotionClassification::walking(now, Confidence::High),
                    Activity::Stationary => MotionClassification::stationary(now, Confidence::High),
                };
                detection.submit(classification)?;
                // Barrier: the transition (if any) is applied before samples flow
                detection.snapshot().await?;

                while let Ok(outcome) = outcomes.try_recv() {
                    log_outcome(outcome, elapsed);
                }

                if step.activity == Activity::Walking {
                    position.latitude += step_deg;
                    location.set_location(position);
                }

                for i in 0..rate {
                    let t = now + i as f64 / rate as f64;
                    sensor.emit(RawSample {
                        orientation: Orientation::new(
                            (t * 2.0).sin() as f32,
                            (t * 3.0).cos() as f32,
                            (t * 0.5).sin() as f32,
                        ),
                        timestamp: t,
                    });
                }
                record_buffer_depth(recorder.buffered_samples());
                elapsed += 1;
            }
        }

        if recorder.is_recording() {
            warn!("Script ended while recording, finishing the open session");
            let record = recorder
                .finish(HazardReport::none(), walker.detection.trigger_threshold_secs)
                .await
                .map_err(|e| CliError::simulation(e.to_string()))?;
            records.submit(&record).await?;
        }

        let detection_stats = detection.shutdown().await?;
        while let Ok(outcome) = outcomes.try_recv() {
            log_outcome(outcome, elapsed);
        }

        let mut stats = SimulationStats {
            simulated_secs: elapsed,
            samples_emitted: sensor.emitted(),
            detection: detection_stats,
            recorder: recorder.metrics().snapshot(),
            write_failures: recorder.writer().metrics().failure_count(),
            ..Default::default()
        };

        let record_sink = match &self.config.record_dir {
            Some(dir) => Some(FileRecordSink::new(dir).context("Failed to create record directory")?),
            None => None,
        };

        let reassembler = ChunkReassembler::new(Arc::clone(&store), &walker.reassembly);
        for record in records.records() {
            let session = reassembler
                .reassemble(&record.chunk_keys)
                .await
                .map_err(|e| CliError::simulation(e.to_string()))?;
            let summary = SessionSummary::from_samples(&session.samples, walker.recorder.sample_rate_hz);

            record_session_metrics(&record);
            stats.session_metrics.update(&record);
            if let Some(sink) = &record_sink {
                sink.submit(&record).await?;
            }

            info!(
                record_id = %record.record_id,
                samples = summary.sample_count,
                chunks = record.chunk_keys.len(),
                gaps = session.gaps.len(),
                "Session reassembled"
            );
            stats.sessions.push(SessionOutcome {
                record,
                summary,
                gaps: session.gaps.len(),
            });
        }

        stats.duration = wall_start.elapsed();
        Ok(stats)
    }
}

fn store_name(store: &ConfiguredStore) -> &str {
    use contracts::ChunkStore;
    store.name()
}

fn log_outcome(outcome: Outcome, at_secs: u64) {
    match outcome {
        Outcome::Started => info!(at_secs, "Detection started recording"),
        Outcome::Stopped => info!(at_secs, "Detection stopped recording"),
        Outcome::Blocked(advisory) => {
            record_advisory(advisory.rate_limit_id());
            warn!(at_secs, ?advisory, "Detection could not start recording");
        }
        Outcome::Recorded | Outcome::Unchanged => {}
    }
}
