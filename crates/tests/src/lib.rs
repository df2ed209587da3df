//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Recording through chunk flushes and back through reassembly
//! - Walking detection driving the recorder and the record sink
//! - File-backed stores and config-driven store selection

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use contracts::{
        FusedSample, Location, NotificationSink, Orientation, RawSample, RecorderConfig,
        WalkerConfig,
    };
    use rand::Rng;
    use recorder::{MockSensorStream, SessionRecorder, StaticLocationProvider};

    pub const START: Location = Location {
        latitude: 42.2808,
        longitude: -83.7430,
        altitude: 256.0,
    };

    /// Notification sink that keeps every title
    #[derive(Default)]
    pub struct Inbox(pub Mutex<Vec<String>>);

    impl NotificationSink for Inbox {
        fn notify(&self, title: &str, _body: &str) {
            self.0.lock().unwrap().push(title.to_string());
        }
    }

    pub struct Rig<S> {
        pub store: Arc<S>,
        pub sensor: Arc<MockSensorStream>,
        pub location: Arc<StaticLocationProvider>,
        pub recorder: Arc<SessionRecorder>,
    }

    pub fn rig<S>(store: S, config: RecorderConfig) -> Rig<S>
    where
        S: contracts::ChunkStore + Send + Sync + 'static,
    {
        let store = Arc::new(store);
        let sensor = Arc::new(MockSensorStream::new());
        let location = Arc::new(StaticLocationProvider::new(START));
        let recorder = Arc::new(SessionRecorder::with_store(
            config,
            sensor.clone(),
            location.clone(),
            Arc::clone(&store),
        ));
        Rig {
            store,
            sensor,
            location,
            recorder,
        }
    }

    pub fn recorder_config(flush_threshold: usize) -> RecorderConfig {
        RecorderConfig {
            flush_threshold,
            ..WalkerConfig::default().recorder
        }
    }

    /// Emit `n` samples with random rotations while the location drifts,
    /// returning the fused samples the recorder should have buffered
    pub fn walk<S>(rig: &Rig<S>, n: usize) -> Vec<FusedSample> {
        let mut rng = rand::rng();
        let mut position = START;
        let mut expected = Vec::with_capacity(n);
        for i in 0..n {
            position.latitude += rng.random_range(0.0..2e-5);
            position.longitude += rng.random_range(-2e-5..2e-5);
            position.altitude += rng.random_range(-0.5..0.5);
            rig.location.set_location(position);

            let raw = RawSample {
                orientation: Orientation::new(
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-3.0..3.0),
                ),
                timestamp: 1_700_000_000.0 + i as f64 * 0.02,
            };
            rig.sensor.emit(raw);
            expected.push(FusedSample::fuse(raw, position));
        }
        expected
    }

    /// Emit `n` samples whose timestamps continue from `seq`
    pub fn emit(sensor: &MockSensorStream, seq: &mut u64, n: u64) {
        for _ in 0..n {
            sensor.emit(RawSample {
                orientation: Orientation::new(*seq as f32, 0.0, 0.0),
                timestamp: *seq as f64 * 0.02,
            });
            *seq += 1;
        }
    }
}

#[cfg(test)]
mod recording_tests {
    use std::time::Duration;

    use chunk_store::MemoryChunkStore;
    use contracts::{CancelPolicy, ChunkStore, Location};
    use reassembly::{ChunkReassembler, SessionSummary};
    use recorder::RecorderError;

    use crate::support::{emit, recorder_config, rig, walk};

    /// 4500 samples at threshold 2000: two full chunks, 500 left buffered,
    /// three keys after finalize, the same 4500 samples back in order.
    #[tokio::test]
    async fn test_flush_and_reassemble_4500() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(2000));
        rig.recorder.start().unwrap();

        let expected = walk(&rig, 4500);

        assert_eq!(rig.recorder.metrics().snapshot().chunks_flushed, 2);
        assert_eq!(rig.recorder.buffered_samples(), 500);
        assert_eq!(rig.recorder.chunk_keys_of_current_session().len(), 2);

        let keys = rig.recorder.finalize_and_flush().await.unwrap();
        assert_eq!(keys.len(), 3);

        let sizes = rig.store.chunk_sizes();
        let ordered: Vec<usize> = keys.iter().map(|k| sizes[k]).collect();
        assert_eq!(ordered, vec![2000, 2000, 500]);

        let reassembler = ChunkReassembler::with_timeout(rig.store.clone(), Duration::from_secs(5));
        let session = reassembler.reassemble(&keys).await.unwrap();
        assert!(session.is_complete());
        assert_eq!(session.samples, expected);

        let summary = SessionSummary::from_samples(&session.samples, 50.0);
        assert_eq!(summary.sample_count, 4500);
        assert_eq!(summary.duration, "0:01:29");
    }

    #[tokio::test]
    async fn test_flush_count_matches_floor() {
        for (n, threshold) in [(0u64, 10usize), (9, 10), (10, 10), (99, 10), (1234, 100)] {
            let rig = rig(MemoryChunkStore::new("memory"), recorder_config(threshold));
            rig.recorder.start().unwrap();
            let mut seq = 0;
            emit(&rig.sensor, &mut seq, n);

            let flushed = rig.recorder.metrics().snapshot().chunks_flushed;
            assert_eq!(flushed, n / threshold as u64, "n={n} threshold={threshold}");
            assert!(rig.recorder.buffered_samples() <= threshold);

            let keys = rig.recorder.finalize_and_flush().await.unwrap();
            assert_eq!(keys.len() as u64, flushed + 1);
        }
    }

    #[tokio::test]
    async fn test_stop_and_finalize_are_idempotent() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(100));
        rig.recorder.start().unwrap();
        let mut seq = 0;
        emit(&rig.sensor, &mut seq, 250);

        rig.recorder.stop().unwrap();
        assert!(matches!(rig.recorder.stop(), Err(RecorderError::NotRecording)));

        // Samples after stop are not recorded
        emit(&rig.sensor, &mut seq, 10);
        assert_eq!(rig.recorder.buffered_samples(), 50);

        let first = rig.recorder.finalize_and_flush().await.unwrap();
        let puts = rig.store.put_count();
        let second = rig.recorder.finalize_and_flush().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(rig.store.put_count(), puts);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_policies() {
        let persist = rig(MemoryChunkStore::new("memory"), recorder_config(100));
        persist.recorder.start().unwrap();
        let mut seq = 0;
        emit(&persist.sensor, &mut seq, 130);
        let finished = persist.recorder.cancel().await.unwrap();
        assert_eq!(finished.chunk_keys.len(), 2);
        assert_eq!(persist.store.len(), 2);

        let mut config = recorder_config(100);
        config.cancel_policy = CancelPolicy::DiscardRemainder;
        let discard = rig(MemoryChunkStore::new("memory"), config);
        discard.recorder.start().unwrap();
        let mut seq = 0;
        emit(&discard.sensor, &mut seq, 130);
        let finished = discard.recorder.cancel().await.unwrap();
        assert_eq!(finished.chunk_keys.len(), 1);
        assert_eq!(discard.recorder.metrics().snapshot().samples_discarded, 30);

        // Cancel with nothing active
        assert!(matches!(
            discard.recorder.cancel().await,
            Err(RecorderError::NotRecording)
        ));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_key_and_leaves_gap() {
        let store = MemoryChunkStore::new("memory");
        store.fail_all_puts(true);
        let rig = rig(store, recorder_config(100));
        rig.recorder.start().unwrap();
        let mut seq = 0;
        emit(&rig.sensor, &mut seq, 150);

        assert!(matches!(
            rig.recorder.finalize_and_flush().await,
            Err(RecorderError::ChunkWriteFailed { .. })
        ));
        let keys = rig.recorder.chunk_keys_of_current_session();
        assert_eq!(keys.len(), 2);

        rig.store.fail_all_puts(false);
        let reassembler = ChunkReassembler::with_timeout(rig.store.clone(), Duration::from_secs(1));
        let session = reassembler.reassemble(&keys).await.unwrap();
        assert_eq!(session.gaps.len(), 2);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_last_location_follows_samples() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(100));
        rig.recorder.start().unwrap();
        let mut seq = 0;
        emit(&rig.sensor, &mut seq, 120);
        let moved = Location::new(42.3, -83.7, 250.0);
        rig.location.set_location(moved);
        emit(&rig.sensor, &mut seq, 1);

        let finished = rig.recorder.finalize_session().await.unwrap();
        assert_eq!(finished.last_location, moved);
        assert_eq!(finished.sample_count, 121);

        let last_key = finished.chunk_keys.last().unwrap();
        let last_chunk = rig.store.get_chunk(last_key).await.unwrap();
        assert_eq!(last_chunk.last().unwrap().location, moved);
    }
}

#[cfg(test)]
mod detection_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chunk_store::{MemoryChunkStore, MemoryRecordSink};
    use contracts::{
        Confidence, DetectionConfig, MotionClassification, NotificationConfig, NotificationSink,
    };
    use detection::{Advisory, Collaborators, DetectionHandle, DetectionStateMachine, Outcome};
    use reassembly::ChunkReassembler;

    use crate::support::{emit, recorder_config, rig, Inbox, Rig};

    fn machine(
        rig: &Rig<MemoryChunkStore>,
        records: Arc<MemoryRecordSink>,
        inbox: Arc<Inbox>,
    ) -> DetectionStateMachine<MemoryRecordSink> {
        let notifications: Arc<dyn NotificationSink> = inbox;
        DetectionStateMachine::new(
            &DetectionConfig {
                trigger_threshold_secs: 60,
                enabled: true,
            },
            NotificationConfig {
                detection_events: true,
                ..NotificationConfig::default()
            },
            Collaborators {
                recorder: Arc::clone(&rig.recorder),
                sensor: rig.sensor.clone(),
                location: rig.location.clone(),
                records,
                notifications,
            },
        )
    }

    /// Walk for 100 s then stand: recording starts once the walking run
    /// exceeds 60 s and stops once the stationary run exceeds 60 s.
    #[tokio::test]
    async fn test_hysteresis_walk_then_stand() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(500));
        let records = Arc::new(MemoryRecordSink::new());
        let inbox = Arc::new(Inbox::default());
        let mut machine = machine(&rig, Arc::clone(&records), Arc::clone(&inbox));
        machine.initialize(0.0);

        let mut seq = 0;
        let mut started_at = None;
        let mut stopped_at = None;
        for t in 1..=200u32 {
            let c = if t <= 100 {
                MotionClassification::walking(t as f64, Confidence::High)
            } else {
                MotionClassification::stationary(t as f64, Confidence::High)
            };
            match machine.on_classification(c).await {
                Outcome::Started => started_at = Some(t),
                Outcome::Stopped => stopped_at = Some(t),
                _ => {}
            }
            emit(&rig.sensor, &mut seq, 50);
        }

        assert_eq!(started_at, Some(61));
        assert_eq!(stopped_at, Some(161));
        assert!(!rig.recorder.is_recording());

        let submitted = records.records();
        assert_eq!(submitted.len(), 1);
        let record = &submitted[0];
        assert!(record.report.is_empty());
        assert!(!record.cancelled);
        assert_eq!(record.detection_threshold_secs, 60);

        // Seconds 61..=160 were recorded
        let reassembler = ChunkReassembler::with_timeout(rig.store.clone(), Duration::from_secs(5));
        let session = reassembler.reassemble(&record.chunk_keys).await.unwrap();
        assert_eq!(session.len(), 100 * 50);

        let titles = inbox.0.lock().unwrap().clone();
        assert_eq!(titles, vec!["Recording Started", "Recording Stopped"]);
    }

    #[tokio::test]
    async fn test_low_confidence_never_transitions() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(500));
        let records = Arc::new(MemoryRecordSink::new());
        let mut machine = machine(&rig, records, Arc::new(Inbox::default()));
        machine.initialize(0.0);

        for t in 1..=300u32 {
            let outcome = machine
                .on_classification(MotionClassification::walking(t as f64, Confidence::Medium))
                .await;
            assert_eq!(outcome, Outcome::Recorded);
        }
        assert!(!rig.recorder.is_recording());
    }

    #[tokio::test]
    async fn test_disconnected_sensor_blocks_start() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(500));
        rig.sensor.set_connected(false);
        let inbox = Arc::new(Inbox::default());
        let mut machine = machine(&rig, Arc::new(MemoryRecordSink::new()), Arc::clone(&inbox));
        machine.initialize(0.0);

        let mut blocked = Vec::new();
        for t in 1..=130u32 {
            if let Outcome::Blocked(advisory) = machine
                .on_classification(MotionClassification::walking(t as f64, Confidence::High))
                .await
            {
                blocked.push(advisory);
            }
        }

        assert!(!rig.recorder.is_recording());
        assert_eq!(blocked.first(), Some(&Advisory::SensorDisconnected));
        // Repeats within the rate-limit window are not notified again
        assert_eq!(inbox.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_drives_recorder() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(500));
        let records = Arc::new(MemoryRecordSink::new());
        let machine = machine(&rig, Arc::clone(&records), Arc::new(Inbox::default()));
        let mut handle = DetectionHandle::spawn(machine);
        let outcomes = handle.take_outcomes().unwrap();
        handle.initialize().unwrap();
        handle.set_threshold(5).unwrap();

        let base = handle.snapshot().await.unwrap().state.last_walking_at;
        let classify = handle.classification_callback();
        for t in 1..=8 {
            classify(MotionClassification::walking(base + t as f64, Confidence::High));
        }
        handle.snapshot().await.unwrap();
        assert!(rig.recorder.is_recording());
        assert_eq!(outcomes.try_recv().unwrap(), Outcome::Started);

        for t in 9..=16 {
            classify(MotionClassification::stationary(base + t as f64, Confidence::High));
        }
        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats.started, 1);
        assert_eq!(stats.stopped, 1);
        assert_eq!(records.records().len(), 1);
    }

    #[tokio::test]
    async fn test_paused_detection_and_disconnect_alert() {
        let rig = rig(MemoryChunkStore::new("memory"), recorder_config(500));
        let inbox = Arc::new(Inbox::default());
        let machine = machine(&rig, Arc::new(MemoryRecordSink::new()), Arc::clone(&inbox));
        let handle = DetectionHandle::spawn(machine);
        handle.initialize().unwrap();
        handle.set_threshold(5).unwrap();
        handle.set_enabled(false).unwrap();

        let base = handle.snapshot().await.unwrap().state.last_walking_at;
        for t in 1..=20 {
            handle
                .submit(MotionClassification::walking(base + t as f64, Confidence::High))
                .unwrap();
        }
        let snapshot = handle.snapshot().await.unwrap();
        assert!(!snapshot.enabled);
        assert!(!rig.recorder.is_recording());

        // Two alerts inside one interval notify once
        handle.sensor_disconnected().unwrap();
        handle.sensor_disconnected().unwrap();
        handle.shutdown().await.unwrap();

        let titles = inbox.0.lock().unwrap().clone();
        assert_eq!(titles, vec!["Sensor Disconnected"]);
    }
}

#[cfg(test)]
mod store_tests {
    use std::time::Duration;

    use chunk_store::{ConfiguredStore, FileChunkStore, FileRecordSink};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{HazardCategory, HazardIntensity, HazardReport, RecordSink, StoreKind};
    use reassembly::ChunkReassembler;

    use crate::support::{emit, recorder_config, rig, walk, START};

    #[tokio::test]
    async fn test_file_store_reproduces_samples_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let rig = rig(
            FileChunkStore::new("file", dir.path()).unwrap(),
            recorder_config(700),
        );
        rig.recorder.start().unwrap();
        let expected = walk(&rig, 2000);
        let keys = rig.recorder.finalize_and_flush().await.unwrap();
        assert_eq!(keys.len(), 3);

        let reopened = std::sync::Arc::new(FileChunkStore::new("file", dir.path()).unwrap());
        let session = ChunkReassembler::with_timeout(reopened, Duration::from_secs(5))
            .reassemble(&keys)
            .await
            .unwrap();
        assert!(session.is_complete());
        assert_eq!(session.samples, expected);
    }

    #[test]
    fn test_demo_config_loads() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/walksense.toml");
        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.store.kind, StoreKind::File);
        assert_eq!(config.recorder.flush_threshold, 2000);
        assert!(config.notifications.detection_events);
    }

    #[tokio::test]
    async fn test_file_store_round_trip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let rig = rig(
            FileChunkStore::new("file", dir.path().join("chunks")).unwrap(),
            recorder_config(300),
        );
        rig.recorder.start().unwrap();
        let mut seq = 0;
        emit(&rig.sensor, &mut seq, 1000);

        let report = HazardReport::none().with(HazardCategory::UnevenSurface, HazardIntensity::Medium);
        let record = rig.recorder.finish(report, 60).await.unwrap();
        assert_eq!(record.chunk_keys.len(), 4);
        assert_eq!(record.start_location, START);

        let sink = FileRecordSink::new(dir.path().join("records")).unwrap();
        sink.submit(&record).await.unwrap();

        // A fresh store instance over the same directory
        let reopened = FileChunkStore::new("file", dir.path().join("chunks")).unwrap();
        let mut listed = reopened.list_keys().unwrap();
        let mut expected = record.chunk_keys.clone();
        listed.sort();
        expected.sort();
        assert_eq!(listed, expected);

        let reassembler = ChunkReassembler::with_timeout(std::sync::Arc::new(reopened), Duration::from_secs(5));
        let session = reassembler.reassemble(&record.chunk_keys).await.unwrap();
        assert_eq!(session.chunk_counts, vec![300, 300, 300, 100]);
        let seqs: Vec<f32> = session.samples.iter().map(|s| s.orientation.x).collect();
        assert!(seqs.iter().enumerate().all(|(i, x)| *x == i as f32));
    }

    #[tokio::test]
    async fn test_config_selects_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            "[recorder]\nflush_threshold = 100\n\n[store]\nkind = \"file\"\nbase_path = \"{}\"\n",
            dir.path().join("chunks").display()
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.store.kind, StoreKind::File);

        let store = ConfiguredStore::open(&config.store).unwrap();
        let rig = rig(store, config.recorder.clone());
        rig.recorder.start().unwrap();
        let mut seq = 0;
        emit(&rig.sensor, &mut seq, 250);
        let keys = rig.recorder.finalize_and_flush().await.unwrap();

        let reassembler = ChunkReassembler::new(rig.store.clone(), &config.reassembly);
        let session = reassembler.reassemble(&keys).await.unwrap();
        assert_eq!(session.len(), 250);
        assert!(dir.path().join("chunks").join(format!("{}.json", keys[0])).exists());
    }

    #[test]
    fn test_file_store_without_path_rejected() {
        let result = ConfigLoader::load_from_str("[store]\nkind = \"file\"\n", ConfigFormat::Toml);
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod reassembly_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chunk_store::MemoryChunkStore;
    use contracts::{FusedSample, Location, Orientation, SessionChunkKey};
    use rand::seq::SliceRandom;
    use rand::Rng;
    use reassembly::{ChunkReassembler, ReassemblyError};

    fn chunk(start: usize, len: usize) -> Vec<FusedSample> {
        (start..start + len)
            .map(|i| FusedSample {
                orientation: Orientation::default(),
                location: Location::UNKNOWN,
                captured_at: i as f64,
            })
            .collect()
    }

    /// Random completion delays must not change sample order
    #[tokio::test]
    async fn test_randomized_completion_order() {
        let mut rng = rand::rng();
        for k in [1usize, 3, 17, 50] {
            let store = MemoryChunkStore::new("memory");
            let mut keys = Vec::new();
            for c in 0..k {
                let key = SessionChunkKey::generate();
                store.insert(key.clone(), chunk(c * 10, 10));
                store.delay_get(key.clone(), Duration::from_millis(rng.random_range(0..15)));
                keys.push(key);
            }
            let reassembler = ChunkReassembler::with_timeout(Arc::new(store), Duration::from_secs(5));
            let session = reassembler.reassemble(&keys).await.unwrap();

            let times: Vec<f64> = session.samples.iter().map(|s| s.captured_at).collect();
            let expected: Vec<f64> = (0..k * 10).map(|i| i as f64).collect();
            assert_eq!(times, expected, "k={k}");
        }
    }

    #[tokio::test]
    async fn test_key_order_defines_sample_order() {
        let store = MemoryChunkStore::new("memory");
        let mut keyed: Vec<(SessionChunkKey, f64)> = (0..6)
            .map(|c| {
                let key = SessionChunkKey::generate();
                store.insert(key.clone(), chunk(c * 3, 3));
                (key, (c * 3) as f64)
            })
            .collect();
        keyed.shuffle(&mut rand::rng());
        let keys: Vec<SessionChunkKey> = keyed.iter().map(|(k, _)| k.clone()).collect();

        let reassembler = ChunkReassembler::with_timeout(Arc::new(store), Duration::from_secs(5));
        let session = reassembler.reassemble(&keys).await.unwrap();

        let firsts: Vec<f64> = session.samples.chunks(3).map(|c| c[0].captured_at).collect();
        let expected: Vec<f64> = keyed.iter().map(|(_, start)| *start).collect();
        assert_eq!(firsts, expected);
    }

    #[tokio::test]
    async fn test_hung_chunk_times_out_and_busy_rejects() {
        let store = MemoryChunkStore::new("memory");
        let a = SessionChunkKey::generate();
        let b = SessionChunkKey::generate();
        store.insert(a.clone(), chunk(0, 5));
        store.insert(b.clone(), chunk(5, 5));
        store.hang_get(b.clone());

        let reassembler = Arc::new(ChunkReassembler::with_timeout(
            Arc::new(store),
            Duration::from_millis(100),
        ));
        let keys = vec![a, b];

        let pending = {
            let reassembler = Arc::clone(&reassembler);
            let keys = keys.clone();
            tokio::spawn(async move { reassembler.reassemble(&keys).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(
            reassembler.reassemble(&keys).await,
            Err(ReassemblyError::ReassemblyInProgress)
        ));

        let session = pending.await.unwrap().unwrap();
        assert_eq!(session.chunk_counts, vec![5, 0]);
        assert_eq!(session.gaps.len(), 1);
        assert_eq!(session.gaps[0].index, 1);
    }
}
