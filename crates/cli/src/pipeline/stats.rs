//! Simulation statistics.

use std::time::Duration;

use contracts::SessionRecord;
use detection::DetectionStats;
use observability::SessionMetricsAggregator;
use reassembly::SessionSummary;
use recorder::RecorderSnapshot;
use serde::Serialize;

/// One recorded session after reassembly
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub record: SessionRecord,
    pub summary: SessionSummary,
    /// Chunks that could not be read back
    pub gaps: usize,
}

/// Statistics from a simulation run
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Scripted time covered
    pub simulated_secs: u64,

    /// Samples delivered to a subscriber
    pub samples_emitted: u64,

    pub detection: DetectionStats,

    pub recorder: RecorderSnapshot,

    /// Chunk writes that failed
    pub write_failures: u64,

    pub sessions: Vec<SessionOutcome>,

    pub session_metrics: SessionMetricsAggregator,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl SimulationStats {
    /// Simulated seconds processed per wall-clock second
    pub fn speedup(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.simulated_secs as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   Simulation Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Simulated: {}s ({:.0}x real time)", self.simulated_secs, self.speedup());
        println!("   ├─ Samples emitted: {}", self.samples_emitted);
        println!("   ├─ Samples recorded: {}", self.recorder.samples_appended);
        println!("   ├─ Chunks flushed: {}", self.recorder.chunks_flushed);
        println!("   └─ Write failures: {}", self.write_failures);

        let d = &self.detection;
        println!("\nDetection");
        println!("   ├─ Classifications: {} ({} below high confidence)", d.classifications, d.low_confidence);
        println!("   ├─ Started: {}", d.started);
        println!("   ├─ Stopped: {}", d.stopped);
        println!("   ├─ Blocked: {}", d.blocked);
        println!("   └─ Submit failures: {}", d.submit_failures);

        for (i, outcome) in self.sessions.iter().enumerate() {
            let s = &outcome.summary;
            println!("\nSession {} ({})", i + 1, outcome.record.record_id);
            println!("   ├─ Samples: {}", s.sample_count);
            println!("   ├─ Chunks: {} ({} missing)", outcome.record.chunk_keys.len(), outcome.gaps);
            println!("   ├─ Duration: {}", s.duration);
            println!("   ├─ Distance: {:.1} m ({:.0} ft)", s.distance_m, s.distance_ft);
            println!(
                "   ├─ Final location: {:.6}, {:.6}",
                s.final_location.latitude, s.final_location.longitude
            );
            println!("   └─ Path: {}", s.polyline);
        }

        println!("\n{}", self.session_metrics.summary());
    }
}
