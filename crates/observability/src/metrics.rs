//! Session metrics
//!
//! Prometheus helpers for finished sessions and advisories, plus an in-memory
//! aggregator for run summaries.

use std::collections::BTreeMap;

use contracts::{HazardIntensity, SessionRecord};
use metrics::{counter, gauge, histogram};

/// Record metrics for a finished session
///
/// Call once per record handed to the record sink.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_session_metrics;
///
/// let record = recorder.finish(report, threshold).await?;
/// record_session_metrics(&record);
/// sink.submit(&record).await?;
/// ```
pub fn record_session_metrics(record: &SessionRecord) {
    let outcome = if record.cancelled { "cancelled" } else { "reported" };
    counter!("walksense_sessions_total", "outcome" => outcome).increment(1);

    histogram!("walksense_session_duration_secs").record(session_duration(record));
    histogram!("walksense_session_chunks").record(record.chunk_keys.len() as f64);

    for (category, intensity) in &record.report.hazards {
        if *intensity != HazardIntensity::None {
            counter!(
                "walksense_hazards_reported_total",
                "category" => category.label()
            )
            .increment(1);
        }
    }
}

/// Record an advisory shown to the user
pub fn record_advisory(rate_limit_id: &str) {
    counter!(
        "walksense_advisories_total",
        "id" => rate_limit_id.to_string()
    )
    .increment(1);
}

/// Record the recorder's current buffer depth
pub fn record_buffer_depth(depth: usize) {
    gauge!("walksense_buffer_depth").set(depth as f64);
}

fn session_duration(record: &SessionRecord) -> f64 {
    (record.ended_at - record.started_at).max(0.0)
}

/// Aggregates finished sessions in memory
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    pub total_sessions: u64,

    pub cancelled_sessions: u64,

    /// Sessions whose report has at least one hazard
    pub sessions_with_hazards: u64,

    pub total_chunks: u64,

    /// Session duration (seconds)
    pub duration_stats: RunningStats,

    /// Chunks per session
    pub chunk_stats: RunningStats,

    /// Reports per hazard label
    pub hazard_counts: BTreeMap<String, u64>,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &SessionRecord) {
        self.total_sessions += 1;
        if record.cancelled {
            self.cancelled_sessions += 1;
        }
        if !record.report.is_empty() {
            self.sessions_with_hazards += 1;
        }
        self.total_chunks += record.chunk_keys.len() as u64;

        self.duration_stats.push(session_duration(record));
        self.chunk_stats.push(record.chunk_keys.len() as f64);

        for (category, intensity) in &record.report.hazards {
            if *intensity != HazardIntensity::None {
                *self
                    .hazard_counts
                    .entry(category.label().to_string())
                    .or_insert(0) += 1;
            }
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_sessions: self.total_sessions,
            cancelled_sessions: self.cancelled_sessions,
            sessions_with_hazards: self.sessions_with_hazards,
            total_chunks: self.total_chunks,
            cancel_rate: if self.total_sessions > 0 {
                self.cancelled_sessions as f64 / self.total_sessions as f64 * 100.0
            } else {
                0.0
            },
            duration_secs: StatsSummary::from(&self.duration_stats),
            chunks_per_session: StatsSummary::from(&self.chunk_stats),
            hazard_counts: self.hazard_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated session summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_sessions: u64,
    pub cancelled_sessions: u64,
    pub sessions_with_hazards: u64,
    pub total_chunks: u64,
    pub cancel_rate: f64,
    pub duration_secs: StatsSummary,
    pub chunks_per_session: StatsSummary,
    pub hazard_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Metrics Summary ===")?;
        writeln!(f, "Sessions: {}", self.total_sessions)?;
        writeln!(
            f,
            "Cancelled: {} ({:.2}%)",
            self.cancelled_sessions, self.cancel_rate
        )?;
        writeln!(f, "With hazards: {}", self.sessions_with_hazards)?;
        writeln!(f, "Chunks: {}", self.total_chunks)?;
        writeln!(f, "Duration (s): {}", self.duration_secs)?;
        writeln!(f, "Chunks per session: {}", self.chunks_per_session)?;

        if !self.hazard_counts.is_empty() {
            writeln!(f, "Hazards reported:")?;
            for (hazard, count) in &self.hazard_counts {
                writeln!(f, "  {}: {}", hazard, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{HazardCategory, HazardReport, Location, SessionChunkKey};

    fn record(duration: f64, chunks: usize, cancelled: bool, report: HazardReport) -> SessionRecord {
        SessionRecord {
            record_id: "20240101-000000".to_string(),
            started_at: 1_000.0,
            ended_at: 1_000.0 + duration,
            start_location: Location::UNKNOWN,
            last_location: Location::UNKNOWN,
            chunk_keys: (0..chunks).map(|_| SessionChunkKey::generate()).collect(),
            report,
            detection_threshold_secs: 60,
            cancelled,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = SessionMetricsAggregator::new();

        aggregator.update(&record(120.0, 3, false, HazardReport::none()));
        aggregator.update(&record(
            60.0,
            1,
            true,
            HazardReport::none().with(HazardCategory::Slope, HazardIntensity::High),
        ));

        assert_eq!(aggregator.total_sessions, 2);
        assert_eq!(aggregator.cancelled_sessions, 1);
        assert_eq!(aggregator.sessions_with_hazards, 1);
        assert_eq!(aggregator.total_chunks, 4);
        assert_eq!(aggregator.hazard_counts.len(), 1);
        assert!((aggregator.duration_stats.mean() - 90.0).abs() < 1e-10);

        let summary = aggregator.summary();
        assert!((summary.cancel_rate - 50.0).abs() < 1e-10);

        aggregator.reset();
        assert_eq!(aggregator.total_sessions, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SessionMetricsAggregator::new();
        aggregator.update(&record(30.0, 2, false, HazardReport::none()));
        let output = format!("{}", aggregator.summary());

        assert!(output.contains("Sessions: 1"));
        assert!(output.contains("0.00%"));
        assert!(!output.contains("Hazards reported"));
    }

    #[test]
    fn test_helpers_without_recorder() {
        // No global recorder installed: calls are no-ops
        record_session_metrics(&record(10.0, 1, false, HazardReport::none()));
        record_advisory("sensorDisconnectAlert");
        record_buffer_depth(42);
    }
}
