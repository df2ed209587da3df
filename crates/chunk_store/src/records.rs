//! Record sinks - destinations for finished session records

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ContractError, RecordSink, SessionRecord};
use tracing::{debug, info, instrument};

/// Keeps submitted records in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSink {
    records: Arc<Mutex<Vec<SessionRecord>>>,
    reject: Arc<AtomicBool>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submitted records, oldest first
    pub fn records(&self) -> Vec<SessionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every submit fail
    pub fn reject_submissions(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

impl RecordSink for MemoryRecordSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn submit(&self, record: &SessionRecord) -> Result<(), ContractError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ContractError::RecordSubmit {
                record_id: record.record_id.clone(),
                message: "submissions rejected".to_string(),
            });
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Logs a summary of each record via tracing
pub struct LogRecordSink {
    name: String,
}

impl LogRecordSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RecordSink for LogRecordSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_record_sink_submit",
        skip(self, record),
        fields(sink = %self.name, record_id = %record.record_id)
    )]
    async fn submit(&self, record: &SessionRecord) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            record_id = %record.record_id,
            chunks = record.chunk_keys.len(),
            duration_s = record.ended_at - record.started_at,
            hazard_free = record.report.is_empty(),
            cancelled = record.cancelled,
            "Session record received"
        );
        Ok(())
    }
}

/// Writes each record to `<base_path>/<record_id>.json`
#[derive(Debug, Clone)]
pub struct FileRecordSink {
    base_path: PathBuf,
}

impl FileRecordSink {
    pub fn new(base_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// First free path for `record_id`; ids have one-second resolution
    fn free_path(&self, record_id: &str) -> PathBuf {
        let mut path = self.base_path.join(format!("{record_id}.json"));
        let mut n = 1;
        while path.exists() {
            path = self.base_path.join(format!("{record_id}-{n}.json"));
            n += 1;
        }
        path
    }
}

impl RecordSink for FileRecordSink {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(name = "file_record_sink_submit", skip(self, record), fields(record_id = %record.record_id))]
    async fn submit(&self, record: &SessionRecord) -> Result<(), ContractError> {
        let submit_error = |message: String| ContractError::RecordSubmit {
            record_id: record.record_id.clone(),
            message,
        };
        let body = serde_json::to_vec_pretty(record).map_err(|e| submit_error(e.to_string()))?;
        let path = self.free_path(&record.record_id);
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| submit_error(e.to_string()))?;
        debug!(path = %path.display(), "Session record written");
        Ok(())
    }
}
