//! Recorder and chunk writer counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Recorder metrics
#[derive(Debug, Default)]
pub struct RecorderMetrics {
    /// Samples appended to an active session
    pub samples_appended: AtomicU64,

    /// Samples that arrived while idle
    pub samples_ignored: AtomicU64,

    /// Chunks handed to the writer (automatic + final)
    pub chunks_flushed: AtomicU64,

    /// Buffered samples dropped by reset or discard-on-cancel
    pub samples_discarded: AtomicU64,

    /// Sessions started
    pub sessions_started: AtomicU64,
}

impl RecorderMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_appended(&self) {
        self.samples_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.samples_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.chunks_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, count: usize) {
        self.samples_discarded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            samples_appended: self.samples_appended.load(Ordering::Relaxed),
            samples_ignored: self.samples_ignored.load(Ordering::Relaxed),
            chunks_flushed: self.chunks_flushed.load(Ordering::Relaxed),
            samples_discarded: self.samples_discarded.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
        }
    }
}

/// Recorder metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderSnapshot {
    pub samples_appended: u64,
    pub samples_ignored: u64,
    pub chunks_flushed: u64,
    pub samples_discarded: u64,
    pub sessions_started: u64,
}

/// Chunk writer metrics
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Writes waiting in the queue
    queue_len: AtomicUsize,
    /// Successful writes
    write_count: AtomicU64,
    /// Failed or timed-out writes
    failure_count: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }
}
