//! ChunkReassembler - parallel fetch of a session's chunks, ordered join
//!
//! One reassembler serves one reassembly at a time; a second request while one
//! is pending is rejected with [`ReassemblyError::ReassemblyInProgress`].
//! Every fetch is bounded by the fetch timeout, and a fetch that panics
//! counts as a failed chunk, so a job always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use contracts::{ChunkStore, ContractError, FusedSample, ReassemblyConfig, SessionChunkKey};

use crate::error::{ReassemblyError, Result};
use crate::job::ReassemblyJob;

/// A chunk that could not be fetched; its slot is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkGap {
    pub index: usize,
    pub key: SessionChunkKey,
    pub reason: String,
}

/// Ordered result of a reassembly
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReassembledSession {
    /// All samples, chunk by chunk in key order
    pub samples: Vec<FusedSample>,
    /// Samples received per chunk, in key order
    pub chunk_counts: Vec<usize>,
    /// Chunks that failed or timed out
    pub gaps: Vec<ChunkGap>,
}

impl ReassembledSession {
    /// True when every chunk was fetched
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Per-slot fetch outcome
struct ChunkSlot {
    key: SessionChunkKey,
    result: std::result::Result<Vec<FusedSample>, ContractError>,
}

/// Holds the reassembler's in-flight claim; released on drop
struct Claim(Arc<AtomicBool>);

impl Drop for Claim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Rebuilds a session from its ordered chunk keys
pub struct ChunkReassembler<S> {
    store: Arc<S>,
    fetch_timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

impl<S> ChunkReassembler<S>
where
    S: ChunkStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, config: &ReassemblyConfig) -> Self {
        Self::with_timeout(store, Duration::from_millis(config.fetch_timeout_ms))
    }

    pub fn with_timeout(store: Arc<S>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a reassembly is pending
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a reassembly; `on_complete` runs exactly once with the result
    ///
    /// Fetches run as separate tokio tasks, so this must be called inside a
    /// runtime. With no keys the callback runs before this returns.
    #[instrument(name = "reassembly_start", skip(self, keys, on_complete), fields(chunks = keys.len()))]
    pub fn reassemble_with<F>(&self, keys: Vec<SessionChunkKey>, on_complete: F) -> Result<()>
    where
        F: FnOnce(ReassembledSession) + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Reassembly rejected, another one is pending");
            return Err(ReassemblyError::ReassemblyInProgress);
        }

        let started = Instant::now();
        let claim = Claim(Arc::clone(&self.in_flight));
        let job = Arc::new(ReassemblyJob::new(
            keys.len(),
            Box::new(move |slots: Vec<ChunkSlot>| {
                let session = join_slots(slots);
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                histogram!("walksense_reassembly_duration_ms").record(elapsed_ms);
                info!(
                    samples = session.samples.len(),
                    chunks = session.chunk_counts.len(),
                    gaps = session.gaps.len(),
                    elapsed_ms,
                    "Reassembly complete"
                );
                // Release before delivering so the callback may start another
                drop(claim);
                on_complete(session);
            }),
        ));

        for (index, key) in keys.into_iter().enumerate() {
            let job = Arc::clone(&job);
            let store = Arc::clone(&self.store);
            let fetch_timeout = self.fetch_timeout;

            tokio::spawn(async move {
                let fetch_key = key.clone();
                let fetch = tokio::spawn(async move {
                    timeout(fetch_timeout, store.get_chunk(&fetch_key)).await
                });
                let result = match fetch.await {
                    Ok(Ok(result)) => result,
                    Ok(Err(_)) => Err(ContractError::timeout(
                        format!("get_chunk {key}"),
                        fetch_timeout.as_millis() as u64,
                    )),
                    Err(e) => {
                        error!(index, key = %key, error = %e, "Chunk fetch task failed");
                        Err(ContractError::chunk_read(key.as_str(), format!("fetch task failed: {e}")))
                    }
                };
                debug!(index, key = %key, ok = result.is_ok(), "Chunk fetch finished");
                job.fill(index, ChunkSlot { key, result });
            });
        }

        Ok(())
    }

    /// Reassemble and wait for the result
    pub async fn reassemble(&self, keys: &[SessionChunkKey]) -> Result<ReassembledSession> {
        let (tx, rx) = oneshot::channel();
        self.reassemble_with(keys.to_vec(), move |session| {
            let _ = tx.send(session);
        })?;
        rx.await.map_err(|_| ReassemblyError::Abandoned)
    }
}

fn join_slots(slots: Vec<ChunkSlot>) -> ReassembledSession {
    let mut session = ReassembledSession {
        samples: Vec::new(),
        chunk_counts: Vec::with_capacity(slots.len()),
        gaps: Vec::new(),
    };

    for (index, slot) in slots.into_iter().enumerate() {
        match slot.result {
            Ok(samples) => {
                session.chunk_counts.push(samples.len());
                session.samples.extend(samples);
            }
            Err(e) => {
                counter!("walksense_reassembly_chunks_failed_total").increment(1);
                warn!(index, key = %slot.key, error = %e, "Chunk read failed, slot left empty");
                session.chunk_counts.push(0);
                session.gaps.push(ChunkGap {
                    index,
                    key: slot.key,
                    reason: e.to_string(),
                });
            }
        }
    }
    session
}
