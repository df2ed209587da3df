//! ChunkWriter - serialized chunk persistence on an isolated worker task
//!
//! Flushes are requested from the sensor callback (synchronous context), so the
//! queue is unbounded and `submit` never blocks. Writes are applied strictly in
//! submission order; a barrier therefore observes every write queued before it.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use metrics::{counter, histogram};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use contracts::{ChunkStore, ContractError, FusedSample, SessionChunkKey};

use crate::error::{RecorderError, Result};
use crate::metrics::WriterMetrics;

/// A chunk write that did not reach the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWriteFailure {
    pub key: SessionChunkKey,
    pub message: String,
}

impl From<ChunkWriteFailure> for RecorderError {
    fn from(failure: ChunkWriteFailure) -> Self {
        RecorderError::ChunkWriteFailed {
            key: failure.key,
            message: failure.message,
        }
    }
}

enum WriteCommand {
    Put {
        key: SessionChunkKey,
        samples: Vec<FusedSample>,
        ack: Option<oneshot::Sender<std::result::Result<(), ContractError>>>,
    },
    /// Reply with failures of fire-and-forget puts since the last barrier
    Barrier(oneshot::Sender<Vec<ChunkWriteFailure>>),
}

/// Handle to a running chunk writer worker
pub struct ChunkWriter {
    /// Store name
    name: String,
    tx: Sender<WriteCommand>,
    metrics: Arc<WriterMetrics>,
    worker_handle: JoinHandle<()>,
}

impl ChunkWriter {
    /// Spawn the worker task on the current tokio runtime
    pub fn spawn<S>(store: Arc<S>, write_timeout: Duration) -> Self
    where
        S: ChunkStore + Send + Sync + 'static,
    {
        let name = store.name().to_string();
        let (tx, rx) = async_channel::unbounded();
        let metrics = Arc::new(WriterMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            writer_worker(store, rx, worker_metrics, worker_name, write_timeout).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Store name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }

    /// Queue a chunk write without waiting (non-blocking)
    ///
    /// A failure is reported by the next [`ChunkWriter::take_failures`].
    pub fn submit(&self, key: SessionChunkKey, samples: Vec<FusedSample>) -> Result<()> {
        self.tx
            .try_send(WriteCommand::Put {
                key,
                samples,
                ack: None,
            })
            .map_err(|_| {
                error!(store = %self.name, "Chunk writer closed unexpectedly");
                RecorderError::WriterClosed
            })?;
        self.metrics.set_queue_len(self.tx.len());
        Ok(())
    }

    /// Queue a chunk write and wait for the store's answer
    pub async fn write(&self, key: SessionChunkKey, samples: Vec<FusedSample>) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Put {
                key: key.clone(),
                samples,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| RecorderError::WriterClosed)?;

        match ack_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RecorderError::ChunkWriteFailed {
                key,
                message: e.to_string(),
            }),
            Err(_) => Err(RecorderError::WriterClosed),
        }
    }

    /// Wait until every previously queued write has finished and collect the
    /// failures of fire-and-forget writes
    pub async fn take_failures(&self) -> Result<Vec<ChunkWriteFailure>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Barrier(reply_tx))
            .await
            .map_err(|_| RecorderError::WriterClosed)?;
        reply_rx.await.map_err(|_| RecorderError::WriterClosed)
    }

    /// Drain the queue and stop the worker
    #[instrument(name = "chunk_writer_shutdown", skip(self), fields(store = %self.name))]
    pub async fn shutdown(self) {
        self.tx.close();
        if let Err(e) = self.worker_handle.await {
            error!(store = %self.name, error = ?e, "Writer task panicked");
        }
        debug!(store = %self.name, "ChunkWriter shutdown complete");
    }
}

/// Worker task that applies queued writes to the store
#[instrument(
    name = "chunk_writer_loop",
    skip(store, rx, metrics, write_timeout),
    fields(store = %name)
)]
async fn writer_worker<S: ChunkStore>(
    store: Arc<S>,
    rx: Receiver<WriteCommand>,
    metrics: Arc<WriterMetrics>,
    name: String,
    write_timeout: Duration,
) {
    debug!(store = %name, "Chunk writer started");
    let mut failures = Vec::new();
    let timeout_ms = write_timeout.as_millis() as u64;

    while let Ok(command) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match command {
            WriteCommand::Put { key, samples, ack } => {
                let result = match timeout(write_timeout, store.put_chunk(&key, &samples)).await {
                    Ok(result) => result,
                    Err(_) => Err(ContractError::timeout(
                        format!("put_chunk {key}"),
                        timeout_ms,
                    )),
                };

                match &result {
                    Ok(()) => {
                        metrics.inc_write_count();
                        counter!("walksense_chunks_flushed_total").increment(1);
                        histogram!("walksense_chunk_size").record(samples.len() as f64);
                        debug!(store = %name, key = %key, samples = samples.len(), "Chunk written");
                    }
                    Err(e) => {
                        metrics.inc_failure_count();
                        counter!("walksense_chunk_write_failures_total").increment(1);
                        error!(store = %name, key = %key, error = %e, "Chunk write failed");
                    }
                }

                match ack {
                    // Caller is waiting; it owns the failure
                    Some(ack) => {
                        let _ = ack.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            failures.push(ChunkWriteFailure {
                                key,
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
            WriteCommand::Barrier(reply) => {
                let _ = reply.send(std::mem::take(&mut failures));
            }
        }
    }

    if !failures.is_empty() {
        error!(
            store = %name,
            unreported = failures.len(),
            "Writer stopped with unreported chunk failures"
        );
    }
    debug!(store = %name, "Chunk writer stopped");
}
