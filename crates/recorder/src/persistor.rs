//! ChunkPersistor - threshold-driven chunking of the sample buffer
//!
//! Keys are appended to the session's key list when the chunk is handed to the
//! writer, before the write outcome is known. A failed write never removes its
//! key from the list.

use std::sync::Arc;

use tracing::debug;

use contracts::{FusedSample, SessionChunkKey};

use crate::buffer::SampleBuffer;
use crate::error::{RecorderError, Result};
use crate::writer::{ChunkWriteFailure, ChunkWriter};

/// Chunk drained from the buffer, keyed but not yet written
#[derive(Debug)]
pub struct SealedChunk {
    pub key: SessionChunkKey,
    pub samples: Vec<FusedSample>,
}

/// Wraps the sample buffer and hands full chunks to the writer
pub struct ChunkPersistor {
    buffer: SampleBuffer,
    threshold: usize,
    writer: Arc<ChunkWriter>,
}

impl ChunkPersistor {
    pub fn new(threshold: usize, writer: Arc<ChunkWriter>) -> Self {
        let threshold = threshold.max(1);
        Self {
            buffer: SampleBuffer::with_capacity(threshold),
            threshold,
            writer,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Buffered (unflushed) sample count
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append a sample and flush if the buffer is full
    pub fn append(
        &mut self,
        sample: FusedSample,
        chunk_keys: &mut Vec<SessionChunkKey>,
    ) -> Result<Option<SessionChunkKey>> {
        self.buffer.append(sample);
        self.on_sample_appended(chunk_keys)
    }

    /// Flush check run after every append
    ///
    /// Returns the minted key when a chunk was handed off. On
    /// [`RecorderError::ChunkWriteFailed`] the key is already in `chunk_keys`.
    pub fn on_sample_appended(
        &mut self,
        chunk_keys: &mut Vec<SessionChunkKey>,
    ) -> Result<Option<SessionChunkKey>> {
        if self.buffer.len() < self.threshold {
            return Ok(None);
        }

        let sealed = self.seal(chunk_keys);
        let key = sealed.key.clone();
        debug!(key = %key, samples = sealed.samples.len(), "Flushing chunk");

        match self.writer.submit(sealed.key, sealed.samples) {
            Ok(()) => Ok(Some(key)),
            Err(RecorderError::WriterClosed) => Err(ChunkWriteFailure {
                key,
                message: RecorderError::WriterClosed.to_string(),
            }
            .into()),
            Err(e) => Err(e),
        }
    }

    /// Drain whatever is buffered (possibly nothing) under a fresh key
    ///
    /// The key is appended to `chunk_keys` immediately; the caller writes the
    /// returned chunk.
    pub fn seal_final(&mut self, chunk_keys: &mut Vec<SessionChunkKey>) -> SealedChunk {
        self.seal(chunk_keys)
    }

    /// Drain and persist the remainder, waiting for the write
    ///
    /// An empty remainder is still written as an empty chunk.
    pub async fn flush_final(
        &mut self,
        chunk_keys: &mut Vec<SessionChunkKey>,
    ) -> Result<SessionChunkKey> {
        let sealed = self.seal_final(chunk_keys);
        let key = sealed.key.clone();
        self.writer.write(sealed.key, sealed.samples).await?;
        Ok(key)
    }

    /// Drop the buffered remainder, returning how many samples were dropped
    pub fn discard(&mut self) -> usize {
        self.buffer.clear()
    }

    fn seal(&mut self, chunk_keys: &mut Vec<SessionChunkKey>) -> SealedChunk {
        let samples = self.buffer.drain();
        let key = SessionChunkKey::generate();
        chunk_keys.push(key.clone());
        SealedChunk { key, samples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ChunkStore, ContractError, Location, Orientation};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MapStore {
        chunks: Mutex<HashMap<String, Vec<FusedSample>>>,
    }

    impl ChunkStore for MapStore {
        fn name(&self) -> &str {
            "map"
        }

        async fn put_chunk(
            &self,
            key: &SessionChunkKey,
            samples: &[FusedSample],
        ) -> std::result::Result<(), ContractError> {
            self.chunks
                .lock()
                .unwrap()
                .insert(key.to_string(), samples.to_vec());
            Ok(())
        }

        async fn get_chunk(
            &self,
            key: &SessionChunkKey,
        ) -> std::result::Result<Vec<FusedSample>, ContractError> {
            Ok(self
                .chunks
                .lock()
                .unwrap()
                .get(key.as_str())
                .cloned()
                .unwrap_or_default())
        }
    }

    fn sample(i: usize) -> FusedSample {
        FusedSample {
            orientation: Orientation::new(i as f32, 1.0, 2.0),
            location: Location::new(47.0, 8.0, 400.0),
            captured_at: i as f64 * 0.02,
        }
    }

    #[tokio::test]
    async fn test_flush_count_matches_threshold() {
        let store = Arc::new(MapStore::default());
        let writer = Arc::new(ChunkWriter::spawn(Arc::clone(&store), Duration::from_secs(1)));
        let mut persistor = ChunkPersistor::new(100, Arc::clone(&writer));
        let mut keys = Vec::new();

        let mut flushed = 0;
        for i in 0..450 {
            if persistor.append(sample(i), &mut keys).unwrap().is_some() {
                flushed += 1;
            }
            assert!(persistor.buffered() < 100);
        }

        assert_eq!(flushed, 4);
        assert_eq!(keys.len(), 4);
        assert_eq!(persistor.buffered(), 50);

        writer.take_failures().await.unwrap();
        for key in &keys {
            assert_eq!(store.get_chunk(key).await.unwrap().len(), 100);
        }
    }

    #[tokio::test]
    async fn test_flush_final_persists_remainder() {
        let store = Arc::new(MapStore::default());
        let writer = Arc::new(ChunkWriter::spawn(Arc::clone(&store), Duration::from_secs(1)));
        let mut persistor = ChunkPersistor::new(10, writer);
        let mut keys = Vec::new();

        for i in 0..13 {
            persistor.append(sample(i), &mut keys).unwrap();
        }
        let last = persistor.flush_final(&mut keys).await.unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1], last);
        let remainder = store.get_chunk(&last).await.unwrap();
        assert_eq!(remainder.len(), 3);
        assert_eq!(remainder[0].captured_at, sample(10).captured_at);
    }

    #[tokio::test]
    async fn test_flush_final_writes_empty_chunk() {
        let store = Arc::new(MapStore::default());
        let writer = Arc::new(ChunkWriter::spawn(Arc::clone(&store), Duration::from_secs(1)));
        let mut persistor = ChunkPersistor::new(10, writer);
        let mut keys = Vec::new();

        let key = persistor.flush_final(&mut keys).await.unwrap();
        assert_eq!(keys, vec![key.clone()]);
        assert!(store.chunks.lock().unwrap().contains_key(key.as_str()));
    }

    #[tokio::test]
    async fn test_discard_drops_remainder() {
        let store = Arc::new(MapStore::default());
        let writer = Arc::new(ChunkWriter::spawn(store, Duration::from_secs(1)));
        let mut persistor = ChunkPersistor::new(10, writer);
        let mut keys = Vec::new();

        for i in 0..7 {
            persistor.append(sample(i), &mut keys).unwrap();
        }
        assert_eq!(persistor.discard(), 7);
        assert_eq!(persistor.buffered(), 0);
        assert!(keys.is_empty());
    }
}
