//! Append-only sample buffer.
//!
//! Single writer, single drainer at a time; the owner serializes access.

use contracts::FusedSample;

/// In-memory ordered sequence of fused samples
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Vec<FusedSample>,
}

impl SampleBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with preallocated room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append a sample
    #[inline]
    pub fn append(&mut self, sample: FusedSample) {
        self.samples.push(sample);
    }

    /// Take the current contents, leaving the buffer empty
    #[inline]
    pub fn drain(&mut self) -> Vec<FusedSample> {
        let capacity = self.samples.capacity();
        std::mem::replace(&mut self.samples, Vec::with_capacity(capacity))
    }

    /// Number of buffered samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recently appended sample
    pub fn last(&self) -> Option<&FusedSample> {
        self.samples.last()
    }

    /// Drop all buffered samples, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.samples.len();
        self.samples.clear();
        dropped
    }
}
