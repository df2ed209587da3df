//! # Recorder
//!
//! Walking session recording.
//!
//! Responsibilities:
//! - Subscribe to the sensor stream while a session is active
//! - Fuse each orientation sample with the current location
//! - Buffer samples and flush fixed-size chunks under fresh keys
//! - Keep the ordered chunk-key list of the session
//! - Force-flush the remainder when the session is finalized
//!
//! ## Usage Example
//!
//! ```ignore
//! use recorder::{MockSensorStream, SessionRecorder, StaticLocationProvider};
//!
//! let recorder = SessionRecorder::with_store(config, sensor, location, store);
//! recorder.start()?;
//! // ... sensor callback feeds samples ...
//! let keys = recorder.finalize_and_flush().await?;
//! ```

mod buffer;
mod error;
mod metrics;
mod mock;
mod persistor;
mod recorder;
mod writer;

pub use buffer::SampleBuffer;
pub use error::{RecorderError, Result};
pub use metrics::{RecorderMetrics, RecorderSnapshot, WriterMetrics};
pub use mock::{MockSensorStream, StaticLocationProvider};
pub use persistor::{ChunkPersistor, SealedChunk};
pub use recorder::{FinishedSession, PhaseListener, RecorderPhase, SessionRecorder};
pub use writer::{ChunkWriteFailure, ChunkWriter};
