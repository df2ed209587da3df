//! # Reassembly
//!
//! Rebuilds a recorded session from its chunk keys.
//!
//! Responsibilities:
//! - Fetch every chunk in parallel, each bounded by the fetch timeout
//! - Join the results in key order regardless of arrival order
//! - Deliver the result exactly once; failed chunks become gaps
//! - Derive a session summary (duration, distance, path)
//!
//! ## Usage Example
//!
//! ```ignore
//! use reassembly::{ChunkReassembler, SessionSummary};
//!
//! let reassembler = ChunkReassembler::new(store, &config.reassembly);
//! let session = reassembler.reassemble(&record.chunk_keys).await?;
//! let summary = SessionSummary::from_samples(&session.samples, 50.0);
//! ```

mod error;
mod job;
mod reassembler;
mod summary;

pub use error::{ReassemblyError, Result};
pub use job::{CompletionCallback, ReassemblyJob};
pub use reassembler::{ChunkGap, ChunkReassembler, ReassembledSession};
pub use summary::{encode_polyline, format_duration, haversine_m, SessionSummary};
