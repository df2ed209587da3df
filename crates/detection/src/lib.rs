//! # Detection
//!
//! Automatic walking detection.
//!
//! Responsibilities:
//! - Track the last high-confidence walking and stationary readings
//! - Start recording after a walking run longer than the trigger threshold
//! - Stop recording after a stationary run longer than the threshold and
//!   submit the session with a zero-intensity report
//! - Surface blocked starts and sensor loss as rate-limited advisories
//!
//! ## Usage Example
//!
//! ```ignore
//! use detection::{Collaborators, DetectionHandle, DetectionStateMachine};
//!
//! let machine = DetectionStateMachine::new(&config.detection, config.notifications, collaborators);
//! let handle = DetectionHandle::spawn(machine);
//! handle.initialize()?;
//! classifier.on_update(handle.classification_callback());
//! ```

mod advisory;
mod error;
mod handle;
mod machine;
mod state;

pub use advisory::{Advisory, DetectionEvent, Notifier, RateLimiter};
pub use error::{DetectionError, Result};
pub use handle::{ClassificationCallback, DetectionCommand, DetectionHandle, OUTCOME_CAPACITY};
pub use machine::{
    Collaborators, DetectionSnapshot, DetectionStateMachine, DetectionStats, Outcome,
};
pub use state::DetectionState;
