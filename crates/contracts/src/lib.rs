//! # Contracts
//!
//! Frozen interface contracts shared by every walksense crate: the sample and
//! session data model, the collaborator traits the core consumes (sensor
//! stream, location provider, chunk store, record sink, notification sink),
//! the shared error type and the runtime configuration.
//!
//! ## Time Model
//! - All timestamps are seconds since the Unix epoch as `f64`
//! - Sample timestamps come from the sensor; detection timestamps come from
//!   the motion classifier's `observed_at`

mod clock;
mod config;
mod error;
mod location;
mod motion;
mod notification;
mod record;
mod sample;
mod sensor_stream;
mod session;
mod store;

pub use clock::unix_now;
pub use config::*;
pub use error::*;
pub use location::LocationProvider;
pub use motion::*;
pub use notification::NotificationSink;
pub use record::*;
pub use sample::*;
pub use sensor_stream::{RawSampleCallback, SensorStream};
pub use session::*;
pub use store::*;
