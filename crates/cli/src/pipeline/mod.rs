//! Simulation pipeline: scripted walk through detection, recorder and store.

mod notify;
mod simulator;
mod stats;

pub use notify::LogNotificationSink;
pub use simulator::{standard_script, Activity, ScriptStep, Simulation, SimulationConfig};
pub use stats::{SessionOutcome, SimulationStats};
