//! LocationProvider trait - GPS abstraction

use crate::Location;

/// Pollable last-known device position
///
/// `current_location` is a cheap, non-blocking read; it returns
/// [`Location::UNKNOWN`] when no fix is available.
pub trait LocationProvider: Send + Sync {
    /// Last known position
    fn current_location(&self) -> Location;

    /// Begin receiving position updates
    fn start_updating(&self);

    /// Stop receiving position updates
    fn stop_updating(&self);

    /// Whether the user granted location permission
    fn is_permission_granted(&self) -> bool;
}
