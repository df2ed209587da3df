//! SensorStream trait - wearable sensor abstraction
//!
//! The pairing/connection protocol lives outside the core; the core only sees
//! a subscribe/unsubscribe stream of raw rotation samples and a connection flag.

use std::sync::Arc;

use crate::RawSample;

/// Raw sample callback type
///
/// Invoked on an arbitrary background context for every rotation reading.
pub type RawSampleCallback = Arc<dyn Fn(RawSample) + Send + Sync>;

/// Wearable rotation stream
///
/// # Example
///
/// ```ignore
/// let stream: Arc<dyn SensorStream> = connect_wearable();
/// stream.subscribe(Arc::new(|raw| println!("{:?}", raw.orientation)));
/// // ... record ...
/// stream.unsubscribe();
/// ```
pub trait SensorStream: Send + Sync {
    /// Register the sample callback
    ///
    /// Repeated calls replace the previous callback.
    fn subscribe(&self, callback: RawSampleCallback);

    /// Stop delivering samples
    fn unsubscribe(&self);

    /// Check if a callback is registered
    fn is_subscribed(&self) -> bool;

    /// Check if the hardware is connected and set up
    fn is_connected(&self) -> bool;
}
