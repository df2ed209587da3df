//! Mock sensor stream and location provider
//!
//! Used by tests and the simulator where no IMU or positioning hardware exists.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{
    Location, LocationProvider, Orientation, RawSample, RawSampleCallback, SensorStream, unix_now,
};
use tracing::{debug, trace};

#[derive(Default)]
struct StreamInner {
    callback: Mutex<Option<RawSampleCallback>>,
    connected: AtomicBool,
    emitted: AtomicU64,
}

impl StreamInner {
    fn emit(&self, sample: RawSample) -> bool {
        // Clone out so the callback runs without our lock
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                callback(sample);
                self.emitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

struct Generator {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Mock IMU stream
///
/// Samples are pushed with [`MockSensorStream::emit`] or produced by a
/// background thread at a fixed rate, mirroring a real sensor's callback.
pub struct MockSensorStream {
    inner: Arc<StreamInner>,
    generator: Mutex<Option<Generator>>,
}

impl MockSensorStream {
    /// Connected stream with no subscriber
    pub fn new() -> Self {
        let inner = StreamInner::default();
        inner.connected.store(true, Ordering::SeqCst);
        Self {
            inner: Arc::new(inner),
            generator: Mutex::new(None),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    /// Deliver one sample to the subscriber
    ///
    /// Returns false if nobody is subscribed.
    pub fn emit(&self, sample: RawSample) -> bool {
        self.inner.emit(sample)
    }

    /// Samples delivered so far
    pub fn emitted(&self) -> u64 {
        self.inner.emitted.load(Ordering::Relaxed)
    }

    /// Produce samples at `frequency_hz` on a background thread
    ///
    /// Idempotent: a running generator is left alone.
    pub fn start_generator(&self, frequency_hz: f64) {
        let mut generator = self.generator.lock().unwrap_or_else(PoisonError::into_inner);
        if generator.is_some() {
            return;
        }

        let running = Arc::new(AtomicBool::new(true));
        let inner = Arc::clone(&self.inner);
        let flag = Arc::clone(&running);
        let interval = Duration::from_secs_f64(1.0 / frequency_hz.max(1.0));

        let thread = thread::spawn(move || {
            debug!(frequency_hz, "mock sensor generator started");
            let mut tick: u64 = 0;
            while flag.load(Ordering::Relaxed) {
                let phase = tick as f32 * 0.1;
                let sample = RawSample {
                    orientation: Orientation::new(phase.sin(), phase.cos(), 0.0),
                    timestamp: unix_now(),
                };
                if inner.connected.load(Ordering::Relaxed) {
                    inner.emit(sample);
                    trace!(tick, "mock sample sent");
                }
                tick += 1;
                thread::sleep(interval);
            }
            debug!(ticks = tick, "mock sensor generator stopped");
        });

        *generator = Some(Generator { running, thread });
    }

    /// Stop the background generator and wait for its thread
    pub fn stop_generator(&self) {
        let generator = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(generator) = generator {
            generator.running.store(false, Ordering::SeqCst);
            let _ = generator.thread.join();
        }
    }
}

impl Default for MockSensorStream {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorStream for MockSensorStream {
    fn subscribe(&self, callback: RawSampleCallback) {
        *self
            .inner
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn unsubscribe(&self) {
        self.inner
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn is_subscribed(&self) -> bool {
        self.inner
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

impl Drop for MockSensorStream {
    fn drop(&mut self) {
        self.stop_generator();
    }
}

/// Location provider returning a settable fixed position
pub struct StaticLocationProvider {
    location: Mutex<Location>,
    permission: AtomicBool,
    updating: AtomicBool,
}

impl StaticLocationProvider {
    /// Provider with permission granted
    pub fn new(location: Location) -> Self {
        Self {
            location: Mutex::new(location),
            permission: AtomicBool::new(true),
            updating: AtomicBool::new(false),
        }
    }

    pub fn set_location(&self, location: Location) {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = location;
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Whether polling is currently on
    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }
}

impl Default for StaticLocationProvider {
    fn default() -> Self {
        Self::new(Location::UNKNOWN)
    }
}

impl LocationProvider for StaticLocationProvider {
    fn current_location(&self) -> Location {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_updating(&self) {
        self.updating.store(true, Ordering::SeqCst);
    }

    fn stop_updating(&self) {
        self.updating.store(false, Ordering::SeqCst);
    }

    fn is_permission_granted(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }
}
