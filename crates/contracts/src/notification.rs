//! NotificationSink trait - user-facing notices

/// Push-notification delivery
///
/// Delivery is best effort; implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}
