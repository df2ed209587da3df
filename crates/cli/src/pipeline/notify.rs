//! Notification sink that logs instead of pushing to a device.

use contracts::NotificationSink;
use tracing::info;

/// Logs every notification at info level
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, title: &str, body: &str) {
        info!(title, body, "Notification");
    }
}
