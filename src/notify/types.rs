use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const CAPTURED_TEXT: &str = "Selfie Captured! 📸";
pub const SMILE_TEXT: &str = "Smile Detected! 🙂";

/// Ordered low to high; a notification only displaces one of equal or lower
/// priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationPriority {
    SmileDetected,
    Capture,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayNotification {
    pub id: Uuid,
    pub text: String,
    pub priority: NotificationPriority,
    pub expires_at: DateTime<Utc>,
}
