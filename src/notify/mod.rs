pub mod manager;
pub mod types;

pub use manager::NotificationManager;
pub use types::{NotificationPriority, OverlayNotification, CAPTURED_TEXT, SMILE_TEXT};
