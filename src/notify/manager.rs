use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::events::{emit, UiEmitter, OVERLAY_CHANGED};

use super::{NotificationPriority, OverlayNotification};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Default)]
struct Slot {
    active: Option<OverlayNotification>,
    expiry: Option<CancellationToken>,
}

/// Single-slot overlay with one pending expiry timer.
///
/// The expiry task is bound to the notification's id, so a timer that loses
/// the race against a replacement can never clear the newer message.
#[derive(Clone)]
pub struct NotificationManager {
    slot: Arc<Mutex<Slot>>,
    emitter: Arc<dyn UiEmitter>,
}

impl NotificationManager {
    pub fn new(emitter: Arc<dyn UiEmitter>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            emitter,
        }
    }

    /// Shows `text` for `duration` unless a higher-priority notification is
    /// on screen. Returns whether the slot was taken.
    pub async fn notify(
        &self,
        text: &str,
        duration: Duration,
        priority: NotificationPriority,
    ) -> bool {
        let mut slot = self.slot.lock().await;

        if let Some(current) = &slot.active {
            if priority < current.priority {
                log_debug!(
                    "Dropping '{}' while '{}' is showing",
                    text,
                    current.text
                );
                return false;
            }
        }

        if let Some(token) = slot.expiry.take() {
            token.cancel();
        }

        let expires_in =
            chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        let notification = OverlayNotification {
            id: Uuid::new_v4(),
            text: text.to_string(),
            priority,
            expires_at: Utc::now() + expires_in,
        };

        let token = CancellationToken::new();
        tokio::spawn(expire_after(
            self.slot.clone(),
            self.emitter.clone(),
            notification.id,
            duration,
            token.clone(),
        ));

        emit(self.emitter.as_ref(), OVERLAY_CHANGED, &Some(&notification));
        slot.active = Some(notification);
        slot.expiry = Some(token);
        true
    }

    pub async fn current(&self) -> Option<OverlayNotification> {
        self.slot.lock().await.active.clone()
    }
}

async fn expire_after(
    slot: Arc<Mutex<Slot>>,
    emitter: Arc<dyn UiEmitter>,
    id: Uuid,
    duration: Duration,
    cancel_token: CancellationToken,
) {
    tokio::select! {
        _ = cancel_token.cancelled() => {}
        _ = tokio::time::sleep(duration) => {
            let mut guard = slot.lock().await;
            if guard.active.as_ref().is_some_and(|active| active.id == id) {
                guard.active = None;
                guard.expiry = None;
                emit(emitter.as_ref(), OVERLAY_CHANGED, &None::<OverlayNotification>);
            }
        }
    }
}
