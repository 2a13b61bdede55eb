use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::events::{emit, UiEmitter, SESSION_STATE_CHANGED};
use crate::gallery::Gallery;
use crate::notify::{NotificationManager, NotificationPriority, CAPTURED_TEXT, SMILE_TEXT};
use crate::protocol::InboundEvent;
use crate::render::FramePipeline;

use super::SessionStore;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Routes every facet of an inbound message to the component that owns it.
#[derive(Clone)]
pub struct MessageDispatcher {
    config: Arc<ClientConfig>,
    store: Arc<Mutex<SessionStore>>,
    pipeline: FramePipeline,
    notifications: NotificationManager,
    gallery: Gallery,
    emitter: Arc<dyn UiEmitter>,
}

impl MessageDispatcher {
    pub fn new(
        config: Arc<ClientConfig>,
        store: Arc<Mutex<SessionStore>>,
        pipeline: FramePipeline,
        notifications: NotificationManager,
        gallery: Gallery,
        emitter: Arc<dyn UiEmitter>,
    ) -> Self {
        Self {
            config,
            store,
            pipeline,
            notifications,
            gallery,
            emitter,
        }
    }

    /// Parses and applies one payload from `session_id`.
    ///
    /// A malformed payload is logged and returned as an error without
    /// touching any state; the caller keeps reading.
    pub async fn dispatch(&self, session_id: Uuid, raw: &str) -> Result<(), SessionError> {
        let event = match InboundEvent::parse(raw) {
            Ok(event) => event,
            Err(err) => {
                log_warn!("Discarding message from session {}: {err}", session_id);
                return Err(err);
            }
        };

        if event.is_empty() {
            log_debug!("Session {} sent an empty message", session_id);
            return Ok(());
        }

        self.apply(session_id, event).await;
        Ok(())
    }

    /// Every present field is applied; none of them are exclusive branches
    /// except smile, which yields to a capture in the same message.
    ///
    /// The store lock is held for the whole message so a concurrent close
    /// cannot interleave with it.
    pub async fn apply(&self, session_id: Uuid, event: InboundEvent) {
        let mut store = self.store.lock().await;
        if !store.is_current(session_id) {
            log_debug!("Ignoring message from stale session {}", session_id);
            return;
        }

        let mut state_changed = false;

        if let Some(frame) = event.frame {
            self.pipeline.render(frame);
        }

        if let Some(predictions) = event.predictions {
            store.set_predictions(predictions);
            state_changed = true;
        }

        if event.captured == Some(true) {
            self.notifications
                .notify(
                    CAPTURED_TEXT,
                    self.config.capture_overlay,
                    NotificationPriority::Capture,
                )
                .await;
            self.gallery
                .schedule_refresh(self.config.gallery_refresh_delay);
        } else if event.smiling == Some(true) {
            self.notifications
                .notify(
                    SMILE_TEXT,
                    self.config.smile_overlay,
                    NotificationPriority::SmileDetected,
                )
                .await;
        }

        if let Some(progress) = event.benchmark_progress {
            store.set_benchmark_progress(progress);
            state_changed = true;
        }

        if let Some(report) = event.benchmark_results {
            store.complete_benchmark(report);
            state_changed = true;
        }

        if state_changed {
            emit(
                self.emitter.as_ref(),
                SESSION_STATE_CHANGED,
                &store.snapshot(),
            );
        }
    }
}
