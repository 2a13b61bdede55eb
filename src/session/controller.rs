use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::events::{emit, UiEmitter, SESSION_STATE_CHANGED};
use crate::gallery::{Gallery, GalleryBackend};
use crate::notify::{NotificationManager, OverlayNotification};
use crate::protocol::ControlMessage;
use crate::render::FramePipeline;
use crate::settings::{SettingChange, Settings};

use super::{
    ConnectionEvent, ConnectionManager, ConnectionStatus, MessageDispatcher, SessionEvent,
    SessionSnapshot, SessionStore,
};

/// Owns one live session at a time and everything derived from it.
///
/// Connection lifecycle events and inbound messages are consumed by a single
/// event-loop task, strictly in arrival order. User intents go through the
/// same store lock, so the two never interleave inside a message.
#[derive(Clone)]
pub struct SessionController {
    config: Arc<ClientConfig>,
    store: Arc<Mutex<SessionStore>>,
    connection: Arc<Mutex<ConnectionManager>>,
    dispatcher: MessageDispatcher,
    pipeline: FramePipeline,
    notifications: NotificationManager,
    gallery: Gallery,
    emitter: Arc<dyn UiEmitter>,
    events_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<SessionEvent>>>>,
    event_loop: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionController {
    pub fn new(
        config: ClientConfig,
        gallery_backend: Arc<dyn GalleryBackend>,
        emitter: Arc<dyn UiEmitter>,
    ) -> Self {
        let config = Arc::new(config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let store = Arc::new(Mutex::new(SessionStore::new()));
        let pipeline = FramePipeline::new(emitter.clone());
        let notifications = NotificationManager::new(emitter.clone());
        let gallery = Gallery::new(gallery_backend, config.clone(), emitter.clone());
        let dispatcher = MessageDispatcher::new(
            config.clone(),
            store.clone(),
            pipeline.clone(),
            notifications.clone(),
            gallery.clone(),
            emitter.clone(),
        );

        Self {
            config,
            store,
            connection: Arc::new(Mutex::new(ConnectionManager::new(events_tx))),
            dispatcher,
            pipeline,
            notifications,
            gallery,
            emitter,
            events_rx: Arc::new(Mutex::new(Some(events_rx))),
            event_loop: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.store.lock().await.snapshot()
    }

    pub async fn overlay(&self) -> Option<OverlayNotification> {
        self.notifications.current().await
    }

    /// Opens the session. A no-op while one is connecting or connected.
    pub async fn start(&self) -> Result<SessionSnapshot> {
        self.ensure_event_loop().await;
        let endpoint = self.config.video_endpoint()?;

        {
            let mut connection = self.connection.lock().await;
            let mut store = self.store.lock().await;
            match connection.connect(endpoint) {
                Some(session_id) => {
                    // The previous session's Close may still be queued; once
                    // the id is replaced it would be dropped as stale.
                    if let Some(previous) = store.session_id() {
                        info!("Closing out session {previous} before restart");
                        self.end_session_locked(&mut store);
                    }
                    info!("Starting session {session_id}");
                    store.begin_session(session_id);
                }
                None => {
                    info!("Start ignored: a session is already active");
                    return Ok(store.snapshot());
                }
            }
        }

        self.emit_state_changed().await;
        Ok(self.snapshot().await)
    }

    /// Closes the session if there is one. Always safe to call.
    pub async fn stop(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;
        connection.disconnect().await?;
        self.close_session(None).await;
        Ok(())
    }

    pub async fn manual_capture(&self) -> bool {
        self.connection
            .lock()
            .await
            .send(&ControlMessage::ManualCapture)
    }

    /// Requests a benchmark run. Only while connected; resets the local run
    /// state to a fresh, just-started run.
    pub async fn run_benchmark(&self) -> bool {
        let connection = self.connection.lock().await;
        if connection.status() != ConnectionStatus::Connected {
            return false;
        }

        let snapshot = {
            let mut store = self.store.lock().await;
            store.begin_benchmark();
            store.snapshot()
        };
        emit(self.emitter.as_ref(), SESSION_STATE_CHANGED, &snapshot);

        connection.send(&ControlMessage::RunBenchmark)
    }

    /// Applies a settings edit locally and forwards what the peer needs.
    pub async fn update_setting(&self, change: SettingChange) -> Result<Settings> {
        let connection = self.connection.lock().await;
        let (settings, outbound, snapshot) = {
            let mut store = self.store.lock().await;
            let outbound = store.settings_mut().apply(change)?;
            (store.settings().clone(), outbound, store.snapshot())
        };
        emit(self.emitter.as_ref(), SESSION_STATE_CHANGED, &snapshot);

        if let Some(message) = outbound {
            connection.send(&message);
        }
        Ok(settings)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.stop().await?;
        if let Some(handle) = self.event_loop.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn ensure_event_loop(&self) {
        let mut event_loop = self.event_loop.lock().await;
        if event_loop.is_some() {
            return;
        }
        let Some(mut events_rx) = self.events_rx.lock().await.take() else {
            return;
        };

        let controller = self.clone();
        *event_loop = Some(tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                controller.handle_event(event).await;
            }
        }));
    }

    async fn handle_event(&self, SessionEvent { session_id, event }: SessionEvent) {
        match event {
            ConnectionEvent::Open => {
                let snapshot = {
                    let mut store = self.store.lock().await;
                    if !store.is_current(session_id) {
                        return;
                    }
                    store.mark_connected();
                    store.snapshot()
                };
                info!("Session {session_id} open");
                emit(self.emitter.as_ref(), SESSION_STATE_CHANGED, &snapshot);
            }
            ConnectionEvent::Message(raw) => {
                // Malformed payloads are logged by the dispatcher.
                let _ = self.dispatcher.dispatch(session_id, &raw).await;
            }
            ConnectionEvent::Error(err) => {
                warn!("Session {session_id} transport error: {err}");
            }
            ConnectionEvent::Close => self.close_session(Some(session_id)).await,
        }
    }

    /// Ends `session_id` (or whatever is current when `None`): clears the
    /// surface, resets predictions and drops the connected flag.
    async fn close_session(&self, session_id: Option<Uuid>) {
        let snapshot = {
            let mut store = self.store.lock().await;
            if let Some(session_id) = session_id {
                if !store.is_current(session_id) {
                    return;
                }
            }
            self.end_session_locked(&mut store);
            store.snapshot()
        };
        emit(self.emitter.as_ref(), SESSION_STATE_CHANGED, &snapshot);
    }

    fn end_session_locked(&self, store: &mut SessionStore) {
        store.end_session();
        self.pipeline.clear();
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        emit(self.emitter.as_ref(), SESSION_STATE_CHANGED, &snapshot);
    }
}
