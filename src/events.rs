use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

pub const SESSION_STATE_CHANGED: &str = "session-state-changed";
pub const OVERLAY_CHANGED: &str = "overlay-changed";
pub const FRAME_RENDERED: &str = "frame-rendered";
pub const SURFACE_CLEARED: &str = "surface-cleared";
pub const GALLERY_UPDATED: &str = "gallery-updated";

/// Push channel to whatever renders the session (webview, test harness).
pub trait UiEmitter: Send + Sync {
    fn emit_json(&self, event: &str, payload: Value);
}

pub(crate) fn emit<T: Serialize>(emitter: &dyn UiEmitter, event: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => emitter.emit_json(event, value),
        Err(err) => log::error!("Failed to serialize {event} payload: {err}"),
    }
}

pub struct NoopEmitter;

impl UiEmitter for NoopEmitter {
    fn emit_json(&self, _event: &str, _payload: Value) {}
}

/// Forwards every event into an mpsc channel, for hosts that poll instead of
/// running a webview.
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<(String, Value)>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UiEmitter for ChannelEmitter {
    fn emit_json(&self, event: &str, payload: Value) {
        let _ = self.tx.send((event.to_string(), payload));
    }
}

#[cfg(feature = "desktop")]
impl UiEmitter for tauri::AppHandle {
    fn emit_json(&self, event: &str, payload: Value) {
        use tauri::Emitter;

        let _ = self.emit(event, payload);
    }
}
