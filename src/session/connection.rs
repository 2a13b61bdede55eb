use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::error::SessionError;
use crate::protocol::ControlMessage;

use super::ConnectionStatus;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Upper bound on sending our Close frame to a peer that stopped reading.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle signals of one connection attempt. An `Error` is always
/// followed by a `Close`.
#[derive(Debug)]
pub enum ConnectionEvent {
    Open,
    Message(String),
    Error(SessionError),
    Close,
}

#[derive(Debug)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub event: ConnectionEvent,
}

struct ActiveConnection {
    session_id: Uuid,
    endpoint: Url,
    status: watch::Receiver<ConnectionStatus>,
    outbound: mpsc::UnboundedSender<String>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the one streaming connection and reports its lifecycle to whoever
/// holds the receiving end of `events`.
///
/// There is no reconnect and no outbound queue: a dropped connection stays
/// dropped until the user starts a new session, and control messages sent
/// while not connected are discarded.
pub struct ConnectionManager {
    events: mpsc::UnboundedSender<SessionEvent>,
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            active: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.active
            .as_ref()
            .map(|active| *active.status.borrow())
            .unwrap_or_default()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match self.status() {
            ConnectionStatus::Disconnected => None,
            _ => self.active.as_ref().map(|active| active.session_id),
        }
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.active.as_ref().map(|active| &active.endpoint)
    }

    /// Opens a new session unless one is already connecting or connected.
    /// Returns the new session's id, or `None` when nothing was started.
    pub fn connect(&mut self, endpoint: Url) -> Option<Uuid> {
        if self.status() != ConnectionStatus::Disconnected {
            log_debug!("connect ignored: session already active");
            return None;
        }

        let session_id = Uuid::new_v4();
        let cancel_token = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(connection_loop(
            session_id,
            endpoint.clone(),
            outbound_rx,
            cancel_token.clone(),
            status_tx,
            self.events.clone(),
        ));

        self.active = Some(ActiveConnection {
            session_id,
            endpoint,
            status: status_rx,
            outbound: outbound_tx,
            cancel_token,
            handle,
        });
        Some(session_id)
    }

    /// Closes the active connection, if any, and waits for its task.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        active.cancel_token.cancel();
        active
            .handle
            .await
            .context("connection task failed to join")
    }

    /// Returns whether the message was handed to the socket.
    pub fn send(&self, message: &ControlMessage) -> bool {
        let Some(active) = &self.active else {
            log_debug!("Dropping {} (no session)", message.action());
            return false;
        };
        if *active.status.borrow() != ConnectionStatus::Connected {
            log_debug!("Dropping {} (not connected)", message.action());
            return false;
        }

        match message.to_json() {
            Ok(payload) => active.outbound.send(payload).is_ok(),
            Err(err) => {
                log_error!("Failed to encode {}: {err}", message.action());
                false
            }
        }
    }
}

async fn connection_loop(
    session_id: Uuid,
    endpoint: Url,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel_token: CancellationToken,
    status: watch::Sender<ConnectionStatus>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let notify = |event: ConnectionEvent| {
        let _ = events.send(SessionEvent { session_id, event });
    };

    log_info!("Session {} connecting to {}", session_id, endpoint);

    let connected = tokio::select! {
        result = tokio_tungstenite::connect_async(endpoint.as_str()) => result,
        _ = cancel_token.cancelled() => {
            status.send_replace(ConnectionStatus::Disconnected);
            notify(ConnectionEvent::Close);
            return;
        }
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(err) => {
            log_warn!("Session {} failed to connect: {err}", session_id);
            status.send_replace(ConnectionStatus::Disconnected);
            notify(ConnectionEvent::Error(err.into()));
            notify(ConnectionEvent::Close);
            return;
        }
    };

    status.send_replace(ConnectionStatus::Connected);
    notify(ConnectionEvent::Open);
    log_info!("Session {} connected", session_id);

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                send_close(session_id, &mut write).await;
                break;
            }
            Some(payload) = outbound.recv() => {
                let sent = tokio::select! {
                    result = write.send(Message::text(payload)) => result,
                    _ = cancel_token.cancelled() => {
                        log_debug!("Session {} cancelled mid-send", session_id);
                        break;
                    }
                };
                if let Err(err) = sent {
                    log_warn!("Session {} send failed: {err}", session_id);
                    notify(ConnectionEvent::Error(err.into()));
                    break;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    notify(ConnectionEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => notify(ConnectionEvent::Message(text)),
                    Err(_) => log_warn!("Session {} sent a non-UTF-8 binary message", session_id),
                },
                Some(Ok(Message::Close(frame))) => {
                    log_info!("Session {} closed by peer: {:?}", session_id, frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    log_warn!("Session {} transport error: {err}", session_id);
                    notify(ConnectionEvent::Error(err.into()));
                    break;
                }
                None => break,
            }
        }
    }

    status.send_replace(ConnectionStatus::Disconnected);
    notify(ConnectionEvent::Close);
    log_info!("Session {} closed", session_id);
}

/// Returns whether the Close frame went out within the timeout.
async fn send_close<S>(session_id: Uuid, write: &mut S) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, write.send(Message::Close(None))).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            log_debug!("Close handshake failed for session {}: {err}", session_id);
            false
        }
        Err(_) => {
            log_warn!("Session {} peer is not reading; dropping without close frame", session_id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};

    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite;

    use super::*;

    /// A socket whose peer never drains it.
    struct StalledSink;

    impl Sink<Message> for StalledSink {
        type Error = tungstenite::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn close_handshake_gives_up_on_a_stalled_peer() {
        let started = tokio::time::Instant::now();
        assert!(!send_close(Uuid::new_v4(), &mut StalledSink).await);
        assert!(started.elapsed() >= CLOSE_HANDSHAKE_TIMEOUT);
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("event channel open")
    }

    #[tokio::test]
    async fn refused_connection_reports_error_then_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = ConnectionManager::new(tx);
        let session_id = manager
            .connect(Url::parse(&format!("ws://{addr}/ws/video")).unwrap())
            .unwrap();
        assert_eq!(manager.status(), ConnectionStatus::Connecting);

        let first = next_event(&mut rx).await;
        assert_eq!(first.session_id, session_id);
        assert!(matches!(
            first.event,
            ConnectionEvent::Error(SessionError::Transport(_))
        ));
        assert!(matches!(next_event(&mut rx).await.event, ConnectionEvent::Close));
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);

        // A failed session does not block the next attempt.
        assert!(manager
            .connect(Url::parse(&format!("ws://{addr}/ws/video")).unwrap())
            .is_some());
        manager.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_connecting() {
        // Accepts TCP but never answers the upgrade, so the session stays
        // in `Connecting`.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = ConnectionManager::new(tx);
        let endpoint = Url::parse(&format!("ws://{addr}/ws/video")).unwrap();

        let first = manager.connect(endpoint.clone()).unwrap();
        assert_eq!(manager.connect(endpoint.clone()), None);
        assert_eq!(manager.session_id(), Some(first));
        assert_eq!(manager.endpoint(), Some(&endpoint));
        assert!(!manager.send(&ControlMessage::ManualCapture));

        manager.disconnect().await.unwrap();
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(matches!(next_event(&mut rx).await.event, ConnectionEvent::Close));
        drop(listener);
    }

    #[tokio::test]
    async fn disconnect_without_session_is_a_no_op() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut manager = ConnectionManager::new(tx);
        manager.disconnect().await.unwrap();
        manager.disconnect().await.unwrap();
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(!manager.send(&ControlMessage::RunBenchmark));
    }
}
