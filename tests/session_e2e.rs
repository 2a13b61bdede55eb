use std::io::Cursor;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::{SinkExt, StreamExt};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use smilage_lib::gallery::GalleryFuture;
use smilage_lib::notify::{CAPTURED_TEXT, SMILE_TEXT};
use smilage_lib::session::{BenchmarkStatus, ConnectionStatus};
use smilage_lib::{ChannelEmitter, ClientConfig, GalleryBackend, SessionController};

/// In-memory capture listing that counts how often it is fetched.
#[derive(Default)]
struct CountingGallery {
    list_calls: AtomicUsize,
}

impl GalleryBackend for CountingGallery {
    fn list(&self) -> GalleryFuture<'_, Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(vec!["selfie_20240101_120000.jpg".to_string()]) })
    }

    fn delete<'a>(&'a self, _filename: &'a str) -> GalleryFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn delete_all(&self) -> GalleryFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

enum ServerCommand {
    Send(Value),
    SendRaw(String),
    Close,
}

/// One-connection stand-in for the inference service.
struct FakeService {
    origin: Url,
    commands: mpsc::UnboundedSender<ServerCommand>,
    received: mpsc::UnboundedReceiver<Value>,
}

impl FakeService {
    async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (commands, mut commands_rx) = mpsc::unbounded_channel();
        let (received_tx, received) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

            loop {
                tokio::select! {
                    command = commands_rx.recv() => match command {
                        Some(ServerCommand::Send(value)) => {
                            socket.send(Message::text(value.to_string())).await.unwrap();
                        }
                        Some(ServerCommand::SendRaw(raw)) => {
                            socket.send(Message::text(raw)).await.unwrap();
                        }
                        Some(ServerCommand::Close) | None => {
                            let _ = socket.close(None).await;
                            break;
                        }
                    },
                    incoming = socket.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let value: Value = serde_json::from_str(text.as_str()).unwrap();
                            let _ = received_tx.send(value);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    },
                }
            }
        });

        Self {
            origin: Url::parse(&format!("http://{addr}")).unwrap(),
            commands,
            received,
        }
    }

    fn send(&self, value: Value) {
        self.commands.send(ServerCommand::Send(value)).unwrap();
    }

    fn send_raw(&self, raw: &str) {
        self.commands
            .send(ServerCommand::SendRaw(raw.to_string()))
            .unwrap();
    }

    fn close(&self) {
        self.commands.send(ServerCommand::Close).unwrap();
    }

    async fn next_control(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .expect("no control message arrived")
            .expect("service stopped")
    }
}

fn encoded_jpeg(width: u32, height: u32) -> String {
    let frame = RgbImage::from_pixel(width, height, Rgb([90, 160, 220]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(frame)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    format!("data:image/jpeg;base64,{}", STANDARD.encode(buffer.into_inner()))
}

async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn connected_session() -> (
    SessionController,
    FakeService,
    Arc<CountingGallery>,
    mpsc::UnboundedReceiver<(String, Value)>,
) {
    let service = FakeService::spawn().await;
    let backend = Arc::new(CountingGallery::default());
    let (emitter, ui_events) = ChannelEmitter::new();
    let controller = SessionController::new(
        ClientConfig::new(service.origin.clone()),
        backend.clone(),
        Arc::new(emitter),
    );

    controller.start().await.unwrap();
    eventually("session to connect", || async {
        controller.snapshot().await.is_connected
    })
    .await;

    (controller, service, backend, ui_events)
}

#[tokio::test]
async fn smile_shows_overlay_then_clears() {
    let (controller, service, _backend, _ui) = connected_session().await;

    service.send(json!({
        "predictions": {
            "emotion": "happiness",
            "age": 27,
            "gender": "female",
            "smile_score": 0.92,
            "is_blurry": false
        },
        "is_smiling": true
    }));

    eventually("smile overlay", || async {
        controller.overlay().await.map(|n| n.text) == Some(SMILE_TEXT.to_string())
    })
    .await;

    let predictions = controller.snapshot().await.predictions;
    assert_eq!(predictions.emotion, "happiness");
    assert_eq!(predictions.smile_score, 0.92);

    tokio::time::sleep(Duration::from_millis(1700)).await;
    assert_eq!(controller.overlay().await, None);

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn capture_overlays_and_refreshes_gallery() {
    let (controller, service, backend, _ui) = connected_session().await;
    let calls_before = backend.list_calls.load(Ordering::SeqCst);

    service.send(json!({ "capture": true, "is_smiling": true }));

    eventually("capture overlay", || async {
        controller.overlay().await.map(|n| n.text) == Some(CAPTURED_TEXT.to_string())
    })
    .await;
    assert_eq!(backend.list_calls.load(Ordering::SeqCst), calls_before);

    eventually("gallery refresh", || async {
        backend.list_calls.load(Ordering::SeqCst) > calls_before
    })
    .await;
    assert_eq!(controller.gallery().images().await.len(), 1);

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn control_messages_reach_the_service() {
    let (controller, mut service, _backend, _ui) = connected_session().await;

    assert!(controller.manual_capture().await);
    assert_eq!(service.next_control().await, json!({ "action": "manual_capture" }));

    assert!(controller.run_benchmark().await);
    assert_eq!(service.next_control().await, json!({ "action": "run_benchmark" }));
    let benchmark = controller.snapshot().await.benchmark;
    assert_eq!(benchmark.status(), BenchmarkStatus::Running);
    assert_eq!(benchmark.progress(), 0.01);

    controller
        .update_setting(smilage_lib::SettingChange::SmileThreshold(0.8))
        .await
        .unwrap();
    let update = service.next_control().await;
    assert_eq!(update["action"], "update_threshold");
    assert_eq!(update["value"], 0.8);

    service.send(json!({ "benchmark_progress": 0.5 }));
    eventually("benchmark progress", || async {
        controller.snapshot().await.benchmark.progress() == 0.5
    })
    .await;

    service.send(json!({
        "benchmark_results": {
            "avg_cpu": 41.0,
            "avg_mem": 22.5,
            "avg_frame_time_ms": 18.4,
            "fps": 29.7
        }
    }));
    eventually("benchmark results", || async {
        controller.snapshot().await.benchmark.status() == BenchmarkStatus::Done
    })
    .await;
    assert_eq!(controller.snapshot().await.benchmark.progress(), 0.0);

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn frames_draw_and_server_close_clears_the_surface() {
    let (controller, service, _backend, mut ui) = connected_session().await;

    service.send(json!({ "frame": encoded_jpeg(32, 24) }));
    eventually("frame to draw", || async {
        !controller.pipeline().is_empty()
    })
    .await;
    assert_eq!(controller.pipeline().with_surface(|s| s.dimensions()), (32, 24));

    service.close();
    eventually("session to close", || async {
        controller.snapshot().await.connection == ConnectionStatus::Disconnected
    })
    .await;

    assert!(controller.pipeline().is_empty());
    let snapshot = controller.snapshot().await;
    assert!(!snapshot.is_connected);
    assert_eq!(snapshot.predictions, Default::default());

    let mut saw_clear = false;
    while let Ok((event, _)) = ui.try_recv() {
        saw_clear |= event == "surface-cleared";
    }
    assert!(saw_clear);

    // No reconnect: intents are dropped until a new session starts.
    assert!(!controller.manual_capture().await);
}

#[tokio::test]
async fn malformed_message_keeps_the_session_alive() {
    let (controller, service, _backend, _ui) = connected_session().await;

    service.send_raw("{not json");
    service.send(json!({ "predictions": { "emotion": "surprise" } }));

    eventually("predictions after malformed message", || async {
        controller.snapshot().await.predictions.emotion == "surprise"
    })
    .await;
    assert!(controller.snapshot().await.is_connected);

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn stop_clears_the_drawn_frame_and_predictions() {
    let (controller, service, _backend, _ui) = connected_session().await;

    service.send(json!({
        "frame": encoded_jpeg(20, 10),
        "predictions": { "emotion": "happiness", "smile_score": 0.81 }
    }));
    eventually("frame and predictions", || async {
        !controller.pipeline().is_empty()
            && controller.snapshot().await.predictions.emotion == "happiness"
    })
    .await;

    controller.stop().await.unwrap();

    assert!(controller.pipeline().is_empty());
    let snapshot = controller.snapshot().await;
    assert!(!snapshot.is_connected);
    assert_eq!(snapshot.connection, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.session_id, None);
    assert_eq!(snapshot.predictions, Default::default());
    assert!(!controller.manual_capture().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_right_after_peer_close_starts_clean() {
    let (controller, service, _backend, _ui) = connected_session().await;
    let first = controller.snapshot().await.session_id;

    service.send(json!({
        "frame": encoded_jpeg(16, 16),
        "predictions": { "emotion": "happiness" }
    }));
    eventually("frame and predictions", || async {
        !controller.pipeline().is_empty()
            && controller.snapshot().await.predictions.emotion == "happiness"
    })
    .await;

    // Restart as soon as the transport lets us, racing the Close handling.
    service.close();
    let mut restarted = None;
    for _ in 0..5000 {
        let snapshot = controller.start().await.unwrap();
        if snapshot.session_id.is_some() && snapshot.session_id != first {
            restarted = Some(snapshot);
            break;
        }
        tokio::task::yield_now().await;
    }
    let snapshot = restarted.expect("a new session started");

    assert!(!snapshot.is_connected);
    assert_eq!(snapshot.predictions, Default::default());
    assert!(controller.pipeline().is_empty());

    controller.stop().await.unwrap();
}
