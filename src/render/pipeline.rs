use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::FrameDecodeError;
use crate::events::{emit, UiEmitter, FRAME_RENDERED, SURFACE_CLEARED};

use super::RasterSurface;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameRenderedEvent {
    width: u32,
    height: u32,
    frames_drawn: u64,
}

/// Decodes frames off the event path and draws them onto the shared surface.
///
/// Decodes are independent tasks with no ordering among them: when an older
/// frame finishes decoding after a newer one, the older one is drawn last.
/// For a live preview the next frame supersedes it within one frame interval,
/// which is cheaper than holding frames back to order them.
///
/// Clearing bumps an epoch so decodes started before the clear are discarded
/// instead of repainting a closed session.
#[derive(Clone)]
pub struct FramePipeline {
    surface: Arc<Mutex<RasterSurface>>,
    epoch: Arc<AtomicU64>,
    emitter: Arc<dyn UiEmitter>,
}

impl FramePipeline {
    pub fn new(emitter: Arc<dyn UiEmitter>) -> Self {
        Self {
            surface: Arc::new(Mutex::new(RasterSurface::new())),
            epoch: Arc::new(AtomicU64::new(0)),
            emitter,
        }
    }

    /// Fire-and-forget; the handle is only useful to callers that want to
    /// wait for this particular frame.
    pub fn render(&self, encoded: String) -> JoinHandle<()> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let pipeline = self.clone();

        tokio::spawn(async move {
            let decoded = match tokio::task::spawn_blocking(move || decode_frame(&encoded)).await
            {
                Ok(result) => result,
                Err(err) => {
                    log_error!("frame decode worker join failed: {err}");
                    return;
                }
            };

            match decoded {
                Ok(frame) => pipeline.draw(epoch, frame),
                Err(err) => log_debug!("Skipping frame: {err}"),
            }
        })
    }

    /// Synchronous so the surface is blank before close handling returns.
    pub fn clear(&self) {
        {
            let mut surface = lock_surface(&self.surface);
            self.epoch.fetch_add(1, Ordering::SeqCst);
            surface.clear();
        }
        emit(self.emitter.as_ref(), SURFACE_CLEARED, &());
    }

    pub fn with_surface<R>(&self, read: impl FnOnce(&RasterSurface) -> R) -> R {
        read(&lock_surface(&self.surface))
    }

    pub fn is_empty(&self) -> bool {
        self.with_surface(RasterSurface::is_empty)
    }

    fn draw(&self, epoch: u64, frame: RgbaImage) {
        let payload = {
            let mut surface = lock_surface(&self.surface);
            if self.epoch.load(Ordering::SeqCst) != epoch {
                log_debug!("Discarding frame decoded for a closed session");
                return;
            }
            let (width, height) = frame.dimensions();
            surface.draw(frame);
            FrameRenderedEvent {
                width,
                height,
                frames_drawn: surface.frames_drawn(),
            }
        };

        emit(self.emitter.as_ref(), FRAME_RENDERED, &payload);
    }
}

pub fn decode_frame(encoded: &str) -> Result<RgbaImage, FrameDecodeError> {
    let encoded = encoded.trim();
    let encoded = encoded.strip_prefix(DATA_URL_PREFIX).unwrap_or(encoded);
    let bytes = STANDARD.decode(encoded)?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?;
    Ok(image.to_rgba8())
}

fn lock_surface(surface: &Mutex<RasterSurface>) -> MutexGuard<'_, RasterSurface> {
    match surface.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
