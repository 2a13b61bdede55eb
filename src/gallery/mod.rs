pub mod backend;

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::events::{emit, UiEmitter, GALLERY_UPDATED};

pub use backend::{GalleryBackend, GalleryFuture, HttpGallery};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    pub filename: String,
    pub url: String,
}

/// Last-known view of the capture collection.
///
/// The session only ever asks for a refresh; deletes come from the gallery
/// UI. A failed request keeps whatever was fetched last.
#[derive(Clone)]
pub struct Gallery {
    backend: Arc<dyn GalleryBackend>,
    config: Arc<ClientConfig>,
    images: Arc<Mutex<Vec<GalleryImage>>>,
    emitter: Arc<dyn UiEmitter>,
}

impl Gallery {
    pub fn new(
        backend: Arc<dyn GalleryBackend>,
        config: Arc<ClientConfig>,
        emitter: Arc<dyn UiEmitter>,
    ) -> Self {
        Self {
            backend,
            config,
            images: Arc::new(Mutex::new(Vec::new())),
            emitter,
        }
    }

    pub async fn images(&self) -> Vec<GalleryImage> {
        self.images.lock().await.clone()
    }

    pub async fn refresh(&self) -> Result<Vec<GalleryImage>, SessionError> {
        let filenames = match self.backend.list().await {
            Ok(filenames) => filenames,
            Err(err) => {
                log::error!("Failed to fetch gallery images: {err}");
                return Err(err);
            }
        };

        let images: Vec<GalleryImage> = filenames
            .into_iter()
            .filter_map(|filename| match self.config.capture_asset(&filename) {
                Ok(url) => Some(GalleryImage {
                    filename,
                    url: url.to_string(),
                }),
                Err(err) => {
                    log::warn!("Skipping capture {filename}: {err}");
                    None
                }
            })
            .collect();

        *self.images.lock().await = images.clone();
        emit(self.emitter.as_ref(), GALLERY_UPDATED, &images);
        Ok(images)
    }

    /// Refetches after `delay` without blocking the caller.
    pub fn schedule_refresh(&self, delay: Duration) -> JoinHandle<()> {
        let gallery = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = gallery.refresh().await;
        })
    }

    pub async fn delete(&self, filename: &str) -> Result<Vec<GalleryImage>, SessionError> {
        if let Err(err) = self.backend.delete(filename).await {
            log::error!("Failed to delete capture {filename}: {err}");
            return Err(err);
        }
        self.refresh().await
    }

    pub async fn delete_all(&self) -> Result<Vec<GalleryImage>, SessionError> {
        if let Err(err) = self.backend.delete_all().await {
            log::error!("Failed to delete all captures: {err}");
            return Err(err);
        }
        self.refresh().await
    }
}
