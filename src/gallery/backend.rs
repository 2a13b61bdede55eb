use std::{future::Future, pin::Pin};

use anyhow::Context;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::SessionError;

pub type GalleryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + Send + 'a>>;

/// The capture collection the backend exposes over REST.
pub trait GalleryBackend: Send + Sync {
    /// Filenames, in the order the backend lists them (newest first).
    fn list(&self) -> GalleryFuture<'_, Vec<String>>;
    fn delete<'a>(&'a self, filename: &'a str) -> GalleryFuture<'a, ()>;
    fn delete_all(&self) -> GalleryFuture<'_, ()>;
}

#[derive(Deserialize)]
struct CaptureListing {
    images: Vec<String>,
}

/// `GET/DELETE /api/captures` against the configured origin.
pub struct HttpGallery {
    client: Client,
    config: ClientConfig,
}

impl HttpGallery {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed to build gallery HTTP client")?;
        Ok(Self { client, config })
    }
}

impl GalleryBackend for HttpGallery {
    fn list(&self) -> GalleryFuture<'_, Vec<String>> {
        Box::pin(async move {
            let url = self.config.captures_api()?;
            let response = check_status(self.client.get(url).send().await?)?;
            let listing: CaptureListing = response.json().await?;
            Ok(listing.images)
        })
    }

    fn delete<'a>(&'a self, filename: &'a str) -> GalleryFuture<'a, ()> {
        Box::pin(async move {
            let url = self.config.capture_api(filename)?;
            check_status(self.client.delete(url).send().await?)?;
            Ok(())
        })
    }

    fn delete_all(&self) -> GalleryFuture<'_, ()> {
        Box::pin(async move {
            let url = self.config.captures_api()?;
            check_status(self.client.delete(url).send().await?)?;
            Ok(())
        })
    }
}

fn check_status(response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SessionError::CollaboratorStatus(status.as_u16()))
    }
}
