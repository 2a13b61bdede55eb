use std::time::Duration;

use url::Url;

use crate::error::SessionError;

pub const ORIGIN_ENV: &str = "SMILAGE_ORIGIN";
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";

pub const VIDEO_STREAM_PATH: &str = "/ws/video";
pub const CAPTURES_API_PATH: &str = "/api/captures";
pub const CAPTURES_ASSET_PATH: &str = "/captures";

/// Where the client talks to and how long its transient effects last.
///
/// Every URL is derived from the page origin, the same way a browser page
/// would reach its own backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub origin: Url,
    /// Grace period between a capture event and the gallery refetch. The
    /// backend writes the file and announces the capture independently.
    pub gallery_refresh_delay: Duration,
    pub capture_overlay: Duration,
    pub smile_overlay: Duration,
    pub http_timeout: Duration,
}

impl ClientConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            gallery_refresh_delay: Duration::from_millis(500),
            capture_overlay: Duration::from_millis(2000),
            smile_overlay: Duration::from_millis(1500),
            http_timeout: Duration::from_secs(4),
        }
    }

    pub fn from_env() -> Result<Self, SessionError> {
        let raw = std::env::var(ORIGIN_ENV).unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());
        let origin = Url::parse(&raw)
            .map_err(|err| SessionError::InvalidEndpoint(format!("{raw}: {err}")))?;
        Ok(Self::new(origin))
    }

    /// `ws://` for plain origins, `wss://` for TLS ones.
    pub fn video_endpoint(&self) -> Result<Url, SessionError> {
        let scheme = match self.origin.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(SessionError::InvalidEndpoint(format!(
                    "unsupported origin scheme '{other}'"
                )))
            }
        };

        let mut endpoint = self.origin_path(VIDEO_STREAM_PATH)?;
        endpoint
            .set_scheme(scheme)
            .map_err(|_| SessionError::InvalidEndpoint(format!("cannot use scheme {scheme}")))?;
        Ok(endpoint)
    }

    pub fn captures_api(&self) -> Result<Url, SessionError> {
        self.origin_path(CAPTURES_API_PATH)
    }

    pub fn capture_api(&self, filename: &str) -> Result<Url, SessionError> {
        let mut url = self.captures_api()?;
        push_segment(&mut url, filename)?;
        Ok(url)
    }

    pub fn capture_asset(&self, filename: &str) -> Result<Url, SessionError> {
        let mut url = self.origin_path(CAPTURES_ASSET_PATH)?;
        push_segment(&mut url, filename)?;
        Ok(url)
    }

    fn origin_path(&self, path: &str) -> Result<Url, SessionError> {
        if self.origin.cannot_be_a_base() {
            return Err(SessionError::InvalidEndpoint(self.origin.to_string()));
        }
        let mut url = self.origin.clone();
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_ORIGIN).expect("DEFAULT_ORIGIN is a valid URL"))
    }
}

fn push_segment(url: &mut Url, segment: &str) -> Result<(), SessionError> {
    let display = url.to_string();
    url.path_segments_mut()
        .map_err(|_| SessionError::InvalidEndpoint(display))?
        .push(segment);
    Ok(())
}
