use thiserror::Error;

/// Failures the session components can hit. Each one is contained where it
/// happens: logged, and at most reflected as a connectivity flip.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    #[error("frame decode failed: {0}")]
    DecodeFailure(#[from] FrameDecodeError),

    #[error("gallery request failed: {0}")]
    CollaboratorFetch(#[from] reqwest::Error),

    #[error("gallery responded with status {0}")]
    CollaboratorStatus(u16),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid image data: {0}")]
    Image(#[from] image::ImageError),
}

impl SessionError {
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            SessionError::CollaboratorFetch(_) | SessionError::CollaboratorStatus(_)
        )
    }
}
