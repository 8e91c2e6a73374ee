//! Voice client error types.

use thiserror::Error;

pub type VoiceResult<T> = Result<T, VoiceError>;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Voice API key is not configured")]
    NotConfigured,

    #[error("Voice API rejected the API key")]
    Unauthorized,

    #[error("Voice API rate limit exceeded")]
    RateLimited,

    #[error("Voice API unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Voice API returned an empty audio body")]
    EmptyAudio,

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Writing audio failed: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VoiceError::RateLimited
                | VoiceError::ServiceUnavailable(_)
                | VoiceError::Timeout(_)
                | VoiceError::Network(_)
        )
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => VoiceError::Unauthorized,
            429 => VoiceError::RateLimited,
            500..=599 => VoiceError::ServiceUnavailable(format!("status {}: {}", status, body)),
            _ => VoiceError::RequestFailed { status, body },
        }
    }
}
