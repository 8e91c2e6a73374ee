//! Worker error types.

use thiserror::Error;

use reel_models::TransitionError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Illegal status change: {0}")]
    Transition(#[from] TransitionError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    Store(reel_store::StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Voice error: {0}")]
    Voice(#[from] reel_voice::VoiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reel_store::StoreError> for WorkerError {
    fn from(err: reel_store::StoreError) -> Self {
        match err {
            reel_store::StoreError::NotFound(id) => WorkerError::NotFound(id),
            reel_store::StoreError::AlreadyExists(id) => WorkerError::AlreadyExists(id),
            other => WorkerError::Store(other),
        }
    }
}

impl WorkerError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkerError::NotFound(_))
    }

    /// Infrastructure errors after which the poll loop may try the job again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::Store(_) | WorkerError::Storage(_) | WorkerError::Io(_)
        )
    }
}
