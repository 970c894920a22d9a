use thiserror::Error;

/// Errors that can occur while configuring or running a recording session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("recorder is not initialized")]
    NotInitialized,

    #[error("already recording")]
    AlreadyRecording,

    #[error("audio engine is owned by another session")]
    EngineBusy,

    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for RecordError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}
