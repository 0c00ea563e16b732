use thiserror::Error;

/// Schema version stamped on every cached analysis record.
///
/// Bump whenever the color, composition or face derivations change so that
/// stale records are re-analyzed instead of silently reused.
pub const ANALYSIS_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SmartFillError {
    #[error("Failed to decode photo {photo_id}: {reason}")]
    DecodeFailure { photo_id: String, reason: String },

    #[error("Face model unavailable: {0}")]
    ModelLoadFailure(String),

    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Analysis worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Photo library error: {0}")]
    Library(String),
}

impl From<serde_json::Error> for SmartFillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SmartFillError>;
