use thiserror::Error;

/// Failures inside the table of contents. None of these ever reach the reader;
/// callers at the browser boundary log them and fall back.
#[derive(Debug, Error)]
pub enum TocError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("preference storage is unavailable")]
    StorageUnavailable,

    #[error("preference storage error: {0}")]
    Storage(String),

    #[error("page element `{0}` not found")]
    MissingElement(String),
}

pub type TocResult<T> = Result<T, TocError>;
