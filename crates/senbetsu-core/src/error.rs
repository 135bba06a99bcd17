use thiserror::Error;

#[derive(Debug, Error)]
pub enum SenbetsuError {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("feed error: {0}")]
    Feed(String),

    /// A rejection specification was registered without rejection text.
    /// This is a programming error and is never converted into a rejection.
    #[error("specification '{0}' has no rejection reason")]
    MissingRejectionReason(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
