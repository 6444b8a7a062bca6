use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid document at {location}: {reason}")]
    Parse { location: String, reason: String },

    #[error("no location: {0}")]
    NoLocation(&'static str),

    #[error("unresolved template field: {0}")]
    UnresolvedField(String),

    #[error("expected at most one '{rel}' link, found {count}")]
    MultipleLinks { rel: String, count: usize },

    #[error("timestamp parse error: {0}")]
    Timestamp(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// True for the recoverable "document is simply absent" case, as opposed
    /// to a malformed document or a failed transfer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
