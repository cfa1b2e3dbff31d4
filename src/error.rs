// ⚠️ Store errors - what a persistence adapter can fail with

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Upstream answered 2xx but the body was not JSON.
    #[error("upstream response is not JSON")]
    NotJson { raw: String },

    #[error("{0} backend is not configured")]
    NotConfigured(&'static str),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Raw upstream payload, kept for diagnostics.
    pub fn details(&self) -> Option<&str> {
        match self {
            StoreError::Upstream { body, .. } => Some(body),
            StoreError::NotJson { raw } => Some(raw),
            _ => None,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}
