use db::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not signed in")]
    Unauthenticated,
    #[error("{0}")]
    Rejected(String),
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Json(err) => StoreError::Serde(err),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
