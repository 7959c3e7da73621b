#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("{endpoint} rejected the request: {reason}")]
    Rejected {
        endpoint: &'static str,
        reason: String,
    },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn rejected(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            endpoint,
            reason: reason.into(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
