use thiserror::Error;

/// Failure surfaced to the dashboard.
///
/// The `Display` output is the single message shown in place of the content
/// area, so every variant carries text that is already user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// Empty or too-short input, rejected before any network call.
    #[error("{0}")]
    InputValidation(String),

    #[error("{0}")]
    TransportFailure(String),

    /// The proxy or the provider reported a failure.
    #[error("{0}")]
    UpstreamFailure(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Failure talking to the weather provider from the proxy side.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Malformed response from weather provider: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// HTTP status reported by the provider, `0` when it was never reached.
    pub fn http_code(&self) -> u16 {
        match self {
            ProviderError::Upstream { status, .. } => *status,
            ProviderError::Connection(_) | ProviderError::Malformed(_) => 0,
        }
    }
}

/// Failure persisting to the local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
