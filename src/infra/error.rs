use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

/// Failures of the bearer credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential path unavailable: {message}")]
    Path { message: String },
}

impl CredentialError {
    pub fn path(message: impl Into<String>) -> Self {
        Self::Path {
            message: message.into(),
        }
    }
}
