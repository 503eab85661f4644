use std::collections::HashMap;

use thiserror::Error;

use crate::infra::error::CredentialError;

/// Errors surfaced by the API gateway.
///
/// The gateway never retries; every failure is reported to the caller after
/// any credential side effects (401 handling) have already run.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("credential storage failure: {0}")]
    Credentials(#[from] CredentialError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("request rejected: {message}")]
    Validation {
        message: String,
        /// Field name to list of rejection reasons, as sent by the server.
        errors: HashMap<String, Vec<String>>,
    },
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("malformed response: {message}")]
    Decode { message: String },
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>, errors: HashMap<String, Vec<String>>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// True when the failure is a client-side rejection (4xx) rather than a
    /// transport or server fault.
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Unauthorized { .. } | Self::Validation { .. } => true,
            Self::Server { status, .. } => *status < 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_keeps_field_map() {
        let mut errors = HashMap::new();
        errors.insert("email".to_string(), vec!["already taken".to_string()]);
        let err = ApiError::validation("invalid input", errors);

        match err {
            ApiError::Validation { message, errors } => {
                assert_eq!(message, "invalid input");
                assert_eq!(errors["email"], vec!["already taken".to_string()]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn server_error_formats_status() {
        let err = ApiError::server(503, "maintenance");
        assert_eq!(err.to_string(), "server error (status 503): maintenance");
    }
}
