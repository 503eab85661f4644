#![deny(clippy::all, clippy::pedantic)]

use thiserror::Error;

use piazza_client::client::{ClientError, PiazzaClient};
use piazza_client::config::{LoadError, Settings};
use piazza_client::infra::error::InfraError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] LoadError),
    #[error("telemetry setup failed: {0}")]
    Telemetry(#[from] InfraError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    #[error("request failed: {0}")]
    Api(#[from] piazza_client::api::ApiError),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

pub fn build_client(settings: &Settings) -> Result<PiazzaClient, CliError> {
    Ok(PiazzaClient::new(settings)?)
}
