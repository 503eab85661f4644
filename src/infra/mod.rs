//! Infrastructure: credential persistence and telemetry wiring.

pub mod credentials;
pub mod error;
pub mod telemetry;
