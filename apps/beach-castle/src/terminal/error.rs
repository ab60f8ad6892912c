use crate::pipeline::PipelineError;
use crate::telemetry::logging::InitError;
use crate::transport::TransportError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
    #[error("{0}")]
    Connect(#[from] TransportError),
    #[error("terminal setup failed: {0}")]
    Terminal(io::Error),
    #[error("{0}")]
    Session(#[from] PipelineError),
}
