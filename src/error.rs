use crate::observer::ObserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrollTimingError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV Writing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Trace Error: unknown node '{0}'")]
    UnknownNode(String),

    #[error("Trace Error: {0}")]
    Trace(String),

    #[error("Background context unavailable: {0}")]
    BackgroundUnavailable(String),

    #[error("Observer registration failed: {0}")]
    Registration(#[from] ObserveError),
}

pub type StResult<T> = Result<T, ScrollTimingError>;
