use pacing::PacingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperienceError {
    #[error("Invalid batch size: requested {requested}, buffer holds {available}")]
    InvalidBatchSize { requested: usize, available: usize },

    #[error("Exploration rate must be within [0, 1], got {0}")]
    InvalidEpsilon(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Simulation error: {0}")]
    Pacing(#[from] PacingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
