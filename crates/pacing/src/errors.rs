use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PacingError {
    #[error("Invalid course: {0}")]
    InvalidCourse(String),

    #[error("Invalid rider: {0}")]
    InvalidRider(String),

    #[error("Invalid reward policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid simulation setting: {0}")]
    InvalidSimulation(String),
}
