use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid version range: {0}")]
    InvalidVersionRange(String),

    #[error("Invalid artifact coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid exclusion pattern: {0}")]
    InvalidExclusion(String),
}
