use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Collaborator '{name}' failed: {reason}")]
    Collaborator { name: String, reason: String },
}

impl Error {
    pub fn collaborator(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Collaborator { name: name.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
