use thiserror::Error;

/// Top-level error type for domain rules.
///
/// Messages are written for the portal user; the API surfaces them verbatim.
#[derive(Error, Debug)]
pub enum FlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{label} with id {id} not found")]
    NotFound { label: String, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("You are not permitted to run this mutation")]
    Forbidden,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlError {
    pub fn not_found(label: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            label: label.into(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlError>;
