use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The add-story slot was targeted as if it were a story.
    #[error("reel slot is not playable")]
    NotPlayable,

    #[error("reel driver has shut down")]
    DriverClosed,
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::UnprocessableEntity(errors.to_string())
    }
}
