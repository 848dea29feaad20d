use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Request body must be a JSON object")]
    InvalidBody,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("This endpoint is for revision requests (round 2)")]
    NotRevision,

    #[error("Build queue is full")]
    QueueFull,

    #[error("Failed to create repository: {0}")]
    RepositoryCreate(String),

    /// Non-success answer from the hosting API
    #[error("GitHub returned {status}: {body}")]
    Hosting { status: u16, body: String },

    #[error("Build cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    /// Errors caused by the caller's request rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_)
                | Error::InvalidField { .. }
                | Error::InvalidBody
                | Error::NotRevision
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
