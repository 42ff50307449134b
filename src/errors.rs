use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No response from server")]
    NoResponse,
    #[error("Connection reset by peer")]
    ConnectionReset,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Please wait {remaining} before making this request again")]
    CooldownActive { remaining: String },
    #[error("A photo is required for {0} requests")]
    PhotoRequired(String),
    #[error("Clearing all requests is disabled")]
    BulkClearDisabled,
    #[error("Cannot parse config: {0}")]
    Config(String),
    #[error("Worker pool is shut down")]
    PoolClosed,
    #[error("Server responded with {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP parse error: {0}")]
    Http(#[from] httparse::Error),
    #[error("Routing error: {0}")]
    Route(#[from] matchit::InsertError),
}

impl Error {
    /// HTTP status code used when this error reaches a client
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::BadRequest(_) | Error::PhotoRequired(_) | Error::Json(_) | Error::Http(_) => {
                400
            }
            Error::BulkClearDisabled => 403,
            Error::Conflict(_) => 409,
            Error::CooldownActive { .. } => 429,
            Error::Remote { status, .. } => *status,
            _ => 500,
        }
    }
}
