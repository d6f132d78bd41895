//! Unified error types for folio.

use tokio_rusqlite::rusqlite;

/// Unified error types shared by the server, the CLI and the link repairer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a zero image dimension).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A record or stored file does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// No authenticated user on the request.
    #[error("UNAUTHORIZED")]
    Unauthorized,

    /// The authenticated user lacks the required privilege.
    #[error("FORBIDDEN: {0}")]
    Forbidden(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A storage backend failed to read or write.
    #[error("STORAGE_ERROR: {0}")]
    Storage(String),

    /// Image decode, transform or encode failed.
    #[error("IMAGE_ERROR: {0}")]
    Image(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response or network failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),
}

impl Error {
    /// True for errors caused by the remote end or the network, which the
    /// link repairer records per link instead of aborting.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::HttpError(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}
