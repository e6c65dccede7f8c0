use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Result alias for Realtime Database operations.
pub type RtdbResult<T> = Result<T, RtdbDaoError>;

/// Errors raised by the Realtime Database backend.
#[derive(Debug, Error)]
pub enum RtdbDaoError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuilder {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never reached the database.
    #[error("request to `{path}` failed")]
    RequestSend {
        /// Tree path of the failed request.
        path: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The database answered with a non-success status.
    #[error("request to `{path}` returned status {status}")]
    RequestStatus {
        /// Tree path of the failed request.
        path: String,
        /// Status the database answered with.
        status: StatusCode,
    },
    /// The response body was not the JSON shape expected at the path.
    #[error("failed to decode response from `{path}`")]
    DecodeResponse {
        /// Tree path of the failed request.
        path: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

impl From<RtdbDaoError> for StorageError {
    fn from(err: RtdbDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
