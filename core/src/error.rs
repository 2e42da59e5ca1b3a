//! Error types for the Game API client.
//!
//! # Design
//! Build-time failures (`MissingCredentials`, `NotLoggedIn`,
//! `InvalidArgument`) are reported before anything is signed, so a request
//! that would certainly be rejected never reaches the network. `Rejected`
//! carries the API's own `message` when the response reports
//! `success: false`; every other non-2xx response lands in `HttpError` with
//! the raw status and body for debugging.

use crate::types::Action;

/// Errors returned by `GameJoltClient` build and handle methods.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The game id or private key has not been configured.
    #[error("missing game credentials: {0} is not set")]
    MissingCredentials(&'static str),

    /// The operation requires an authenticated user.
    #[error("user is not logged in")]
    NotLoggedIn,

    /// A caller-supplied argument cannot produce a valid request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The HTTP round trip itself failed (DNS, TLS, connection reset, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be parsed.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A field the response kind requires was absent.
    #[error("response field missing: {0}")]
    MissingField(&'static str),

    /// The API answered with `success: false`.
    #[error("{action} was rejected: {message}")]
    Rejected { action: Action, message: String },

    /// The credentials file exists but is malformed.
    #[error("invalid credentials file: {0}")]
    Credentials(String),

    /// The configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ApiError {
    fn from(err: toml::de::Error) -> Self {
        ApiError::Config(err.to_string())
    }
}
