//! Error taxonomy for the Easee cloud client.
//!
//! The split matters for the token engine: [`EaseeError::AuthExpired`] means
//! the refresh token pair was rejected outright and a fresh login is the only
//! way forward, while [`EaseeError::Network`] covers transient failures that
//! are worth retrying with backoff. Callers of the token manager never see
//! these directly; the manager classifies them internally and exposes a
//! boolean outcome plus a status value.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EaseeError {
    /// Credentials missing or malformed. Never retried.
    #[error("invalid credentials: {message}")]
    Validation {
        message: String,
        /// Which credential field failed, when a single one can be named.
        field: Option<&'static str>,
    },

    /// The server rejected the access/refresh token pair (HTTP 401 or an
    /// explicit invalid-token body). Triggers a fresh login, not a retry.
    #[error("refresh token rejected by server")]
    AuthExpired,

    /// Transport-layer failure (timeout, connection refused, DNS). Transient,
    /// retried with bounded backoff.
    #[error("network error: {0}")]
    Network(String),

    /// Retry budget exhausted. All token state has been cleared; the account
    /// must be reconfigured before anything else will work.
    #[error("authentication failed - reconfiguration required")]
    TerminalAuth,

    /// Authentication was required for a call but could not be established.
    #[error("not authenticated against the Easee cloud")]
    NotAuthenticated,

    /// Non-auth HTTP error from the REST API.
    #[error("Easee API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// A required charger/site/circuit parameter could not be resolved from
    /// any of its supply points. The message names all of them.
    #[error("{0}")]
    MissingParameter(String),

    #[error("unknown command topic: {0}")]
    UnknownTopic(String),

    #[error("streaming connection error: {0}")]
    Stream(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for EaseeError {
    fn from(err: reqwest::Error) -> Self {
        EaseeError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EaseeError>;
