//! Error types for the authenticated pipeline

use fridge_transport::TransportError;

/// Why a session renewal did not produce a new access token.
///
/// `Clone` because one failed renewal is delivered to every request that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenewalError {
    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("refresh token rejected: {0}")]
    Rejected(String),

    #[error("session renewal failed: {0}")]
    Failed(String),

    #[error("session renewal timed out: {0}")]
    TimedOut(String),

    #[error("credential store error during renewal: {0}")]
    Store(String),

    #[error("session renewal abandoned before it settled")]
    Abandoned,
}

impl RenewalError {
    /// Outcome label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RenewalError::MissingRefreshToken => "missing_refresh_token",
            RenewalError::Rejected(_) => "rejected",
            RenewalError::Failed(_) => "failed",
            RenewalError::TimedOut(_) => "timed_out",
            RenewalError::Store(_) => "store_error",
            RenewalError::Abandoned => "abandoned",
        }
    }
}

impl From<fridge_auth::Error> for RenewalError {
    fn from(e: fridge_auth::Error) -> Self {
        match e {
            fridge_auth::Error::InvalidCredentials(msg) => RenewalError::Rejected(msg),
            fridge_auth::Error::Timeout(msg) => RenewalError::TimedOut(msg),
            fridge_auth::Error::Io(msg) | fridge_auth::Error::CredentialParse(msg) => {
                RenewalError::Store(msg)
            }
            other => RenewalError::Failed(other.to_string()),
        }
    }
}

/// Errors surfaced to callers of the pipeline.
///
/// Non-2xx responses are not errors: they come back as `Ok(ApiResponse)`
/// for the caller to interpret.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("session expired: {0}")]
    SessionExpired(#[from] RenewalError),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Whether the caller should send the user back to login.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired(_))
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
