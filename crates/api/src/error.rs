use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid consumer key")]
    InvalidIdentity,

    #[error("Failed to bind callback listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authorization service rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Callback listener closed before the redirect arrived")]
    ListenerClosed,

    #[error("Redirect signal already consumed")]
    SignalConsumed,

    #[error("Timed out after {0:?} waiting for browser authorization")]
    Timeout(Duration),

    #[error("Authorization cancelled")]
    Cancelled,
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidIdentity => "No usable consumer key is configured.",
            AuthError::Bind(_) => "Could not open a local port for the authorization redirect.",
            AuthError::Network(_) => "Network error. Check your connection.",
            AuthError::Rejected { .. } => "Pocket rejected the authorization request.",
            AuthError::Url(_) => "Could not build the authorization URL.",
            AuthError::ListenerClosed | AuthError::SignalConsumed => {
                "The local authorization listener stopped unexpectedly."
            }
            AuthError::Timeout(_) => "Authorization was not completed in time.",
            AuthError::Cancelled => "Authorization was cancelled.",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing, unreadable, or undecodable. Callers treat all of these as "no credential".
    #[error("Credential store {path} unavailable: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("Failed to write credential store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Rate limited. Retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => {
                "Authentication failed. Delete the credential cache to re-authorize."
            }
            ApiError::RateLimited { .. } => "Rate limited. Please slow down.",
            ApiError::Network(_) => "Network error. Check your connection.",
            ApiError::Api { .. } => "Server error. Please try again later.",
            ApiError::Decode(_) => "Pocket returned a response this client does not understand.",
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
