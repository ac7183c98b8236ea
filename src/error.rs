//! Error types for the graph-console application.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Device-code sign-in errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Device code request failed: {0}")]
    DeviceCodeFailed(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Device code expired before sign-in completed")]
    CodeExpired,

    #[error("User declined the sign-in request")]
    AccessDenied,

    #[error("Token response did not contain an access token")]
    NoAccessToken,

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Microsoft Graph call errors.
///
/// Non-2xx statuses are not errors at this level; callers inspect the status
/// of the returned response.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    GraphRequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Access token expired")]
    TokenExpired,

    #[error("Failed to access {path}: {source}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub(crate) fn local_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalFile {
            path: path.into(),
            source,
        }
    }
}

impl AppError {
    /// Wrap a configuration loading failure, keeping its context chain.
    pub fn config(err: &anyhow::Error) -> Self {
        Self::Config(format!("{:#}", err))
    }

    /// Returns a user-friendly message for the console.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Auth(AuthError::CodeExpired) => "Sign-in timed out. Please run the sample again.",
            Self::Auth(AuthError::AccessDenied) => "Sign-in was declined.",
            Self::Auth(AuthError::NoAccessToken) => "Sign-in did not return an access token.",
            Self::Auth(_) => "Sign-in failed. Please try again.",
            Self::Api(ApiError::TokenExpired) => "Authentication expired. Sign in again.",
            Self::Api(ApiError::LocalFile { .. }) => "Failed to read or write a local file.",
            Self::Api(_) => "Network error. Check your connection.",
            Self::Config(_) => "Configuration error. Please check config.toml.",
        }
    }

    /// Returns true if this error means the user has to sign in again.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::CodeExpired)
                | Self::Auth(AuthError::NoAccessToken)
                | Self::Api(ApiError::TokenExpired)
        )
    }
}
