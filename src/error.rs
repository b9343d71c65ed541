//! Top-level error type for the command-line front end.
//!
//! Aggregates the per-layer errors and turns them into messages a user can
//! act on.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::walker::WalkerError;

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Errors raised while walking search results.
    #[error("{0}")]
    Walker(WalkerError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WalkerError> for AppError {
    fn from(err: WalkerError) -> Self {
        match err {
            WalkerError::Api(api) => AppError::Api(api),
            other => AppError::Walker(other),
        }
    }
}

impl AppError {
    /// A message suitable for showing to users, without technical detail.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file is readable."
                        .to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => format!("Profile '{}' not found.", name),
            },
            AppError::Api(e) => match e {
                ApiError::Unauthorized => {
                    "Authentication failed. Please check your email and API token.".to_string()
                }
                ApiError::Forbidden => {
                    "Access denied. You don't have permission to access this resource.".to_string()
                }
                ApiError::NotFound(resource) => format!("'{}' was not found.", resource),
                ApiError::RateLimited => {
                    "Too many requests. Please wait a moment and try again.".to_string()
                }
                ApiError::ServerError(_) => "JIRA server error. Please try again later.".to_string(),
                ApiError::Network(_) => {
                    "Connection failed. Please check your internet connection.".to_string()
                }
                ApiError::InvalidUrl(url) => format!("Invalid JIRA URL '{}'.", url),
                ApiError::Keyring(_) => {
                    "Could not access secure storage. Please log in again.".to_string()
                }
                ApiError::InvalidResponse(_) => {
                    "Unexpected response from JIRA. Please try again.".to_string()
                }
                ApiError::ConnectionFailed(_) => {
                    "Could not connect to JIRA. Please check your URL and network.".to_string()
                }
                ApiError::Conflict => {
                    "The resource was modified by someone else. Please try again.".to_string()
                }
                ApiError::Runtime(_) => "Could not start the HTTP runtime.".to_string(),
            },
            AppError::Walker(e) => match e {
                WalkerError::Transform(err) => format!("Could not format an issue: {}", err),
                other => other.to_string(),
            },
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
        }
    }

    /// Whether the error prevents any further work until the user acts.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Api(ApiError::Unauthorized)
                | AppError::Api(ApiError::Forbidden)
                | AppError::Api(ApiError::Keyring(_))
        )
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Config(ConfigError::ProfileNotFound(_))
            | AppError::Api(ApiError::Keyring(_)) => {
                Some("Run 'jira-walker login' to configure a profile.")
            }
            AppError::Api(ApiError::Unauthorized) => Some(
                "Check your API token at https://id.atlassian.com/manage-profile/security/api-tokens",
            ),
            AppError::Api(ApiError::RateLimited) => Some("Wait a few seconds and try again."),
            AppError::Api(ApiError::Network(_)) | AppError::Api(ApiError::ConnectionFailed(_)) => {
                Some("Check your internet connection and JIRA URL.")
            }
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
