//! Authentication handling for the JIRA API.
//!
//! Basic Auth (email + API token), with tokens kept in the OS keyring.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::error::{ApiError, Result};

/// The keyring service name for jira-walker tokens.
const KEYRING_SERVICE: &str = "jira-walker";

/// Authentication credentials for JIRA.
#[derive(Debug, Clone)]
pub struct Auth {
    /// The user's email address.
    email: String,
    /// The Base64-encoded authorization header value.
    auth_header: String,
}

impl Auth {
    /// Create new authentication credentials from email and token.
    ///
    /// The token is immediately encoded and the raw token is not stored.
    pub fn new(email: &str, token: &str) -> Self {
        let auth_header = build_auth_header(email, token);
        Self {
            email: email.to_string(),
            auth_header,
        }
    }

    /// Create authentication for a profile, reading its token from the OS keyring.
    pub fn from_keyring(profile_name: &str, email: &str) -> Result<Self> {
        let token = get_token(profile_name)?;
        Ok(Self::new(email, &token))
    }

    /// The complete "Basic ..." header value.
    pub fn header_value(&self) -> &str {
        &self.auth_header
    }

    /// Get the email address.
    pub fn email(&self) -> &str {
        &self.email
    }
}

fn build_auth_header(email: &str, token: &str) -> String {
    let credentials = format!("{}:{}", email, token);
    let encoded = BASE64.encode(credentials.as_bytes());
    format!("Basic {}", encoded)
}

fn entry(profile_name: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))
}

/// Store an API token in the OS keyring under the profile name.
pub fn store_token(profile_name: &str, token: &str) -> Result<()> {
    entry(profile_name)?
        .set_password(token)
        .map_err(|e| ApiError::Keyring(format!("failed to store token: {}", e)))
}

/// Retrieve a profile's API token from the OS keyring.
pub fn get_token(profile_name: &str) -> Result<String> {
    entry(profile_name)?
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve token: {}", e)))
}

/// Delete a profile's API token from the OS keyring.
pub fn delete_token(profile_name: &str) -> Result<()> {
    entry(profile_name)?
        .delete_password()
        .map_err(|e| ApiError::Keyring(format!("failed to delete token: {}", e)))
}
