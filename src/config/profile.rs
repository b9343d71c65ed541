//! JIRA profile configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};

/// A named JIRA connection.
///
/// The API token is kept in the OS keyring under the profile name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile. Non-empty, no whitespace, unique.
    pub name: String,

    /// The JIRA instance URL (e.g., "https://company.atlassian.net").
    pub url: String,

    /// The user's email address, used with the API token for Basic auth.
    pub email: String,
}

impl Profile {
    /// Create a new profile.
    pub fn new(name: String, url: String, email: String) -> Self {
        Self { name, url, email }
    }

    /// Validate this profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL must start with http:// or https://",
                self.name
            )));
        }

        if !self.email.contains('@') {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': '{}' does not appear to be a valid email address",
                self.name, self.email
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, url: &str, email: &str) -> Profile {
        Profile::new(name.to_string(), url.to_string(), email.to_string())
    }

    #[test]
    fn test_valid_profile() {
        let p = profile("work", "https://company.atlassian.net", "user@company.com");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_http_url_accepted() {
        let p = profile("local", "http://localhost:8080", "user@company.com");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_invalid_profiles_rejected() {
        let cases = [
            (profile("", "https://x.net", "a@b.c"), "name cannot be empty"),
            (profile("my work", "https://x.net", "a@b.c"), "cannot contain whitespace"),
            (profile("work", "x.net", "a@b.c"), "must start with http"),
            (profile("work", "", "a@b.c"), "must start with http"),
            (profile("work", "https://x.net", "not-an-email"), "valid email"),
        ];

        for (p, expected) in cases {
            let err = p.validate().unwrap_err().to_string();
            assert!(err.contains(expected), "{:?}: {}", p, err);
        }
    }

    #[test]
    fn test_profile_serialization() {
        let p = profile("work", "https://company.atlassian.net", "user@company.com");
        let toml_str = toml::to_string(&p).unwrap();
        let parsed: Profile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, p);
    }
}
