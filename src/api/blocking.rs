//! Blocking facade over [`JiraClient`].
//!
//! The walker fetches pages synchronously, so this wraps the async client in
//! a current-thread tokio runtime and exposes it as a [`SearchService`].

use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::client::JiraClient;
use super::error::{ApiError, Result};
use super::search::{Query, SearchService};
use super::types::{CurrentUser, FieldDefinition, Issue, PageResult};
use crate::config::Profile;

/// A [`JiraClient`] driven by its own runtime.
///
/// Must not be used from inside another tokio runtime.
#[derive(Debug)]
pub struct BlockingClient {
    client: JiraClient,
    runtime: Runtime,
}

impl BlockingClient {
    /// Connect using a profile and its keyring token, validating the connection.
    pub fn connect(profile: &Profile) -> Result<Self> {
        let runtime = build_runtime()?;
        let client = runtime.block_on(JiraClient::new(profile))?;
        Ok(Self { client, runtime })
    }

    /// Create a client with explicit credentials, without validating them.
    pub fn with_credentials(base_url: &str, email: &str, token: &str) -> Result<Self> {
        let runtime = build_runtime()?;
        let client = JiraClient::with_credentials(base_url, email, token)?;
        Ok(Self { client, runtime })
    }

    /// See [`JiraClient::with_automap_fields`].
    pub fn with_automap_fields(mut self, enabled: bool) -> Self {
        self.client = self.client.with_automap_fields(enabled);
        self
    }

    /// See [`JiraClient::validate_connection`].
    pub fn validate_connection(&self) -> Result<CurrentUser> {
        self.runtime.block_on(self.client.validate_connection())
    }

    /// See [`JiraClient::get_issue`].
    pub fn get_issue(&self, key: &str) -> Result<Issue> {
        self.runtime.block_on(self.client.get_issue(key))
    }

    /// See [`JiraClient::get_fields`].
    pub fn get_fields(&self) -> Result<Vec<FieldDefinition>> {
        self.runtime.block_on(self.client.get_fields())
    }

    /// Web address of an issue, for people rather than the API.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.client.base_url(), key)
    }
}

impl SearchService for BlockingClient {
    fn search(&self, query: &Query, start_at: u32, page_size: u32) -> Result<PageResult> {
        debug!(start_at, page_size, "Blocking search");
        self.runtime
            .block_on(self.client.search(query, start_at, page_size))
    }
}

fn build_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ApiError::Runtime(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_credentials_builds_client() {
        let client =
            BlockingClient::with_credentials("http://localhost:8080/", "a@b.c", "t").unwrap();
        assert_eq!(
            client.browse_url("PROJ-1"),
            "http://localhost:8080/browse/PROJ-1"
        );
    }

    #[test]
    fn test_with_credentials_rejects_bad_url() {
        let err = BlockingClient::with_credentials("localhost", "a@b.c", "t").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
