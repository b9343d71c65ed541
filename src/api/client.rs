//! JIRA API client implementation.
//!
//! This module provides the async client for the JIRA REST API v3.
//! It handles authentication, request/response processing, error handling, and retry logic.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use super::auth::Auth;
use super::error::{ApiError, Result};
use super::search::Query;
use super::types::{custom_field_names, CurrentUser, FieldDefinition, Issue, PageResult};
use crate::config::Profile;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Largest page JIRA serves for a search.
pub const MAX_PAGE_SIZE: u32 = 100;

/// The JIRA API client.
///
/// Provides async methods for interacting with the JIRA REST API v3.
/// Handles authentication, error handling, and retry logic for transient failures.
#[derive(Debug)]
pub struct JiraClient {
    /// The HTTP client.
    client: Client,
    /// The base URL for the JIRA instance.
    base_url: String,
    /// Authentication credentials.
    auth: Auth,
    /// Rename custom field IDs in search results to their display names.
    automap_fields: bool,
    /// Custom field names, fetched once on first use.
    field_names: OnceCell<HashMap<String, String>>,
}

impl JiraClient {
    /// Create a new JIRA client from a profile.
    ///
    /// Retrieves the API token from the OS keyring and validates the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The token cannot be retrieved from the keyring
    /// - The HTTP client cannot be built
    /// - Connection validation fails
    #[instrument(skip(profile), fields(profile_name = %profile.name))]
    pub async fn new(profile: &Profile) -> Result<Self> {
        info!("Creating JIRA client for profile");

        let auth = Auth::from_keyring(&profile.name, &profile.email)?;
        let jira = Self::from_parts(&profile.url, auth)?;

        jira.validate_connection().await?;

        info!("JIRA client created and connection validated");
        Ok(jira)
    }

    /// Create a new JIRA client with explicit credentials.
    ///
    /// Does NOT validate the connection automatically.
    pub fn with_credentials(base_url: &str, email: &str, token: &str) -> Result<Self> {
        Self::from_parts(base_url, Auth::new(email, token))
    }

    fn from_parts(base_url: &str, auth: Auth) -> Result<Self> {
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Self::build_http_client()?,
            base_url: normalize_base_url(base_url),
            auth,
            automap_fields: false,
            field_names: OnceCell::new(),
        })
    }

    /// Enable or disable renaming custom field IDs in search results.
    ///
    /// When enabled, the first search also fetches the instance's field list.
    pub fn with_automap_fields(mut self, enabled: bool) -> Self {
        self.automap_fields = enabled;
        self
    }

    /// Build the HTTP client with appropriate settings.
    fn build_http_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(ApiError::Network)
    }

    /// Validate the connection by calling the /myself endpoint.
    ///
    /// Rejected credentials stay [`ApiError::Unauthorized`]; anything else
    /// becomes [`ApiError::ConnectionFailed`].
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<CurrentUser> {
        debug!("Validating JIRA connection");

        let user = self.get_current_user().await.map_err(|e| {
            error!("Connection validation failed: {}", e);
            match e {
                ApiError::Unauthorized => e,
                ApiError::Network(ref _err) => {
                    ApiError::ConnectionFailed(format!("Cannot connect to {}: {}", self.base_url, e))
                }
                _ => ApiError::ConnectionFailed(e.to_string()),
            }
        })?;

        info!("Connected as user: {}", user.display_name);
        Ok(user)
    }

    /// Get the current authenticated user.
    ///
    /// Calls `GET /rest/api/3/myself`.
    #[instrument(skip(self))]
    pub async fn get_current_user(&self) -> Result<CurrentUser> {
        let url = format!("{}/rest/api/3/myself", self.base_url);
        self.get(&url).await
    }

    /// Fetch one page of a JQL search.
    ///
    /// `max_results` is clamped to [`MAX_PAGE_SIZE`].
    #[instrument(skip(self, query), fields(jql = %query.jql()))]
    pub async fn search(&self, query: &Query, start_at: u32, max_results: u32) -> Result<PageResult> {
        debug!("Searching issues: startAt={}, maxResults={}", start_at, max_results);

        let url = search_url(&self.base_url, query, start_at, max_results);
        let mut page: PageResult = self.get(&url).await?;
        if self.automap_fields {
            page.automap_fields(self.field_names().await?);
        }

        debug!("Found {} issues (total: {})", page.issue_count(), page.total());
        Ok(page)
    }

    /// Get a single issue by key.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get_issue(&self, key: &str) -> Result<Issue> {
        debug!("Fetching issue");

        let url = issue_url(&self.base_url, key);
        let issue: Issue = self.get(&url).await.map_err(|e| {
            if matches!(e, ApiError::NotFound(_)) {
                ApiError::NotFound(format!("Issue '{}' not found", key))
            } else {
                e
            }
        })?;

        debug!("Fetched issue: {}", issue.key);
        Ok(issue)
    }

    /// List every field the instance knows about.
    ///
    /// Calls `GET /rest/api/3/field`.
    #[instrument(skip(self))]
    pub async fn get_fields(&self) -> Result<Vec<FieldDefinition>> {
        let url = format!("{}/rest/api/3/field", self.base_url);
        self.get(&url).await
    }

    async fn field_names(&self) -> Result<&HashMap<String, String>> {
        self.field_names
            .get_or_try_init(|| async {
                let fields = self.get_fields().await?;
                debug!("Loaded {} field definitions", fields.len());
                Ok::<_, ApiError>(custom_field_names(&fields))
            })
            .await
    }

    /// Perform a GET request with authentication and error handling.
    ///
    /// Includes retry logic for transient failures (rate limiting, server errors).
    #[instrument(skip(self), fields(url = %url))]
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempts = 0;
        let mut last_error: Option<ApiError> = None;

        while attempts < MAX_RETRIES {
            attempts += 1;
            debug!("Request attempt {}/{}", attempts, MAX_RETRIES);

            match self.execute_get::<T>(url).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if Self::is_retryable(&e) && attempts < MAX_RETRIES {
                        let delay = Self::calculate_retry_delay(attempts);
                        warn!(
                            "Request failed (attempt {}), retrying in {}ms: {}",
                            attempts, delay, e
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ApiError::ServerError("Max retries exceeded".to_string())))
    }

    /// Execute a single GET request.
    async fn execute_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Check the status and decode the JSON body.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
        } else {
            let error_body = response.text().await.unwrap_or_default();
            debug!("Error response body: {}", error_body);

            Err(error_from_response(status, &url, &error_body))
        }
    }

    /// Check if an error is retryable.
    fn is_retryable(error: &ApiError) -> bool {
        matches!(
            error,
            ApiError::RateLimited | ApiError::ServerError(_) | ApiError::Network(_)
        )
    }

    /// Calculate retry delay with exponential backoff.
    fn calculate_retry_delay(attempt: u32) -> u64 {
        RETRY_DELAY_MS * 2u64.pow(attempt - 1)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Build the search endpoint URL for one page.
fn search_url(base_url: &str, query: &Query, start_at: u32, max_results: u32) -> String {
    format!(
        "{}/rest/api/3/search?jql={}&startAt={}&maxResults={}&fields={}",
        base_url,
        urlencoding::encode(query.jql()),
        start_at,
        max_results.min(MAX_PAGE_SIZE),
        urlencoding::encode(&query.fields().as_param())
    )
}

/// Build the URL of a single issue.
fn issue_url(base_url: &str, key: &str) -> String {
    format!("{}/rest/api/3/issue/{}", base_url, urlencoding::encode(key))
}

/// Create an error from a failed response, preferring JIRA's own messages.
fn error_from_response(status: StatusCode, url: &str, body: &str) -> ApiError {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let messages: Vec<&str> = json
            .get("errorMessages")
            .and_then(|m| m.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if !messages.is_empty() {
            return ApiError::from_status(status, &messages.join(", "));
        }

        if let Some(obj) = json.get("errors").and_then(|e| e.as_object()) {
            let errors: Vec<String> = obj.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            if !errors.is_empty() {
                return ApiError::from_status(status, &errors.join(", "));
            }
        }
    }

    ApiError::from_status(status, url)
}

/// Normalize the base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');

    // Warn if not HTTPS (but don't enforce for localhost/testing)
    if !url.starts_with("https://") && !url.contains("localhost") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::search::Fields;

    #[test]
    fn test_normalize_base_url_removes_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://company.atlassian.net/"),
            "https://company.atlassian.net"
        );
    }

    #[test]
    fn test_normalize_base_url_handles_multiple_slashes() {
        assert_eq!(
            normalize_base_url("https://company.atlassian.net///"),
            "https://company.atlassian.net"
        );
    }

    #[test]
    fn test_normalize_base_url_preserves_path() {
        assert_eq!(
            normalize_base_url("https://company.atlassian.net/jira/"),
            "https://company.atlassian.net/jira"
        );
    }

    #[test]
    fn test_with_credentials_rejects_url_without_scheme() {
        let err = JiraClient::with_credentials("company.atlassian.net", "a@b.c", "t").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_with_credentials_normalizes_url() {
        let client =
            JiraClient::with_credentials("https://company.atlassian.net/", "a@b.c", "t").unwrap();
        assert_eq!(client.base_url(), "https://company.atlassian.net");
    }

    #[test]
    fn test_search_url_encodes_query_and_fields() {
        let query = Query::new(
            "project = PROJ ORDER BY key",
            Some(Fields::from(&["summary", "status"][..])),
        );
        let url = search_url("https://jira.example.com", &query, 5, 5);
        assert_eq!(
            url,
            "https://jira.example.com/rest/api/3/search?jql=project%20%3D%20PROJ%20ORDER%20BY%20key&startAt=5&maxResults=5&fields=summary%2Cstatus"
        );
    }

    #[test]
    fn test_search_url_clamps_page_size() {
        let query = Query::new("x", None);
        let url = search_url("https://jira.example.com", &query, 0, 500);
        assert!(url.contains("maxResults=100"));
        assert!(url.ends_with("fields=%2Aall"));
    }

    #[test]
    fn test_issue_url_encodes_key() {
        assert_eq!(
            issue_url("https://jira.example.com", "PROJ-1"),
            "https://jira.example.com/rest/api/3/issue/PROJ-1"
        );
        assert_eq!(
            issue_url("https://jira.example.com", "a b/c"),
            "https://jira.example.com/rest/api/3/issue/a%20b%2Fc"
        );
    }

    #[test]
    fn test_automap_fields_off_by_default() {
        let client =
            JiraClient::with_credentials("https://jira.example.com", "a@b.c", "t").unwrap();
        assert!(!client.automap_fields);
        assert!(client.with_automap_fields(true).automap_fields);
    }

    #[test]
    fn test_error_from_response_uses_error_messages() {
        let body = r#"{"errorMessages": ["The value 'FOO' does not exist for the field 'project'."]}"#;
        let err = error_from_response(StatusCode::BAD_REQUEST, "url", body);
        match err {
            ApiError::ServerError(msg) => assert!(msg.contains("does not exist")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_from_response_uses_field_errors() {
        let body = r#"{"errorMessages": [], "errors": {"jql": "bad"}}"#;
        let err = error_from_response(StatusCode::NOT_FOUND, "url", body);
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "jql: \"bad\""),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_from_response_falls_back_to_url() {
        let err = error_from_response(StatusCode::NOT_FOUND, "https://x/rest", "");
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "https://x/rest"),
            other => panic!("unexpected error: {:?}", other),
        }
        let err = error_from_response(StatusCode::UNAUTHORIZED, "u", "<html>");
        assert!(err.is_authorization());
    }

    #[test]
    fn test_is_retryable() {
        assert!(JiraClient::is_retryable(&ApiError::RateLimited));
        assert!(JiraClient::is_retryable(&ApiError::ServerError("x".to_string())));
        assert!(!JiraClient::is_retryable(&ApiError::Unauthorized));
        assert!(!JiraClient::is_retryable(&ApiError::NotFound("x".to_string())));
    }

    #[test]
    fn test_retry_delay_exponential() {
        assert_eq!(JiraClient::calculate_retry_delay(1), 1000);
        assert_eq!(JiraClient::calculate_retry_delay(2), 2000);
        assert_eq!(JiraClient::calculate_retry_delay(3), 4000);
    }
}
