//! JIRA API response types.
//!
//! Search responses are decoded into [`PageResult`], one page of [`Issue`]
//! records. Issues keep their `fields` as a raw JSON object because a search
//! may select any subset of fields.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The current authenticated user.
///
/// Returned by `GET /rest/api/3/myself`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// The user's account ID.
    pub account_id: String,
    /// The user's display name.
    pub display_name: String,
    /// The user's email address (may be empty if hidden).
    #[serde(default)]
    pub email_address: String,
    /// Whether the user is active.
    #[serde(default = "default_true")]
    pub active: bool,
    /// The user's timezone.
    #[serde(default)]
    pub time_zone: Option<String>,
}

fn default_true() -> bool {
    true
}

/// One page of a JQL search.
///
/// Returned by `GET /rest/api/3/search`. Every wire field is optional and
/// defaults to zero or empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    #[serde(default, deserialize_with = "comma_list")]
    expand: Vec<String>,
    #[serde(default)]
    start_at: u32,
    #[serde(default)]
    max_results: u32,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    issues: Vec<Issue>,
}

impl PageResult {
    /// Build a page from its parts.
    pub fn new(total: u32, start_at: u32, issues: Vec<Issue>) -> Self {
        Self {
            expand: Vec::new(),
            start_at,
            max_results: issues.len() as u32,
            total,
            issues,
        }
    }

    /// Total number of issues matching the query, across all pages.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Issues on this page, in server order.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Number of issues on this page.
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// The index of the first issue on this page.
    pub fn start_at(&self) -> u32 {
        self.start_at
    }

    /// The page size the server applied.
    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    /// Entities the server offers to expand.
    pub fn expand(&self) -> &[String] {
        &self.expand
    }

    /// Rename field IDs on every issue; see [`Issue::automap_fields`].
    pub fn automap_fields(&mut self, names: &HashMap<String, String>) {
        for issue in &mut self.issues {
            issue.automap_fields(names);
        }
    }
}

/// A field known to the JIRA instance.
///
/// Returned by `GET /rest/api/3/field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// The field ID (e.g., "summary" or "customfield_10010").
    pub id: String,
    /// The display name.
    pub name: String,
    /// Whether the field was created by an administrator.
    #[serde(default)]
    pub custom: bool,
}

/// Map custom field IDs to their display names.
///
/// System fields are left out so their IDs stay stable for the typed
/// [`Issue`] accessors.
pub fn custom_field_names(fields: &[FieldDefinition]) -> HashMap<String, String> {
    fields
        .iter()
        .filter(|f| f.custom)
        .map(|f| (f.id.clone(), f.name.clone()))
        .collect()
}

/// A JIRA issue.
///
/// Returned by `GET /rest/api/3/issue/{issueKey}` or as part of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// The issue ID.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// The issue key (e.g., "PROJ-123").
    pub key: String,
    /// REST URL of the issue.
    #[serde(rename = "self", default)]
    pub self_url: String,
    /// Entities the server offers to expand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
    /// The selected issue fields, keyed by field ID.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Issue {
    /// Create an issue with no fields.
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            self_url: String::new(),
            expand: None,
            fields: Map::new(),
        }
    }

    /// Set a field, returning the issue.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Raw value of a field, if it was selected and present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Get the issue summary.
    pub fn summary(&self) -> Option<&str> {
        self.get("summary").and_then(Value::as_str)
    }

    /// Get the issue status name.
    pub fn status(&self) -> Option<&str> {
        self.named("status", "name")
    }

    /// Get the issue type name.
    pub fn issue_type(&self) -> Option<&str> {
        self.named("issuetype", "name")
    }

    /// Get the issue priority name, if set.
    pub fn priority(&self) -> Option<&str> {
        self.named("priority", "name")
    }

    /// Get the assignee display name, if assigned.
    pub fn assignee(&self) -> Option<&str> {
        self.named("assignee", "displayName")
    }

    /// Get the project key, if available.
    pub fn project_key(&self) -> Option<&str> {
        self.named("project", "key")
    }

    /// Get the description as plain text, or empty string if not set.
    pub fn description_text(&self) -> String {
        self.get("description")
            .map(|d| {
                if let Ok(doc) = serde_json::from_value::<AtlassianDoc>(d.clone()) {
                    doc.to_plain_text()
                } else if let Some(s) = d.as_str() {
                    s.to_string()
                } else {
                    String::new()
                }
            })
            .unwrap_or_default()
    }

    /// Rename field keys found in `names`, keeping unknown keys as they are.
    pub fn automap_fields(&mut self, names: &HashMap<String, String>) {
        self.fields = std::mem::take(&mut self.fields)
            .into_iter()
            .map(|(id, value)| match names.get(&id) {
                Some(name) => (name.clone(), value),
                None => (id, value),
            })
            .collect();
    }

    fn named(&self, field: &str, attr: &str) -> Option<&str> {
        self.get(field)?.get(attr)?.as_str()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary() {
            Some(summary) => write!(f, "{}: {}", self.key, summary),
            None => write!(f, "{}", self.key),
        }
    }
}

/// Atlassian Document Format (ADF) content.
///
/// JIRA v3 returns rich text fields such as `description` as ADF trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlassianDoc {
    /// The document type (always "doc" for root documents).
    #[serde(rename = "type")]
    pub doc_type: String,
    /// The document version (typically 1).
    #[serde(default)]
    pub version: Option<u32>,
    /// The content nodes within the document.
    #[serde(default)]
    pub content: Vec<Value>,
}

impl AtlassianDoc {
    /// Convert ADF content to plain text.
    pub fn to_plain_text(&self) -> String {
        let mut result = String::new();
        for node in &self.content {
            Self::extract_text(node, &mut result);
        }
        result.trim().to_string()
    }

    fn extract_text(node: &Value, result: &mut String) {
        let Value::Object(obj) = node else {
            if let Value::Array(items) = node {
                Self::extract_all(items, result);
            }
            return;
        };

        let children = obj.get("content").and_then(Value::as_array);
        match obj.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = obj.get("text").and_then(Value::as_str) {
                    result.push_str(text);
                }
            }
            Some("paragraph") | Some("heading") | Some("codeBlock") => {
                if let Some(items) = children {
                    Self::extract_all(items, result);
                }
                if !result.ends_with('\n') && !result.is_empty() {
                    result.push('\n');
                }
            }
            Some("hardBreak") => result.push('\n'),
            Some("listItem") => {
                result.push_str("• ");
                if let Some(items) = children {
                    Self::extract_all(items, result);
                }
            }
            Some("mention") => {
                if let Some(text) = obj
                    .get("attrs")
                    .and_then(|a| a.get("text"))
                    .and_then(Value::as_str)
                {
                    result.push('@');
                    result.push_str(text.trim_start_matches('@'));
                }
            }
            // Media and cards carry no text.
            Some("inlineCard") | Some("mediaGroup") | Some("mediaSingle") => {}
            _ => {
                if let Some(items) = children {
                    Self::extract_all(items, result);
                }
            }
        }
    }

    fn extract_all(items: &[Value], result: &mut String) {
        for item in items {
            Self::extract_text(item, result);
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn comma_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}
