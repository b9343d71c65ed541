//! JQL queries and the one-page search seam the walker fetches through.

use std::fmt;

use super::error::Result;
use super::types::PageResult;

/// Which issue fields a search returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fields {
    /// Every field (`*all`).
    #[default]
    All,
    /// The fields JIRA shows in issue navigators (`*navigable`).
    Navigable,
    /// An explicit list of field IDs.
    List(Vec<String>),
    /// A raw `fields` expression, sent verbatim (e.g. `*all,-comment`).
    Expression(String),
}

impl Fields {
    /// The value of the `fields` query parameter.
    pub fn as_param(&self) -> String {
        match self {
            Fields::All => "*all".to_string(),
            Fields::Navigable => "*navigable".to_string(),
            Fields::List(names) => names.join(","),
            Fields::Expression(expr) => expr.clone(),
        }
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_param())
    }
}

impl From<&str> for Fields {
    fn from(expr: &str) -> Self {
        Fields::Expression(expr.to_string())
    }
}

impl From<Vec<String>> for Fields {
    fn from(names: Vec<String>) -> Self {
        Fields::List(names)
    }
}

impl From<&[&str]> for Fields {
    fn from(names: &[&str]) -> Self {
        Fields::List(names.iter().map(|s| s.to_string()).collect())
    }
}

/// A JQL search with its field selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    jql: String,
    fields: Fields,
}

impl Query {
    /// Create a query. `None` selects every field.
    pub fn new(jql: impl Into<String>, fields: Option<Fields>) -> Self {
        Self {
            jql: jql.into(),
            fields: fields.unwrap_or_default(),
        }
    }

    /// The JQL expression.
    pub fn jql(&self) -> &str {
        &self.jql
    }

    /// The field selection.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

/// Executes one page of a search.
///
/// Implementations report rejected credentials as
/// [`ApiError::Unauthorized`](super::ApiError::Unauthorized); any other
/// failure is treated as a communication error.
pub trait SearchService {
    /// Fetch up to `page_size` issues starting at index `start_at`.
    fn search(&self, query: &Query, start_at: u32, page_size: u32) -> Result<PageResult>;
}

impl<S: SearchService + ?Sized> SearchService for &S {
    fn search(&self, query: &Query, start_at: u32, page_size: u32) -> Result<PageResult> {
        (**self).search(query, start_at, page_size)
    }
}

impl<S: SearchService + ?Sized> SearchService for Box<S> {
    fn search(&self, query: &Query, start_at: u32, page_size: u32) -> Result<PageResult> {
        (**self).search(query, start_at, page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_all_fields() {
        let query = Query::new("project = PROJ", None);
        assert_eq!(query.jql(), "project = PROJ");
        assert_eq!(query.fields(), &Fields::All);
        assert_eq!(query.fields().as_param(), "*all");
    }

    #[test]
    fn test_fields_list_is_comma_joined() {
        let fields = Fields::from(&["summary", "status"][..]);
        assert_eq!(fields.as_param(), "summary,status");
    }

    #[test]
    fn test_fields_expression_is_verbatim() {
        let fields = Fields::from("*navigable,-comment");
        assert_eq!(fields.to_string(), "*navigable,-comment");
        assert_eq!(Fields::Navigable.as_param(), "*navigable");
    }
}
