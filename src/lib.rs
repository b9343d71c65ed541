//! jira-walker - a JIRA REST client with lazy, restartable search iteration.
//!
//! The [`walker`] module turns the page-at-a-time JQL search endpoint into a
//! sequence of issues. The [`api`] module provides the HTTP client the walker
//! fetches through, and [`config`] holds the profiles used to connect.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod walker;

pub use api::{BlockingClient, Fields, Issue, JiraClient, PageResult, Query, SearchService};
pub use walker::Walker;
