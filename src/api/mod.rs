//! JIRA API client and types.
//!
//! This module provides the interface for communicating with the JIRA REST API.

pub mod auth;
mod blocking;
mod client;
pub mod error;
mod search;
pub mod types;

pub use auth::Auth;
pub use blocking::BlockingClient;
pub use client::{JiraClient, MAX_PAGE_SIZE};
pub use error::{ApiError, Result};
pub use search::{Fields, Query, SearchService};
pub use types::{CurrentUser, FieldDefinition, Issue, PageResult};
