//! Application settings configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::api::MAX_PAGE_SIZE;
use crate::walker::DEFAULT_PAGE_SIZE;

/// Application-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// The name of the default profile to use.
    pub default_profile: Option<String>,
    /// Issues fetched per search page.
    pub page_size: u32,
    /// Show custom fields under their display names instead of their IDs.
    pub automap_fields: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_profile: None,
            page_size: DEFAULT_PAGE_SIZE,
            automap_fields: false,
        }
    }
}

impl Settings {
    /// Check that the page size is one JIRA will honour.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }
}
