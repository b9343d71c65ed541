//! Lazy, restartable iteration over JQL search results.
//!
//! A [`Walker`] turns the page-at-a-time search endpoint into a sequence of
//! issues. It fetches the first page on the first call to
//! [`has_next`](Walker::has_next) (or [`count`](Walker::count)), buffers
//! exactly one page, and fetches the next page only once the buffered one has
//! been consumed and the server-reported total has not been reached.
//!
//! # Failure policy
//!
//! - [`ApiError::Unauthorized`](crate::api::ApiError::Unauthorized) from
//!   the search service is returned to the caller unchanged.
//! - Every other fetch failure is handed to the walker's
//!   [`DiagnosticsSink`] and the sequence reports itself exhausted, so a
//!   `for` loop simply ends early with the issues fetched so far.
//!
//! # Example
//!
//! ```no_run
//! use jira_walker::api::{BlockingClient, Fields};
//! use jira_walker::walker::Walker;
//!
//! let client = BlockingClient::with_credentials("https://company.atlassian.net", "me@company.com", "token")?;
//! let mut walker = Walker::with_page_size(&client, 25)?;
//! walker.configure("project = PROJ ORDER BY key", Some(Fields::from(&["summary"][..])));
//!
//! for issue in &mut walker {
//!     println!("{}", issue?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod diagnostics;
mod error;

use std::fmt;

use tracing::debug;

use crate::api::{Fields, Issue, PageResult, Query, SearchService};

pub use diagnostics::{DiagnosticsSink, MemorySink, TracingSink};
pub use error::{BoxError, Result, WalkerError};

/// Issues requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Per-issue mapping applied when the current item is read.
pub type Transform<T> = Box<dyn Fn(&Issue) -> std::result::Result<T, BoxError> + Send>;

fn identity(issue: &Issue) -> std::result::Result<Issue, BoxError> {
    Ok(issue.clone())
}

/// A paginated cursor over the results of one JQL query.
///
/// Drive it either through the explicit protocol
/// ([`has_next`](Self::has_next), [`current`](Self::current),
/// [`advance`](Self::advance)) or as an iterator via [`iter`](Self::iter).
pub struct Walker<S, T = Issue> {
    service: S,
    query: Option<Query>,
    page_size: u32,
    /// Successful fetches since the last restart.
    pages_fetched: u32,
    /// Global index of the first issue in `page`.
    page_start: u32,
    /// Cursor within `page`; never exceeds its issue count.
    offset: usize,
    /// Set by the first successful fetch; never decreases within a run.
    total: Option<u32>,
    page: Option<PageResult>,
    executed: bool,
    /// A page came back empty before the total was reached.
    exhausted: bool,
    transform: Transform<T>,
    diagnostics: Box<dyn DiagnosticsSink>,
}

impl<S: SearchService> Walker<S, Issue> {
    /// Create a walker yielding issues, fetching [`DEFAULT_PAGE_SIZE`] per page.
    pub fn new(service: S) -> Self {
        Self {
            service,
            query: None,
            page_size: DEFAULT_PAGE_SIZE,
            pages_fetched: 0,
            page_start: 0,
            offset: 0,
            total: None,
            page: None,
            executed: false,
            exhausted: false,
            transform: Box::new(identity),
            diagnostics: Box::new(TracingSink),
        }
    }

    /// Create a walker with a custom page size.
    ///
    /// # Errors
    ///
    /// [`WalkerError::InvalidArgument`] if `page_size` is zero.
    pub fn with_page_size(service: S, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(WalkerError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }

        let mut walker = Self::new(service);
        walker.page_size = page_size;
        Ok(walker)
    }
}

impl<S: SearchService, T> Walker<S, T> {
    /// Replace the diagnostics sink.
    pub fn with_diagnostics(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// Set the query to walk. `None` selects every field.
    ///
    /// Replacing a query does not reset the cursor; call
    /// [`restart`](Self::restart) for a clean run.
    pub fn configure(&mut self, jql: impl Into<String>, fields: Option<Fields>) {
        self.query = Some(Query::new(jql, fields));
    }

    /// The configured query, if any.
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Issues requested per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Pages fetched since the last restart.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Replace the per-issue transform.
    ///
    /// # Errors
    ///
    /// [`WalkerError::InvalidArgument`] if no transform is supplied; the
    /// previous transform stays in place.
    pub fn set_transform(&mut self, transform: Option<Transform<T>>) -> Result<()> {
        match transform {
            Some(transform) => {
                self.transform = transform;
                Ok(())
            }
            None => Err(WalkerError::InvalidArgument(
                "transform is not callable".to_string(),
            )),
        }
    }

    /// Change the item type by installing a new transform.
    ///
    /// Query, cursor, buffered page, page size and sink carry over.
    pub fn map<U, F>(self, transform: F) -> Walker<S, U>
    where
        F: Fn(&Issue) -> std::result::Result<U, BoxError> + Send + 'static,
    {
        Walker {
            service: self.service,
            query: self.query,
            page_size: self.page_size,
            pages_fetched: self.pages_fetched,
            page_start: self.page_start,
            offset: self.offset,
            total: self.total,
            page: self.page,
            executed: self.executed,
            exhausted: self.exhausted,
            transform: Box::new(transform),
            diagnostics: self.diagnostics,
        }
    }

    /// Whether an issue is available at the cursor, fetching a page if needed.
    ///
    /// The first call after construction or [`restart`](Self::restart)
    /// fetches the first page. Later calls fetch the next page once the
    /// buffered one is consumed and the total has not been reached.
    ///
    /// # Errors
    ///
    /// - [`WalkerError::NotConfigured`] if no query was configured.
    /// - [`WalkerError::Api`] if the server rejected the credentials.
    ///
    /// Any other fetch failure is recorded to the diagnostics sink and
    /// reported as `Ok(false)`.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.query.is_none() {
            return Err(WalkerError::NotConfigured);
        }

        if !self.executed {
            let Some(page) = self.fetch(0)? else {
                return Ok(false);
            };
            self.load(0, page);
            self.executed = true;
            return Ok(self.total() > 0 && !self.page_exhausted());
        }

        if self.exhausted {
            return Ok(false);
        }

        let position = self.position();
        if self.page_exhausted() && position < self.total() {
            let Some(page) = self.fetch(position)? else {
                return Ok(false);
            };
            self.load(position, page);
            // An empty page ends the run even if the total says otherwise.
            self.exhausted = self.page_exhausted();
            return Ok(!self.exhausted);
        }

        Ok(position < self.total())
    }

    /// Move the cursor to the next buffered issue. Never fetches.
    pub fn advance(&mut self) {
        if !self.page_exhausted() {
            self.offset += 1;
        }
    }

    /// The issue at the cursor, passed through the transform.
    ///
    /// # Errors
    ///
    /// - [`WalkerError::OutOfRange`] if no issue is buffered at the cursor.
    /// - [`WalkerError::Transform`] if the transform fails.
    pub fn current(&self) -> Result<T> {
        let position = self.position();
        if position >= self.total() {
            return Err(WalkerError::OutOfRange { position });
        }

        let issue = self
            .page
            .as_ref()
            .and_then(|page| page.issues().get(self.offset))
            .ok_or(WalkerError::OutOfRange { position })?;

        (self.transform)(issue).map_err(WalkerError::Transform)
    }

    /// Global index of the cursor across all pages.
    pub fn position(&self) -> u32 {
        self.page_start + self.offset as u32
    }

    /// Total number of issues matching the query.
    ///
    /// Fetches the first page if no total is known yet. Returns `0` if that
    /// fetch failed with a communication error.
    ///
    /// # Errors
    ///
    /// Same as [`has_next`](Self::has_next).
    pub fn count(&mut self) -> Result<u32> {
        if self.total.is_none() {
            self.has_next()?;
        }
        Ok(self.total())
    }

    /// The total reported by the server, without fetching.
    ///
    /// `None` until a fetch in the current run has succeeded.
    pub fn total_known(&self) -> Option<u32> {
        self.total
    }

    /// Reset the cursor and drop the buffered page.
    ///
    /// The query, transform, page size and sink are kept.
    pub fn restart(&mut self) {
        self.pages_fetched = 0;
        self.page_start = 0;
        self.offset = 0;
        self.total = None;
        self.page = None;
        self.executed = false;
        self.exhausted = false;
    }

    /// Restart and iterate from the first issue.
    pub fn iter(&mut self) -> Iter<'_, S, T> {
        self.restart();
        self.remaining()
    }

    /// Iterate from the current cursor position without restarting.
    pub fn remaining(&mut self) -> Iter<'_, S, T> {
        Iter {
            walker: self,
            done: false,
        }
    }

    fn total(&self) -> u32 {
        self.total.unwrap_or(0)
    }

    fn page_exhausted(&self) -> bool {
        self.offset >= self.page.as_ref().map_or(0, PageResult::issue_count)
    }

    /// Fetch one page. `Ok(None)` means a communication failure was recorded.
    fn fetch(&self, start_at: u32) -> Result<Option<PageResult>> {
        let query = self.query.as_ref().ok_or(WalkerError::NotConfigured)?;
        debug!(
            jql = %query.jql(),
            start_at,
            page_size = self.page_size,
            "Fetching search page"
        );

        match self.service.search(query, start_at, self.page_size) {
            Ok(page) => Ok(Some(page)),
            Err(e) if e.is_authorization() => Err(e.into()),
            Err(e) => {
                self.diagnostics.record(start_at, &e);
                Ok(None)
            }
        }
    }

    fn load(&mut self, start_at: u32, page: PageResult) {
        debug!(
            start_at,
            issues = page.issue_count(),
            total = page.total(),
            "Buffered search page"
        );
        self.total = Some(self.total.map_or(page.total(), |t| t.max(page.total())));
        self.pages_fetched += 1;
        self.page_start = start_at;
        self.offset = 0;
        self.page = Some(page);
    }
}

impl<S, T> fmt::Debug for Walker<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walker")
            .field("query", &self.query)
            .field("page_size", &self.page_size)
            .field("pages_fetched", &self.pages_fetched)
            .field("page_start", &self.page_start)
            .field("offset", &self.offset)
            .field("total", &self.total)
            .field("executed", &self.executed)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

/// Iterator over a [`Walker`].
///
/// Ends after yielding a fetch error. A transform error is yielded and the
/// iterator moves on to the next issue.
pub struct Iter<'a, S, T> {
    walker: &'a mut Walker<S, T>,
    done: bool,
}

impl<S: SearchService, T> Iterator for Iter<'_, S, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.walker.has_next() {
            Ok(true) => {
                let item = self.walker.current();
                self.walker.advance();
                Some(item)
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a, S: SearchService, T> IntoIterator for &'a mut Walker<S, T> {
    type Item = Result<T>;
    type IntoIter = Iter<'a, S, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
