//! Searching the catalogue.
//!
//! A search goes through three steps:
//!
//! 1. [`parse`](parse::parse) reads the query string into a [`QueryDescriptor`].
//! 2. [`resolve`](resolve::resolve) checks it against the caller's groups and
//!    builds a [`Filter`].
//! 3. [`execute`](execute::execute) runs the filter for one [`Page`].
//!
//! [`search`] does all three under a timeout.

pub mod execute;
pub mod modifiers;
pub mod parse;
pub mod query;
pub mod resolve;
pub mod sort;

use crate::{
    config::SearchConfig,
    database::Database,
    error::{PaginationError, SearchError},
    models::{gif::GifEntry, identity::Identity},
};

pub use execute::Page;
pub use modifiers::Filter;
pub use parse::QueryDescriptor;

/// One incoming search, before anything's been checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub page: Page,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, page: Page) -> Self {
        Self {
            query: query.into(),
            page,
        }
    }

    /// Builds a request from the raw `q`, `max` and `skip` parameters.
    pub fn from_params(
        config: &SearchConfig,
        q: Option<&str>,
        max: Option<&str>,
        skip: Option<&str>,
    ) -> Result<Self, PaginationError> {
        let query = q.unwrap_or_default();
        if query.len() > config.max_query_len {
            return Err(PaginationError::QueryTooLong {
                len: query.len(),
                max: config.max_query_len,
            });
        }

        Ok(Self::new(query, Page::from_params(max, skip)?))
    }
}

/// Answers a search on behalf of `caller`.
///
/// Gives up with [`SearchError::TimedOut`] after the configured timeout.
#[tracing::instrument(skip(db, config, caller))]
pub async fn search(
    db: &Database,
    config: &SearchConfig,
    request: &SearchRequest,
    caller: Option<&Identity>,
) -> Result<Vec<GifEntry>, SearchError> {
    let username = caller.map(|c| c.username.as_str());
    let descriptor = parse::parse(&request.query, username)
        .inspect_err(|e| tracing::debug!("Rejected search syntax. err: {e}"))?;
    let filter = resolve::resolve(&descriptor, caller)
        .inspect_err(|e| tracing::debug!("Rejected search access. err: {e}"))?;

    let timeout = config.timeout();
    match tokio::time::timeout(timeout, execute::execute(db, &filter, request.page)).await {
        Ok(results) => Ok(results?),
        Err(_) => {
            tracing::warn!("Search timed out after {timeout:?}.");
            Err(SearchError::TimedOut {
                secs: timeout.as_secs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_queries_are_rejected() {
        let config = SearchConfig::default();
        let long = "a".repeat(config.max_query_len + 1);

        assert!(matches!(
            SearchRequest::from_params(&config, Some(&long), None, None),
            Err(PaginationError::QueryTooLong { .. })
        ));

        let request = SearchRequest::from_params(&config, None, Some("5"), Some("2")).unwrap();
        assert_eq!(request, SearchRequest::new("", Page::new(2, 5).unwrap()));
    }
}
