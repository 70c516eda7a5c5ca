//! Runs a [`Filter`] against the catalogue, one page at a time.

use futures::TryStreamExt as _;

use crate::{
    database::Database,
    error::{DatabaseError, PaginationError},
    models::gif::GifEntry,
};

use super::modifiers::Filter;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 500;

/// Which slice of the results to return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: u64, limit: u32) -> Result<Self, PaginationError> {
        if limit > MAX_LIMIT {
            return Err(PaginationError::InvalidMax {
                given: limit.to_string(),
            });
        }
        Ok(Self { skip, limit })
    }

    /// Reads `max` and `skip` as they arrive in a request. Missing or empty
    /// values get their defaults.
    pub fn from_params(max: Option<&str>, skip: Option<&str>) -> Result<Self, PaginationError> {
        let limit = match max.filter(|m| !m.is_empty()) {
            Some(max) => max.parse().map_err(|_| PaginationError::InvalidMax {
                given: max.to_string(),
            })?,
            None => DEFAULT_LIMIT,
        };

        let skip = match skip.filter(|s| !s.is_empty()) {
            Some(skip) => skip.parse().map_err(|_| PaginationError::InvalidSkip {
                given: skip.to_string(),
            })?,
            None => 0,
        };

        Self::new(skip, limit)
    }
}

/// Fetches one page of gifs matching `filter`.
///
/// Rows are streamed, and we stop reading as soon as the page is full.
#[tracing::instrument(skip(db))]
pub async fn execute(
    db: &Database,
    filter: &Filter,
    page: Page,
) -> Result<Vec<GifEntry>, DatabaseError> {
    if page.limit == 0 {
        return Ok(Vec::new());
    }

    let (select, values) = filter.select(page.skip, page.limit);
    tracing::debug!("Running search: {select}");

    let limit = page.limit as usize;
    let mut results = Vec::with_capacity(limit.min(DEFAULT_LIMIT as usize));
    let mut rows = sqlx::query_as_with::<_, GifEntry, _>(&select, values).fetch(db.pool());

    while let Some(gif) = rows
        .try_next()
        .await
        .inspect_err(|e| tracing::error!("Search query failed. err: {e}"))?
    {
        results.push(gif);
        if results.len() >= limit {
            break;
        }
    }

    Ok(results)
}
