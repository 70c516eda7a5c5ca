//! Helps to sort search results.

use core::str::FromStr;

use sea_query::Order;

use crate::error::ParseError;

/// Different sorts users can apply to a search with `sort:<name>`.
///
/// Gif ids are UUIDv7s, so sorting by id is sorting by upload time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Newest uploads first.
    New,
    /// Oldest uploads first.
    Old,
}

impl SortKey {
    /// The order to sort gif ids in.
    pub fn order(self) -> Order {
        match self {
            SortKey::New => Order::Desc,
            SortKey::Old => Order::Asc,
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(SortKey::New),
            "old" => Ok(SortKey::Old),
            other => Err(ParseError::InvalidSort {
                name: other.to_string(),
            }),
        }
    }
}
