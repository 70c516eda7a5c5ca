use sea_query::SimpleExpr;

use super::sort::SortKey;

/// A single restriction on which gifs a search returns.
///
/// Every clause in a [`Filter`] must hold for a gif to match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Clause {
    /// Only gifs without a group.
    Public,

    /// Gifs without a group, or in any of these groups.
    ///
    /// An empty list is the same as [`Clause::Public`].
    PublicOrGroups(Vec<String>),

    /// Only gifs in exactly this group.
    Group(String),

    /// The gif carries this exact tag.
    Tag(String),

    /// The gif carries a tag starting with this, ignoring case.
    TagPrefix(String),

    Uploader(String),

    /// The note matches this regex fragment, ignoring case.
    NoteRegex(String),

    /// The note matches these words in the full-text index.
    NoteText(String),
}

/// A resolved, permission-checked search, ready to run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
    pub sort: Option<SortKey>,
}

/// A modifier must become a query to be used.
///
/// All modifiers must implement this trait!
pub trait ToQuery {
    /// Converts the modifier into a query for use in querying the database.
    ///
    /// This assumes that each modifier can become a query clause.
    fn to_query(self) -> SimpleExpr;
}
