//! Checks a parsed query against who's asking, then turns it into a
//! [`Filter`].

use crate::{error::AuthorizationError, models::identity::Identity};

use super::{
    modifiers::{Clause, Filter},
    parse::{IncludeGroups, QueryDescriptor},
};

/// Builds the filter for `query`, making sure `caller` may see every group
/// it asks for.
///
/// Nothing the query asks for is ever dropped: each restriction either
/// becomes a clause or fails the whole search.
#[tracing::instrument(level = "debug", skip_all)]
pub fn resolve(
    query: &QueryDescriptor,
    caller: Option<&Identity>,
) -> Result<Filter, AuthorizationError> {
    let mut clauses = Vec::new();

    match &query.include_groups {
        IncludeGroups::Absent if query.exclusive_group.is_none() => clauses.push(Clause::Public),
        IncludeGroups::Absent => (),
        IncludeGroups::AllVisible => clauses.push(Clause::PublicOrGroups(
            caller.map(Identity::visible_groups).unwrap_or_default(),
        )),
        IncludeGroups::Only(groups) => {
            for group in groups {
                require(caller, group)?;
            }
            clauses.push(Clause::PublicOrGroups(groups.clone()));
        }
    }

    if let Some(group) = &query.exclusive_group {
        require(caller, group)?;
        clauses.push(Clause::Group(group.clone()));
    }

    if let Some((last, rest)) = query.tags.split_last() {
        clauses.extend(rest.iter().cloned().map(Clause::Tag));
        clauses.push(Clause::TagPrefix(last.clone()));
    }

    if let Some(uploader) = &query.uploader {
        clauses.push(Clause::Uploader(uploader.clone()));
    }
    if let Some(fragment) = &query.note_regex {
        clauses.push(Clause::NoteRegex(fragment.clone()));
    }
    if let Some(text) = &query.note_text {
        clauses.push(Clause::NoteText(text.clone()));
    }

    Ok(Filter {
        clauses,
        sort: query.sort,
    })
}

/// Fails unless `caller` may see `group`. Anonymous callers see no groups.
fn require(caller: Option<&Identity>, group: &str) -> Result<(), AuthorizationError> {
    if caller.is_some_and(|c| c.has_group(group)) {
        return Ok(());
    }

    tracing::debug!("Caller may not see group `{group}`.");
    Err(AuthorizationError::Forbidden {
        group: group.to_string(),
    })
}
