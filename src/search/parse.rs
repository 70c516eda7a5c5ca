//! Turns a raw search string into a [`QueryDescriptor`].
//!
//! The syntax, applied in this order:
//!
//! - `'some words'`: full-text search over notes.
//! - `"a pattern"`: case-insensitive regex over notes.
//! - `@name`: uploaded by `name`.
//! - `#!group`: only gifs in `group`. `#!private` means the caller's own.
//! - `#group`: also include gifs in `group`.
//! - `$ig`: also include every group the caller can see.
//! - `sort:new` / `sort:old`: upload order.
//! - anything else is a tag. The last tag matches as a prefix.
//!
//! Parsing doesn't check permissions. That's [`super::resolve`]'s job.

use regex::Regex;

use crate::error::ParseError;

use super::sort::SortKey;

/// Stands in for the caller's own `@username` group.
const PRIVATE_GROUP: &str = "private";
const INCLUDE_ALL_GROUPS: &str = "$ig";
const SORT_PREFIX: &str = "sort:";

/// Which groups, beyond public gifs, a search should look in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IncludeGroups {
    /// Public gifs only.
    #[default]
    Absent,
    /// Every group the caller belongs to.
    AllVisible,
    /// Exactly these groups, in the order they were written.
    Only(Vec<String>),
}

impl IncludeGroups {
    fn push(&mut self, group: String) {
        match self {
            IncludeGroups::Only(groups) => groups.push(group),
            _ => *self = IncludeGroups::Only(vec![group]),
        }
    }
}

/// A parsed search query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryDescriptor {
    /// Tags in order of appearance. Duplicates are kept.
    pub tags: Vec<String>,
    pub uploader: Option<String>,
    /// From the double-quoted region.
    pub note_regex: Option<String>,
    /// From the single-quoted region.
    pub note_text: Option<String>,
    pub include_groups: IncludeGroups,
    pub exclusive_group: Option<String>,
    pub sort: Option<SortKey>,
}

/// Parses `raw` on behalf of `caller` (their username, if logged in).
#[tracing::instrument(level = "debug")]
pub fn parse(raw: &str, caller: Option<&str>) -> Result<QueryDescriptor, ParseError> {
    let mut query = QueryDescriptor::default();

    let (rest, text) = extract_quoted(raw, '\'');
    let (rest, pattern) = extract_quoted(&rest, '"');

    query.note_text = text.filter(|t| !t.trim().is_empty());
    if let Some(pattern) = pattern.filter(|p| !p.is_empty()) {
        Regex::new(&note_pattern(&pattern)).map_err(ParseError::InvalidNotePattern)?;
        query.note_regex = Some(pattern);
    }

    for token in rest.split(' ').filter(|t| !t.is_empty()) {
        if let Some(uploader) = token.strip_prefix('@') {
            query.uploader = (!uploader.is_empty()).then(|| uploader.to_string());
        } else if let Some(group) = token.strip_prefix("#!") {
            let group = scoped_group(group, caller)?;
            if let Some(first) = &query.exclusive_group {
                return Err(ParseError::ConflictingGroup {
                    first: first.clone(),
                    second: group,
                });
            }
            query.exclusive_group = Some(group);
        } else if let Some(group) = token.strip_prefix('#') {
            query.include_groups.push(scoped_group(group, caller)?);
        } else if token == INCLUDE_ALL_GROUPS {
            if query.include_groups == IncludeGroups::Absent {
                query.include_groups = IncludeGroups::AllVisible;
            }
        } else if let Some(sort) = token.strip_prefix(SORT_PREFIX) {
            query.sort = Some(sort.parse()?);
        } else {
            query.tags.push(token.to_string());
        }
    }

    tracing::debug!("Parsed query: {query:?}");
    Ok(query)
}

/// The regex actually run against notes for a double-quoted fragment.
pub(crate) fn note_pattern(fragment: &str) -> String {
    format!("(?i){fragment}")
}

/// Swaps `private` for the caller's own group.
fn scoped_group(group: &str, caller: Option<&str>) -> Result<String, ParseError> {
    if group != PRIVATE_GROUP {
        return Ok(group.to_string());
    }

    caller
        .map(|username| format!("@{username}"))
        .ok_or(ParseError::MissingIdentity)
}

/// Cuts a quoted region out of `query`, returning what's left and what was
/// quoted.
///
/// The region runs from the first `delimiter` to the last one, so quotes
/// inside it are kept. Without a closing delimiter, it runs to the end.
fn extract_quoted(query: &str, delimiter: char) -> (String, Option<String>) {
    let Some(start) = query.find(delimiter) else {
        return (query.to_string(), None);
    };

    let after = &query[start + delimiter.len_utf8()..];
    match after.rfind(delimiter) {
        Some(end) => {
            let mut rest = query[..start].to_string();
            rest.push_str(&after[end + delimiter.len_utf8()..]);
            (rest, Some(after[..end].to_string()))
        }
        None => (query[..start].to_string(), Some(after.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quoted_notes() {
        let cases = [
            ("test @uploader \"note\"", vec!["test"], Some("uploader"), Some("note")),
            ("test \"note\" @uploader ", vec!["test"], Some("uploader"), Some("note")),
            (
                "test \"\"note \" quotes\"\" @uploader ",
                vec!["test"],
                Some("uploader"),
                Some("\"note \" quotes\""),
            ),
            ("\"note", vec![], None, Some("note")),
            ("test @uploader", vec!["test"], Some("uploader"), None),
        ];

        for (raw, tags, uploader, note) in cases {
            let parsed = parse(raw, Some("user")).unwrap();
            assert_eq!(parsed.tags, strings(&tags), "tags of `{raw}`");
            assert_eq!(parsed.uploader.as_deref(), uploader, "uploader of `{raw}`");
            assert_eq!(parsed.note_regex.as_deref(), note, "note of `{raw}`");
            assert_eq!(parsed.note_text, None);
            assert_eq!(parsed.include_groups, IncludeGroups::Absent);
            assert_eq!(parsed.exclusive_group, None);
            assert_eq!(parsed.sort, None);
        }
    }

    #[test]
    fn unterminated_quote_swallows_the_rest() {
        let parsed = parse("cat \"dancing @bob #!private", None).unwrap();
        assert_eq!(parsed.tags, strings(&["cat"]));
        assert_eq!(parsed.note_regex.as_deref(), Some("dancing @bob #!private"));
        assert_eq!(parsed.uploader, None, "nothing after the quote is a token");
        assert_eq!(parsed.exclusive_group, None);
    }

    #[test]
    fn single_quotes_are_full_text() {
        let parsed = parse("'happy birthday' cake \"party\"", None).unwrap();
        assert_eq!(parsed.note_text.as_deref(), Some("happy birthday"));
        assert_eq!(parsed.note_regex.as_deref(), Some("party"));
        assert_eq!(parsed.tags, strings(&["cake"]));

        // single quotes go first, so they can eat double quotes
        let parsed = parse("a 'b \"c' d\"", None).unwrap();
        assert_eq!(parsed.note_text.as_deref(), Some("b \"c"));
        assert_eq!(parsed.note_regex, None, "the leftover quote opens an empty region");
        assert_eq!(parsed.tags, strings(&["a", "d"]));
    }

    #[test]
    fn empty_quotes_mean_nothing() {
        let parsed = parse("cat \"\" ''", None).unwrap();
        assert_eq!(parsed.note_regex, None);
        assert_eq!(parsed.note_text, None);
        assert_eq!(parsed.tags, strings(&["cat"]));
    }

    #[test]
    fn bad_regex_is_a_syntax_error() {
        let res = parse("\"(unclosed\"", None);
        assert!(matches!(res, Err(ParseError::InvalidNotePattern(_))));
    }

    #[test]
    fn last_uploader_wins() {
        let parsed = parse("@alice cat @bob", None).unwrap();
        assert_eq!(parsed.uploader.as_deref(), Some("bob"));

        let parsed = parse("@alice @", None).unwrap();
        assert_eq!(parsed.uploader, None, "bare `@` clears it");
    }

    #[test]
    fn tags_keep_order_and_duplicates() {
        let parsed = parse("b  a b   c", None).unwrap();
        assert_eq!(parsed.tags, strings(&["b", "a", "b", "c"]));
    }

    #[test]
    fn include_groups() {
        let parsed = parse("#cats #dogs", None).unwrap();
        assert_eq!(
            parsed.include_groups,
            IncludeGroups::Only(strings(&["cats", "dogs"]))
        );

        let parsed = parse("#private", Some("bob")).unwrap();
        assert_eq!(parsed.include_groups, IncludeGroups::Only(strings(&["@bob"])));

        let parsed = parse("#", None).unwrap();
        assert_eq!(parsed.include_groups, IncludeGroups::Only(strings(&[""])));

        assert!(matches!(
            parse("#private", None),
            Err(ParseError::MissingIdentity)
        ));
    }

    #[test]
    fn include_all_groups_shorthand() {
        let parsed = parse("$ig", None).unwrap();
        assert_eq!(parsed.include_groups, IncludeGroups::AllVisible);

        // doesn't clobber named groups
        let parsed = parse("#cats $ig", None).unwrap();
        assert_eq!(parsed.include_groups, IncludeGroups::Only(strings(&["cats"])));

        // but named groups narrow it
        let parsed = parse("$ig #cats", None).unwrap();
        assert_eq!(parsed.include_groups, IncludeGroups::Only(strings(&["cats"])));
    }

    #[test]
    fn exclusive_group() {
        let parsed = parse("#!cats", None).unwrap();
        assert_eq!(parsed.exclusive_group.as_deref(), Some("cats"));
        assert_eq!(parsed.include_groups, IncludeGroups::Absent);

        let parsed = parse("#!private", Some("u")).unwrap();
        assert_eq!(parsed.exclusive_group.as_deref(), Some("@u"));

        assert!(matches!(
            parse("#!private", None),
            Err(ParseError::MissingIdentity)
        ));

        assert!(matches!(
            parse("#!cats #!dogs", None),
            Err(ParseError::ConflictingGroup { first, second }) if first == "cats" && second == "dogs"
        ));
    }

    #[test]
    fn sorts() {
        assert_eq!(parse("sort:new", None).unwrap().sort, Some(SortKey::New));
        assert_eq!(parse("sort:old cat", None).unwrap().sort, Some(SortKey::Old));
        assert!(matches!(
            parse("sort:random", None),
            Err(ParseError::InvalidSort { name }) if name == "random"
        ));
    }

    #[test]
    fn everything_at_once() {
        let parsed = parse("tag1 tag2 @alice \"secret note\"", Some("bob")).unwrap();
        assert_eq!(
            parsed,
            QueryDescriptor {
                tags: strings(&["tag1", "tag2"]),
                uploader: Some("alice".into()),
                note_regex: Some("secret note".into()),
                ..Default::default()
            }
        );
    }
}
