use sea_query::*;
use sea_query_binder::{SqlxBinder as _, SqlxValues};

use super::{
    modifiers::{Clause, Filter, ToQuery},
    parse::note_pattern,
};

/// the gifs table
#[derive(Iden)]
pub enum Gifs {
    Table,
    Seq,
    Id,
    Url,
    PreviewGif,
    PreviewVideo,
    PreviewVideoWebm,
    Width,
    Height,
    Tags,
    Uploader,
    Note,
    Group,
}

/// Character used to escape `LIKE` wildcards in tag prefixes.
const LIKE_ESCAPE: char = '!';

impl ToQuery for Clause {
    #[tracing::instrument]
    fn to_query(self) -> SimpleExpr {
        match self {
            Clause::Public => Expr::col(Gifs::Group).is_null(),
            Clause::PublicOrGroups(groups) if groups.is_empty() => Expr::col(Gifs::Group).is_null(),

            // parenthesized by hand so it can't bleed into neighboring `AND`s
            Clause::PublicOrGroups(groups) => {
                tracing::debug!("Including public gifs and groups: {groups:?}");
                let placeholders = vec!["?"; groups.len()].join(", ");
                Expr::cust_with_values(
                    format!(r#"("gifs"."group" IS NULL OR "gifs"."group" IN ({placeholders}))"#),
                    groups,
                )
            }

            Clause::Group(group) => {
                tracing::debug!("Only looking in group `{group}`");
                Expr::col(Gifs::Group).eq(group)
            }

            Clause::Tag(tag) => Expr::cust_with_values(
                r#"EXISTS (SELECT 1 FROM json_each("gifs"."tags") WHERE "value" = ?)"#,
                [tag],
            ),

            // `LIKE` ignores ASCII case in SQLite, which is what we want here
            Clause::TagPrefix(prefix) => {
                tracing::debug!("Looking for a tag starting with `{prefix}`");
                Expr::cust_with_values(
                    r#"EXISTS (SELECT 1 FROM json_each("gifs"."tags") WHERE "value" LIKE ? ESCAPE '!')"#,
                    [format!("{}%", escape_like(&prefix))],
                )
            }

            Clause::Uploader(uploader) => Expr::col(Gifs::Uploader).eq(uploader),

            Clause::NoteRegex(fragment) => Expr::cust_with_values(
                r#""gifs"."note" REGEXP ?"#,
                [note_pattern(&fragment)],
            ),

            Clause::NoteText(text) => {
                tracing::debug!("Full-text searching notes for `{text}`");
                Expr::cust_with_values(
                    r#""gifs"."seq" IN (SELECT rowid FROM "gifs_fts" WHERE "gifs_fts" MATCH ?)"#,
                    [fts_match(&text)],
                )
            }
        }
    }
}

impl Filter {
    /// Every clause, `AND`ed together.
    pub fn condition(&self) -> Condition {
        self.clauses
            .iter()
            .cloned()
            .fold(Cond::all(), |cond, clause| cond.add(clause.to_query()))
    }

    /// Builds the `SELECT` for one page of results.
    ///
    /// Without a sort, rows come back in storage order.
    pub fn select(&self, skip: u64, limit: u32) -> (String, SqlxValues) {
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(Gifs::Table)
            .cond_where(self.condition());

        if let Some(sort) = self.sort {
            select.order_by(Gifs::Id, sort.order());
        }

        select
            .limit(u64::from(limit))
            .offset(skip)
            .build_sqlx(SqliteQueryBuilder)
    }
}

/// Escapes `LIKE` wildcards so a prefix only matches itself.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Turns free text into an FTS5 query where any word may match.
///
/// Each word is quoted, so FTS5 operators in user input are just words.
fn fts_match(text: &str) -> String {
    text.split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use sea_query::{Asterisk, Cond, Query, SqliteQueryBuilder};
    use sea_query_binder::SqlxBinder as _;

    use crate::search::{
        modifiers::{Clause, Filter, ToQuery as _},
        sort::SortKey,
    };

    use super::*;

    fn render(clauses: Vec<Clause>) -> String {
        let filter = Filter {
            clauses,
            sort: None,
        };
        Query::select()
            .column(Asterisk)
            .from(Gifs::Table)
            .cond_where(filter.condition())
            .build_sqlx(SqliteQueryBuilder)
            .0
    }

    #[test]
    fn public_and_uploader() {
        let select = render(vec![Clause::Public, Clause::Uploader("alice".into())]);
        assert_eq!(
            r#"SELECT * FROM "gifs" WHERE "group" IS NULL AND "uploader" = ?"#,
            select
        );
    }

    #[test]
    fn exclusive_group() {
        let (select, _) = Query::select()
            .column(Asterisk)
            .from(Gifs::Table)
            .cond_where(Cond::all().add(Clause::Group("cats".into()).to_query()))
            .build_sqlx(SqliteQueryBuilder);

        assert_eq!(r#"SELECT * FROM "gifs" WHERE "group" = ?"#, select);
    }

    #[test]
    fn empty_group_list_is_public() {
        assert_eq!(
            Clause::PublicOrGroups(Vec::new()).to_query(),
            Clause::Public.to_query()
        );
    }

    #[test]
    fn group_list_is_parenthesized() {
        let select = render(vec![
            Clause::PublicOrGroups(vec!["a".into(), "b".into()]),
            Clause::Uploader("bob".into()),
        ]);

        assert!(
            select.contains(r#"("gifs"."group" IS NULL OR "gifs"."group" IN (?, ?))"#),
            "got: {select}"
        );
        assert!(select.contains(r#""uploader" = ?"#));
    }

    #[test]
    fn tags_check_the_json_array() {
        let select = render(vec![Clause::Tag("cat".into()), Clause::TagPrefix("da".into())]);

        assert!(select.contains(r#"json_each("gifs"."tags") WHERE "value" = ?"#));
        assert!(select.contains(r#""value" LIKE ? ESCAPE '!'"#));
    }

    #[test]
    fn sorted_pages() {
        let filter = Filter {
            clauses: vec![Clause::Public],
            sort: Some(SortKey::New),
        };
        let (select, _) = filter.select(20, 10);
        assert_eq!(
            r#"SELECT * FROM "gifs" WHERE "group" IS NULL ORDER BY "id" DESC LIMIT ? OFFSET ?"#,
            select
        );

        let filter = Filter {
            sort: Some(SortKey::Old),
            ..filter
        };
        assert!(filter.select(0, 10).0.contains(r#"ORDER BY "id" ASC"#));

        let filter = Filter {
            sort: None,
            ..filter
        };
        assert!(!filter.select(0, 10).0.contains("ORDER BY"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("happy_b"), "happy!_b");
        assert_eq!(escape_like("100%!"), "100!%!!");
        assert_eq!(escape_like("cat"), "cat");
    }

    #[test]
    fn full_text_words_are_quoted() {
        assert_eq!(fts_match("happy birthday"), r#""happy" OR "birthday""#);
        assert_eq!(fts_match(r#"  say "hi"  "#), r#""say" OR """hi""""#);
        assert_eq!(fts_match("NOT"), r#""NOT""#);
    }
}
