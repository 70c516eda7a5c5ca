//! Rebuilds the cached usage count of every tag.

use std::collections::BTreeMap;

use crate::{database::Database, error::DatabaseError, models::tags::Tag};

/// What a recount found and changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recount {
    /// Fresh `{tag: count}` over public gifs.
    pub counts: BTreeMap<String, i64>,
    pub upserted: u64,
    pub deleted: u64,
}

/// Counts tags on every public gif, then brings the `tags` table in line.
///
/// Only rows that changed are written. Tags no public gif uses anymore are
/// deleted, even if someone gave them a description.
///
/// Only one recount runs per database at a time. A second caller waits for
/// the first to finish, then counts again.
///
/// This isn't transactional. If it's cut short, whatever was already written
/// stays, and the next run fixes the rest.
#[tracing::instrument(skip_all)]
pub async fn recompute(db: &Database) -> Result<Recount, DatabaseError> {
    let _running = db.lock_recount().await;
    let cached = Tag::counts(db).await?;

    let counts: BTreeMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT tag.value, COUNT(*)
        FROM gifs, json_each(gifs.tags) AS tag
        WHERE gifs."group" IS NULL
        GROUP BY tag.value
        "#,
    )
    .fetch_all(db.pool())
    .await
    .inspect_err(|e| tracing::error!("Failed to count tags. err: {e}"))?
    .into_iter()
    .collect();

    let mut recount = Recount::default();
    let mut conn = db.acquire().await?;

    for (name, &count) in &counts {
        if cached.get(name) == Some(&count) {
            continue;
        }
        Tag::upsert_count(&mut conn, name, count).await?;
        recount.upserted += 1;
    }

    for name in cached.keys().filter(|name| !counts.contains_key(*name)) {
        Tag::delete(&mut conn, name).await?;
        recount.deleted += 1;
    }

    tracing::info!(
        "Recounted {} tags: {} upserted, {} deleted.",
        counts.len(),
        recount.upserted,
        recount.deleted
    );
    recount.counts = counts;
    Ok(recount)
}
