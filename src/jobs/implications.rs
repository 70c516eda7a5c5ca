//! Makes sure every gif carries the tags its tags imply.

use std::collections::HashMap;

use sqlx::types::Json;

use crate::{database::Database, error::DatabaseError, models::tags::Tag};

/// Adds any missing implied tags to every gif, following implications of
/// implications until nothing new turns up. Tags are only ever added.
///
/// Returns how many gif rows were rewritten. Running it again right away
/// changes nothing.
#[tracing::instrument(skip_all)]
pub async fn backfill_implications(db: &Database) -> Result<u64, DatabaseError> {
    let implications: HashMap<String, Vec<String>> = Tag::with_implications(db)
        .await?
        .into_iter()
        .map(|tag| {
            let implied = tag.implied().to_vec();
            (tag.name, implied)
        })
        .collect();

    if implications.is_empty() {
        tracing::debug!("No tags imply others. Nothing to backfill.");
        return Ok(0);
    }

    let gifs = sqlx::query_as::<_, (i64, Json<Vec<String>>)>(
        r#"
        SELECT seq, tags FROM gifs
        WHERE EXISTS (
            SELECT 1 FROM json_each(gifs.tags) AS t
            JOIN tags ON tags.name = t.value
            WHERE tags.implications IS NOT NULL AND json_array_length(tags.implications) > 0
        )
        "#,
    )
    .fetch_all(db.pool())
    .await
    .inspect_err(|e| tracing::error!("Failed to find gifs with implying tags. err: {e}"))?;

    let mut tx = db.pool().begin().await?;
    let mut changed = 0;

    for (seq, Json(mut tags)) in gifs {
        if !close_over(&mut tags, &implications) {
            continue;
        }

        sqlx::query("UPDATE gifs SET tags = $1 WHERE seq = $2")
            .bind(Json(&tags))
            .bind(seq)
            .execute(&mut *tx)
            .await
            .inspect_err(|e| tracing::error!("Failed to backfill gif #{seq}. err: {e}"))?;
        changed += 1;
    }

    tx.commit().await?;

    tracing::info!("Implication backfill changed {changed} gifs.");
    Ok(changed)
}

/// Appends everything `tags` implies, directly or through other implied
/// tags. Returns whether anything was added.
fn close_over(tags: &mut Vec<String>, implications: &HashMap<String, Vec<String>>) -> bool {
    let before = tags.len();

    // newly pushed tags get visited too, so chains resolve in one pass
    let mut i = 0;
    while i < tags.len() {
        if let Some(implied) = implications.get(&tags[i]) {
            for extra in implied {
                if !tags.contains(extra) {
                    tags.push(extra.clone());
                }
            }
        }
        i += 1;
    }

    tags.len() != before
}
