//! Represents tags in all their glory.

use std::collections::HashMap;

use sqlx::{types::Json, SqliteConnection};

use crate::{
    database::Database,
    error::{CatalogueError, DatabaseError, ValidationError},
    validate::Validator,
};

use super::{identity::Identity, EDIT_TAGS_PERMISSION};

/// A tag, plus what the catalogue knows about it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// The tag itself, like `cat` or `happy_birthday`.
    pub name: String,

    /// How many public gifs carry this tag.
    ///
    /// This is a cache, rebuilt by the tag count job. Don't trust it for
    /// anything important.
    pub count: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name of the [`TagCategory`] this belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// The other tags this tag "implies". For example, tags "christmas" and
    /// "halloween" would both imply the "holiday" tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implications: Option<Json<Vec<String>>>,
}

/// The parts of a tag an editor can change.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct TagPatch {
    pub description: Option<String>,
    pub category: Option<String>,
    pub implications: Option<Vec<String>>,
}

/// A label for grouping tags, like "species" or "emotion".
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct TagCategory {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// A six-digit hex color, without the `#`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Tag {
    /// The tags this one implies, or nothing.
    pub fn implied(&self) -> &[String] {
        self.implications
            .as_ref()
            .map(|Json(tags)| tags.as_slice())
            .unwrap_or_default()
    }

    #[tracing::instrument(skip(db))]
    pub async fn find(db: &Database, name: &str) -> Result<Self, CatalogueError> {
        sqlx::query_as::<_, Self>("SELECT * FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| CatalogueError::NotFound {
                what: String::from("tag"),
                key: name.to_string(),
            })
    }

    /// Every tag, most used first.
    #[tracing::instrument(skip(db))]
    pub async fn list(db: &Database) -> Result<Vec<Self>, DatabaseError> {
        sqlx::query_as::<_, Self>("SELECT * FROM tags ORDER BY count DESC, name ASC")
            .fetch_all(db.pool())
            .await
            .map_err(DatabaseError::from)
    }

    /// Tags that declare at least one implication.
    pub async fn with_implications(db: &Database) -> Result<Vec<Self>, DatabaseError> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM tags WHERE implications IS NOT NULL AND json_array_length(implications) > 0",
        )
        .fetch_all(db.pool())
        .await
        .map_err(DatabaseError::from)
    }

    /// Changes a tag's description, category and implications.
    ///
    /// Needs [`EDIT_TAGS_PERMISSION`], and the category (if any) must exist.
    #[tracing::instrument(skip(db, validator))]
    pub async fn update(
        db: &Database,
        validator: &Validator,
        name: &str,
        patch: TagPatch,
        editor: &Identity,
    ) -> Result<Self, CatalogueError> {
        if !editor.has_group(EDIT_TAGS_PERMISSION) {
            return Err(CatalogueError::Forbidden {
                reason: format!("editing tags needs {EDIT_TAGS_PERMISSION}"),
            });
        }

        let mut tag = Self::find(db, name).await?;
        tag.description = patch.description;
        tag.category = patch.category;
        tag.implications = patch.implications.map(Json);
        validator.tag(&tag)?;

        if let Some(category) = &tag.category {
            if !TagCategory::exists(db, category).await? {
                return Err(ValidationError::UnknownCategory {
                    name: category.clone(),
                }
                .into());
            }
        }

        sqlx::query(
            "UPDATE tags SET description = $1, category = $2, implications = $3 WHERE name = $4",
        )
        .bind(&tag.description)
        .bind(&tag.category)
        .bind(&tag.implications)
        .bind(&tag.name)
        .execute(db.pool())
        .await
        .inspect_err(|e| tracing::error!("Failed to update tag `{name}`. err: {e}"))?;

        Ok(tag)
    }

    /// The cached `{name: count}` of every tag.
    pub async fn counts(db: &Database) -> Result<HashMap<String, i64>, DatabaseError> {
        let rows = sqlx::query_as::<_, (String, i64)>("SELECT name, count FROM tags")
            .fetch_all(db.pool())
            .await?;

        Ok(rows.into_iter().collect())
    }

    /// Sets a tag's count, creating the tag if needed. Other fields are kept.
    pub async fn upsert_count(
        conn: &mut SqliteConnection,
        name: &str,
        count: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO tags (name, count)
            VALUES ($1, $2)
            ON CONFLICT(name)
            DO UPDATE SET
                count = excluded.count;
            "#,
        )
        .bind(name)
        .bind(count)
        .execute(conn)
        .await
        .map(|_| ())
        .map_err(DatabaseError::from)
    }

    pub async fn delete(conn: &mut SqliteConnection, name: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM tags WHERE name = $1")
            .bind(name)
            .execute(conn)
            .await
            .map(|_| ())
            .map_err(DatabaseError::from)
    }
}

impl TagCategory {
    pub async fn exists(db: &Database, name: &str) -> Result<bool, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tag_categories WHERE name = $1")
            .bind(name)
            .fetch_one(db.pool())
            .await
            .map(|count| count > 0)
            .map_err(DatabaseError::from)
    }

    pub async fn list(db: &Database) -> Result<Vec<Self>, DatabaseError> {
        sqlx::query_as::<_, Self>("SELECT * FROM tag_categories ORDER BY name ASC")
            .fetch_all(db.pool())
            .await
            .map_err(DatabaseError::from)
    }

    #[tracing::instrument(skip(db, validator))]
    pub async fn create(
        db: &Database,
        validator: &Validator,
        category: Self,
        editor: &Identity,
    ) -> Result<Self, CatalogueError> {
        require_tag_editor(editor)?;
        validator.tag_category(&category)?;

        if Self::exists(db, &category.name).await? {
            return Err(CatalogueError::Forbidden {
                reason: format!("category `{}` already exists", category.name),
            });
        }

        sqlx::query("INSERT INTO tag_categories (name, description, color) VALUES ($1, $2, $3)")
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.color)
            .execute(db.pool())
            .await
            .inspect_err(|e| tracing::error!("Failed to create tag category. err: {e}"))?;

        Ok(category)
    }

    /// Renames a category. Every tag in it moves along.
    #[tracing::instrument(skip(db, validator))]
    pub async fn rename(
        db: &Database,
        validator: &Validator,
        from: &str,
        to: &str,
        editor: &Identity,
    ) -> Result<Self, CatalogueError> {
        require_tag_editor(editor)?;

        let mut tx = db.pool().begin().await?;

        let mut category =
            sqlx::query_as::<_, Self>("SELECT * FROM tag_categories WHERE name = $1")
                .bind(from)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CatalogueError::NotFound {
                    what: String::from("tag category"),
                    key: from.to_string(),
                })?;

        category.name = to.to_string();
        validator.tag_category(&category)?;

        sqlx::query("UPDATE tag_categories SET name = $1 WHERE name = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *tx)
            .await?;

        let moved = sqlx::query("UPDATE tags SET category = $1 WHERE category = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        tracing::debug!("Renamed category `{from}` to `{to}`, moving {moved} tags.");
        Ok(category)
    }

    /// Deletes a category. Its tags become uncategorized.
    #[tracing::instrument(skip(db))]
    pub async fn delete(db: &Database, name: &str, editor: &Identity) -> Result<(), CatalogueError> {
        require_tag_editor(editor)?;

        let mut tx = db.pool().begin().await?;

        let deleted = sqlx::query("DELETE FROM tag_categories WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogueError::NotFound {
                what: String::from("tag category"),
                key: name.to_string(),
            });
        }

        sqlx::query("UPDATE tags SET category = NULL WHERE category = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn require_tag_editor(editor: &Identity) -> Result<(), CatalogueError> {
    if editor.has_group(EDIT_TAGS_PERMISSION) {
        Ok(())
    } else {
        Err(CatalogueError::Forbidden {
            reason: format!("editing tag categories needs {EDIT_TAGS_PERMISSION}"),
        })
    }
}
