//! Who's asking.
//!
//! Sessions and passwords live elsewhere. By the time a request reaches the
//! catalogue, it's either anonymous or carries one of these.

use sqlx::types::Json;

use crate::{
    database::{Database, InsertIntoTable},
    error::DatabaseError,
};

/// This group passes every group check.
pub const ADMIN_GROUP: &str = "admin";

/// An authenticated user and the groups they belong to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Identity {
    pub username: String,

    /// Named groups this user was added to. Their private group is implied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    groups: Option<Json<Vec<String>>>,
}

impl Identity {
    pub fn new(username: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            username: username.into(),
            groups,
        }
    }

    /// The `@username` group that only this user can see.
    pub fn private_group(&self) -> String {
        format!("@{}", self.username)
    }

    pub fn is_admin(&self) -> bool {
        self.groups.iter().any(|g| g == ADMIN_GROUP)
    }

    /// Checks whether this user may see entries in `group`.
    ///
    /// Admins pass every check. A `@name` group is only ever satisfied by the
    /// user called `name`.
    pub fn has_group(&self, group: &str) -> bool {
        if self.is_admin() {
            return true;
        }

        match group.strip_prefix('@') {
            Some(owner) => owner == self.username,
            None => self.groups.iter().any(|g| g == group),
        }
    }

    /// Every group this user can see: their named groups plus their private
    /// one.
    pub fn visible_groups(&self) -> Vec<String> {
        let mut groups = self.groups.clone();
        groups.push(self.private_group());
        groups
    }

    /// Loads the identity for `username`, if that user exists.
    #[tracing::instrument(skip(db))]
    pub async fn load(db: &Database, username: &str) -> Result<Option<Self>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(db.pool())
            .await
            .inspect_err(|e| tracing::warn!("Failed to look up user `{username}`. err: {e}"))?;

        Ok(row.map(|row| Self {
            username: row.username,
            groups: row.groups.map(|Json(groups)| groups).unwrap_or_default(),
        }))
    }

    /// Stores this identity, replacing any previous groups.
    #[tracing::instrument(skip(db))]
    pub async fn save(&self, db: &Database) -> Result<(), DatabaseError> {
        self.make_insertion_query()
            .execute(db.pool())
            .await
            .inspect_err(|e| tracing::error!("Failed to save user `{}`. err: {e}", self.username))
            .map(|_| ())
            .map_err(DatabaseError::from)
    }
}

impl InsertIntoTable for Identity {
    fn make_insertion_query(
        &self,
    ) -> sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
        sqlx::query(
            r#"
            INSERT INTO users (username, groups)
            VALUES ($1, $2)
            ON CONFLICT(username)
            DO UPDATE SET
                groups = excluded.groups;
            "#,
        )
        .bind(&self.username)
        .bind(Json(&self.groups))
    }
}
