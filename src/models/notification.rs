//! A small inbox of things users should look at.
//!
//! Every notification belongs to an *event*. One event can notify several
//! users (everyone in a group, say), and resolving the event removes all of
//! its notifications together.

use core::str::FromStr;

use sqlx::{
    query::Query,
    sqlite::SqliteArguments,
    types::{Json, Uuid},
    Sqlite, SqliteConnection,
};

use crate::{
    database::{Database, InsertIntoTable},
    error::{CatalogueError, DatabaseError, NotificationError},
};

use super::identity::Identity;

/// What a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    /// Someone asked for their data, or for their account to be deleted.
    GdprRequest,

    /// Someone suggested new tags or a new note for a gif.
    GifEditSuggestion,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GdprRequest => "gdprRequest",
            Self::GifEditSuggestion => "gifEditSuggestion",
        }
    }

    /// Whether the recipient may dismiss this themselves.
    ///
    /// Others go away when the server resolves their event, like when an
    /// edit suggestion is applied.
    pub fn is_deletable(&self) -> bool {
        matches!(self, Self::GdprRequest)
    }

    /// Whether dismissing one of these dismisses it for everyone who got it.
    pub fn deletes_whole_event(&self) -> bool {
        matches!(self, Self::GdprRequest)
    }
}

impl FromStr for NotificationKind {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gdprRequest" => Ok(Self::GdprRequest),
            "gifEditSuggestion" => Ok(Self::GifEditSuggestion),
            other => Err(NotificationError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = NotificationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One entry in a user's inbox.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// A UUIDv7, so the inbox reads oldest first.
    pub id: Uuid,

    /// Whose inbox this is in.
    pub username: String,

    pub event_id: Uuid,

    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,

    /// Whatever the client needs to show it, like the gif id of a suggestion.
    pub data: Json<serde_json::Value>,
}

impl Notification {
    fn new(
        username: impl Into<String>,
        event_id: Uuid,
        kind: NotificationKind,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            event_id,
            kind,
            data: Json(data),
        }
    }

    /// Drops a notification into one user's inbox.
    #[tracing::instrument(skip(db, data))]
    pub async fn notify_user(
        db: &Database,
        username: &str,
        event_id: Uuid,
        kind: NotificationKind,
        data: serde_json::Value,
    ) -> Result<Self, DatabaseError> {
        let notification = Self::new(username, event_id, kind, data);

        notification
            .make_insertion_query()
            .execute(db.pool())
            .await
            .inspect_err(|e| tracing::error!("Failed to notify `{username}`. err: {e}"))?;

        Ok(notification)
    }

    /// Notifies every member of `group`, plus each of `also`.
    ///
    /// Nobody is notified twice, even if they're in both. Returns how many
    /// users were notified.
    #[tracing::instrument(skip(db, data))]
    pub async fn notify_group(
        db: &Database,
        group: &str,
        event_id: Uuid,
        kind: NotificationKind,
        data: serde_json::Value,
        also: &[&str],
    ) -> Result<u64, DatabaseError> {
        let mut recipients = sqlx::query_scalar::<_, String>(
            r#"
            SELECT username FROM users
            WHERE EXISTS (SELECT 1 FROM json_each(users.groups) WHERE value = $1)
            "#,
        )
        .bind(group)
        .fetch_all(db.pool())
        .await
        .inspect_err(|e| tracing::error!("Failed to list members of `{group}`. err: {e}"))?;

        recipients.retain(|username| !also.contains(&username.as_str()));
        recipients.extend(also.iter().map(|username| username.to_string()));

        let mut tx = db.pool().begin().await?;
        for username in &recipients {
            Self::new(username.as_str(), event_id, kind, data.clone())
                .make_insertion_query()
                .execute(&mut *tx)
                .await
                .inspect_err(|e| tracing::error!("Failed to notify `{username}`. err: {e}"))?;
        }
        tx.commit().await?;

        tracing::debug!(
            "Sent `{}` for event `{event_id}` to {} users.",
            kind.as_str(),
            recipients.len()
        );
        Ok(recipients.len() as u64)
    }

    /// Everything in `username`'s inbox, oldest first.
    #[tracing::instrument(skip(db))]
    pub async fn list(db: &Database, username: &str) -> Result<Vec<Self>, DatabaseError> {
        sqlx::query_as::<_, Self>("SELECT * FROM notifications WHERE username = $1 ORDER BY id ASC")
            .bind(username)
            .fetch_all(db.pool())
            .await
            .inspect_err(|e| tracing::warn!("Failed to list notifications. err: {e}"))
            .map_err(DatabaseError::from)
    }

    pub async fn count(db: &Database, username: &str) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE username = $1")
            .bind(username)
            .fetch_one(db.pool())
            .await
            .map_err(DatabaseError::from)
    }

    /// The notification `username` got for `event_id`.
    #[tracing::instrument(skip(db))]
    pub async fn find_by_event(
        db: &Database,
        event_id: Uuid,
        username: &str,
    ) -> Result<Self, CatalogueError> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM notifications WHERE event_id = $1 AND username = $2",
        )
        .bind(event_id)
        .bind(username)
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| CatalogueError::NotFound {
            what: String::from("notification"),
            key: event_id.to_string(),
        })
    }

    /// Dismisses one of `caller`'s notifications.
    ///
    /// Only [deletable](NotificationKind::is_deletable) kinds can be
    /// dismissed. Some kinds take the rest of their event with them. Returns
    /// how many notifications were removed.
    #[tracing::instrument(skip(db))]
    pub async fn delete(db: &Database, id: Uuid, caller: &Identity) -> Result<u64, CatalogueError> {
        let notification = sqlx::query_as::<_, Self>(
            "SELECT * FROM notifications WHERE id = $1 AND username = $2",
        )
        .bind(id)
        .bind(&caller.username)
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| CatalogueError::NotFound {
            what: String::from("notification"),
            key: id.to_string(),
        })?;

        if !notification.kind.is_deletable() {
            return Err(CatalogueError::Forbidden {
                reason: String::from("this notification is not deletable"),
            });
        }

        let mut conn = db.acquire().await?;
        if notification.kind.deletes_whole_event() {
            return Ok(Self::delete_by_event(&mut conn, notification.event_id).await?);
        }

        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map(|res| res.rows_affected())
            .map_err(CatalogueError::from)
    }

    /// Removes every notification sent for `event_id`, for everyone.
    pub async fn delete_by_event(
        conn: &mut SqliteConnection,
        event_id: Uuid,
    ) -> Result<u64, DatabaseError> {
        let deleted = sqlx::query("DELETE FROM notifications WHERE event_id = $1")
            .bind(event_id)
            .execute(conn)
            .await
            .inspect_err(|e| tracing::error!("Failed to resolve event `{event_id}`. err: {e}"))?
            .rows_affected();

        tracing::debug!("Resolved event `{event_id}`, removing {deleted} notifications.");
        Ok(deleted)
    }
}

impl InsertIntoTable for Notification {
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, username, event_id, kind, data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(self.id)
        .bind(&self.username)
        .bind(self.event_id)
        .bind(self.kind.as_str())
        .bind(&self.data)
    }
}
