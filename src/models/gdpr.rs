//! Requests for a copy of someone's data, or for their account to go away.
//!
//! These are logged and handed to the admins. Nothing here acts on them.

use sqlx::types::Uuid;

use crate::{
    database::Database,
    error::{CatalogueError, ValidationError},
};

use super::{
    identity::{Identity, ADMIN_GROUP},
    notification::{Notification, NotificationKind},
};

/// Longest note a user can attach to a request.
pub const MAX_GDPR_NOTE_LEN: usize = 2048;

/// What the user asked for.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdprRequest {
    /// `true` to delete the account, `false` for a copy of its data.
    pub is_deletion: bool,

    /// For deletions: leave their public gifs up.
    #[serde(default)]
    pub keep_posts: bool,

    #[serde(default)]
    pub note: String,
}

impl GdprRequest {
    pub fn kind(&self) -> &'static str {
        if self.is_deletion {
            "deletion"
        } else {
            "request"
        }
    }

    /// Logs the request, then notifies every admin.
    ///
    /// The returned id is also the event id of those notifications, so an
    /// admin dismissing one dismisses them all.
    #[tracing::instrument(skip(db))]
    pub async fn file(self, db: &Database, caller: &Identity) -> Result<Uuid, CatalogueError> {
        if self.note.len() > MAX_GDPR_NOTE_LEN {
            return Err(ValidationError::NoteTooLong {
                max: MAX_GDPR_NOTE_LEN,
            }
            .into());
        }

        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO gdpr_requests (id, username, is_deletion, keep_posts, note)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&caller.username)
        .bind(self.is_deletion)
        .bind(self.keep_posts)
        .bind(&self.note)
        .execute(db.pool())
        .await
        .inspect_err(|e| tracing::error!("Failed to log gdpr request. err: {e}"))?;

        tracing::info!("New gdpr {} from `{}`.", self.kind(), caller.username);

        Notification::notify_group(
            db,
            ADMIN_GROUP,
            id,
            NotificationKind::GdprRequest,
            serde_json::json!({ "username": caller.username }),
            &[],
        )
        .await?;

        Ok(id)
    }
}
