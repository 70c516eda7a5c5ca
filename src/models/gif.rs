use chrono::{DateTime, Utc};
use sqlx::{
    query::Query,
    sqlite::SqliteArguments,
    types::{Json, Uuid},
    Sqlite,
};

use crate::{
    database::{Database, InsertIntoTable},
    error::{CatalogueError, DatabaseError},
    validate::Validator,
};

use super::{
    identity::Identity,
    notification::{Notification, NotificationKind},
    preview::Preview,
    DELETE_ALL_GIFS_PERMISSION, EDIT_ALL_GIFS_PERMISSION, GIF_EDIT_SUGGESTIONS_GROUP,
};

/// A single bookmarked gif.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GifEntry {
    /// A UUIDv7. Newer gifs always have larger ids.
    pub id: Uuid,

    /// Where the gif actually lives.
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_gif: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_video: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_video_webm: Option<String>,

    /// Width of the preview, in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Height of the preview, in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    pub tags: Json<Vec<String>>,

    /// Username of whoever uploaded this. Never changes.
    pub uploader: String,

    pub note: String,

    /// Who can see this gif. See [`GifEntry::visibility`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Who can see a gif, decoded from its `group`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility<'a> {
    Public,
    Private { owner: &'a str },
    Shared(&'a str),
}

/// The group a client asked for when writing a gif.
///
/// Clients send `null`, `""`, `"private"` or a group name. Only the last two
/// need a permission check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupInput {
    Public,
    Private,
    Named(String),
}

impl From<Option<String>> for GroupInput {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::Public,
            Some(group) if group.is_empty() => Self::Public,
            Some(group) if group == "private" => Self::Private,
            Some(group) => Self::Named(group),
        }
    }
}

impl GroupInput {
    /// Turns the request into the value that's stored, checking that the
    /// caller is allowed to put gifs in that group.
    pub fn resolve(self, caller: &Identity) -> Result<Option<String>, CatalogueError> {
        match self {
            Self::Public => Ok(None),
            Self::Private => Ok(Some(caller.private_group())),
            Self::Named(group) if caller.has_group(&group) => Ok(Some(group)),
            Self::Named(group) => Err(CatalogueError::Forbidden {
                reason: format!("you do not have the group {group}"),
            }),
        }
    }
}

/// A gif as sent by its uploader. Previews are never taken from the client.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct NewGif {
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub group: Option<String>,
}

/// The editable parts of a gif.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct GifEdit {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub group: Option<String>,
}

/// New tags or a new note, proposed by someone who can't edit the gif.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EditSuggestion {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl GifEntry {
    pub fn visibility(&self) -> Visibility<'_> {
        match self.group.as_deref() {
            None => Visibility::Public,
            Some(group) => match group.strip_prefix('@') {
                Some(owner) => Visibility::Private { owner },
                None => Visibility::Shared(group),
            },
        }
    }

    /// When this gif was uploaded, read back out of its id.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let (secs, nanos) = self.id.get_timestamp()?.to_unix();
        DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
    }

    /// Whether `caller` may see this gif at all.
    pub fn is_visible_to(&self, caller: Option<&Identity>) -> bool {
        match (&self.group, caller) {
            (None, _) => true,
            (Some(group), Some(caller)) => caller.has_group(group),
            (Some(_), None) => false,
        }
    }

    /// Uploads a new gif on behalf of `caller`.
    ///
    /// `preview` comes from the server's own lookup of the url, if it did one.
    #[tracing::instrument(skip(db, validator, preview))]
    pub async fn create(
        db: &Database,
        validator: &Validator,
        new: NewGif,
        preview: Option<Preview>,
        caller: &Identity,
    ) -> Result<Self, CatalogueError> {
        let group = GroupInput::from(new.group).resolve(caller)?;

        let mut gif = Self {
            id: Uuid::now_v7(),
            url: new.url,
            preview_gif: None,
            preview_video: None,
            preview_video_webm: None,
            width: None,
            height: None,
            tags: Json(new.tags),
            uploader: caller.username.clone(),
            note: new.note,
            group,
        };
        validator.gif(&gif)?;

        if let Some(preview) = preview {
            gif.apply_preview(preview);
        }

        gif.make_insertion_query()
            .execute(db.pool())
            .await
            .inspect_err(|e| tracing::error!("Failed to insert gif! err: {e}"))?;

        tracing::debug!("Gif `{}` uploaded by `{}`.", gif.id, gif.uploader);
        Ok(gif)
    }

    /// Grabs a gif by id, refusing if `caller` can't see its group.
    #[tracing::instrument(skip(db))]
    pub async fn find_by_id(
        db: &Database,
        id: Uuid,
        caller: Option<&Identity>,
    ) -> Result<Self, CatalogueError> {
        let gif = Self::fetch(db, id).await?;

        if !gif.is_visible_to(caller) {
            return Err(CatalogueError::Forbidden {
                reason: String::from("you do not have access to this gif"),
            });
        }

        Ok(gif)
    }

    /// Replaces the tags, note and group of a gif.
    ///
    /// Only the uploader, or someone with [`EDIT_ALL_GIFS_PERMISSION`], may do
    /// this. If the edit applies an [`EditSuggestion`], pass its event id as
    /// `suggestion` and everyone's notifications about it are cleared.
    #[tracing::instrument(skip(db, validator))]
    pub async fn update(
        db: &Database,
        validator: &Validator,
        id: Uuid,
        edit: GifEdit,
        suggestion: Option<Uuid>,
        caller: &Identity,
    ) -> Result<Self, CatalogueError> {
        let mut gif = Self::fetch(db, id).await?;

        if gif.uploader != caller.username && !caller.has_group(EDIT_ALL_GIFS_PERMISSION) {
            return Err(CatalogueError::Forbidden {
                reason: format!(
                    "you are not the uploader of this gif nor do you have {EDIT_ALL_GIFS_PERMISSION}"
                ),
            });
        }

        gif.group = GroupInput::from(edit.group).resolve(caller)?;
        gif.tags = Json(edit.tags);
        gif.note = edit.note;
        validator.gif(&gif)?;

        let mut tx = db.pool().begin().await?;

        sqlx::query(r#"UPDATE gifs SET tags = $1, note = $2, "group" = $3 WHERE id = $4"#)
            .bind(&gif.tags)
            .bind(&gif.note)
            .bind(&gif.group)
            .bind(gif.id)
            .execute(&mut *tx)
            .await
            .inspect_err(|e| tracing::error!("Failed to update gif `{id}`. err: {e}"))?;

        if let Some(event_id) = suggestion {
            Notification::delete_by_event(&mut *tx, event_id).await?;
        }

        tx.commit().await?;
        Ok(gif)
    }

    /// Sends an edit suggestion for a gif to its uploader and to everyone in
    /// [`GIF_EDIT_SUGGESTIONS_GROUP`].
    ///
    /// Anyone who can see the gif may suggest. Returns the suggestion's event
    /// id, which [`GifEntry::update`] takes once it's applied.
    #[tracing::instrument(skip(db, validator))]
    pub async fn suggest_edit(
        db: &Database,
        validator: &Validator,
        id: Uuid,
        suggestion: EditSuggestion,
        caller: &Identity,
    ) -> Result<Uuid, CatalogueError> {
        let gif = Self::find_by_id(db, id, Some(caller)).await?;

        validator.tags(&suggestion.tags)?;
        if let Some(note) = &suggestion.note {
            validator.note(note)?;
        }

        let event_id = Uuid::now_v7();
        let data = serde_json::json!({
            "gifId": id,
            "tags": suggestion.tags,
            "note": suggestion.note,
            "username": caller.username,
        });

        Notification::notify_group(
            db,
            GIF_EDIT_SUGGESTIONS_GROUP,
            event_id,
            NotificationKind::GifEditSuggestion,
            data,
            &[gif.uploader.as_str()],
        )
        .await?;

        Ok(event_id)
    }

    /// Deletes a gif, returning what it was.
    ///
    /// Only the uploader, or someone with [`DELETE_ALL_GIFS_PERMISSION`], may
    /// do this.
    #[tracing::instrument(skip(db))]
    pub async fn delete(
        db: &Database,
        id: Uuid,
        caller: &Identity,
    ) -> Result<Self, CatalogueError> {
        let gif = Self::fetch(db, id).await?;

        if gif.uploader != caller.username && !caller.has_group(DELETE_ALL_GIFS_PERMISSION) {
            return Err(CatalogueError::Forbidden {
                reason: format!(
                    "you are not the uploader of this gif nor do you have {DELETE_ALL_GIFS_PERMISSION}"
                ),
            });
        }

        sqlx::query("DELETE FROM gifs WHERE id = $1")
            .bind(id)
            .execute(db.pool())
            .await
            .inspect_err(|e| tracing::error!("Failed to delete gif `{id}`. err: {e}"))?;

        Ok(gif)
    }

    /// How many gifs `username` has uploaded, of any visibility.
    #[tracing::instrument(skip(db))]
    pub async fn count_by_uploader(db: &Database, username: &str) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM gifs WHERE uploader = $1")
            .bind(username)
            .fetch_one(db.pool())
            .await
            .map_err(DatabaseError::from)
    }
}

// the private impl
impl GifEntry {
    async fn fetch(db: &Database, id: Uuid) -> Result<Self, CatalogueError> {
        sqlx::query_as::<_, Self>("SELECT * FROM gifs WHERE id = $1")
            .bind(id)
            .fetch_optional(db.pool())
            .await
            .inspect_err(|e| tracing::warn!("Failed to query for gif `{id}`. err: {e}"))?
            .ok_or_else(|| CatalogueError::NotFound {
                what: String::from("gif"),
                key: id.to_string(),
            })
    }

    fn apply_preview(&mut self, preview: Preview) {
        self.preview_gif = Some(preview.gif);
        self.preview_video = Some(preview.video);
        self.preview_video_webm = Some(preview.video_webm);
        if let Some((width, height)) = preview.size {
            self.width = Some(width);
            self.height = Some(height);
        }
    }
}

impl InsertIntoTable for GifEntry {
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
        INSERT INTO gifs
        (id, url, preview_gif, preview_video, preview_video_webm, width, height, tags, uploader, note, "group")
        VALUES
        ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        )
        .bind(self.id)
        .bind(&self.url)
        .bind(&self.preview_gif)
        .bind(&self.preview_video)
        .bind(&self.preview_video_webm)
        .bind(self.width)
        .bind(self.height)
        .bind(&self.tags)
        .bind(&self.uploader)
        .bind(&self.note)
        .bind(&self.group)
    }
}
