//! Types that are really the bedrock of the app.

pub mod gdpr;
pub mod gif;
pub mod identity;
pub mod notification;
pub mod preview;
pub mod tags;

/// Lets the holder edit any gif, not just their own.
pub const EDIT_ALL_GIFS_PERMISSION: &str = "perm:edit_all_gifs";

/// Lets the holder delete any gif, not just their own.
pub const DELETE_ALL_GIFS_PERMISSION: &str = "perm:delete_all_gifs";

/// Lets the holder change tags and tag categories.
pub const EDIT_TAGS_PERMISSION: &str = "perm:edit_tags";

/// Members of this group are told about every gif edit suggestion.
pub const GIF_EDIT_SUGGESTIONS_GROUP: &str = "gifEditSuggestions";
