//! Write-path checks for gifs, tags, tag categories and usernames.
//!
//! A [`Validator`] is built once from the [`Config`] and shared by reference.

use regex::Regex;

use crate::{
    config::Config,
    error::{ConfigError, ValidationError},
    models::{
        gif::GifEntry,
        tags::{Tag, TagCategory},
    },
};

pub const MAX_URL_LEN: usize = 320;
pub const MAX_TAGS: usize = 24;
pub const MAX_NOTE_LEN: usize = 512;
pub const MAX_DESCRIPTION_LEN: usize = 128;
pub const MAX_CATEGORY_LEN: usize = 32;

/// Category name that can't be created, since it stands for "no category".
pub const RESERVED_CATEGORY: &str = "none";

#[derive(Clone, Debug)]
pub struct Validator {
    tag: Regex,
    username: Regex,
    category: Regex,
    color: Regex,
    url: Regex,
    allowed_domains: Vec<String>,
}

impl Validator {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            tag: Regex::new("^[a-z0-9_]{2,20}$")?,
            username: Regex::new("^[a-z0-9_]{3,20}$")?,
            category: Regex::new("^[a-z0-9_]{1,32}$")?,
            color: Regex::new("^[0-9a-fA-F]{6}$")?,
            // scheme, then host (skipping any userinfo)
            url: Regex::new(r"^([A-Za-z][A-Za-z0-9+.-]*)://(?:[^/?#@]*@)?([^/?#:]*)")?,
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        })
    }

    /// Checks every client-controlled field of a gif.
    pub fn gif(&self, gif: &GifEntry) -> Result<(), ValidationError> {
        self.url(&gif.url)?;
        self.tags(&gif.tags)?;
        self.note(&gif.note)?;

        if gif.group.as_deref() == Some("") {
            return Err(ValidationError::EmptyGroup);
        }

        Ok(())
    }

    pub fn url(&self, url: &str) -> Result<(), ValidationError> {
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        if url.len() > MAX_URL_LEN {
            return Err(ValidationError::UrlTooLong { max: MAX_URL_LEN });
        }

        let not_http = || ValidationError::UrlNotHttp {
            url: url.to_string(),
        };
        let caps = self.url.captures(url).ok_or_else(not_http)?;
        let scheme = caps.get(1).map(|m| m.as_str().to_lowercase());
        if !matches!(scheme.as_deref(), Some("http" | "https")) {
            return Err(not_http());
        }

        let host = caps
            .get(2)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        if !self.allowed_domains.contains(&host) {
            return Err(ValidationError::DomainNotAllowed { domain: host });
        }

        Ok(())
    }

    /// Checks tag count and syntax, and rejects duplicates.
    pub fn tags(&self, tags: &[String]) -> Result<(), ValidationError> {
        if tags.len() > MAX_TAGS {
            return Err(ValidationError::TooManyTags { max: MAX_TAGS });
        }
        for (i, tag) in tags.iter().enumerate() {
            if !self.tag.is_match(tag) {
                return Err(ValidationError::InvalidTag { tag: tag.clone() });
            }
            if tags[..i].contains(tag) {
                return Err(ValidationError::DuplicateTag { tag: tag.clone() });
            }
        }
        Ok(())
    }

    pub fn note(&self, note: &str) -> Result<(), ValidationError> {
        if note.len() > MAX_NOTE_LEN {
            return Err(ValidationError::NoteTooLong { max: MAX_NOTE_LEN });
        }
        Ok(())
    }

    /// Checks a tag's editable fields. Doesn't look at its name, and doesn't
    /// check that its category exists.
    pub fn tag(&self, tag: &Tag) -> Result<(), ValidationError> {
        optional_text("description", tag.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        optional_text("category", tag.category.as_deref(), MAX_CATEGORY_LEN)?;

        if let Some(implications) = &tag.implications {
            self.tags(&implications.0)?;
        }

        Ok(())
    }

    pub fn tag_category(&self, category: &TagCategory) -> Result<(), ValidationError> {
        let name = &category.name;
        if name.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "name".into(),
            });
        }
        if name.len() > MAX_CATEGORY_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "name".into(),
                max: MAX_CATEGORY_LEN,
            });
        }
        if name == RESERVED_CATEGORY {
            return Err(ValidationError::ReservedName { name: name.clone() });
        }
        if !self.category.is_match(name) {
            return Err(ValidationError::InvalidName { name: name.clone() });
        }

        if let Some(description) = &category.description {
            if description.len() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::FieldTooLong {
                    field: "description".into(),
                    max: MAX_DESCRIPTION_LEN,
                });
            }
        }
        if let Some(color) = &category.color {
            if !self.color.is_match(color) {
                return Err(ValidationError::InvalidColor {
                    color: color.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn username(&self, username: &str) -> Result<(), ValidationError> {
        if self.username.is_match(username) {
            Ok(())
        } else {
            Err(ValidationError::InvalidUsername {
                username: username.to_string(),
            })
        }
    }
}

/// `None` is fine. `Some("")` should have been `None`.
fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some("") => Err(ValidationError::EmptyField {
            field: field.to_string(),
        }),
        Some(s) if s.len() > max => Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}
