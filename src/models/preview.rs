//! Preview media scraped from Tenor pages.
//!
//! Fetching the page is up to the caller. This only reads it.

use regex::Regex;

use crate::error::ValidationError;

/// Server-computed preview fields for a gif.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub gif: String,
    pub video: String,
    pub video_webm: String,
    /// `(width, height)` in pixels, when the page lists it.
    pub size: Option<(u32, u32)>,
}

#[derive(Clone, Debug)]
pub struct TenorScraper {
    view_url: Regex,
    gif: Regex,
    video: Regex,
    video_webm: Regex,
    size: Regex,
}

impl TenorScraper {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            view_url: Regex::new(r"(?i)^https://tenor\.com/view/(?:.*-)?(\d+)$")?,
            gif: media_url_regex("mediumgif", "gif")?,
            video: media_url_regex("mp4", "mp4")?,
            video_webm: media_url_regex("webm", "webm")?,
            size: Regex::new(r#"(?i)"details":\{"width":(\d+),"height":(\d+)"#)?,
        })
    }

    /// The numeric id of a Tenor view url, or `None` if `url` isn't one.
    pub fn view_id<'u>(&self, url: &'u str) -> Option<&'u str> {
        self.view_url
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Where to fetch the page for a view id.
    pub fn page_url(view_id: &str) -> String {
        format!("https://tenor.com/view/{view_id}")
    }

    /// Pulls preview urls out of a Tenor page body.
    ///
    /// The three urls are required. The size is best-effort.
    pub fn extract(&self, page: &str) -> Result<Preview, ValidationError> {
        let size = self.size.captures(page).and_then(|caps| {
            let width = caps.get(1)?.as_str().parse().ok()?;
            let height = caps.get(2)?.as_str().parse().ok()?;
            Some((width, height))
        });

        Ok(Preview {
            gif: json_string_capture(&self.gif, page, "gif")?,
            video: json_string_capture(&self.video, page, "video")?,
            video_webm: json_string_capture(&self.video_webm, page, "webm video")?,
            size,
        })
    }
}

/// Matches `"<key>":{"url":"https://media.tenor.com/.../....<ext>"`
/// and captures the quoted url, still JSON-escaped.
fn media_url_regex(key: &str, ext: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"(?i)"{key}":\{{"url":("https:\\u002F\\u002Fmedia[0-9]?\.tenor\.com\\u002F.+?\\u002F.+?\.{ext}")"#
    ))
}

fn json_string_capture(re: &Regex, page: &str, what: &str) -> Result<String, ValidationError> {
    let missing = || ValidationError::MissingPreview {
        what: what.to_string(),
    };

    let quoted = re
        .captures(page)
        .and_then(|caps| caps.get(1))
        .ok_or_else(missing)?;

    serde_json::from_str::<String>(quoted.as_str())
        .inspect_err(|e| tracing::warn!("Tenor {what} url wasn't a JSON string. err: {e}"))
        .map_err(|_| missing())
}
