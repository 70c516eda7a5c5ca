use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ConfigError;

/// Server-wide settings.
///
/// This is built once at startup and handed out by reference. Every field
/// has a default, so a config file only needs to list what it changes.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the SQLite database lives.
    pub database_path: Utf8PathBuf,

    /// Hosts that gif urls may point at.
    pub allowed_domains: Vec<String>,

    /// Limits applied to searches.
    pub search: SearchConfig,

    /// Scheduling for the tag count job.
    pub tag_count: TagCountConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: Utf8PathBuf::from("kittygifs.sqlite"),
            allowed_domains: [
                "tenor.com",
                "media.tenor.com",
                "i.imgur.com",
                "media.discordapp.net",
                "cdn.discordapp.com",
                "autumn.revolt.chat",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            search: SearchConfig::default(),
            tag_count: TagCountConfig::default(),
        }
    }
}

impl Config {
    /// Attempts to read a `Config` from the TOML file at `path`.
    pub async fn from_disk(path: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let s = tokio::fs::read_to_string(path)
            .await
            .inspect_err(|e| tracing::error!("Failed to read config at `{path}`. err: {e}"))
            .map_err(ConfigError::ReadFailed)?;

        Self::from_toml(&s)
    }

    /// Parses a `Config` from TOML text.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::ParseFailed)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Longest raw query string accepted, in bytes.
    pub max_query_len: usize,

    /// How long a search may take before it's abandoned.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_query_len: 256,
            timeout_secs: 16,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TagCountConfig {
    /// Time to wait between the end of one recount and the start of the next.
    pub interval_secs: u64,

    /// Deadline for a single recount.
    pub timeout_secs: u64,
}

impl Default for TagCountConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60 * 60,
            timeout_secs: 20,
        }
    }
}

impl TagCountConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
