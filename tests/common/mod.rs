//! The parent of the other tests.
//!
//! Mostly to import the setup stuff below.

use std::str::FromStr as _;

use camino::Utf8PathBuf;
use kittygifs::{
    database::{Database, InsertIntoTable as _},
    models::{gif::GifEntry, identity::Identity},
};
use sqlx::{
    pool::PoolConnection,
    types::{Json, Uuid},
    Sqlite,
};
use temp_dir::TempDir;
use tracing_subscriber::{filter, layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer};

/// A fresh catalogue. The database goes away with this.
#[allow(dead_code, reason = "it's used in the other tests")]
pub struct Setup {
    pub db: Database,
    _dir: TempDir,
}

/// call this at the top of any new test func! :)
#[allow(dead_code, reason = "it's used in the other tests")]
pub async fn setup() -> Setup {
    // start logging. only the first test to get here wins
    _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_filter(filter::EnvFilter::from_str("DEBUG,sqlx=INFO").unwrap()),
        )
        .try_init();

    let dir = TempDir::new().expect("create db temp dir");
    let path = Utf8PathBuf::try_from(dir.path().join("kittygifs.sqlite")).unwrap();
    let db = Database::connect(&path).await.expect("connect to test db");

    Setup { db, _dir: dir }
}

/// A gif with the given id. Larger ids sort as newer.
#[allow(dead_code, reason = "it's used in the other tests")]
pub fn gif(id: u128, uploader: &str, tags: &[&str], note: &str, group: Option<&str>) -> GifEntry {
    GifEntry {
        id: Uuid::from_u128(id),
        url: format!("https://media.tenor.com/{id}/cat.gif"),
        preview_gif: None,
        preview_video: None,
        preview_video_webm: None,
        width: None,
        height: None,
        tags: Json(tags.iter().map(|t| t.to_string()).collect()),
        uploader: uploader.into(),
        note: note.into(),
        group: group.map(String::from),
    }
}

/// Writes gifs straight into the table, skipping validation.
#[allow(dead_code, reason = "it's used in the other tests")]
pub async fn insert(db: &Database, gifs: &[GifEntry]) {
    for gif in gifs {
        gif.make_insertion_query()
            .execute(db.pool())
            .await
            .expect("insert test gif");
    }
}

#[allow(dead_code, reason = "it's used in the other tests")]
pub fn user(name: &str, groups: &[&str]) -> Identity {
    Identity::new(name, groups.iter().map(|g| g.to_string()).collect())
}

/// The numeric ids of some gifs, in order.
#[allow(dead_code, reason = "it's used in the other tests")]
pub fn ids(gifs: &[GifEntry]) -> Vec<u128> {
    gifs.iter().map(|g| g.id.as_u128()).collect()
}

/// Checks out every pooled connection, so anything else touching the
/// database waits until these drop.
#[allow(dead_code, reason = "it's used in the other tests")]
pub async fn hold_every_connection(db: &Database) -> Vec<PoolConnection<Sqlite>> {
    let max = db.pool().options().get_max_connections();

    let mut held = Vec::new();
    for _ in 0..max {
        held.push(db.acquire().await.expect("check out a connection"));
    }
    held
}
