//! Background maintenance for the catalogue.

pub mod implications;
pub mod tag_count;

use std::time::Duration;

use crate::{config::TagCountConfig, database::Database};

pub use implications::backfill_implications;
pub use tag_count::{recompute, Recount};

/// A 'daemon' that keeps tag counts fresh.
pub struct TagCountDaemon;

impl TagCountDaemon {
    /// Recounts tags forever, waiting `config.interval()` between runs.
    ///
    /// The wait only starts once a run finishes, so runs never overlap.
    ///
    /// NOTE: You should use this with `tokio::spawn`.
    #[tracing::instrument(skip_all)]
    pub async fn run(db: Database, config: TagCountConfig) {
        tracing::info!("starting tag count daemon...");

        loop {
            Self::tick(&db, config.timeout()).await;
            tokio::time::sleep(config.interval()).await;
        }
    }

    /// Runs one recount under `timeout`. Failures are logged, not returned,
    /// since the next run starts from scratch anyway.
    pub async fn tick(db: &Database, timeout: Duration) -> Option<Recount> {
        match tokio::time::timeout(timeout, recompute(db)).await {
            Ok(Ok(recount)) => Some(recount),
            Ok(Err(e)) => {
                tracing::error!("Tag recount failed. err: {e}");
                None
            }
            Err(_) => {
                tracing::warn!("Tag recount timed out after {timeout:?}. Some counts may be stale.");
                None
            }
        }
    }
}
