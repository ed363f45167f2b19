use std::time::Duration;

use time::OffsetDateTime;
use tokio::time as tokio_time;

use crate::Result;
use vcat_storage::{cache, db::Db};

pub struct WorkerState {
	pub db: Db,
	pub purge_interval: Duration,
}
impl WorkerState {
	pub fn new(db: Db, cfg: &vcat_config::Worker) -> Self {
		Self { db, purge_interval: Duration::from_secs(cfg.cache_purge_interval_seconds) }
	}
}

/// Purges expired search cache rows forever. A failed pass is logged and retried on the next tick.
pub async fn run_worker(state: WorkerState) -> Result<()> {
	tracing::info!(
		interval_seconds = state.purge_interval.as_secs(),
		"Search cache purge worker started."
	);

	loop {
		if let Err(err) = purge_expired_cache(&state.db, OffsetDateTime::now_utc()).await {
			tracing::error!(error = %err, "Search cache cleanup failed.");
		}

		tokio_time::sleep(state.purge_interval).await;
	}
}

pub async fn purge_expired_cache(db: &Db, now: OffsetDateTime) -> Result<u64> {
	let purged = cache::purge_expired(db, now).await?;

	if purged > 0 {
		tracing::info!(purged, "Expired search cache entries purged.");
	} else {
		tracing::debug!("No expired search cache entries.");
	}

	Ok(purged)
}
