use std::collections::HashMap;

use vcat_storage::{engine::EngineHit, models::VideoRecord};

use crate::{
	Result, VideoStore,
	search::{Highlights, SearchHit, VideoView},
};

/// Joins engine hits with entity-store rows in one bulk read. Hit order is preserved and hits
/// whose row no longer exists are dropped.
pub async fn hydrate(store: &dyn VideoStore, hits: &[EngineHit]) -> Result<Vec<SearchHit>> {
	let ids: Vec<i64> = hits.iter().map(|hit| hit.id).collect();
	let rows = fetch_by_id(store, &ids).await?;
	let mut out = Vec::with_capacity(hits.len());

	for hit in hits {
		let Some(video) = rows.get(&hit.id) else {
			tracing::debug!(video_id = hit.id, "Indexed video is missing from the entity store.");

			continue;
		};

		out.push(SearchHit {
			video: VideoView::from(video.clone()),
			score: hit.score,
			highlights: Highlights::from_engine(&hit.highlights),
		});
	}

	Ok(out)
}

/// Rows for `ids` in the given order, skipping ids without a row.
pub async fn fetch_in_order(store: &dyn VideoStore, ids: &[i64]) -> Result<Vec<VideoRecord>> {
	let mut rows = fetch_by_id(store, ids).await?;

	Ok(ids.iter().filter_map(|id| rows.remove(id)).collect())
}

async fn fetch_by_id(store: &dyn VideoStore, ids: &[i64]) -> Result<HashMap<i64, VideoRecord>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows = store.get_by_ids(ids).await?;

	Ok(rows.into_iter().map(|row| (row.video_id, row)).collect())
}
