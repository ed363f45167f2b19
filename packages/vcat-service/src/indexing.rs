use serde::{Deserialize, Serialize};

use crate::{CatalogService, Error, Result};
use vcat_storage::engine::VideoDocument;

pub const REBUILD_BATCH_SIZE: u32 = 200;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub indexed: u64,
	/// Ids listed by the store but gone by the time their batch was read.
	pub missing: u64,
}

impl CatalogService {
	pub async fn ensure_index(&self) -> Result<bool> {
		self.backends.engine.ensure_index().await
	}

	/// Copies the current entity-store row into the index.
	pub async fn index_video(&self, video_id: i64) -> Result<()> {
		let video = self
			.backends
			.videos
			.get_by_id(video_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Video {video_id} not found.") })?;

		self.backends.engine.ensure_index().await?;
		self.backends.engine.index_document(&VideoDocument::from(&video)).await?;

		tracing::debug!(video_id, "Video indexed.");

		Ok(())
	}

	/// A document that was never indexed is not an error; the return value reports it.
	pub async fn remove_video(&self, video_id: i64) -> Result<bool> {
		let removed = self.backends.engine.delete_document(video_id).await?;

		tracing::debug!(video_id, removed, "Video removed from the index.");

		Ok(removed)
	}

	/// Re-indexes every video from the entity store in id order.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		let videos = self.backends.videos.as_ref();
		let engine = self.backends.engine.as_ref();
		let mut report = RebuildReport::default();
		let mut after = None;

		engine.ensure_index().await?;

		loop {
			let ids = videos.list_ids_after(after, REBUILD_BATCH_SIZE).await?;
			let Some(last) = ids.last().copied() else {
				break;
			};
			let rows = videos.get_by_ids(&ids).await?;

			report.missing += (ids.len() - rows.len().min(ids.len())) as u64;

			for row in &rows {
				engine.index_document(&VideoDocument::from(row)).await?;

				report.indexed += 1;
			}

			after = Some(last);
		}

		tracing::info!(indexed = report.indexed, missing = report.missing, "Search index rebuilt.");

		Ok(report)
	}
}
