use crate::{CatalogService, Error, Result, VideoView, hydrate};
use vcat_storage::{models::VideoRecord, predicate::VideoPredicate};

const RELATED_LIMIT_CEILING: u32 = 50;

impl CatalogService {
	/// Videos similar to `video_id` that share a tag or the category with it. Falls back to the
	/// newest videos of the same category when the engine is unavailable.
	pub async fn related(&self, video_id: i64, limit: Option<u32>) -> Result<Vec<VideoView>> {
		let videos = self.backends.videos.as_ref();
		let source = videos
			.get_by_id(video_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Video {video_id} not found.") })?;
		let limit = limit
			.unwrap_or(self.cfg.search.suggest.related_limit)
			.clamp(1, RELATED_LIMIT_CEILING);
		let take = limit as usize;

		// One extra candidate since the source video usually ranks first.
		match self.backends.engine.more_like_this(video_id, limit + 1).await {
			Ok(ids) => {
				let ids: Vec<i64> = ids.into_iter().filter(|id| *id != video_id).collect();
				let rows = hydrate::fetch_in_order(videos, &ids).await?;

				Ok(rows
					.into_iter()
					.filter(|row| is_related(&source, row))
					.take(take)
					.map(VideoView::from)
					.collect())
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					video_id,
					fallback = true,
					"Related video query failed. Falling back to the same category."
				);

				let predicate =
					VideoPredicate { category: Some(source.category.clone()), ..Default::default() };
				let rows = videos.find_matching(&predicate, 0, u64::from(limit) + 1).await?;

				Ok(rows
					.into_iter()
					.filter(|row| row.video_id != video_id)
					.take(take)
					.map(VideoView::from)
					.collect())
			},
		}
	}
}

fn is_related(source: &VideoRecord, candidate: &VideoRecord) -> bool {
	candidate.video_id != source.video_id
		&& (candidate.category == source.category
			|| candidate.tags.iter().any(|tag| source.tags.contains(tag)))
}
