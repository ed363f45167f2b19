use serde::{Deserialize, Serialize};

use crate::{CatalogService, Result};
use vcat_storage::{models::TagCountRow, videos::DistinctField};

const DEFAULT_POPULAR_TAGS: u32 = 30;
const POPULAR_TAGS_CEILING: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
	pub name: String,
	pub count: u64,
}
impl From<TagCountRow> for TagCount {
	fn from(row: TagCountRow) -> Self {
		Self { name: row.name, count: row.count.max(0) as u64 }
	}
}

impl CatalogService {
	/// Distinct categories, sorted.
	pub async fn categories(&self) -> Result<Vec<String>> {
		let mut categories = self.backends.videos.list_distinct(DistinctField::Category).await?;

		categories.sort();
		categories.dedup();

		Ok(categories)
	}

	/// Tag facet for browsing: the most used tags with their video counts.
	pub async fn popular_tags(&self, limit: Option<u32>) -> Result<Vec<TagCount>> {
		let limit = limit.unwrap_or(DEFAULT_POPULAR_TAGS).clamp(1, POPULAR_TAGS_CEILING);
		let rows = self.backends.videos.popular_tags(limit).await?;

		Ok(rows.into_iter().map(TagCount::from).collect())
	}
}
