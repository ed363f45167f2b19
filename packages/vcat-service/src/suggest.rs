use serde::{Deserialize, Serialize};

use crate::{CatalogService, Result};
use vcat_storage::videos::DistinctField;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
	/// Popular past queries, independent of the prefix.
	pub suggestions: Vec<String>,
	pub tags: Vec<String>,
}

impl CatalogService {
	pub async fn suggest(&self, prefix: &str) -> Result<Suggestions> {
		let prefix = prefix.trim();
		let tags = if prefix.is_empty() { Vec::new() } else { self.suggest_tags(prefix).await };
		let popular_limit = self.cfg.search.suggest.popular_limit;
		let suggestions = match self.backends.history.popular(popular_limit).await {
			Ok(popular) => popular.into_iter().map(|item| item.query).collect(),
			Err(err) => {
				tracing::warn!(error = %err, "Popular query lookup failed.");

				Vec::new()
			},
		};

		Ok(Suggestions { suggestions, tags })
	}

	async fn suggest_tags(&self, prefix: &str) -> Vec<String> {
		let limit = self.cfg.search.suggest.tag_limit;

		match self.backends.engine.suggest_tags(prefix, limit).await {
			Ok(tags) => return tags,
			Err(err) => {
				tracing::warn!(
					error = %err,
					fallback = true,
					"Tag suggestion query failed. Falling back to the entity store."
				);
			},
		}

		match self.backends.videos.list_distinct(DistinctField::Tag).await {
			Ok(tags) => prefix_matches(tags, prefix, limit as usize),
			Err(err) => {
				tracing::warn!(error = %err, "Tag listing failed.");

				Vec::new()
			},
		}
	}
}

/// Tags whose lowercase form starts with the lowercase prefix, in input order.
fn prefix_matches(tags: Vec<String>, prefix: &str, limit: usize) -> Vec<String> {
	let prefix = prefix.to_lowercase();

	tags.into_iter().filter(|tag| tag.to_lowercase().starts_with(&prefix)).take(limit).collect()
}
