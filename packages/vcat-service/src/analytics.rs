use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CatalogService, Error, Result, search::NormalizedSearch};
use vcat_domain::{NormalizedFilters, RawFilters, SortOption, filters};
use vcat_storage::models::SavedSearchRow;

const POPULAR_LIMIT_CEILING: u32 = 100;

/// The filter state stored with history entries and saved searches. Unknown fields are ignored
/// and missing ones default, so older rows keep decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSnapshot {
	pub filters: NormalizedFilters,
	pub sort: SortOption,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub within: Option<String>,
}
impl From<&NormalizedSearch> for FilterSnapshot {
	fn from(search: &NormalizedSearch) -> Self {
		Self { filters: search.filters.clone(), sort: search.sort, within: search.within.clone() }
	}
}
impl FilterSnapshot {
	/// Lenient decode: anything that is not a snapshot object becomes the empty snapshot.
	pub fn from_value(value: serde_json::Value) -> Self {
		serde_json::from_value(value).unwrap_or_default()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
	/// Empty for filter-only searches.
	pub query: String,
	pub filters: FilterSnapshot,
	pub result_count: u64,
	pub duration_ms: u64,
	pub fallback: bool,
	pub cache_hit: bool,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularQuery {
	pub query: String,
	pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
	pub id: Uuid,
	pub name: String,
	pub query: String,
	pub filters: FilterSnapshot,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<SavedSearchRow> for SavedSearch {
	fn from(row: SavedSearchRow) -> Self {
		Self {
			id: row.saved_search_id,
			name: row.name,
			query: row.query,
			filters: FilterSnapshot::from_value(row.filters),
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveSearchRequest {
	pub name: String,
	pub query: Option<String>,
	pub filters: RawFilters,
	pub sort: Option<SortOption>,
	pub within: Option<String>,
}

impl CatalogService {
	/// Best-effort: failures are logged and never reach the caller.
	pub async fn record_search(&self, entry: SearchHistoryEntry) {
		if let Err(err) = self.backends.history.record(&entry).await {
			tracing::warn!(error = %err, query = %entry.query, "Search history write failed.");
		}
	}

	pub async fn popular_searches(&self, limit: Option<u32>) -> Result<Vec<PopularQuery>> {
		let limit = limit
			.unwrap_or(self.cfg.search.suggest.popular_limit)
			.clamp(1, POPULAR_LIMIT_CEILING);

		self.backends.history.popular(limit).await
	}

	pub async fn save_search(&self, req: SaveSearchRequest) -> Result<SavedSearch> {
		let name = req.name.trim();

		if name.is_empty() {
			return Err(Error::InvalidRequest { message: "name must be non-empty.".to_string() });
		}

		let query = req.query.as_deref().map(str::trim).unwrap_or_default();
		let snapshot = FilterSnapshot {
			filters: filters::normalize(&req.filters),
			sort: req.sort.unwrap_or_default(),
			within: req
				.within
				.as_deref()
				.map(str::trim)
				.filter(|within| !within.is_empty())
				.map(str::to_string),
		};
		let saved = self.backends.history.save(name, query, &snapshot).await?;

		tracing::info!(saved_search_id = %saved.id, "Saved search stored.");

		Ok(saved)
	}

	/// Newest first by update time.
	pub async fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
		self.backends.history.list_saved().await
	}

	pub async fn get_saved_search(&self, id: Uuid) -> Result<SavedSearch> {
		self.backends
			.history
			.get_saved(id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Saved search {id} not found.") })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_decode_ignores_unknown_and_defaults_missing() {
		let snapshot = FilterSnapshot::from_value(serde_json::json!({
			"filters": { "category": "education", "legacy": 1 },
			"fallback": true
		}));

		assert_eq!(snapshot.filters.category.as_deref(), Some("education"));
		assert_eq!(snapshot.sort, SortOption::Relevance);
		assert_eq!(snapshot.within, None);
	}

	#[test]
	fn snapshot_decode_tolerates_garbage() {
		assert_eq!(FilterSnapshot::from_value(serde_json::json!("nope")), FilterSnapshot::default());
	}

	#[test]
	fn snapshot_serializes_compactly() {
		let snapshot = FilterSnapshot { sort: SortOption::ViewCount, ..Default::default() };

		assert_eq!(
			serde_json::to_value(&snapshot).expect("Failed to encode snapshot."),
			serde_json::json!({ "filters": {}, "sort": "viewCount" })
		);
	}
}
