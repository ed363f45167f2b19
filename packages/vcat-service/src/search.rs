use std::{collections::BTreeMap, time::Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
	CatalogService, FilterSnapshot, Result, SearchHistoryEntry, cache_key, fallback, hydrate,
	index_query,
};
use vcat_domain::{NormalizedFilters, Pagination, RawFilters, SortOption, filters};
use vcat_storage::models::VideoRecord;

pub const SEARCH_PATH: &str = "/api/videos/search";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
	pub query: Option<String>,
	pub filters: RawFilters,
	pub sort: Option<SortOption>,
	pub page: Option<i64>,
	pub page_size: Option<i64>,
	pub within: Option<String>,
}

/// A request after trimming, filter normalization, and pagination clamping. Both query paths and
/// the cache key are derived from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSearch {
	pub query: Option<String>,
	pub within: Option<String>,
	pub filters: NormalizedFilters,
	pub sort: SortOption,
	pub pagination: Pagination,
}
impl NormalizedSearch {
	pub fn from_request(req: &SearchRequest, cfg: &vcat_config::Search) -> Self {
		Self {
			query: clean_text(req.query.as_deref()),
			within: clean_text(req.within.as_deref()),
			filters: filters::normalize(&req.filters),
			sort: req.sort.unwrap_or_default(),
			pagination: Pagination::clamp(
				req.page,
				req.page_size,
				cfg.default_page_size,
				cfg.max_page_size,
			),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
	pub id: i64,
	pub title: String,
	pub description: Option<String>,
	pub url: String,
	pub thumbnail_url: Option<String>,
	pub duration: i32,
	pub category: String,
	#[serde(with = "time::serde::rfc3339")]
	pub upload_date: OffsetDateTime,
	pub uploader_name: String,
	pub view_count: i64,
	pub file_size: i64,
	pub resolution: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
	pub tags: Vec<String>,
}
impl From<VideoRecord> for VideoView {
	fn from(video: VideoRecord) -> Self {
		Self {
			id: video.video_id,
			title: video.title,
			description: video.description,
			url: video.url,
			thumbnail_url: video.thumbnail_url,
			duration: video.duration,
			category: video.category,
			upload_date: video.upload_date,
			uploader_name: video.uploader_name,
			view_count: video.view_count,
			file_size: video.file_size,
			resolution: video.resolution,
			created_at: video.created_at,
			updated_at: video.updated_at,
			tags: video.tags,
		}
	}
}

/// Highlighted fragments per field, with matches wrapped in `<mark>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Highlights {
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub title: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub description: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub uploader_name: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,
}
impl Highlights {
	pub fn from_engine(raw: &BTreeMap<String, Vec<String>>) -> Self {
		let field = |name: &str| raw.get(name).cloned().unwrap_or_default();

		Self {
			title: field("title"),
			description: field("description"),
			uploader_name: field("uploader_name"),
			tags: field("tags"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
	pub video: VideoView,
	/// Absent on the fallback path and under field sorts.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub score: Option<f32>,
	#[serde(default)]
	pub highlights: Highlights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
	Index,
	Cache,
	Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub results: Vec<SearchHit>,
	/// Full match count, independent of the page.
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	pub took_ms: u64,
	pub summary: String,
	pub source: ResultSource,
}

impl CatalogService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let search = NormalizedSearch::from_request(&req, &self.cfg.search);
		let cache_enabled = self.cfg.search.cache.enabled;
		let key = cache_key::search_cache_key(SEARCH_PATH, &search);

		if cache_enabled && let Some(mut cached) = self.read_cached(&key).await {
			let took_ms = elapsed_ms(started);

			cached.source = ResultSource::Cache;
			cached.took_ms = took_ms;
			cached.summary = summary(cached.total, took_ms);

			self.record_search(history_entry(&search, &cached, false, true)).await;

			return Ok(cached);
		}

		let query = index_query::build(&search);
		let response = match self.backends.engine.search(&query).await {
			Ok(result) => {
				let results = hydrate::hydrate(self.backends.videos.as_ref(), &result.hits).await?;
				let took_ms = elapsed_ms(started);
				let response = SearchResponse {
					results,
					total: result.total,
					page: search.pagination.page,
					page_size: search.pagination.page_size,
					took_ms,
					summary: summary(result.total, took_ms),
					source: ResultSource::Index,
				};

				if cache_enabled {
					self.write_cached(&key, &response).await;
				}

				response
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					fallback = true,
					"Search engine query failed. Falling back to the entity store."
				);

				self.search_fallback(&search, started).await?
			},
		};
		let fallback = response.source == ResultSource::Fallback;

		self.record_search(history_entry(&search, &response, fallback, false)).await;

		Ok(response)
	}

	async fn search_fallback(
		&self,
		search: &NormalizedSearch,
		started: Instant,
	) -> Result<SearchResponse> {
		let predicate = fallback::build(search);
		let videos = self.backends.videos.as_ref();
		let total = videos.count_matching(&predicate).await?;
		let rows = videos
			.find_matching(&predicate, search.pagination.offset(), search.pagination.limit())
			.await?;
		let results = rows
			.into_iter()
			.map(|row| SearchHit {
				video: VideoView::from(row),
				score: None,
				highlights: Highlights::default(),
			})
			.collect();
		let took_ms = elapsed_ms(started);

		Ok(SearchResponse {
			results,
			total,
			page: search.pagination.page,
			page_size: search.pagination.page_size,
			took_ms,
			summary: summary(total, took_ms),
			source: ResultSource::Fallback,
		})
	}

	/// Any cache problem is treated as a miss.
	async fn read_cached(&self, key: &str) -> Option<SearchResponse> {
		let key_prefix = cache_key::cache_key_prefix(key);
		let value = match self.backends.cache.get(key).await {
			Ok(Some(value)) => value,
			Ok(None) => {
				tracing::debug!(cache_key_prefix = key_prefix, hit = false, "Search cache miss.");

				return None;
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = key_prefix,
					"Search cache read failed."
				);

				return None;
			},
		};

		match serde_json::from_value::<SearchResponse>(value) {
			Ok(response) => {
				tracing::info!(cache_key_prefix = key_prefix, hit = true, "Search cache hit.");

				Some(response)
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = key_prefix,
					"Search cache payload decode failed."
				);

				None
			},
		}
	}

	async fn write_cached(&self, key: &str, response: &SearchResponse) {
		let cache_cfg = &self.cfg.search.cache;
		let key_prefix = cache_key::cache_key_prefix(key);
		let value = match serde_json::to_value(response) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = key_prefix,
					"Search cache payload encode failed."
				);

				return;
			},
		};

		if let Some(max) = cache_cfg.max_payload_bytes {
			let size = value.to_string().len();

			if size as u64 > max {
				tracing::debug!(
					cache_key_prefix = key_prefix,
					size_bytes = size,
					max_payload_bytes = max,
					"Search cache payload too large. Skipping write."
				);

				return;
			}
		}
		if let Err(err) = self.backends.cache.set(key, &value, cache_cfg.ttl_seconds).await {
			tracing::warn!(error = %err, cache_key_prefix = key_prefix, "Search cache write failed.");
		}
	}
}

pub fn summary(total: u64, took_ms: u64) -> String {
	format!("Found {total} results in {:.2}s", took_ms as f64 / 1_000.0)
}

fn history_entry(
	search: &NormalizedSearch,
	response: &SearchResponse,
	fallback: bool,
	cache_hit: bool,
) -> SearchHistoryEntry {
	SearchHistoryEntry {
		query: search.query.clone().unwrap_or_default(),
		filters: FilterSnapshot::from(search),
		result_count: response.total,
		duration_ms: response.took_ms,
		fallback,
		cache_hit,
		created_at: OffsetDateTime::now_utc(),
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn clean_text(raw: Option<&str>) -> Option<String> {
	raw.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
