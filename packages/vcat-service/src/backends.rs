//! Default collaborator implementations over Postgres and the engine REST client.

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, FilterSnapshot, PopularQuery, Result, SavedSearch, SearchCache, SearchEngine,
	SearchHistoryEntry, SearchHistoryStore, VideoStore,
};
use vcat_storage::{
	cache,
	db::Db,
	engine::{EngineClient, EngineQuery, EngineSearchResult, VideoDocument},
	history,
	models::{SearchHistoryRow, TagCountRow, VideoRecord},
	predicate::VideoPredicate,
	videos::{self, DistinctField},
};

impl VideoStore for Db {
	fn get_by_ids<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<VideoRecord>>> {
		Box::pin(async move { Ok(videos::get_by_ids(self, ids).await?) })
	}

	fn get_by_id(&self, id: i64) -> BoxFuture<'_, Result<Option<VideoRecord>>> {
		Box::pin(async move { Ok(videos::get_by_id(self, id).await?) })
	}

	fn list_distinct(&self, field: DistinctField) -> BoxFuture<'_, Result<Vec<String>>> {
		Box::pin(async move { Ok(videos::list_distinct(self, field).await?) })
	}

	fn popular_tags(&self, limit: u32) -> BoxFuture<'_, Result<Vec<TagCountRow>>> {
		Box::pin(async move { Ok(videos::popular_tags(self, limit).await?) })
	}

	fn count_matching<'a>(&'a self, predicate: &'a VideoPredicate) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(videos::count_matching(self, predicate).await?) })
	}

	fn find_matching<'a>(
		&'a self,
		predicate: &'a VideoPredicate,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<VideoRecord>>> {
		Box::pin(async move { Ok(videos::find_matching(self, predicate, offset, limit).await?) })
	}

	fn list_ids_after(&self, after: Option<i64>, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move { Ok(videos::list_ids_after(self, after, limit).await?) })
	}
}

impl SearchCache for Db {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move {
			let payload = cache::fetch_cache_payload(self, key, OffsetDateTime::now_utc())
				.await
				.map_err(cache_error)?;

			Ok(payload.map(|payload| payload.value))
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a Value,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
			let expires_at = now.saturating_add(Duration::seconds(ttl));

			cache::store_cache_payload(self, key, value, now, expires_at, None)
				.await
				.map_err(cache_error)?;

			Ok(())
		})
	}
}

impl SearchHistoryStore for Db {
	fn record<'a>(&'a self, entry: &'a SearchHistoryEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let row = SearchHistoryRow {
				history_id: Uuid::new_v4(),
				query: entry.query.clone(),
				filters: encode_snapshot(&entry.filters)?,
				result_count: i64::try_from(entry.result_count).unwrap_or(i64::MAX),
				duration_ms: i64::try_from(entry.duration_ms).unwrap_or(i64::MAX),
				fallback: entry.fallback,
				cache_hit: entry.cache_hit,
				created_at: entry.created_at,
			};

			history::insert_history(self, &row).await?;

			Ok(())
		})
	}

	fn popular(&self, limit: u32) -> BoxFuture<'_, Result<Vec<PopularQuery>>> {
		Box::pin(async move {
			let rows = history::popular_queries(self, limit).await?;

			Ok(rows
				.into_iter()
				.map(|row| PopularQuery { query: row.query, count: row.count.max(0) as u64 })
				.collect())
		})
	}

	fn save<'a>(
		&'a self,
		name: &'a str,
		query: &'a str,
		filters: &'a FilterSnapshot,
	) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move {
			let filters = encode_snapshot(filters)?;
			let row = history::insert_saved_search(
				self,
				name,
				query,
				&filters,
				OffsetDateTime::now_utc(),
			)
			.await?;

			Ok(SavedSearch::from(row))
		})
	}

	fn list_saved(&self) -> BoxFuture<'_, Result<Vec<SavedSearch>>> {
		Box::pin(async move {
			let rows = history::list_saved_searches(self).await?;

			Ok(rows.into_iter().map(SavedSearch::from).collect())
		})
	}

	fn get_saved(&self, id: Uuid) -> BoxFuture<'_, Result<Option<SavedSearch>>> {
		Box::pin(async move {
			let row = history::get_saved_search(self, id).await?;

			Ok(row.map(SavedSearch::from))
		})
	}
}

impl SearchEngine for EngineClient {
	fn ensure_index(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(EngineClient::ensure_index(self).await?) })
	}

	fn index_document<'a>(&'a self, doc: &'a VideoDocument) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(EngineClient::index_document(self, doc).await?) })
	}

	fn delete_document(&self, id: i64) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(EngineClient::delete_document(self, id).await?) })
	}

	fn search<'a>(&'a self, query: &'a EngineQuery) -> BoxFuture<'a, Result<EngineSearchResult>> {
		Box::pin(async move { Ok(EngineClient::search(self, query).await?) })
	}

	fn suggest_tags<'a>(
		&'a self,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move { Ok(EngineClient::suggest_tags(self, prefix, limit).await?) })
	}

	fn more_like_this(&self, id: i64, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move { Ok(EngineClient::more_like_this(self, id, limit).await?) })
	}
}

fn encode_snapshot(snapshot: &FilterSnapshot) -> Result<Value> {
	serde_json::to_value(snapshot).map_err(|err| Error::Storage {
		message: format!("Failed to encode filter snapshot: {err}"),
	})
}

fn cache_error(err: vcat_storage::Error) -> Error {
	Error::Cache { message: err.to_string() }
}
