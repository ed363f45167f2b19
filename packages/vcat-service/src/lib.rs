pub mod analytics;
pub mod backends;
pub mod cache_key;
pub mod catalog;
pub mod fallback;
pub mod hydrate;
pub mod index_query;
pub mod indexing;
pub mod related;
pub mod search;
pub mod suggest;

mod error;

pub use analytics::{
	FilterSnapshot, PopularQuery, SaveSearchRequest, SavedSearch, SearchHistoryEntry,
};
pub use catalog::TagCount;
pub use error::{Error, Result};
pub use indexing::RebuildReport;
pub use search::{
	Highlights, NormalizedSearch, ResultSource, SearchHit, SearchRequest, SearchResponse,
	VideoView,
};
pub use suggest::Suggestions;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

use vcat_config::Config;
use vcat_storage::{
	db::Db,
	engine::{EngineClient, EngineQuery, EngineSearchResult, VideoDocument},
	models::{TagCountRow, VideoRecord},
	predicate::VideoPredicate,
	videos::DistinctField,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Canonical source of truth for videos and tags.
pub trait VideoStore
where
	Self: Send + Sync,
{
	/// Unordered; ids without a row are simply absent.
	fn get_by_ids<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<VideoRecord>>>;

	fn get_by_id(&self, id: i64) -> BoxFuture<'_, Result<Option<VideoRecord>>>;

	fn list_distinct(&self, field: DistinctField) -> BoxFuture<'_, Result<Vec<String>>>;

	/// Most used tags first, ties by name.
	fn popular_tags(&self, limit: u32) -> BoxFuture<'_, Result<Vec<TagCountRow>>>;

	fn count_matching<'a>(&'a self, predicate: &'a VideoPredicate) -> BoxFuture<'a, Result<u64>>;

	/// Ordered by upload date descending, then id descending.
	fn find_matching<'a>(
		&'a self,
		predicate: &'a VideoPredicate,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<VideoRecord>>>;

	fn list_ids_after(&self, after: Option<i64>, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>>;
}

/// Full-text index holding a denormalized copy of each video.
pub trait SearchEngine
where
	Self: Send + Sync,
{
	/// Returns `true` when the index had to be created.
	fn ensure_index(&self) -> BoxFuture<'_, Result<bool>>;

	fn index_document<'a>(&'a self, doc: &'a VideoDocument) -> BoxFuture<'a, Result<()>>;

	/// Returns `false` when there was nothing to delete.
	fn delete_document(&self, id: i64) -> BoxFuture<'_, Result<bool>>;

	fn search<'a>(&'a self, query: &'a EngineQuery) -> BoxFuture<'a, Result<EngineSearchResult>>;

	fn suggest_tags<'a>(&'a self, prefix: &'a str, limit: u32)
	-> BoxFuture<'a, Result<Vec<String>>>;

	fn more_like_this(&self, id: i64, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>>;
}

/// Key-value store with per-entry TTL.
pub trait SearchCache
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>>>;

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a Value,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<()>>;
}

/// Append-only search history plus saved searches.
pub trait SearchHistoryStore
where
	Self: Send + Sync,
{
	fn record<'a>(&'a self, entry: &'a SearchHistoryEntry) -> BoxFuture<'a, Result<()>>;

	fn popular(&self, limit: u32) -> BoxFuture<'_, Result<Vec<PopularQuery>>>;

	fn save<'a>(
		&'a self,
		name: &'a str,
		query: &'a str,
		filters: &'a FilterSnapshot,
	) -> BoxFuture<'a, Result<SavedSearch>>;

	fn list_saved(&self) -> BoxFuture<'_, Result<Vec<SavedSearch>>>;

	fn get_saved(&self, id: Uuid) -> BoxFuture<'_, Result<Option<SavedSearch>>>;
}

#[derive(Clone)]
pub struct Backends {
	pub videos: Arc<dyn VideoStore>,
	pub engine: Arc<dyn SearchEngine>,
	pub cache: Arc<dyn SearchCache>,
	pub history: Arc<dyn SearchHistoryStore>,
}
impl Backends {
	pub fn new(
		videos: Arc<dyn VideoStore>,
		engine: Arc<dyn SearchEngine>,
		cache: Arc<dyn SearchCache>,
		history: Arc<dyn SearchHistoryStore>,
	) -> Self {
		Self { videos, engine, cache, history }
	}

	/// Postgres for the entity store, cache, and history; the REST client for the engine.
	pub fn postgres(db: Db, engine: EngineClient) -> Self {
		let db = Arc::new(db);

		Self { videos: db.clone(), engine: Arc::new(engine), cache: db.clone(), history: db }
	}
}

pub struct CatalogService {
	pub cfg: Config,
	pub backends: Backends,
}
impl CatalogService {
	pub fn new(cfg: Config, db: Db, engine: EngineClient) -> Self {
		Self { cfg, backends: Backends::postgres(db, engine) }
	}

	pub fn with_backends(cfg: Config, backends: Backends) -> Self {
		Self { cfg, backends }
	}
}
