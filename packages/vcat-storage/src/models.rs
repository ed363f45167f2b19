use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VideoRecord {
	pub video_id: i64,
	pub title: String,
	pub description: Option<String>,
	pub url: String,
	pub thumbnail_url: Option<String>,
	pub duration: i32,
	pub category: String,
	pub upload_date: OffsetDateTime,
	pub uploader_name: String,
	pub view_count: i64,
	pub file_size: i64,
	pub resolution: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	/// Tag names, sorted.
	pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
	pub title: String,
	pub description: Option<String>,
	pub url: String,
	pub thumbnail_url: Option<String>,
	pub duration: i32,
	pub category: String,
	pub upload_date: OffsetDateTime,
	pub uploader_name: String,
	pub view_count: i64,
	pub file_size: i64,
	pub resolution: String,
	pub tags: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchHistoryRow {
	pub history_id: Uuid,
	pub query: String,
	pub filters: Value,
	pub result_count: i64,
	pub duration_ms: i64,
	pub fallback: bool,
	pub cache_hit: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PopularQueryRow {
	pub query: String,
	pub count: i64,
}

/// A tag name with the number of videos carrying it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TagCountRow {
	pub name: String,
	pub count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SavedSearchRow {
	pub saved_search_id: Uuid,
	pub name: String,
	pub query: String,
	pub filters: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
