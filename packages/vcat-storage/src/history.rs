use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{PopularQueryRow, SavedSearchRow, SearchHistoryRow},
};

pub async fn insert_history(db: &Db, row: &SearchHistoryRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO search_history (
	history_id,
	query,
	filters,
	result_count,
	duration_ms,
	fallback,
	cache_hit,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
	)
	.bind(row.history_id)
	.bind(row.query.as_str())
	.bind(&row.filters)
	.bind(row.result_count)
	.bind(row.duration_ms)
	.bind(row.fallback)
	.bind(row.cache_hit)
	.bind(row.created_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Most frequent non-empty queries. Ties go to the query seen first, then to lexical order.
pub async fn popular_queries(db: &Db, limit: u32) -> Result<Vec<PopularQueryRow>> {
	let rows = sqlx::query_as::<_, PopularQueryRow>(
		"\
SELECT query, count(*) AS count
FROM search_history
WHERE query <> ''
GROUP BY query
ORDER BY count(*) DESC, min(created_at) ASC, query ASC
LIMIT $1",
	)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn insert_saved_search(
	db: &Db,
	name: &str,
	query: &str,
	filters: &Value,
	now: OffsetDateTime,
) -> Result<SavedSearchRow> {
	let row = sqlx::query_as::<_, SavedSearchRow>(
		"\
INSERT INTO saved_searches (saved_search_id, name, query, filters, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $5)
RETURNING saved_search_id, name, query, filters, created_at, updated_at",
	)
	.bind(Uuid::new_v4())
	.bind(name)
	.bind(query)
	.bind(filters)
	.bind(now)
	.fetch_one(&db.pool)
	.await?;

	Ok(row)
}

pub async fn list_saved_searches(db: &Db) -> Result<Vec<SavedSearchRow>> {
	let rows = sqlx::query_as::<_, SavedSearchRow>(
		"\
SELECT saved_search_id, name, query, filters, created_at, updated_at
FROM saved_searches
ORDER BY updated_at DESC, created_at DESC",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn get_saved_search(db: &Db, saved_search_id: Uuid) -> Result<Option<SavedSearchRow>> {
	let row = sqlx::query_as::<_, SavedSearchRow>(
		"\
SELECT saved_search_id, name, query, filters, created_at, updated_at
FROM saved_searches
WHERE saved_search_id = $1",
	)
	.bind(saved_search_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}
