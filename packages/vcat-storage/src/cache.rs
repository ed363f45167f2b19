use serde_json::Value;
use time::OffsetDateTime;

use crate::{Result, db::Db};

pub struct CachePayload {
	pub value: Value,
	pub size_bytes: usize,
}

/// Returns the payload only while `expires_at > now`, bumping the hit counter on a read.
pub async fn fetch_cache_payload(
	db: &Db,
	key: &str,
	now: OffsetDateTime,
) -> Result<Option<CachePayload>> {
	let payload: Option<Value> = sqlx::query_scalar(
		"\
UPDATE search_cache
SET last_accessed_at = $2, hit_count = hit_count + 1
WHERE cache_key = $1 AND expires_at > $2
RETURNING payload",
	)
	.bind(key)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;
	let Some(value) = payload else {
		return Ok(None);
	};
	let size_bytes = serde_json::to_vec(&value)?.len();

	Ok(Some(CachePayload { value, size_bytes }))
}

/// Upserts the payload. Payloads over `max_payload_bytes` are skipped and `None` is returned.
pub async fn store_cache_payload(
	db: &Db,
	key: &str,
	payload: &Value,
	now: OffsetDateTime,
	expires_at: OffsetDateTime,
	max_payload_bytes: Option<u64>,
) -> Result<Option<usize>> {
	let payload_size = serde_json::to_vec(payload)?.len();

	if let Some(max) = max_payload_bytes
		&& payload_size as u64 > max
	{
		return Ok(None);
	}

	sqlx::query(
		"\
INSERT INTO search_cache (cache_key, payload, created_at, last_accessed_at, expires_at, hit_count)
VALUES ($1, $2, $3, $3, $4, 0)
ON CONFLICT (cache_key) DO UPDATE SET
	payload = EXCLUDED.payload,
	created_at = EXCLUDED.created_at,
	last_accessed_at = EXCLUDED.last_accessed_at,
	expires_at = EXCLUDED.expires_at,
	hit_count = 0",
	)
	.bind(key)
	.bind(payload)
	.bind(now)
	.bind(expires_at)
	.execute(&db.pool)
	.await?;

	Ok(Some(payload_size))
}

pub async fn purge_expired(db: &Db, now: OffsetDateTime) -> Result<u64> {
	let result =
		sqlx::query("DELETE FROM search_cache WHERE expires_at <= $1").bind(now).execute(&db.pool).await?;

	Ok(result.rows_affected())
}
