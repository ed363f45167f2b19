use sqlx::{Postgres, QueryBuilder};

use crate::{
	Result,
	db::Db,
	models::{NewVideo, TagCountRow, VideoRecord},
	predicate::VideoPredicate,
};

const VIDEO_SELECT: &str = "\
SELECT
	v.video_id,
	v.title,
	v.description,
	v.url,
	v.thumbnail_url,
	v.duration,
	v.category,
	v.upload_date,
	v.uploader_name,
	v.view_count,
	v.file_size,
	v.resolution,
	v.created_at,
	v.updated_at,
	COALESCE(
		(
			SELECT array_agg(t.name ORDER BY t.name)
			FROM video_tags vt
			JOIN tags t ON t.tag_id = vt.tag_id
			WHERE vt.video_id = v.video_id
		),
		ARRAY[]::text[]
	) AS tags
FROM videos v";

/// Columns with a distinct-value listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
	Category,
	Resolution,
	Tag,
}

/// Unordered bulk fetch; callers restore the order they need.
pub async fn get_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<VideoRecord>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!("{VIDEO_SELECT} WHERE v.video_id = ANY($1)");
	let rows = sqlx::query_as::<_, VideoRecord>(&sql).bind(ids).fetch_all(&db.pool).await?;

	Ok(rows)
}

pub async fn get_by_id(db: &Db, id: i64) -> Result<Option<VideoRecord>> {
	let sql = format!("{VIDEO_SELECT} WHERE v.video_id = $1");
	let row = sqlx::query_as::<_, VideoRecord>(&sql).bind(id).fetch_optional(&db.pool).await?;

	Ok(row)
}

pub async fn count_matching(db: &Db, predicate: &VideoPredicate) -> Result<u64> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT count(*) FROM videos v");

	predicate.push_where(&mut builder);

	let count = builder.build_query_scalar::<i64>().fetch_one(&db.pool).await?;

	Ok(count.max(0) as u64)
}

/// Ordered by upload date, newest first, then id descending.
pub async fn find_matching(
	db: &Db,
	predicate: &VideoPredicate,
	offset: u64,
	limit: u64,
) -> Result<Vec<VideoRecord>> {
	let mut builder = QueryBuilder::<Postgres>::new(VIDEO_SELECT);

	predicate.push_where(&mut builder);
	builder.push(" ORDER BY v.upload_date DESC, v.video_id DESC LIMIT ");
	builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
	builder.push(" OFFSET ");
	builder.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

	let rows = builder.build_query_as::<VideoRecord>().fetch_all(&db.pool).await?;

	Ok(rows)
}

/// Sorted distinct values. Tags are limited to those attached to at least one video.
pub async fn list_distinct(db: &Db, field: DistinctField) -> Result<Vec<String>> {
	let sql = match field {
		DistinctField::Category => "SELECT DISTINCT category FROM videos ORDER BY category",
		DistinctField::Resolution => "SELECT DISTINCT resolution FROM videos ORDER BY resolution",
		DistinctField::Tag => "\
SELECT DISTINCT t.name
FROM tags t
JOIN video_tags vt ON vt.tag_id = t.tag_id
ORDER BY t.name",
	};
	let values: Vec<String> = sqlx::query_scalar(sql).fetch_all(&db.pool).await?;

	Ok(values)
}

/// Tags attached to at least one video, most used first, then by name.
pub async fn popular_tags(db: &Db, limit: u32) -> Result<Vec<TagCountRow>> {
	let rows = sqlx::query_as::<_, TagCountRow>(
		"\
SELECT t.name, count(*) AS count
FROM tags t
JOIN video_tags vt ON vt.tag_id = t.tag_id
GROUP BY t.name
ORDER BY count DESC, t.name ASC
LIMIT $1",
	)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Keyset page of ids in ascending order, starting after `after`.
pub async fn list_ids_after(db: &Db, after: Option<i64>, limit: u32) -> Result<Vec<i64>> {
	let ids: Vec<i64> = sqlx::query_scalar(
		"\
SELECT video_id
FROM videos
WHERE $1::bigint IS NULL OR video_id > $1
ORDER BY video_id ASC
LIMIT $2",
	)
	.bind(after)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

pub async fn insert_video(db: &Db, video: &NewVideo) -> Result<i64> {
	let mut tx = db.pool.begin().await?;
	let video_id: i64 = sqlx::query_scalar(
		"\
INSERT INTO videos (
	title,
	description,
	url,
	thumbnail_url,
	duration,
	category,
	upload_date,
	uploader_name,
	view_count,
	file_size,
	resolution
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
RETURNING video_id",
	)
	.bind(video.title.as_str())
	.bind(video.description.as_deref())
	.bind(video.url.as_str())
	.bind(video.thumbnail_url.as_deref())
	.bind(video.duration)
	.bind(video.category.as_str())
	.bind(video.upload_date)
	.bind(video.uploader_name.as_str())
	.bind(video.view_count)
	.bind(video.file_size)
	.bind(video.resolution.as_str())
	.fetch_one(&mut *tx)
	.await?;

	for tag in &video.tags {
		let tag_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO tags (name)
VALUES ($1)
ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
RETURNING tag_id",
		)
		.bind(tag.as_str())
		.fetch_one(&mut *tx)
		.await?;

		sqlx::query(
			"INSERT INTO video_tags (video_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
		)
		.bind(video_id)
		.bind(tag_id)
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;

	Ok(video_id)
}
