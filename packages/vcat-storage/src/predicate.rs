use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::models::VideoRecord;

/// A relational filter over videos. Renders to SQL and can also be evaluated in memory.
///
/// Every entry in `text_groups` must match (AND); inside one group the needle may match the title,
/// description, uploader name, or any tag name (OR), case-insensitively as a substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoPredicate {
	pub text_groups: Vec<String>,
	pub category: Option<String>,
	pub resolution: Option<String>,
	/// A video matches when it carries any of these tags.
	pub tags_any: Vec<String>,
	pub duration_min: Option<i32>,
	/// Exclusive.
	pub duration_max: Option<i32>,
	pub uploaded_from: Option<OffsetDateTime>,
	/// Exclusive.
	pub uploaded_before: Option<OffsetDateTime>,
}
impl VideoPredicate {
	/// Appends ` WHERE ...` for a query whose videos table is aliased as `v`.
	pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		builder.push(" WHERE TRUE");

		for needle in &self.text_groups {
			let pattern = format!("%{}%", escape_like(needle));

			builder.push(" AND (v.title ILIKE ");
			builder.push_bind(pattern.clone());
			builder.push(" OR COALESCE(v.description, '') ILIKE ");
			builder.push_bind(pattern.clone());
			builder.push(" OR v.uploader_name ILIKE ");
			builder.push_bind(pattern.clone());
			builder.push(
				" OR EXISTS (SELECT 1 FROM video_tags vt JOIN tags t ON t.tag_id = vt.tag_id \
				 WHERE vt.video_id = v.video_id AND t.name ILIKE ",
			);
			builder.push_bind(pattern);
			builder.push("))");
		}
		if let Some(category) = &self.category {
			builder.push(" AND v.category = ");
			builder.push_bind(category.clone());
		}
		if let Some(resolution) = &self.resolution {
			builder.push(" AND v.resolution = ");
			builder.push_bind(resolution.clone());
		}
		if !self.tags_any.is_empty() {
			builder.push(
				" AND EXISTS (SELECT 1 FROM video_tags vt JOIN tags t ON t.tag_id = vt.tag_id \
				 WHERE vt.video_id = v.video_id AND t.name = ANY(",
			);
			builder.push_bind(self.tags_any.clone());
			builder.push("))");
		}
		if let Some(min) = self.duration_min {
			builder.push(" AND v.duration >= ");
			builder.push_bind(min);
		}
		if let Some(max) = self.duration_max {
			builder.push(" AND v.duration < ");
			builder.push_bind(max);
		}
		if let Some(from) = self.uploaded_from {
			builder.push(" AND v.upload_date >= ");
			builder.push_bind(from);
		}
		if let Some(before) = self.uploaded_before {
			builder.push(" AND v.upload_date < ");
			builder.push_bind(before);
		}
	}

	pub fn matches(&self, video: &VideoRecord) -> bool {
		let text_ok = self.text_groups.iter().all(|needle| {
			let needle = needle.to_lowercase();
			let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

			contains(&video.title)
				|| video.description.as_deref().map(contains).unwrap_or(false)
				|| contains(&video.uploader_name)
				|| video.tags.iter().any(|tag| contains(tag))
		});

		text_ok
			&& self.category.as_ref().map(|c| &video.category == c).unwrap_or(true)
			&& self.resolution.as_ref().map(|r| &video.resolution == r).unwrap_or(true)
			&& (self.tags_any.is_empty() || video.tags.iter().any(|tag| self.tags_any.contains(tag)))
			&& self.duration_min.map(|min| video.duration >= min).unwrap_or(true)
			&& self.duration_max.map(|max| video.duration < max).unwrap_or(true)
			&& self.uploaded_from.map(|from| video.upload_date >= from).unwrap_or(true)
			&& self.uploaded_before.map(|before| video.upload_date < before).unwrap_or(true)
	}
}

/// Escapes `%`, `_`, and the escape character itself for use inside a LIKE pattern.
pub fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn video() -> VideoRecord {
		VideoRecord {
			video_id: 1,
			title: "React Tutorial".to_string(),
			description: Some("Learn 100% of hooks".to_string()),
			url: "https://videos.example/1".to_string(),
			thumbnail_url: None,
			duration: 600,
			category: "education".to_string(),
			upload_date: datetime!(2024-01-10 12:00 UTC),
			uploader_name: "Dana".to_string(),
			view_count: 10,
			file_size: 1_024,
			resolution: "1080p".to_string(),
			created_at: datetime!(2024-01-10 12:00 UTC),
			updated_at: datetime!(2024-01-10 12:00 UTC),
			tags: vec!["react".to_string(), "typescript".to_string()],
		}
	}

	#[test]
	fn escapes_like_wildcards() {
		assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
	}

	#[test]
	fn text_groups_are_and_ed_and_fields_or_ed() {
		let mut predicate =
			VideoPredicate { text_groups: vec!["REACT".to_string()], ..Default::default() };

		assert!(predicate.matches(&video()));

		predicate.text_groups.push("typescript".to_string());

		assert!(predicate.matches(&video()));

		predicate.text_groups.push("vite".to_string());

		assert!(!predicate.matches(&video()));
	}

	#[test]
	fn bounds_are_half_open() {
		let predicate = VideoPredicate {
			duration_min: Some(600),
			duration_max: Some(601),
			uploaded_from: Some(datetime!(2024-01-10 0:00 UTC)),
			uploaded_before: Some(datetime!(2024-01-11 0:00 UTC)),
			..Default::default()
		};

		assert!(predicate.matches(&video()));

		let predicate = VideoPredicate { duration_max: Some(600), ..Default::default() };

		assert!(!predicate.matches(&video()));
	}

	#[test]
	fn renders_bound_parameters() {
		let predicate = VideoPredicate {
			text_groups: vec!["react".to_string()],
			category: Some("education".to_string()),
			tags_any: vec!["vite".to_string()],
			..Default::default()
		};
		let mut builder = QueryBuilder::<Postgres>::new("SELECT count(*) FROM videos v");

		predicate.push_where(&mut builder);

		let sql = builder.sql();

		assert!(sql.starts_with("SELECT count(*) FROM videos v WHERE TRUE AND (v.title ILIKE $1"));
		assert!(sql.contains("v.category = $5"));
		assert!(sql.contains("t.name = ANY($6)"));
	}
}
