pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_videos.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_videos.sql")),
				"tables/002_tags.sql" => out.push_str(include_str!("../../../sql/tables/002_tags.sql")),
				"tables/003_video_tags.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_video_tags.sql")),
				"tables/004_search_history.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_search_history.sql")),
				"tables/005_saved_searches.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_saved_searches.sql")),
				"tables/006_search_cache.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_search_cache.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expands_every_include() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));

		for table in ["videos", "tags", "video_tags", "search_history", "saved_searches", "search_cache"]
		{
			assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")), "{table}");
		}
	}
}
