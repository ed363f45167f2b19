use vcat_domain::{NormalizedFilters, SortOption};
use vcat_storage::engine::{
	BoostedField, EngineQuery, EngineSort, FilterClause, Highlight, Operator, RangeValue,
	SortOrder, TextClause,
};

use crate::search::NormalizedSearch;

pub const HIGHLIGHT_FIELDS: [&str; 4] = ["title", "description", "uploader_name", "tags"];

/// Translates a normalized search into the engine query. Construction cannot fail.
pub fn build(search: &NormalizedSearch) -> EngineQuery {
	let mut must = Vec::new();

	if let Some(query) = &search.query {
		must.push(TextClause {
			query: query.clone(),
			fields: vec![
				BoostedField::new("title", Some(3.0)),
				BoostedField::new("description", Some(2.0)),
				BoostedField::new("tags", Some(2.0)),
				BoostedField::new("uploader_name", None),
			],
			operator: Operator::And,
			fuzzy: true,
		});
	}
	if let Some(within) = &search.within {
		must.push(TextClause {
			query: within.clone(),
			fields: vec![
				BoostedField::new("title", Some(2.0)),
				BoostedField::new("description", None),
				BoostedField::new("tags", Some(1.5)),
			],
			operator: Operator::Or,
			fuzzy: true,
		});
	}

	EngineQuery {
		must,
		filter: filter_clauses(&search.filters),
		sort: sort_clauses(search.sort),
		highlight: Some(Highlight::marked(&HIGHLIGHT_FIELDS)),
		from: search.pagination.offset(),
		size: search.pagination.limit(),
		track_total_hits: true,
	}
}

pub fn filter_clauses(filters: &NormalizedFilters) -> Vec<FilterClause> {
	let mut clauses = Vec::new();

	if let Some(category) = &filters.category {
		clauses.push(FilterClause::Term { field: "category".to_string(), value: category.clone() });
	}
	if let Some(resolution) = &filters.resolution {
		clauses
			.push(FilterClause::Term { field: "resolution".to_string(), value: resolution.clone() });
	}
	if !filters.tags.is_empty() {
		clauses.push(FilterClause::Terms { field: "tags".to_string(), values: filters.tags.clone() });
	}
	if !filters.duration.is_unbounded() {
		clauses.push(FilterClause::Range {
			field: "duration".to_string(),
			gte: filters.duration.min.map(|min| RangeValue::Int(i64::from(min))),
			lt: filters.duration.max.map(|max| RangeValue::Int(i64::from(max))),
		});
	}

	let (from, before) = filters.upload_date.bounds();

	if from.is_some() || before.is_some() {
		clauses.push(FilterClause::Range {
			field: "upload_date".to_string(),
			gte: from.map(RangeValue::Timestamp),
			lt: before.map(RangeValue::Timestamp),
		});
	}

	clauses
}

fn sort_clauses(sort: SortOption) -> Vec<EngineSort> {
	let field = |name: &str, order| EngineSort::Field { field: name.to_string(), order };
	let tie_breaker = field("id", SortOrder::Desc);

	match sort {
		SortOption::Relevance => vec![EngineSort::Score],
		SortOption::UploadDate => vec![field("upload_date", SortOrder::Desc), tie_breaker],
		SortOption::ViewCount => vec![field("view_count", SortOrder::Desc), tie_breaker],
		SortOption::Duration => vec![field("duration", SortOrder::Asc), tie_breaker],
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;
	use vcat_domain::{DateRange, DurationRange, Pagination};

	fn search() -> NormalizedSearch {
		NormalizedSearch {
			query: None,
			within: None,
			filters: NormalizedFilters::default(),
			sort: SortOption::Relevance,
			pagination: Pagination { page: 3, page_size: 10 },
		}
	}

	#[test]
	fn filter_only_search_matches_all() {
		let query = build(&search());

		assert!(query.must.is_empty());
		assert_eq!(query.from, 20);
		assert_eq!(query.size, 10);
		assert!(query.track_total_hits);
		assert_eq!(query.sort, vec![EngineSort::Score]);
	}

	#[test]
	fn text_and_within_become_two_clauses() {
		let mut search = search();

		search.query = Some("react tutorial".to_string());
		search.within = Some("hooks".to_string());

		let query = build(&search);

		assert_eq!(query.must.len(), 2);
		assert_eq!(query.must[0].operator, Operator::And);
		assert_eq!(query.must[0].fields[0], BoostedField::new("title", Some(3.0)));
		assert_eq!(query.must[1].operator, Operator::Or);
		assert_eq!(query.must[1].query, "hooks");
	}

	#[test]
	fn filters_map_to_clauses_with_half_open_bounds() {
		let mut search = search();

		search.filters = NormalizedFilters {
			category: Some("education".to_string()),
			resolution: None,
			duration: DurationRange { min: Some(120), max: Some(300) },
			upload_date: DateRange {
				from: Some(time::macros::date!(2024 - 01 - 01)),
				to: Some(time::macros::date!(2024 - 01 - 31)),
			},
			tags: vec!["react".to_string(), "typescript".to_string()],
		};

		let clauses = build(&search).filter;

		assert_eq!(clauses.len(), 4);
		assert!(clauses.contains(&FilterClause::Terms {
			field: "tags".to_string(),
			values: vec!["react".to_string(), "typescript".to_string()],
		}));
		assert!(clauses.contains(&FilterClause::Range {
			field: "duration".to_string(),
			gte: Some(RangeValue::Int(120)),
			lt: Some(RangeValue::Int(300)),
		}));
		assert!(clauses.contains(&FilterClause::Range {
			field: "upload_date".to_string(),
			gte: Some(RangeValue::Timestamp(datetime!(2024-01-01 0:00 UTC))),
			lt: Some(RangeValue::Timestamp(datetime!(2024-02-01 0:00 UTC))),
		}));
	}

	#[test]
	fn open_ended_last_day_adds_no_date_clause() {
		let mut search = search();

		search.filters.upload_date = DateRange { from: None, to: Some(time::Date::MAX) };

		assert!(build(&search).filter.is_empty());
	}

	#[test]
	fn field_sorts_carry_an_id_tie_breaker() {
		let mut search = search();

		search.sort = SortOption::Duration;

		assert_eq!(
			build(&search).sort,
			vec![
				EngineSort::Field { field: "duration".to_string(), order: SortOrder::Asc },
				EngineSort::Field { field: "id".to_string(), order: SortOrder::Desc },
			]
		);
	}
}
