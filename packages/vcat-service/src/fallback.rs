use vcat_storage::predicate::VideoPredicate;

use crate::search::NormalizedSearch;

/// Relational equivalent of the index query. Filter bounds are the ones the engine receives;
/// ordering is fixed to upload date descending, then id descending.
pub fn build(search: &NormalizedSearch) -> VideoPredicate {
	let filters = &search.filters;
	let (uploaded_from, uploaded_before) = filters.upload_date.bounds();
	let text_groups = [&search.query, &search.within].into_iter().flatten().cloned().collect();

	VideoPredicate {
		text_groups,
		category: filters.category.clone(),
		resolution: filters.resolution.clone(),
		tags_any: filters.tags.clone(),
		duration_min: filters.duration.min.map(to_i32),
		duration_max: filters.duration.max.map(to_i32),
		uploaded_from,
		uploaded_before,
	}
}

fn to_i32(seconds: u32) -> i32 {
	i32::try_from(seconds).unwrap_or(i32::MAX)
}
