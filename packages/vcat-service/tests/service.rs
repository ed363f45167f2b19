use std::sync::Arc;

use uuid::Uuid;

use vcat_config::Config;
use vcat_domain::{RawFilters, SortOption};
use vcat_service::{
	CatalogService, Error, ResultSource, SaveSearchRequest, SearchRequest, SearchResponse,
};
use vcat_storage::{engine::FilterClause, models::VideoRecord};
use vcat_testkit::{MemoryBackends, MemoryEngine, fixture_videos, memory_backends, test_config};

fn service(backends: &MemoryBackends) -> CatalogService {
	CatalogService::with_backends(test_config(), backends.backends())
}

fn service_with(cfg: Config, backends: &MemoryBackends) -> CatalogService {
	CatalogService::with_backends(cfg, backends.backends())
}

fn react_request() -> SearchRequest {
	SearchRequest {
		query: Some("react tutorial".to_string()),
		filters: RawFilters {
			category: Some("education".to_string()),
			tags: Some(vec!["typescript".to_string()]),
			..Default::default()
		},
		sort: Some(SortOption::UploadDate),
		page: Some(1),
		page_size: Some(2),
		..Default::default()
	}
}

fn ids(response: &SearchResponse) -> Vec<i64> {
	response.results.iter().map(|hit| hit.video.id).collect()
}

#[tokio::test]
async fn index_path_filters_sorts_and_pages() {
	let backends = memory_backends(fixture_videos());
	let response = service(&backends).search(react_request()).await.expect("Search failed.");

	assert_eq!(response.source, ResultSource::Index);
	assert_eq!(response.total, 3);
	assert_eq!(response.page, 1);
	assert_eq!(response.page_size, 2);
	assert_eq!(ids(&response), vec![5, 2]);
	assert!(response.summary.starts_with("Found 3 results in "));
	assert!(response.results.iter().all(|hit| hit.score.is_none()));
	assert_eq!(
		response.results[0].highlights.title,
		vec!["<mark>React</mark> <mark>Tutorial</mark> with TypeScript and Vite".to_string()]
	);
}

#[tokio::test]
async fn engine_receives_normalized_filters() {
	let backends = memory_backends(fixture_videos());

	service(&backends).search(react_request()).await.expect("Search failed.");

	let query = backends.engine.last_query().expect("Expected an engine query.");

	assert_eq!(query.from, 0);
	assert_eq!(query.size, 2);
	assert!(query.filter.contains(&FilterClause::Term {
		field: "category".to_string(),
		value: "education".to_string(),
	}));
	assert!(query.filter.contains(&FilterClause::Terms {
		field: "tags".to_string(),
		values: vec!["typescript".to_string()],
	}));
}

#[tokio::test]
async fn fallback_path_returns_the_same_page() {
	let backends = memory_backends(fixture_videos());

	backends.engine.set_failing(true);

	let response = service(&backends).search(react_request()).await.expect("Search failed.");

	assert_eq!(response.source, ResultSource::Fallback);
	assert_eq!(response.total, 3);
	assert_eq!(ids(&response), vec![5, 2]);
	assert!(response.results.iter().all(|hit| hit.score.is_none()));
	assert!(response.results.iter().all(|hit| hit.highlights.title.is_empty()));
}

#[tokio::test]
async fn filter_only_search_agrees_across_paths() {
	let request = SearchRequest {
		filters: RawFilters {
			category: Some("education".to_string()),
			duration: Some("medium".to_string()),
			..Default::default()
		},
		sort: Some(SortOption::UploadDate),
		..Default::default()
	};
	let indexed = memory_backends(fixture_videos());
	let fallback = memory_backends(fixture_videos());

	fallback.engine.set_failing(true);

	let from_index = service(&indexed).search(request.clone()).await.expect("Search failed.");
	let from_store = service(&fallback).search(request).await.expect("Search failed.");

	assert_eq!(from_index.source, ResultSource::Index);
	assert_eq!(from_store.source, ResultSource::Fallback);
	assert_eq!(from_index.total, 4);
	assert_eq!(from_index.total, from_store.total);
	assert_eq!(ids(&from_index), vec![5, 2, 3, 1]);
	assert_eq!(ids(&from_index), ids(&from_store));
}

async fn search_both_paths(
	videos: Vec<VideoRecord>,
	request: SearchRequest,
) -> (SearchResponse, SearchResponse) {
	let indexed = memory_backends(videos.clone());
	let fallback = memory_backends(videos);

	fallback.engine.set_failing(true);

	let from_index = service(&indexed).search(request.clone()).await.expect("Search failed.");
	let from_store = service(&fallback).search(request).await.expect("Search failed.");

	assert_eq!(from_index.source, ResultSource::Index);
	assert_eq!(from_store.source, ResultSource::Fallback);

	(from_index, from_store)
}

#[tokio::test]
async fn empty_duration_range_yields_no_results_on_both_paths() {
	let request = SearchRequest {
		filters: RawFilters {
			duration: Some("long".to_string()),
			max_duration: Some(600),
			..Default::default()
		},
		..Default::default()
	};
	let (from_index, from_store) = search_both_paths(fixture_videos(), request).await;

	assert_eq!(from_index.total, 0);
	assert!(from_index.results.is_empty());
	assert_eq!(from_store.total, 0);
	assert!(from_store.results.is_empty());
}

#[tokio::test]
async fn last_representable_upload_day_is_an_open_upper_bound() {
	let request = SearchRequest {
		filters: RawFilters {
			upload_date_to: Some("9999-12-31".to_string()),
			..Default::default()
		},
		sort: Some(SortOption::UploadDate),
		..Default::default()
	};
	let (from_index, from_store) = search_both_paths(fixture_videos(), request).await;

	assert_eq!(from_index.total, 5);
	assert_eq!(ids(&from_index), vec![5, 2, 3, 4, 1]);
	assert_eq!(ids(&from_index), ids(&from_store));
}

#[tokio::test]
async fn oversized_duration_bounds_agree_across_paths() {
	let mut videos = fixture_videos();
	let mut marathon = videos[3].clone();

	marathon.video_id = 6;
	marathon.duration = i32::MAX;
	videos.push(marathon);

	let request = SearchRequest {
		filters: RawFilters { min_duration: Some(5_000_000_000), ..Default::default() },
		..Default::default()
	};
	let (from_index, from_store) = search_both_paths(videos.clone(), request).await;

	assert_eq!(ids(&from_index), vec![6]);
	assert_eq!(ids(&from_store), vec![6]);

	let request = SearchRequest {
		filters: RawFilters {
			min_duration: Some(1_000_000),
			max_duration: Some(i64::from(i32::MAX)),
			..Default::default()
		},
		..Default::default()
	};
	let (from_index, from_store) = search_both_paths(videos, request).await;

	assert_eq!(ids(&from_index), vec![6]);
	assert_eq!(ids(&from_store), vec![6]);
}

#[tokio::test]
async fn popular_tags_rank_by_usage_then_name() {
	let backends = memory_backends(fixture_videos());
	let tags = service(&backends).popular_tags(Some(4)).await.expect("Popular tags failed.");
	let ranked: Vec<(&str, u64)> = tags.iter().map(|tag| (tag.name.as_str(), tag.count)).collect();

	assert_eq!(ranked, vec![("react", 4), ("typescript", 3), ("cooking", 1), ("javascript", 1)]);

	let all = service(&backends).popular_tags(None).await.expect("Popular tags failed.");

	assert_eq!(all.len(), 6);

	backends.videos.set_failing(true);

	assert!(matches!(service(&backends).popular_tags(None).await, Err(Error::Storage { .. })));
}

#[tokio::test]
async fn relevance_sort_reports_scores_and_tolerates_typos() {
	let backends = memory_backends(fixture_videos());
	let request = SearchRequest { query: Some("reakt".to_string()), ..Default::default() };
	let response = service(&backends).search(request).await.expect("Search failed.");

	assert_eq!(response.source, ResultSource::Index);
	assert_eq!(response.total, 4);
	assert!(!ids(&response).contains(&4));
	assert!(response.results.iter().all(|hit| hit.score.is_some()));
}

#[tokio::test]
async fn second_identical_search_is_served_from_cache() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);
	let first = service.search(react_request()).await.expect("Search failed.");
	let second = service.search(react_request()).await.expect("Search failed.");

	assert_eq!(first.source, ResultSource::Index);
	assert_eq!(second.source, ResultSource::Cache);
	assert_eq!(ids(&first), ids(&second));
	assert_eq!(first.total, second.total);
	assert_eq!(backends.engine.searches(), 1);
	assert_eq!(backends.cache.writes(), 1);
}

#[tokio::test]
async fn equivalent_requests_share_a_cache_entry() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);
	let mut reordered = react_request();

	reordered.query = Some("  react tutorial ".to_string());
	reordered.filters.tags =
		Some(vec!["typescript".to_string(), " typescript ".to_string(), String::new()]);

	service.search(react_request()).await.expect("Search failed.");

	let second = service.search(reordered).await.expect("Search failed.");

	assert_eq!(second.source, ResultSource::Cache);
	assert_eq!(backends.cache.len(), 1);
	assert_eq!(backends.engine.searches(), 1);
}

#[tokio::test]
async fn different_pages_use_different_cache_entries() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);
	let mut second_page = react_request();

	second_page.page = Some(2);

	service.search(react_request()).await.expect("Search failed.");

	let response = service.search(second_page).await.expect("Search failed.");

	assert_eq!(response.source, ResultSource::Index);
	assert_eq!(ids(&response), vec![1]);
	assert_eq!(backends.cache.len(), 2);
}

#[tokio::test]
async fn fallback_results_are_never_cached() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);

	backends.engine.set_failing(true);

	let degraded = service.search(react_request()).await.expect("Search failed.");

	assert_eq!(degraded.source, ResultSource::Fallback);
	assert_eq!(backends.cache.writes(), 0);
	assert!(backends.cache.is_empty());

	backends.engine.set_failing(false);

	let recovered = service.search(react_request()).await.expect("Search failed.");

	assert_eq!(recovered.source, ResultSource::Index);
	assert_eq!(backends.cache.writes(), 1);
}

#[tokio::test]
async fn disabled_cache_is_never_touched() {
	let backends = memory_backends(fixture_videos());
	let mut cfg = test_config();

	cfg.search.cache.enabled = false;

	let service = service_with(cfg, &backends);

	service.search(react_request()).await.expect("Search failed.");

	let second = service.search(react_request()).await.expect("Search failed.");

	assert_eq!(second.source, ResultSource::Index);
	assert_eq!(backends.cache.reads(), 0);
	assert_eq!(backends.cache.writes(), 0);
}

#[tokio::test]
async fn oversized_payloads_skip_the_cache_write() {
	let backends = memory_backends(fixture_videos());
	let mut cfg = test_config();

	cfg.search.cache.max_payload_bytes = Some(16);

	let response =
		service_with(cfg, &backends).search(react_request()).await.expect("Search failed.");

	assert_eq!(response.source, ResultSource::Index);
	assert_eq!(backends.cache.writes(), 0);
}

#[tokio::test]
async fn cache_outage_degrades_to_a_miss() {
	let backends = memory_backends(fixture_videos());

	backends.cache.set_failing(true);

	let response = service(&backends).search(react_request()).await.expect("Search failed.");

	assert_eq!(response.source, ResultSource::Index);
	assert_eq!(ids(&response), vec![5, 2]);
	assert_eq!(backends.history.entries().len(), 1);
}

#[tokio::test]
async fn hydration_keeps_engine_order_and_drops_missing_rows() {
	let backends = memory_backends(fixture_videos());

	backends.videos.remove(2);

	let response = service(&backends).search(react_request()).await.expect("Search failed.");

	assert_eq!(response.source, ResultSource::Index);
	assert_eq!(response.total, 3);
	assert_eq!(ids(&response), vec![5]);
	assert_eq!(backends.videos.bulk_reads(), 1);
}

#[tokio::test]
async fn store_failure_during_fallback_is_fatal() {
	let backends = memory_backends(fixture_videos());

	backends.engine.set_failing(true);
	backends.videos.set_failing(true);

	let err = service(&backends).search(react_request()).await.expect_err("Expected a failure.");

	assert!(matches!(err, Error::Storage { .. }), "Unexpected error: {err:?}");
	assert!(backends.history.entries().is_empty());
}

#[tokio::test]
async fn store_failure_during_hydration_is_fatal() {
	let backends = memory_backends(fixture_videos());

	backends.videos.set_failing(true);

	let err = service(&backends).search(react_request()).await.expect_err("Expected a failure.");

	assert!(matches!(err, Error::Storage { .. }), "Unexpected error: {err:?}");
	assert_eq!(backends.cache.writes(), 0);
}

#[tokio::test]
async fn every_search_is_recorded_once() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);

	service.search(react_request()).await.expect("Search failed.");
	service.search(react_request()).await.expect("Search failed.");
	backends.engine.set_failing(true);
	service
		.search(SearchRequest { query: Some("pasta".to_string()), ..Default::default() })
		.await
		.expect("Search failed.");

	let entries = backends.history.entries();

	assert_eq!(entries.len(), 3);
	assert_eq!(entries[0].query, "react tutorial");
	assert_eq!(entries[0].result_count, 3);
	assert!(!entries[0].cache_hit && !entries[0].fallback);
	assert!(entries[1].cache_hit && !entries[1].fallback);
	assert_eq!(entries[2].query, "pasta");
	assert!(entries[2].fallback && !entries[2].cache_hit);
	assert_eq!(entries[0].filters.filters.category.as_deref(), Some("education"));
	assert_eq!(entries[0].filters.sort, SortOption::UploadDate);
}

#[tokio::test]
async fn history_outage_does_not_fail_the_search() {
	let backends = memory_backends(fixture_videos());

	backends.history.set_failing(true);

	let response = service(&backends).search(react_request()).await.expect("Search failed.");

	assert_eq!(response.total, 3);
}

#[tokio::test]
async fn popular_searches_rank_by_frequency() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);

	for query in ["pasta", "react tutorial", "react tutorial", "", "hooks"] {
		service
			.search(SearchRequest { query: Some(query.to_string()), ..Default::default() })
			.await
			.expect("Search failed.");
	}

	let popular = service.popular_searches(None).await.expect("Popular lookup failed.");
	let queries: Vec<(&str, u64)> =
		popular.iter().map(|item| (item.query.as_str(), item.count)).collect();

	assert_eq!(queries, vec![("react tutorial", 2), ("pasta", 1), ("hooks", 1)]);

	let top = service.popular_searches(Some(1)).await.expect("Popular lookup failed.");

	assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn suggestions_combine_tags_and_popular_queries() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);

	service
		.search(SearchRequest { query: Some("react".to_string()), ..Default::default() })
		.await
		.expect("Search failed.");

	let suggestions = service.suggest("rea").await.expect("Suggest failed.");

	assert_eq!(suggestions.tags, vec!["react", "typescript", "javascript", "vite"]);
	assert_eq!(suggestions.suggestions, vec!["react"]);
}

#[tokio::test]
async fn tag_suggestions_fall_back_to_the_store() {
	let backends = memory_backends(fixture_videos());

	backends.engine.set_failing(true);

	let suggestions = service(&backends).suggest("JA").await.expect("Suggest failed.");

	assert_eq!(suggestions.tags, vec!["javascript"]);
}

#[tokio::test]
async fn empty_prefix_suggests_no_tags() {
	let backends = memory_backends(fixture_videos());
	let suggestions = service(&backends).suggest("   ").await.expect("Suggest failed.");

	assert!(suggestions.tags.is_empty());
}

#[tokio::test]
async fn related_videos_share_a_tag_or_category() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);
	let related = service.related(1, None).await.expect("Related lookup failed.");
	let mut related_ids: Vec<i64> = related.iter().map(|video| video.id).collect();

	related_ids.sort();

	assert_eq!(related_ids, vec![2, 3, 5]);

	let limited = service.related(1, Some(2)).await.expect("Related lookup failed.");

	assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn related_videos_fall_back_to_the_category() {
	let backends = memory_backends(fixture_videos());

	backends.engine.set_failing(true);

	let related = service(&backends).related(1, None).await.expect("Related lookup failed.");
	let related_ids: Vec<i64> = related.iter().map(|video| video.id).collect();

	assert_eq!(related_ids, vec![5, 2, 3]);
}

#[tokio::test]
async fn related_videos_of_an_unknown_id_is_not_found() {
	let backends = memory_backends(fixture_videos());
	let err = service(&backends).related(404, None).await.expect_err("Expected a failure.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn rebuild_copies_every_video_into_the_index() {
	let seeded = memory_backends(fixture_videos());
	let backends = MemoryBackends { engine: Arc::new(MemoryEngine::default()), ..seeded };
	let report = service(&backends).rebuild_index().await.expect("Rebuild failed.");

	assert_eq!(report.indexed, 5);
	assert_eq!(report.missing, 0);
	assert_eq!(backends.engine.len(), 5);
}

#[tokio::test]
async fn single_video_index_lifecycle() {
	let seeded = memory_backends(fixture_videos());
	let backends = MemoryBackends { engine: Arc::new(MemoryEngine::default()), ..seeded };
	let service = service(&backends);

	service.index_video(3).await.expect("Indexing failed.");

	let doc = backends.engine.document(3).expect("Expected an indexed document.");

	assert_eq!(doc.title, "React Tutorial: Hooks Deep Dive");

	let err = service.index_video(99).await.expect_err("Expected a failure.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");
	assert!(service.remove_video(3).await.expect("Removal failed."));
	assert!(!service.remove_video(3).await.expect("Removal failed."));
}

#[tokio::test]
async fn saved_searches_round_trip() {
	let backends = memory_backends(fixture_videos());
	let service = service(&backends);
	let blank = service
		.save_search(SaveSearchRequest { name: "  ".to_string(), ..Default::default() })
		.await
		.expect_err("Expected a failure.");

	assert!(matches!(blank, Error::InvalidRequest { .. }), "Unexpected error: {blank:?}");

	let saved = service
		.save_search(SaveSearchRequest {
			name: " Weekend React ".to_string(),
			query: Some("react".to_string()),
			filters: RawFilters {
				tags: Some(vec!["vite".to_string(), "react".to_string()]),
				..Default::default()
			},
			sort: Some(SortOption::ViewCount),
			within: None,
		})
		.await
		.expect("Save failed.");

	assert_eq!(saved.name, "Weekend React");
	assert_eq!(saved.filters.filters.tags, vec!["react".to_string(), "vite".to_string()]);
	assert_eq!(saved.filters.sort, SortOption::ViewCount);

	let fetched = service.get_saved_search(saved.id).await.expect("Lookup failed.");

	assert_eq!(fetched, saved);

	let second = service
		.save_search(SaveSearchRequest { name: "Pasta".to_string(), ..Default::default() })
		.await
		.expect("Save failed.");
	let listed = service.list_saved_searches().await.expect("Listing failed.");

	assert_eq!(listed.len(), 2);
	assert_eq!(listed[0].id, second.id);

	let missing = service.get_saved_search(Uuid::new_v4()).await.expect_err("Expected a failure.");

	assert!(matches!(missing, Error::NotFound { .. }), "Unexpected error: {missing:?}");
}

#[tokio::test]
async fn categories_are_distinct_and_sorted() {
	let backends = memory_backends(fixture_videos());
	let categories = service(&backends).categories().await.expect("Listing failed.");

	assert_eq!(categories, vec!["education".to_string(), "lifestyle".to_string()]);
}
