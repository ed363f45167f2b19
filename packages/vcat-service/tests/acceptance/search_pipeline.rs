use vcat_domain::{RawFilters, SortOption};
use vcat_service::{CatalogService, ResultSource, SearchRequest, SearchResponse};
use vcat_storage::db::Db;

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

async fn history_count(db: &Db) -> i64 {
	sqlx::query_scalar("SELECT count(*) FROM search_history")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to count search history.")
}

#[tokio::test]
#[ignore = "Requires external Postgres and Elasticsearch. Set VCAT_PG_DSN and VCAT_ES_URL to run."]
async fn search_uses_index_then_cache_then_fallback() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping search_uses_index_then_cache_then_fallback; set VCAT_PG_DSN to run.");

		return;
	};
	let Some(es_url) = vcat_testkit::env_es_url() else {
		eprintln!("Skipping search_uses_index_then_cache_then_fallback; set VCAT_ES_URL to run.");

		return;
	};
	let cfg = super::test_config(&test_db, es_url);
	let service = super::build_service(cfg.clone()).await.expect("Failed to build service.");
	let report = service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!(report.indexed, 5);

	let indexed = service.search(react_request()).await.expect("Search failed.");

	assert_eq!(indexed.source, ResultSource::Index);
	assert_eq!(indexed.total, 3);
	assert_eq!(ids(&indexed), vec![5, 2]);
	assert!(indexed.results[0].highlights.title.iter().any(|fragment| fragment.contains("<mark>")));

	let cached = service.search(react_request()).await.expect("Search failed.");

	assert_eq!(cached.source, ResultSource::Cache);
	assert_eq!(ids(&cached), ids(&indexed));

	let mut offline_cfg = cfg.clone();

	offline_cfg.storage.search_engine.url = "http://127.0.0.1:1".to_string();
	offline_cfg.search.cache.enabled = false;

	let offline_db =
		Db::connect(&offline_cfg.storage.postgres).await.expect("Failed to connect to Postgres.");
	let offline_engine = vcat_storage::engine::EngineClient::new(&offline_cfg.storage.search_engine)
		.expect("Failed to build engine client.");
	let offline = CatalogService::new(offline_cfg, offline_db, offline_engine);
	let degraded = offline.search(react_request()).await.expect("Search failed.");

	assert_eq!(degraded.source, ResultSource::Fallback);
	assert_eq!(degraded.total, 3);
	assert_eq!(ids(&degraded), vec![5, 2]);

	let inspect = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	assert_eq!(history_count(&inspect).await, 3);

	let suggestions = service.suggest("reac").await.expect("Suggest failed.");

	assert!(suggestions.tags.contains(&"react".to_string()));
	assert_eq!(suggestions.suggestions, vec!["react tutorial".to_string()]);

	inspect.pool.close().await;

	drop(service);
	drop(offline);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
