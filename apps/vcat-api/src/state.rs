use std::sync::Arc;

use vcat_service::CatalogService;
use vcat_storage::{db::Db, engine::EngineClient};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CatalogService>,
}
impl AppState {
	pub async fn new(config: vcat_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let engine = EngineClient::new(&config.storage.search_engine)?;
		let service = CatalogService::new(config, db, engine);

		// Best-effort; searches fall back to Postgres while the engine is down.
		match service.ensure_index().await {
			Ok(created) => tracing::info!(created, "Search index ready."),
			Err(err) => tracing::warn!(error = %err, "Search index check failed."),
		}

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: CatalogService) -> Self {
		Self { service: Arc::new(service) }
	}
}
