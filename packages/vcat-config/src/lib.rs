mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Postgres, Search, SearchCache, SearchEngine, SearchSuggest, Service, Storage, Worker,
};

use std::{fs, net::SocketAddr, path::Path};

/// Hard ceiling for any page size, independent of configuration.
pub const PAGE_SIZE_CEILING: u32 = 100;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("storage.search_engine.url", &cfg.storage.search_engine.url),
		("storage.search_engine.index", &cfg.storage.search_engine.index),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	let admin_addr: SocketAddr = cfg.service.admin_bind.parse().map_err(|_| Error::Validation {
		message: "service.admin_bind must be a socket address.".to_string(),
	})?;

	if !admin_addr.ip().is_loopback() {
		return Err(Error::Validation {
			message: "service.admin_bind must be a loopback address.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let engine = &cfg.storage.search_engine;

	if engine.username.is_some() != engine.password.is_some() {
		return Err(Error::Validation {
			message:
				"storage.search_engine.username and storage.search_engine.password must be set together."
					.to_string(),
		});
	}
	if engine.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.search_engine.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if engine.autocomplete_min_gram == 0 {
		return Err(Error::Validation {
			message: "storage.search_engine.autocomplete_min_gram must be greater than zero."
				.to_string(),
		});
	}
	if engine.autocomplete_min_gram > engine.autocomplete_max_gram {
		return Err(Error::Validation {
			message: "storage.search_engine.autocomplete_min_gram must not exceed autocomplete_max_gram."
				.to_string(),
		});
	}
	if cfg.search.default_page_size == 0 {
		return Err(Error::Validation {
			message: "search.default_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_page_size > PAGE_SIZE_CEILING {
		return Err(Error::Validation {
			message: format!("search.max_page_size must be {PAGE_SIZE_CEILING} or less."),
		});
	}
	if cfg.search.default_page_size > cfg.search.max_page_size {
		return Err(Error::Validation {
			message: "search.default_page_size must not exceed search.max_page_size.".to_string(),
		});
	}
	if cfg.search.cache.ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "search.cache.ttl_seconds must be greater than zero.".to_string(),
		});
	}

	if let Some(max) = cfg.search.cache.max_payload_bytes
		&& max == 0
	{
		return Err(Error::Validation {
			message: "search.cache.max_payload_bytes must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("search.suggest.tag_limit", cfg.search.suggest.tag_limit),
		("search.suggest.popular_limit", cfg.search.suggest.popular_limit),
		("search.suggest.related_limit", cfg.search.suggest.related_limit),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.worker.cache_purge_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "worker.cache_purge_interval_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let engine = &mut cfg.storage.search_engine;

	if engine.username.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
		engine.username = None;
	}
	if engine.password.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
		engine.password = None;
	}

	engine.url = engine.url.trim_end_matches('/').to_string();
}
