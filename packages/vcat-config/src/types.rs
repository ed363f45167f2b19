use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	pub worker: Worker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub search_engine: SearchEngine,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchEngine {
	pub url: String,
	pub index: String,
	pub username: Option<String>,
	pub password: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub skip_tls_verify: bool,
	#[serde(default = "default_min_gram")]
	pub autocomplete_min_gram: u32,
	#[serde(default = "default_max_gram")]
	pub autocomplete_max_gram: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u32,
	pub cache: SearchCache,
	pub suggest: SearchSuggest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCache {
	pub enabled: bool,
	#[serde(default = "default_cache_ttl_seconds")]
	pub ttl_seconds: u64,
	pub max_payload_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSuggest {
	#[serde(default = "default_tag_limit")]
	pub tag_limit: u32,
	#[serde(default = "default_popular_limit")]
	pub popular_limit: u32,
	#[serde(default = "default_related_limit")]
	pub related_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Worker {
	pub cache_purge_interval_seconds: u64,
}

fn default_min_gram() -> u32 {
	2
}

fn default_max_gram() -> u32 {
	20
}

fn default_page_size() -> u32 {
	12
}

fn default_max_page_size() -> u32 {
	100
}

fn default_cache_ttl_seconds() -> u64 {
	120
}

fn default_tag_limit() -> u32 {
	10
}

fn default_popular_limit() -> u32 {
	5
}

fn default_related_limit() -> u32 {
	6
}
