use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use vcat_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn sample_with(edit: impl FnOnce(&mut toml::Table)) -> String {
	let mut value: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let root = value.as_table_mut().expect("Sample config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render sample config.")
}

fn table<'a>(root: &'a mut toml::Table, path: &[&str]) -> &'a mut toml::Table {
	let mut current = root;

	for key in path {
		current = current
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{key}]."));
	}

	current
}

fn write_temp_config(payload: String) -> PathBuf {
	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock before epoch.").as_nanos();
	let seq = COUNTER.fetch_add(1, Ordering::SeqCst);
	let path = env::temp_dir().join(format!("vcat_config_test_{nanos}_{seq}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_str(payload: String) -> vcat_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = vcat_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, needle: &str) {
	let err = load_str(payload).expect_err("Expected validation error.");

	match err {
		Error::Validation { message } =>
			assert!(message.contains(needle), "Unexpected message: {message}"),
		other => panic!("Expected validation error, got {other:?}"),
	}
}

#[test]
fn sample_config_loads_and_normalizes() {
	let cfg = load_str(SAMPLE_CONFIG_TOML.to_string()).expect("Sample config must load.");

	assert_eq!(cfg.storage.search_engine.url, "http://localhost:9200");
	assert!(cfg.storage.search_engine.username.is_none());
	assert!(cfg.storage.search_engine.password.is_none());
	assert_eq!(cfg.storage.search_engine.autocomplete_min_gram, 2);
	assert_eq!(cfg.storage.search_engine.autocomplete_max_gram, 20);
	assert_eq!(cfg.search.cache.ttl_seconds, 120);
	assert_eq!(cfg.search.default_page_size, 12);
}

#[test]
fn missing_file_is_reported() {
	let path = env::temp_dir().join("vcat_config_does_not_exist.toml");
	let err = vcat_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}

#[test]
fn malformed_toml_is_reported() {
	let err = load_str("[service\nhttp_bind = 1".to_string()).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }));
}

#[test]
fn rejects_non_loopback_admin_bind() {
	let payload = sample_with(|root| {
		table(root, &["service"])
			.insert("admin_bind".to_string(), Value::String("0.0.0.0:4001".to_string()));
	});

	expect_validation(payload, "service.admin_bind must be a loopback address.");
}

#[test]
fn rejects_zero_cache_ttl() {
	let payload = sample_with(|root| {
		table(root, &["search", "cache"]).insert("ttl_seconds".to_string(), Value::Integer(0));
	});

	expect_validation(payload, "search.cache.ttl_seconds must be greater than zero.");
}

#[test]
fn rejects_page_size_above_ceiling() {
	let payload = sample_with(|root| {
		table(root, &["search"]).insert("max_page_size".to_string(), Value::Integer(500));
	});

	expect_validation(payload, "search.max_page_size must be 100 or less.");
}

#[test]
fn rejects_default_page_size_above_max() {
	let payload = sample_with(|root| {
		let search = table(root, &["search"]);

		search.insert("default_page_size".to_string(), Value::Integer(50));
		search.insert("max_page_size".to_string(), Value::Integer(20));
	});

	expect_validation(payload, "search.default_page_size must not exceed search.max_page_size.");
}

#[test]
fn rejects_half_configured_engine_credentials() {
	let payload = sample_with(|root| {
		table(root, &["storage", "search_engine"])
			.insert("username".to_string(), Value::String("elastic".to_string()));
	});

	expect_validation(payload, "must be set together");
}

#[test]
fn rejects_inverted_autocomplete_grams() {
	let payload = sample_with(|root| {
		let engine = table(root, &["storage", "search_engine"]);

		engine.insert("autocomplete_min_gram".to_string(), Value::Integer(5));
		engine.insert("autocomplete_max_gram".to_string(), Value::Integer(3));
	});

	expect_validation(payload, "autocomplete_min_gram must not exceed");
}

#[test]
fn rejects_zero_suggest_limits() {
	let payload = sample_with(|root| {
		table(root, &["search", "suggest"]).insert("tag_limit".to_string(), Value::Integer(0));
	});

	expect_validation(payload, "search.suggest.tag_limit must be greater than zero.");
}
