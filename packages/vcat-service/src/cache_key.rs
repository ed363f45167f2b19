use serde_json::Value;

use crate::search::NormalizedSearch;

pub const CACHE_KEY_PREFIX: &str = "search:";

/// Deterministic key for a request: empty values are pruned, object keys sorted at every level,
/// and `"{path}?{canonical}"` hashed with BLAKE3.
pub fn build_key(path: &str, params: &Value) -> String {
	let mut canonical = String::new();

	match prune(params) {
		Some(value) => write_canonical(&value, &mut canonical),
		None => canonical.push_str("{}"),
	}

	let hash = blake3::hash(format!("{path}?{canonical}").as_bytes());

	format!("{CACHE_KEY_PREFIX}{}", hash.to_hex())
}

pub fn search_cache_key(path: &str, search: &NormalizedSearch) -> String {
	let filters = serde_json::to_value(&search.filters).unwrap_or(Value::Null);
	let params = serde_json::json!({
		"query": search.query,
		"within": search.within,
		"filters": filters,
		"sort": search.sort.as_str(),
		"page": search.pagination.page,
		"pageSize": search.pagination.page_size,
	});

	build_key(path, &params)
}

/// Shortened key for log fields.
pub fn cache_key_prefix(key: &str) -> &str {
	let body = key.strip_prefix(CACHE_KEY_PREFIX).unwrap_or(key);

	&body[..body.len().min(12)]
}

/// Drops nulls, empty strings, and containers that end up empty. Array order is kept.
fn prune(value: &Value) -> Option<Value> {
	match value {
		Value::Null => None,
		Value::String(s) if s.is_empty() => None,
		Value::Array(items) => {
			let items: Vec<Value> = items.iter().filter_map(prune).collect();

			(!items.is_empty()).then_some(Value::Array(items))
		},
		Value::Object(map) => {
			let map: serde_json::Map<String, Value> = map
				.iter()
				.filter_map(|(key, value)| prune(value).map(|value| (key.clone(), value)))
				.collect();

			(!map.is_empty()).then_some(Value::Object(map))
		},
		other => Some(other.clone()),
	}
}

fn write_canonical(value: &Value, out: &mut String) {
	match value {
		Value::Array(items) => {
			out.push('[');

			for (idx, item) in items.iter().enumerate() {
				if idx > 0 {
					out.push(',');
				}

				write_canonical(item, out);
			}

			out.push(']');
		},
		Value::Object(map) => {
			let mut keys: Vec<&String> = map.keys().collect();

			keys.sort();
			out.push('{');

			for (idx, key) in keys.into_iter().enumerate() {
				if idx > 0 {
					out.push(',');
				}

				out.push_str(&Value::String(key.clone()).to_string());
				out.push(':');

				if let Some(value) = map.get(key) {
					write_canonical(value, out);
				}
			}

			out.push('}');
		},
		scalar => out.push_str(&scalar.to_string()),
	}
}
