use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineHit {
	pub id: i64,
	/// Absent when the engine sorted by a field instead of relevance.
	pub score: Option<f32>,
	pub highlights: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSearchResult {
	pub hits: Vec<EngineHit>,
	pub total: u64,
	pub took_ms: Option<u64>,
}

#[derive(Deserialize)]
struct RawSearchResponse {
	took: Option<u64>,
	hits: RawHits,
	#[serde(default)]
	aggregations: Option<Value>,
}

#[derive(Deserialize)]
struct RawHits {
	total: Option<RawTotal>,
	#[serde(default)]
	hits: Vec<RawHit>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTotal {
	Count(u64),
	Object { value: u64 },
}

#[derive(Deserialize)]
struct RawHit {
	#[serde(rename = "_id")]
	id: String,
	#[serde(rename = "_score")]
	score: Option<f32>,
	#[serde(default)]
	highlight: BTreeMap<String, Vec<String>>,
}

pub fn parse_search_response(json: Value) -> Result<EngineSearchResult> {
	let raw: RawSearchResponse = serde_json::from_value(json)
		.map_err(|err| Error::InvalidResponse(format!("Malformed search response: {err}.")))?;
	let mut hits = Vec::with_capacity(raw.hits.hits.len());

	for hit in raw.hits.hits {
		hits.push(EngineHit {
			id: parse_doc_id(&hit.id)?,
			score: hit.score,
			highlights: hit.highlight,
		});
	}

	let total = match raw.hits.total {
		Some(RawTotal::Count(value)) | Some(RawTotal::Object { value }) => value,
		None => hits.len() as u64,
	};

	Ok(EngineSearchResult { hits, total, took_ms: raw.took })
}

/// Hit ids only, in engine order.
pub fn parse_hit_ids(json: Value) -> Result<Vec<i64>> {
	Ok(parse_search_response(json)?.hits.into_iter().map(|hit| hit.id).collect())
}

/// Bucket keys of a terms aggregation, in engine order.
pub fn parse_terms_buckets(json: Value, aggregation: &str) -> Result<Vec<String>> {
	let raw: RawSearchResponse = serde_json::from_value(json)
		.map_err(|err| Error::InvalidResponse(format!("Malformed search response: {err}.")))?;
	let Some(buckets) = raw
		.aggregations
		.as_ref()
		.and_then(|aggs| aggs.get(aggregation))
		.and_then(|agg| agg.get("buckets"))
		.and_then(Value::as_array)
	else {
		return Ok(Vec::new());
	};

	Ok(buckets
		.iter()
		.filter_map(|bucket| bucket.get("key"))
		.map(|key| match key {
			Value::String(key) => key.clone(),
			other => other.to_string(),
		})
		.collect())
}

fn parse_doc_id(raw: &str) -> Result<i64> {
	raw.parse()
		.map_err(|_| Error::InvalidResponse(format!("Document id {raw:?} is not numeric.")))
}
