pub mod mapping;
pub mod query;
pub mod response;

pub use mapping::VideoDocument;
pub use query::{
	BoostedField, EngineQuery, EngineSort, FilterClause, Highlight, Operator, RangeValue, SortOrder,
	TextClause,
};
pub use response::{EngineHit, EngineSearchResult};

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::{Error, Result};

pub const POPULAR_TAGS_AGG: &str = "popular_tags";

/// REST client for the Elasticsearch-compatible search engine.
pub struct EngineClient {
	client: Client,
	base_url: String,
	pub index: String,
	username: Option<String>,
	password: Option<String>,
	min_gram: u32,
	max_gram: u32,
}
impl EngineClient {
	pub fn new(cfg: &vcat_config::SearchEngine) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.danger_accept_invalid_certs(cfg.skip_tls_verify)
			.build()?;

		Ok(Self {
			client,
			base_url: cfg.url.trim_end_matches('/').to_string(),
			index: cfg.index.clone(),
			username: cfg.username.clone(),
			password: cfg.password.clone(),
			min_gram: cfg.autocomplete_min_gram,
			max_gram: cfg.autocomplete_max_gram,
		})
	}

	/// Creates the index with the video mapping when it does not exist yet.
	pub async fn ensure_index(&self) -> Result<bool> {
		let res = self.request(Method::HEAD, &self.index_path()).send().await?;

		match res.status() {
			status if status.is_success() => return Ok(false),
			StatusCode::NOT_FOUND => {},
			status =>
				return Err(Error::Engine { status: status.as_u16(), body: res.text().await? }),
		}

		let body = mapping::index_definition(self.min_gram, self.max_gram);
		let res = self.request(Method::PUT, &self.index_path()).json(&body).send().await?;
		let status = res.status();

		if status.is_success() {
			tracing::info!(index = %self.index, "Search index created.");

			return Ok(true);
		}

		let text = res.text().await?;

		// Another process created it between the two calls.
		if text.contains("resource_already_exists_exception") {
			return Ok(false);
		}

		Err(Error::Engine { status: status.as_u16(), body: text })
	}

	pub async fn index_document(&self, doc: &VideoDocument) -> Result<()> {
		let path = format!("{}/_doc/{}?refresh=wait_for", self.index_path(), doc.id);

		self.send_json(self.request(Method::PUT, &path).json(doc)).await?;

		Ok(())
	}

	/// Returns `false` when the document was not indexed.
	pub async fn delete_document(&self, id: i64) -> Result<bool> {
		let path = format!("{}/_doc/{id}?refresh=wait_for", self.index_path());
		let res = self.request(Method::DELETE, &path).send().await?;
		let status = res.status();

		if status == StatusCode::NOT_FOUND {
			return Ok(false);
		}
		if !status.is_success() {
			return Err(Error::Engine { status: status.as_u16(), body: res.text().await? });
		}

		Ok(true)
	}

	pub async fn search(&self, query: &EngineQuery) -> Result<EngineSearchResult> {
		let json = self.search_raw(&query.to_body()).await?;

		response::parse_search_response(json)
	}

	/// Tags of documents matching the prefix on the edge-gram subfields.
	pub async fn suggest_tags(&self, prefix: &str, limit: u32) -> Result<Vec<String>> {
		let body = serde_json::json!({
			"size": 0,
			"query": {
				"multi_match": {
					"query": prefix,
					"type": "bool_prefix",
					"fields": ["title.autocomplete^3", "tags.autocomplete^2", "uploader_name.autocomplete"]
				}
			},
			"aggs": {
				POPULAR_TAGS_AGG: { "terms": { "field": "tags", "size": limit } }
			}
		});
		let json = self.search_raw(&body).await?;

		response::parse_terms_buckets(json, POPULAR_TAGS_AGG)
	}

	/// Ids of documents similar to `id`, best first. May include `id` itself.
	pub async fn more_like_this(&self, id: i64, limit: u32) -> Result<Vec<i64>> {
		let body = serde_json::json!({
			"size": limit,
			"query": {
				"more_like_this": {
					"fields": ["title", "description", "tags"],
					"like": [{ "_id": id.to_string() }],
					"min_term_freq": 1,
					"max_query_terms": 12
				}
			}
		});
		let json = self.search_raw(&body).await?;

		response::parse_hit_ids(json)
	}

	async fn search_raw(&self, body: &Value) -> Result<Value> {
		let path = format!("{}/_search", self.index_path());

		self.send_json(self.request(Method::POST, &path).json(body)).await
	}

	async fn send_json(&self, req: RequestBuilder) -> Result<Value> {
		let res = req.send().await?;
		let status = res.status();

		if !status.is_success() {
			return Err(Error::Engine { status: status.as_u16(), body: res.text().await? });
		}

		Ok(res.json().await?)
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		let req = self.client.request(method, format!("{}{path}", self.base_url));

		match (&self.username, &self.password) {
			(Some(username), password) => req.basic_auth(username, password.as_deref()),
			_ => req,
		}
	}

	fn index_path(&self) -> String {
		format!("/{}", self.index)
	}
}
