use serde::Serialize;
use serde_json::Value;

use crate::{engine::query::epoch_millis, models::VideoRecord};

pub const AUTOCOMPLETE_ANALYZER: &str = "autocomplete_analyzer";

/// The indexed projection of a video. The entity store stays the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoDocument {
	pub id: i64,
	pub title: String,
	pub description: String,
	pub uploader_name: String,
	pub category: String,
	pub duration: i32,
	/// Epoch milliseconds.
	pub upload_date: i64,
	pub resolution: String,
	pub tags: Vec<String>,
	pub view_count: i64,
}
impl From<&VideoRecord> for VideoDocument {
	fn from(video: &VideoRecord) -> Self {
		Self {
			id: video.video_id,
			title: video.title.clone(),
			description: video.description.clone().unwrap_or_default(),
			uploader_name: video.uploader_name.clone(),
			category: video.category.clone(),
			duration: video.duration,
			upload_date: epoch_millis(video.upload_date),
			resolution: video.resolution.clone(),
			tags: video.tags.clone(),
			view_count: video.view_count,
		}
	}
}

pub fn index_definition(min_gram: u32, max_gram: u32) -> Value {
	let autocomplete = serde_json::json!({
		"autocomplete": {
			"type": "text",
			"analyzer": AUTOCOMPLETE_ANALYZER,
			"search_analyzer": "standard"
		}
	});

	serde_json::json!({
		"settings": {
			"index": { "max_ngram_diff": max_gram.saturating_sub(min_gram) },
			"analysis": {
				"filter": {
					"autocomplete_filter": {
						"type": "edge_ngram",
						"min_gram": min_gram,
						"max_gram": max_gram
					}
				},
				"analyzer": {
					AUTOCOMPLETE_ANALYZER: {
						"type": "custom",
						"tokenizer": "standard",
						"filter": ["lowercase", "autocomplete_filter"]
					}
				}
			}
		},
		"mappings": {
			"properties": {
				"id": { "type": "long" },
				"title": { "type": "text", "analyzer": "standard", "fields": autocomplete.clone() },
				"description": { "type": "text", "analyzer": "standard" },
				"uploader_name": { "type": "text", "analyzer": "standard", "fields": autocomplete.clone() },
				"category": { "type": "keyword" },
				"duration": { "type": "integer" },
				"upload_date": { "type": "date" },
				"resolution": { "type": "keyword" },
				"tags": { "type": "keyword", "fields": autocomplete },
				"view_count": { "type": "long" }
			}
		}
	})
}
