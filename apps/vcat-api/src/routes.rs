use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use vcat_domain::{RawFilters, SortOption, filters};
use vcat_service::{
	Error, PopularQuery, RebuildReport, SaveSearchRequest, SavedSearch, SearchRequest,
	SearchResponse, Suggestions, TagCount, VideoView,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/videos/search", get(search))
		.route("/api/videos/search/suggestions", get(suggestions))
		.route("/api/videos/search/save", post(save_search))
		.route("/api/videos/search/saved", get(list_saved_searches))
		.route("/api/videos/search/saved/{id}", get(get_saved_search))
		.route("/api/videos/search/popular", get(popular_searches))
		.route("/api/videos/categories", get(categories))
		.route("/api/videos/tags/popular", get(popular_tags))
		.route("/api/videos/{id}/related", get(related))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/rebuild_index", post(rebuild_index))
		.route("/v1/admin/index/{id}", post(index_video).delete(remove_video))
		.with_state(state)
}

/// Query-string form of a search. Everything arrives as text; `tags` is comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
	pub q: Option<String>,
	pub category: Option<String>,
	pub duration: Option<String>,
	pub min_duration: Option<String>,
	pub max_duration: Option<String>,
	pub upload_date_from: Option<String>,
	pub upload_date_to: Option<String>,
	pub resolution: Option<String>,
	pub tags: Option<String>,
	pub sort: Option<String>,
	pub page: Option<String>,
	pub page_size: Option<String>,
	pub within: Option<String>,
}
impl SearchParams {
	/// Rejects unparsable dates; unparsable numbers and unknown sorts are ignored.
	pub fn into_request(self) -> Result<SearchRequest, ApiError> {
		let mut invalid = Vec::new();

		for (field, value) in
			[("uploadDateFrom", &self.upload_date_from), ("uploadDateTo", &self.upload_date_to)]
		{
			if let Some(raw) = value
				&& !raw.trim().is_empty()
				&& filters::parse_iso_date(raw).is_none()
			{
				invalid.push(field.to_string());
			}
		}

		if !invalid.is_empty() {
			return Err(json_error(
				StatusCode::BAD_REQUEST,
				"INVALID_REQUEST",
				"Dates must be YYYY-MM-DD or RFC 3339 timestamps.",
				Some(invalid),
			));
		}

		let tags = self.tags.map(|raw| raw.split(',').map(|tag| tag.trim().to_string()).collect());

		Ok(SearchRequest {
			query: self.q,
			filters: RawFilters {
				category: self.category,
				duration: self.duration,
				min_duration: parse_int(self.min_duration.as_deref()),
				max_duration: parse_int(self.max_duration.as_deref()),
				upload_date_from: self.upload_date_from,
				upload_date_to: self.upload_date_to,
				resolution: self.resolution,
				tags,
			},
			sort: self.sort.as_deref().and_then(SortOption::parse),
			page: parse_int(self.page.as_deref()),
			page_size: parse_int(self.page_size.as_deref()),
			within: self.within,
		})
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
	#[serde(default)]
	pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
	pub removed: bool,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
	let request = params.into_request()?;
	let response = state.service.search(request).await?;

	Ok(Json(response))
}

async fn suggestions(
	State(state): State<AppState>,
	Query(params): Query<SuggestParams>,
) -> Result<Json<Suggestions>, ApiError> {
	let response = state.service.suggest(params.q.as_deref().unwrap_or_default()).await?;

	Ok(Json(response))
}

async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
	Ok(Json(state.service.categories().await?))
}

async fn popular_tags(
	State(state): State<AppState>,
	Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TagCount>>, ApiError> {
	Ok(Json(state.service.popular_tags(params.limit).await?))
}

async fn related(
	State(state): State<AppState>,
	Path(id): Path<i64>,
	Query(params): Query<LimitParams>,
) -> Result<Json<Vec<VideoView>>, ApiError> {
	Ok(Json(state.service.related(id, params.limit).await?))
}

async fn save_search(
	State(state): State<AppState>,
	Json(payload): Json<SaveSearchRequest>,
) -> Result<(StatusCode, Json<SavedSearch>), ApiError> {
	let saved = state.service.save_search(payload).await?;

	Ok((StatusCode::CREATED, Json(saved)))
}

async fn list_saved_searches(
	State(state): State<AppState>,
) -> Result<Json<Vec<SavedSearch>>, ApiError> {
	Ok(Json(state.service.list_saved_searches().await?))
}

async fn get_saved_search(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<SavedSearch>, ApiError> {
	Ok(Json(state.service.get_saved_search(id).await?))
}

async fn popular_searches(
	State(state): State<AppState>,
	Query(params): Query<LimitParams>,
) -> Result<Json<Vec<PopularQuery>>, ApiError> {
	Ok(Json(state.service.popular_searches(params.limit).await?))
}

async fn rebuild_index(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let report = state.service.rebuild_index().await?;

	Ok(Json(report))
}

async fn index_video(
	State(state): State<AppState>,
	Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
	state.service.index_video(id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn remove_video(
	State(state): State<AppState>,
	Path(id): Path<i64>,
) -> Result<Json<RemoveResponse>, ApiError> {
	let removed = state.service.remove_video(id).await?;

	Ok(Json(RemoveResponse { removed }))
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
	raw.and_then(|value| value.trim().parse().ok())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::Storage { message } => {
				tracing::error!(error = %message, "Request failed on the entity store.");

				json_error(
					StatusCode::SERVICE_UNAVAILABLE,
					"STORAGE_UNAVAILABLE",
					"The video catalog is temporarily unavailable.",
					None,
				)
			},
			Error::Engine { message } => {
				tracing::error!(error = %message, "Request failed on the search engine.");

				json_error(
					StatusCode::SERVICE_UNAVAILABLE,
					"SEARCH_ENGINE_UNAVAILABLE",
					"The search index is temporarily unavailable.",
					None,
				)
			},
			Error::Cache { message } => {
				tracing::error!(error = %message, "Request failed on the search cache.");

				json_error(
					StatusCode::SERVICE_UNAVAILABLE,
					"CACHE_UNAVAILABLE",
					"The search cache is temporarily unavailable.",
					None,
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn params_split_tags_and_ignore_unknown_sort() {
		let params = SearchParams {
			q: Some("react".to_string()),
			tags: Some("typescript, react,".to_string()),
			sort: Some("newest".to_string()),
			page: Some("two".to_string()),
			page_size: Some(" 5 ".to_string()),
			..Default::default()
		};
		let request = params.into_request().expect("Expected a valid request.");

		assert_eq!(
			request.filters.tags,
			Some(vec!["typescript".to_string(), "react".to_string(), String::new()])
		);
		assert_eq!(request.sort, None);
		assert_eq!(request.page, None);
		assert_eq!(request.page_size, Some(5));
	}

	#[test]
	fn params_reject_bad_dates() {
		let params = SearchParams {
			upload_date_from: Some("2024-13-01".to_string()),
			upload_date_to: Some("2024-02-01".to_string()),
			..Default::default()
		};
		let err = params.into_request().expect_err("Expected a rejected request.");

		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
		assert_eq!(err.fields, Some(vec!["uploadDateFrom".to_string()]));
	}
}
