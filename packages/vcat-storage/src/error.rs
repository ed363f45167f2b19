#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error("Search engine returned {status}: {body}")]
	Engine { status: u16, body: String },
	#[error("Invalid search engine response: {0}")]
	InvalidResponse(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
}
impl Error {
	/// True for failures of the search engine rather than the relational store.
	pub fn is_engine(&self) -> bool {
		matches!(self, Self::Http(_) | Self::Engine { .. } | Self::InvalidResponse(_))
	}
}
