pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Search engine error: {message}")]
	Engine { message: String },
	#[error("Cache error: {message}")]
	Cache { message: String },
}
impl From<vcat_storage::Error> for Error {
	fn from(err: vcat_storage::Error) -> Self {
		if err.is_engine() {
			return Self::Engine { message: err.to_string() };
		}

		match err {
			vcat_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			vcat_storage::Error::NotFound(message) => Self::NotFound { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
