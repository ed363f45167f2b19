use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOption {
	#[default]
	Relevance,
	UploadDate,
	ViewCount,
	Duration,
}
impl SortOption {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Relevance => "relevance",
			Self::UploadDate => "uploadDate",
			Self::ViewCount => "viewCount",
			Self::Duration => "duration",
		}
	}

	/// Lenient parse used at request boundaries: unknown names yield `None`.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"relevance" => Some(Self::Relevance),
			"uploadDate" => Some(Self::UploadDate),
			"viewCount" => Some(Self::ViewCount),
			"duration" => Some(Self::Duration),
			_ => None,
		}
	}
}
