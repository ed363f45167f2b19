use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	pub page: u32,
	pub page_size: u32,
}
impl Pagination {
	/// Clamps raw input into `page >= 1` and `1 <= page_size <= max_page_size`.
	pub fn clamp(
		page: Option<i64>,
		page_size: Option<i64>,
		default_page_size: u32,
		max_page_size: u32,
	) -> Self {
		let max_page_size = max_page_size.clamp(1, MAX_PAGE_SIZE);
		let default_page_size = default_page_size.clamp(1, max_page_size);
		let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
		let page_size = page_size
			.unwrap_or(i64::from(default_page_size))
			.clamp(1, i64::from(max_page_size)) as u32;

		Self { page, page_size }
	}

	pub fn offset(&self) -> u64 {
		u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
	}

	pub fn limit(&self) -> u64 {
		u64::from(self.page_size)
	}
}
impl Default for Pagination {
	fn default() -> Self {
		Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
	}
}
