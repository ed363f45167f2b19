pub mod filters;
pub mod pagination;
pub mod sort;

pub use filters::{DateRange, DurationBucket, DurationRange, NormalizedFilters, RawFilters};
pub use pagination::Pagination;
pub use sort::SortOption;
