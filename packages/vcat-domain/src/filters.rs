use serde::{Deserialize, Serialize};
use time::{
	Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
	format_description::well_known::Rfc3339, macros::format_description,
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub const SHORT_MAX_SECONDS: u32 = 5 * 60;
pub const MEDIUM_MAX_SECONDS: u32 = 20 * 60;
/// Largest duration the entity store can hold (`INTEGER` seconds).
pub const MAX_DURATION_SECONDS: u32 = i32::MAX as u32;

/// Filter input as received from callers. Every field is optional and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFilters {
	pub category: Option<String>,
	pub duration: Option<String>,
	pub min_duration: Option<i64>,
	pub max_duration: Option<i64>,
	pub upload_date_from: Option<String>,
	pub upload_date_to: Option<String>,
	pub resolution: Option<String>,
	pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBucket {
	Short,
	Medium,
	Long,
}
impl DurationBucket {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"short" => Some(Self::Short),
			"medium" => Some(Self::Medium),
			"long" => Some(Self::Long),
			_ => None,
		}
	}

	pub fn range(self) -> DurationRange {
		match self {
			Self::Short => DurationRange { min: Some(0), max: Some(SHORT_MAX_SECONDS) },
			Self::Medium =>
				DurationRange { min: Some(SHORT_MAX_SECONDS), max: Some(MEDIUM_MAX_SECONDS) },
			Self::Long => DurationRange { min: Some(MEDIUM_MAX_SECONDS), max: None },
		}
	}
}

/// Half-open duration interval in seconds: `min` is inclusive, `max` is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationRange {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max: Option<u32>,
}
impl DurationRange {
	pub fn is_unbounded(&self) -> bool {
		self.min.is_none() && self.max.is_none()
	}

	/// True when no duration can satisfy the range.
	pub fn is_empty(&self) -> bool {
		matches!((self.min, self.max), (Some(min), Some(max)) if min >= max)
	}

	pub fn intersect(self, other: Self) -> Self {
		let min = match (self.min, other.min) {
			(Some(a), Some(b)) => Some(a.max(b)),
			(a, b) => a.or(b),
		};
		let max = match (self.max, other.max) {
			(Some(a), Some(b)) => Some(a.min(b)),
			(a, b) => a.or(b),
		};

		Self { min, max }
	}

	pub fn contains(&self, seconds: u32) -> bool {
		self.min.map(|min| seconds >= min).unwrap_or(true)
			&& self.max.map(|max| seconds < max).unwrap_or(true)
	}
}

/// Inclusive calendar-day range on the upload date, interpreted in UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
	#[serde(with = "iso_date::option", skip_serializing_if = "Option::is_none")]
	pub from: Option<Date>,
	#[serde(with = "iso_date::option", skip_serializing_if = "Option::is_none")]
	pub to: Option<Date>,
}
impl DateRange {
	pub fn is_unbounded(&self) -> bool {
		self.from.is_none() && self.to.is_none()
	}

	/// Timestamp bounds shared by every query path: `[from 00:00Z, (to + 1 day) 00:00Z)`.
	/// A `to` on the last representable day leaves the range open above.
	pub fn bounds(&self) -> (Option<OffsetDateTime>, Option<OffsetDateTime>) {
		let lower = self.from.map(start_of_day);
		let upper = self.to.and_then(|to| start_of_day(to).checked_add(Duration::days(1)));

		(lower, upper)
	}

	pub fn contains(&self, ts: OffsetDateTime) -> bool {
		let (lower, upper) = self.bounds();

		lower.map(|lower| ts >= lower).unwrap_or(true)
			&& upper.map(|upper| ts < upper).unwrap_or(true)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedFilters {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolution: Option<String>,
	#[serde(skip_serializing_if = "DurationRange::is_unbounded")]
	pub duration: DurationRange,
	#[serde(skip_serializing_if = "DateRange::is_unbounded")]
	pub upload_date: DateRange,
	/// Sorted and deduplicated; a video matches when it carries any of these tags.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,
}
impl NormalizedFilters {
	pub fn is_empty(&self) -> bool {
		self.category.is_none()
			&& self.resolution.is_none()
			&& self.duration.is_unbounded()
			&& self.upload_date.is_unbounded()
			&& self.tags.is_empty()
	}
}

pub fn normalize(raw: &RawFilters) -> NormalizedFilters {
	let bucket_range = raw
		.duration
		.as_deref()
		.and_then(DurationBucket::parse)
		.map(DurationBucket::range)
		.unwrap_or_default();
	let explicit_range = DurationRange {
		min: raw.min_duration.and_then(non_negative_seconds),
		max: raw
			.max_duration
			.and_then(non_negative_seconds)
			.filter(|max| *max < MAX_DURATION_SECONDS)
			.map(|max| max + 1),
	};

	NormalizedFilters {
		category: clean_text(raw.category.as_deref()),
		resolution: clean_text(raw.resolution.as_deref()),
		duration: bucket_range.intersect(explicit_range),
		upload_date: DateRange {
			from: raw.upload_date_from.as_deref().and_then(parse_iso_date),
			to: raw.upload_date_to.as_deref().and_then(parse_iso_date),
		},
		tags: normalize_tags(raw.tags.as_deref().unwrap_or_default()),
	}
}

/// Trims, drops blanks, and deduplicates. Case is preserved; output is sorted.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
	let mut out: Vec<String> = tags
		.iter()
		.map(|tag| tag.trim())
		.filter(|tag| !tag.is_empty())
		.map(str::to_string)
		.collect();

	out.sort();
	out.dedup();

	out
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its UTC date is used).
pub fn parse_iso_date(raw: &str) -> Option<Date> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return None;
	}
	if let Ok(date) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
		return Some(date);
	}

	OffsetDateTime::parse(trimmed, &Rfc3339).ok().map(|ts| ts.to_offset(UtcOffset::UTC).date())
}

fn start_of_day(date: Date) -> OffsetDateTime {
	PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc()
}

fn non_negative_seconds(value: i64) -> Option<u32> {
	if value < 0 {
		return None;
	}

	Some(u32::try_from(value).unwrap_or(u32::MAX).min(MAX_DURATION_SECONDS))
}

fn clean_text(raw: Option<&str>) -> Option<String> {
	raw.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
