use serde_json::{Map, Value};
use time::OffsetDateTime;

pub const HIGHLIGHT_PRE_TAG: &str = "<mark>";
pub const HIGHLIGHT_POST_TAG: &str = "</mark>";

/// A typed bool query: `must` text clauses (or `match_all` when empty) plus non-scoring filters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
	pub must: Vec<TextClause>,
	pub filter: Vec<FilterClause>,
	pub sort: Vec<EngineSort>,
	pub highlight: Option<Highlight>,
	pub from: u64,
	pub size: u64,
	pub track_total_hits: bool,
}
impl EngineQuery {
	pub fn to_body(&self) -> Value {
		let must = if self.must.is_empty() {
			vec![serde_json::json!({ "match_all": {} })]
		} else {
			self.must.iter().map(TextClause::to_value).collect()
		};
		let filter: Vec<Value> = self.filter.iter().map(FilterClause::to_value).collect();
		let mut body = Map::new();

		body.insert("from".to_string(), Value::from(self.from));
		body.insert("size".to_string(), Value::from(self.size));
		body.insert("track_total_hits".to_string(), Value::Bool(self.track_total_hits));
		body.insert(
			"query".to_string(),
			serde_json::json!({ "bool": { "must": must, "filter": filter } }),
		);

		if !self.sort.is_empty() {
			body.insert(
				"sort".to_string(),
				Value::Array(self.sort.iter().map(EngineSort::to_value).collect()),
			);
		}
		if let Some(highlight) = &self.highlight {
			body.insert("highlight".to_string(), highlight.to_value());
		}

		Value::Object(body)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
	And,
	Or,
}
impl Operator {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::And => "and",
			Self::Or => "or",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoostedField {
	pub name: String,
	pub boost: Option<f32>,
}
impl BoostedField {
	pub fn new(name: &str, boost: Option<f32>) -> Self {
		Self { name: name.to_string(), boost }
	}

	fn render(&self) -> String {
		match self.boost {
			Some(boost) => format!("{}^{boost}", self.name),
			None => self.name.clone(),
		}
	}
}

/// Fuzzy `best_fields` multi-match.
#[derive(Debug, Clone, PartialEq)]
pub struct TextClause {
	pub query: String,
	pub fields: Vec<BoostedField>,
	pub operator: Operator,
	/// Rendered as `fuzziness: AUTO` when set.
	pub fuzzy: bool,
}
impl TextClause {
	fn to_value(&self) -> Value {
		let fields: Vec<String> = self.fields.iter().map(BoostedField::render).collect();
		let mut multi_match = serde_json::json!({
			"query": self.query,
			"type": "best_fields",
			"fields": fields,
			"operator": self.operator.as_str(),
		});

		if self.fuzzy {
			multi_match["fuzziness"] = Value::from("AUTO");
		}

		serde_json::json!({ "multi_match": multi_match })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeValue {
	Int(i64),
	/// Sent as epoch milliseconds, which the default date format accepts.
	Timestamp(OffsetDateTime),
}
impl RangeValue {
	fn to_value(self) -> Value {
		match self {
			Self::Int(value) => Value::from(value),
			Self::Timestamp(ts) => Value::from(epoch_millis(ts)),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
	Term { field: String, value: String },
	/// Matches documents carrying any of the values.
	Terms { field: String, values: Vec<String> },
	/// `gte` is inclusive and `lt` exclusive.
	Range { field: String, gte: Option<RangeValue>, lt: Option<RangeValue> },
}
impl FilterClause {
	fn to_value(&self) -> Value {
		match self {
			Self::Term { field, value } => serde_json::json!({ "term": { field: value } }),
			Self::Terms { field, values } => serde_json::json!({ "terms": { field: values } }),
			Self::Range { field, gte, lt } => {
				let mut bounds = Map::new();

				if let Some(gte) = gte {
					bounds.insert("gte".to_string(), gte.to_value());
				}
				if let Some(lt) = lt {
					bounds.insert("lt".to_string(), lt.to_value());
				}

				serde_json::json!({ "range": { field: bounds } })
			},
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
	Asc,
	Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineSort {
	Score,
	Field { field: String, order: SortOrder },
}
impl EngineSort {
	fn to_value(&self) -> Value {
		match self {
			Self::Score => Value::from("_score"),
			Self::Field { field, order } => {
				let order = match order {
					SortOrder::Asc => "asc",
					SortOrder::Desc => "desc",
				};

				serde_json::json!({ field: { "order": order } })
			},
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
	pub fields: Vec<String>,
	pub pre_tag: String,
	pub post_tag: String,
}
impl Highlight {
	pub fn marked(fields: &[&str]) -> Self {
		Self {
			fields: fields.iter().map(|field| field.to_string()).collect(),
			pre_tag: HIGHLIGHT_PRE_TAG.to_string(),
			post_tag: HIGHLIGHT_POST_TAG.to_string(),
		}
	}

	fn to_value(&self) -> Value {
		let fields: Map<String, Value> =
			self.fields.iter().map(|field| (field.clone(), serde_json::json!({}))).collect();

		serde_json::json!({
			"pre_tags": [self.pre_tag],
			"post_tags": [self.post_tag],
			"fields": fields,
		})
	}
}

pub fn epoch_millis(ts: OffsetDateTime) -> i64 {
	(ts.unix_timestamp_nanos() / 1_000_000) as i64
}
