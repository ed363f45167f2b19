//! In-memory collaborators for service and HTTP tests. Each fake can be switched into a failing
//! state and counts the calls that matter to the orchestration tests.

use std::{
	cmp::Ordering as CmpOrdering,
	collections::{BTreeMap, BTreeSet, HashMap},
	sync::{
		Arc, Mutex, MutexGuard,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::{Duration, Instant},
};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use vcat_service::{
	Backends, BoxFuture, Error, FilterSnapshot, PopularQuery, Result, SavedSearch, SearchCache,
	SearchEngine, SearchHistoryEntry, SearchHistoryStore, VideoStore,
};
use vcat_storage::{
	engine::{
		EngineHit, EngineQuery, EngineSearchResult, EngineSort, FilterClause, Highlight, Operator,
		RangeValue, SortOrder, TextClause, VideoDocument,
	},
	models::{TagCountRow, VideoRecord},
	predicate::VideoPredicate,
	videos::DistinctField,
};

/// All four fakes, sharing one seed of videos.
#[derive(Clone)]
pub struct MemoryBackends {
	pub videos: Arc<MemoryVideoStore>,
	pub engine: Arc<MemoryEngine>,
	pub cache: Arc<MemoryCache>,
	pub history: Arc<MemoryHistory>,
}
impl MemoryBackends {
	pub fn backends(&self) -> Backends {
		Backends::new(
			self.videos.clone(),
			self.engine.clone(),
			self.cache.clone(),
			self.history.clone(),
		)
	}
}

/// Seeds both the store and the engine with `videos`.
pub fn memory_backends(videos: Vec<VideoRecord>) -> MemoryBackends {
	let engine = MemoryEngine::default();

	for video in &videos {
		engine.insert(VideoDocument::from(video));
	}

	MemoryBackends {
		videos: Arc::new(MemoryVideoStore::new(videos)),
		engine: Arc::new(engine),
		cache: Arc::new(MemoryCache::default()),
		history: Arc::new(MemoryHistory::default()),
	}
}

#[derive(Default)]
pub struct MemoryVideoStore {
	rows: Mutex<BTreeMap<i64, VideoRecord>>,
	failing: AtomicBool,
	bulk_reads: AtomicUsize,
	predicate_queries: AtomicUsize,
}
impl MemoryVideoStore {
	pub fn new(videos: Vec<VideoRecord>) -> Self {
		let store = Self::default();

		for video in videos {
			store.insert(video);
		}

		store
	}

	pub fn insert(&self, video: VideoRecord) {
		lock(&self.rows).insert(video.video_id, video);
	}

	pub fn remove(&self, id: i64) -> Option<VideoRecord> {
		lock(&self.rows).remove(&id)
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	/// Calls to `get_by_ids`.
	pub fn bulk_reads(&self) -> usize {
		self.bulk_reads.load(Ordering::SeqCst)
	}

	/// Calls to `count_matching` and `find_matching`.
	pub fn predicate_queries(&self) -> usize {
		self.predicate_queries.load(Ordering::SeqCst)
	}

	fn check(&self) -> Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::Storage { message: "Entity store is unavailable.".to_string() });
		}

		Ok(())
	}

	fn matching(&self, predicate: &VideoPredicate) -> Vec<VideoRecord> {
		let mut rows: Vec<VideoRecord> =
			lock(&self.rows).values().filter(|row| predicate.matches(row)).cloned().collect();

		rows.sort_by(|a, b| {
			b.upload_date.cmp(&a.upload_date).then_with(|| b.video_id.cmp(&a.video_id))
		});

		rows
	}
}
impl VideoStore for MemoryVideoStore {
	fn get_by_ids<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<VideoRecord>>> {
		Box::pin(async move {
			self.bulk_reads.fetch_add(1, Ordering::SeqCst);
			self.check()?;

			let rows = lock(&self.rows);
			let wanted: BTreeSet<i64> = ids.iter().copied().collect();

			// Reverse id order so callers cannot rely on the input order.
			Ok(wanted.into_iter().rev().filter_map(|id| rows.get(&id).cloned()).collect())
		})
	}

	fn get_by_id(&self, id: i64) -> BoxFuture<'_, Result<Option<VideoRecord>>> {
		Box::pin(async move {
			self.check()?;

			Ok(lock(&self.rows).get(&id).cloned())
		})
	}

	fn list_distinct(&self, field: DistinctField) -> BoxFuture<'_, Result<Vec<String>>> {
		Box::pin(async move {
			self.check()?;

			let rows = lock(&self.rows);
			let values: BTreeSet<String> = match field {
				DistinctField::Category => rows.values().map(|row| row.category.clone()).collect(),
				DistinctField::Resolution =>
					rows.values().map(|row| row.resolution.clone()).collect(),
				DistinctField::Tag => rows.values().flat_map(|row| row.tags.clone()).collect(),
			};

			Ok(values.into_iter().collect())
		})
	}

	fn popular_tags(&self, limit: u32) -> BoxFuture<'_, Result<Vec<TagCountRow>>> {
		Box::pin(async move {
			self.check()?;

			let mut counts: BTreeMap<String, i64> = BTreeMap::new();

			for tag in lock(&self.rows).values().flat_map(|row| row.tags.iter()) {
				*counts.entry(tag.clone()).or_default() += 1;
			}

			let mut tags: Vec<TagCountRow> =
				counts.into_iter().map(|(name, count)| TagCountRow { name, count }).collect();

			// Stable sort keeps the name order among equal counts.
			tags.sort_by(|a, b| b.count.cmp(&a.count));
			tags.truncate(limit as usize);

			Ok(tags)
		})
	}

	fn count_matching<'a>(&'a self, predicate: &'a VideoPredicate) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.predicate_queries.fetch_add(1, Ordering::SeqCst);
			self.check()?;

			Ok(self.matching(predicate).len() as u64)
		})
	}

	fn find_matching<'a>(
		&'a self,
		predicate: &'a VideoPredicate,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<VideoRecord>>> {
		Box::pin(async move {
			self.predicate_queries.fetch_add(1, Ordering::SeqCst);
			self.check()?;

			Ok(self
				.matching(predicate)
				.into_iter()
				.skip(offset as usize)
				.take(limit as usize)
				.collect())
		})
	}

	fn list_ids_after(&self, after: Option<i64>, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move {
			self.check()?;

			Ok(lock(&self.rows)
				.keys()
				.copied()
				.filter(|id| after.map(|after| *id > after).unwrap_or(true))
				.take(limit as usize)
				.collect())
		})
	}
}

/// Evaluates engine queries over in-memory documents: fuzzy `best_fields` text matching, filter
/// clauses, sorting, and `<mark>` highlights.
#[derive(Default)]
pub struct MemoryEngine {
	docs: Mutex<BTreeMap<i64, VideoDocument>>,
	failing: AtomicBool,
	searches: AtomicUsize,
	last_query: Mutex<Option<EngineQuery>>,
}
impl MemoryEngine {
	pub fn insert(&self, doc: VideoDocument) {
		lock(&self.docs).insert(doc.id, doc);
	}

	pub fn document(&self, id: i64) -> Option<VideoDocument> {
		lock(&self.docs).get(&id).cloned()
	}

	pub fn len(&self) -> usize {
		lock(&self.docs).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn searches(&self) -> usize {
		self.searches.load(Ordering::SeqCst)
	}

	pub fn last_query(&self) -> Option<EngineQuery> {
		lock(&self.last_query).clone()
	}

	fn check(&self) -> Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::Engine { message: "Search engine is unreachable.".to_string() });
		}

		Ok(())
	}

	fn evaluate(&self, query: &EngineQuery) -> EngineSearchResult {
		let docs = lock(&self.docs);
		let mut matched: Vec<(&VideoDocument, f32)> = docs
			.values()
			.filter(|doc| query.filter.iter().all(|clause| filter_matches(clause, doc)))
			.filter_map(|doc| {
				let mut score = 0.0;

				for clause in &query.must {
					score += text_score(clause, doc)?;
				}

				Some((doc, if query.must.is_empty() { 1.0 } else { score }))
			})
			.collect();

		matched.sort_by(|a, b| compare_hits(&query.sort, a, b));

		let total = matched.len() as u64;
		let scored = query.sort.iter().any(|sort| matches!(sort, EngineSort::Score));
		let hits = matched
			.into_iter()
			.skip(query.from as usize)
			.take(query.size as usize)
			.map(|(doc, score)| EngineHit {
				id: doc.id,
				score: scored.then_some(score),
				highlights: query
					.highlight
					.as_ref()
					.map(|highlight| highlights(highlight, &query.must, doc))
					.unwrap_or_default(),
			})
			.collect();

		EngineSearchResult { hits, total, took_ms: Some(1) }
	}
}
impl SearchEngine for MemoryEngine {
	fn ensure_index(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move {
			self.check()?;

			Ok(false)
		})
	}

	fn index_document<'a>(&'a self, doc: &'a VideoDocument) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.check()?;
			self.insert(doc.clone());

			Ok(())
		})
	}

	fn delete_document(&self, id: i64) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move {
			self.check()?;

			Ok(lock(&self.docs).remove(&id).is_some())
		})
	}

	fn search<'a>(&'a self, query: &'a EngineQuery) -> BoxFuture<'a, Result<EngineSearchResult>> {
		Box::pin(async move {
			self.searches.fetch_add(1, Ordering::SeqCst);
			*lock(&self.last_query) = Some(query.clone());
			self.check()?;

			Ok(self.evaluate(query))
		})
	}

	fn suggest_tags<'a>(
		&'a self,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			self.check()?;

			let terms = tokenize(prefix);
			let docs = lock(&self.docs);
			let mut counts: BTreeMap<String, usize> = BTreeMap::new();

			for doc in docs.values() {
				let mut tokens = tokenize(&doc.title);

				tokens.extend(tokenize(&doc.uploader_name));
				tokens.extend(doc.tags.iter().map(|tag| tag.to_lowercase()));

				let Some((last, rest)) = terms.split_last() else {
					continue;
				};
				let prefix_hit = tokens.iter().any(|token| token.starts_with(last.as_str()));
				let rest_hit = rest.iter().all(|term| tokens.contains(term));

				if prefix_hit && rest_hit {
					for tag in &doc.tags {
						*counts.entry(tag.clone()).or_default() += 1;
					}
				}
			}

			let mut buckets: Vec<(String, usize)> = counts.into_iter().collect();

			buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

			Ok(buckets.into_iter().take(limit as usize).map(|(tag, _)| tag).collect())
		})
	}

	fn more_like_this(&self, id: i64, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move {
			self.check()?;

			let docs = lock(&self.docs);
			let Some(source) = docs.get(&id) else {
				return Ok(Vec::new());
			};
			let source_terms = similarity_terms(source);
			let mut scored: Vec<(i64, usize)> = docs
				.values()
				.filter(|doc| doc.id != id)
				.map(|doc| (doc.id, similarity_terms(doc).intersection(&source_terms).count()))
				.filter(|(_, shared)| *shared > 0)
				.collect();

			scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

			Ok(scored.into_iter().take(limit as usize).map(|(id, _)| id).collect())
		})
	}
}

/// TTL-aware map cache.
#[derive(Default)]
pub struct MemoryCache {
	entries: Mutex<HashMap<String, (Value, Instant)>>,
	failing: AtomicBool,
	reads: AtomicUsize,
	writes: AtomicUsize,
}
impl MemoryCache {
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}

	/// Successful writes.
	pub fn writes(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}

	pub fn len(&self) -> usize {
		lock(&self.entries).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn keys(&self) -> Vec<String> {
		lock(&self.entries).keys().cloned().collect()
	}

	fn check(&self) -> Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::Cache { message: "Cache is unreachable.".to_string() });
		}

		Ok(())
	}
}
impl SearchCache for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move {
			self.reads.fetch_add(1, Ordering::SeqCst);
			self.check()?;

			let mut entries = lock(&self.entries);
			let expired = matches!(
				entries.get(key),
				Some((_, expires_at)) if *expires_at <= Instant::now()
			);

			if expired {
				entries.remove(key);

				return Ok(None);
			}

			Ok(entries.get(key).map(|(value, _)| value.clone()))
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a Value,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.check()?;

			let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);

			lock(&self.entries).insert(key.to_string(), (value.clone(), expires_at));
			self.writes.fetch_add(1, Ordering::SeqCst);

			Ok(())
		})
	}
}

#[derive(Default)]
pub struct MemoryHistory {
	entries: Mutex<Vec<SearchHistoryEntry>>,
	saved: Mutex<Vec<SavedSearch>>,
	failing: AtomicBool,
}
impl MemoryHistory {
	pub fn entries(&self) -> Vec<SearchHistoryEntry> {
		lock(&self.entries).clone()
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	fn check(&self) -> Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::Storage { message: "History store is unavailable.".to_string() });
		}

		Ok(())
	}
}
impl SearchHistoryStore for MemoryHistory {
	fn record<'a>(&'a self, entry: &'a SearchHistoryEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.check()?;
			lock(&self.entries).push(entry.clone());

			Ok(())
		})
	}

	fn popular(&self, limit: u32) -> BoxFuture<'_, Result<Vec<PopularQuery>>> {
		Box::pin(async move {
			self.check()?;

			let entries = lock(&self.entries);
			// query -> (count, first position)
			let mut groups: HashMap<&str, (u64, usize)> = HashMap::new();

			for (position, entry) in entries.iter().enumerate() {
				if entry.query.is_empty() {
					continue;
				}

				groups.entry(entry.query.as_str()).or_insert((0, position)).0 += 1;
			}

			let mut ranked: Vec<(&str, u64, usize)> =
				groups.into_iter().map(|(query, (count, first))| (query, count, first)).collect();

			ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(b.0)));

			Ok(ranked
				.into_iter()
				.take(limit as usize)
				.map(|(query, count, _)| PopularQuery { query: query.to_string(), count })
				.collect())
		})
	}

	fn save<'a>(
		&'a self,
		name: &'a str,
		query: &'a str,
		filters: &'a FilterSnapshot,
	) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move {
			self.check()?;

			let now = OffsetDateTime::now_utc();
			let saved = SavedSearch {
				id: Uuid::new_v4(),
				name: name.to_string(),
				query: query.to_string(),
				filters: filters.clone(),
				created_at: now,
				updated_at: now,
			};

			lock(&self.saved).push(saved.clone());

			Ok(saved)
		})
	}

	fn list_saved(&self) -> BoxFuture<'_, Result<Vec<SavedSearch>>> {
		Box::pin(async move {
			self.check()?;

			// Insertion order breaks ties between identical timestamps.
			let mut saved: Vec<(usize, SavedSearch)> =
				lock(&self.saved).iter().cloned().enumerate().collect();

			saved.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at).then(b.0.cmp(&a.0)));

			Ok(saved.into_iter().map(|(_, saved)| saved).collect())
		})
	}

	fn get_saved(&self, id: Uuid) -> BoxFuture<'_, Result<Option<SavedSearch>>> {
		Box::pin(async move {
			self.check()?;

			Ok(lock(&self.saved).iter().find(|saved| saved.id == id).cloned())
		})
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}

fn tokenize(text: &str) -> Vec<String> {
	text.split(|ch: char| !ch.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_lowercase)
		.collect()
}

fn field_tokens(doc: &VideoDocument, field: &str) -> Vec<String> {
	match field {
		"title" => tokenize(&doc.title),
		"description" => tokenize(&doc.description),
		"uploader_name" => tokenize(&doc.uploader_name),
		"tags" => doc.tags.iter().map(|tag| tag.to_lowercase()).collect(),
		_ => Vec::new(),
	}
}

fn term_matches(term: &str, token: &str, fuzzy: bool) -> bool {
	if term == token {
		return true;
	}
	if !fuzzy {
		return false;
	}

	let allowed = match term.chars().count() {
		0..=2 => 0,
		3..=5 => 1,
		_ => 2,
	};

	allowed > 0 && levenshtein(term, token) <= allowed
}

/// `best_fields`: the best single field decides, and `and` needs every term in that field.
fn text_score(clause: &TextClause, doc: &VideoDocument) -> Option<f32> {
	let terms = tokenize(&clause.query);

	if terms.is_empty() {
		return Some(0.0);
	}

	clause
		.fields
		.iter()
		.filter_map(|field| {
			let tokens = field_tokens(doc, &field.name);
			let matched = terms
				.iter()
				.filter(|term| tokens.iter().any(|token| term_matches(term, token, clause.fuzzy)))
				.count();
			let ok = match clause.operator {
				Operator::And => matched == terms.len(),
				Operator::Or => matched > 0,
			};

			ok.then(|| matched as f32 * field.boost.unwrap_or(1.0))
		})
		.max_by(|a, b| a.partial_cmp(b).unwrap_or(CmpOrdering::Equal))
}

fn range_value(value: RangeValue) -> i64 {
	match value {
		RangeValue::Int(value) => value,
		RangeValue::Timestamp(ts) => vcat_storage::engine::query::epoch_millis(ts),
	}
}

fn numeric_field(doc: &VideoDocument, field: &str) -> Option<i64> {
	match field {
		"id" => Some(doc.id),
		"duration" => Some(i64::from(doc.duration)),
		"upload_date" => Some(doc.upload_date),
		"view_count" => Some(doc.view_count),
		_ => None,
	}
}

fn filter_matches(clause: &FilterClause, doc: &VideoDocument) -> bool {
	match clause {
		FilterClause::Term { field, value } => match field.as_str() {
			"category" => &doc.category == value,
			"resolution" => &doc.resolution == value,
			"tags" => doc.tags.contains(value),
			_ => false,
		},
		FilterClause::Terms { field, values } =>
			field == "tags" && doc.tags.iter().any(|tag| values.contains(tag)),
		FilterClause::Range { field, gte, lt } => {
			let Some(value) = numeric_field(doc, field) else {
				return false;
			};

			gte.map(|gte| value >= range_value(gte)).unwrap_or(true)
				&& lt.map(|lt| value < range_value(lt)).unwrap_or(true)
		},
	}
}

fn compare_hits(
	sort: &[EngineSort],
	a: &(&VideoDocument, f32),
	b: &(&VideoDocument, f32),
) -> CmpOrdering {
	for key in sort {
		let ordering = match key {
			EngineSort::Score => b.1.partial_cmp(&a.1).unwrap_or(CmpOrdering::Equal),
			EngineSort::Field { field, order } => {
				let ordering = numeric_field(a.0, field).cmp(&numeric_field(b.0, field));

				match order {
					SortOrder::Asc => ordering,
					SortOrder::Desc => ordering.reverse(),
				}
			},
		};

		if ordering != CmpOrdering::Equal {
			return ordering;
		}
	}

	a.0.id.cmp(&b.0.id)
}

fn highlights(
	highlight: &Highlight,
	clauses: &[TextClause],
	doc: &VideoDocument,
) -> BTreeMap<String, Vec<String>> {
	let terms: Vec<(String, bool)> = clauses
		.iter()
		.flat_map(|clause| tokenize(&clause.query).into_iter().map(move |term| (term, clause.fuzzy)))
		.collect();
	let is_hit = |word: &str| {
		let word = word.to_lowercase();

		terms.iter().any(|(term, fuzzy)| term_matches(term, &word, *fuzzy))
	};
	let mark = |word: &str| format!("{}{word}{}", highlight.pre_tag, highlight.post_tag);
	let mut out = BTreeMap::new();

	for field in &highlight.fields {
		let fragments: Vec<String> = match field.as_str() {
			"tags" => doc.tags.iter().filter(|tag| is_hit(tag)).map(|tag| mark(tag)).collect(),
			"title" | "description" | "uploader_name" => {
				let text = match field.as_str() {
					"title" => &doc.title,
					"description" => &doc.description,
					_ => &doc.uploader_name,
				};
				let mut any = false;
				let marked: Vec<String> = text
					.split(' ')
					.map(|word| {
						let bare = word.trim_matches(|ch: char| !ch.is_alphanumeric());

						if !bare.is_empty() && is_hit(bare) {
							any = true;

							word.replacen(bare, &mark(bare), 1)
						} else {
							word.to_string()
						}
					})
					.collect();

				if any { vec![marked.join(" ")] } else { Vec::new() }
			},
			_ => Vec::new(),
		};

		if !fragments.is_empty() {
			out.insert(field.clone(), fragments);
		}
	}

	out
}

fn similarity_terms(doc: &VideoDocument) -> BTreeSet<String> {
	let mut terms: BTreeSet<String> = tokenize(&doc.title).into_iter().collect();

	terms.extend(tokenize(&doc.description));
	terms.extend(doc.tags.iter().map(|tag| tag.to_lowercase()));

	terms.retain(|term| term.chars().count() > 3);

	terms
}

fn levenshtein(a: &str, b: &str) -> usize {
	let b: Vec<char> = b.chars().collect();
	let mut prev: Vec<usize> = (0..=b.len()).collect();

	for (i, ca) in a.chars().enumerate() {
		let mut current = vec![i + 1; b.len() + 1];

		for (j, cb) in b.iter().enumerate() {
			let cost = usize::from(ca != *cb);

			current[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(current[j] + 1);
		}

		prev = current;
	}

	prev[b.len()]
}
