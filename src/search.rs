//! Query-driven, page-numbered search over the media providers.
//!
//! A search session is identified by its (query, kind, filters) tuple.
//! Changing any part of the tuple discards the session wholesale; responses
//! for a superseded session are detected at completion time by comparing
//! the key captured at request time, never by a bare flag.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api;
use crate::error::Result;
use crate::http::ApiClient;
use crate::media::{MediaItem, MediaKind};
use crate::normalize::normalize;
use crate::providers::ImageProvider;

/// Image-only refinements. Video search ignores all of these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub orientation: Option<String>,
    pub color: Option<String>,
    pub min_width: Option<u32>,
}

/// Identity of one logical search stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub query: String,
    pub kind: MediaKind,
    pub filters: SearchFilters,
}

impl SessionKey {
    pub fn new(query: &str, kind: MediaKind, filters: SearchFilters) -> Self {
        Self { query: norm_query(query), kind, filters }
    }
}

/// What a page load did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Items landed; `added` counts new (deduplicated, renderable) entries.
    Appended { added: usize },
    /// The first page came back empty: a user-facing "no matches", not an
    /// error.
    NoMatches,
    /// The previous page was short, so there is nothing further to fetch.
    Exhausted,
    /// No session is active (empty query).
    EmptyQuery,
    /// Another page request is already outstanding.
    Busy,
    /// The response arrived for a session that is no longer current and
    /// was discarded.
    Stale,
}

/// One provider-facing page fetch. Implementations return raw payload
/// entries; the engine normalizes and accumulates them.
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn fetch_page(&self, key: &SessionKey, page: u32, per_page: u32) -> Result<Vec<Value>>;
}

/// Image search against the image provider, filters included when set.
pub struct ImageSearchSource {
    provider: Arc<ImageProvider>,
}

impl ImageSearchSource {
    pub fn new(provider: Arc<ImageProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SearchSource for ImageSearchSource {
    async fn fetch_page(&self, key: &SessionKey, page: u32, per_page: u32) -> Result<Vec<Value>> {
        self.provider
            .search_photos(
                &key.query,
                page,
                per_page,
                key.filters.orientation.as_deref(),
                key.filters.color.as_deref(),
                key.filters.min_width,
            )
            .await
    }
}

/// Video search through the backend proxy. Filters never apply here.
pub struct BackendVideoSource {
    api: ApiClient,
}

impl BackendVideoSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SearchSource for BackendVideoSource {
    async fn fetch_page(&self, key: &SessionKey, page: u32, per_page: u32) -> Result<Vec<Value>> {
        api::search_videos(&self.api, &key.query, page, per_page).await
    }
}

struct EngineState {
    key: Option<SessionKey>,
    next_page: u32,
    items: Vec<MediaItem>,
    seen_ids: HashSet<String>,
    has_more: bool,
}

impl EngineState {
    fn fresh(key: Option<SessionKey>) -> Self {
        let has_more = key.is_some();
        Self { key, next_page: 1, items: Vec::new(), seen_ids: HashSet::new(), has_more }
    }
}

/// Accumulating, infinite-scroll-shaped search driver.
///
/// Pagination is monotonic with at most one outstanding page request; the
/// continuation is expected to be driven by the caller's end-of-list
/// signal (last rendered item becoming visible).
pub struct SearchEngine {
    image_source: Arc<dyn SearchSource>,
    video_source: Arc<dyn SearchSource>,
    page_size: u32,
    state: Mutex<EngineState>,
    in_flight: AtomicBool,
}

impl SearchEngine {
    pub fn new(
        image_source: Arc<dyn SearchSource>,
        video_source: Arc<dyn SearchSource>,
        page_size: u32,
    ) -> Self {
        Self {
            image_source,
            video_source,
            page_size,
            state: Mutex::new(EngineState::fresh(None)),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Start (or restart) a session. A key equal to the current one is a
    /// no-op so repeated submissions of the same settled query don't wipe
    /// accumulated results. An empty query clears the session.
    pub fn begin(&self, query: &str, kind: MediaKind, filters: SearchFilters) {
        let query = norm_query(query);
        let mut st = self.lock_state();
        if query.is_empty() {
            *st = EngineState::fresh(None);
            return;
        }
        let key = SessionKey { query, kind, filters };
        if st.key.as_ref() == Some(&key) {
            return;
        }
        *st = EngineState::fresh(Some(key));
    }

    /// Accumulated results for the current session, in arrival order.
    pub fn results(&self) -> Vec<MediaItem> {
        self.lock_state().items.clone()
    }

    pub fn has_more(&self) -> bool {
        self.lock_state().has_more
    }

    pub fn current_key(&self) -> Option<SessionKey> {
        self.lock_state().key.clone()
    }

    /// Fetch the next page for the current session.
    ///
    /// The session key and page number are captured before the request goes
    /// out; if either changed by the time the response lands, the response
    /// is discarded as [`PageOutcome::Stale`].
    pub async fn load_next_page(&self) -> Result<PageOutcome> {
        let (key, page) = {
            let st = self.lock_state();
            let Some(key) = st.key.clone() else {
                return Ok(PageOutcome::EmptyQuery);
            };
            if !st.has_more {
                return Ok(PageOutcome::Exhausted);
            }
            (key, st.next_page)
        };

        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Ok(PageOutcome::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let source = match key.kind {
            MediaKind::Image => &self.image_source,
            MediaKind::Video => &self.video_source,
        };
        let raw = source.fetch_page(&key, page, self.page_size).await?;

        let mut st = self.lock_state();
        if st.key.as_ref() != Some(&key) || st.next_page != page {
            tracing::debug!(query = %key.query, page, "discarding stale page response");
            return Ok(PageOutcome::Stale);
        }

        // a full page (by raw count) means another may follow
        let full = raw.len() as u32 == self.page_size;
        let empty_first_page = page == 1 && raw.is_empty();

        let mut added = 0;
        for payload in &raw {
            if let Some(item) = normalize(payload, Some(key.kind)) {
                if st.seen_ids.insert(item.id.clone()) {
                    st.items.push(item);
                    added += 1;
                }
            }
        }
        st.has_more = full;
        st.next_page = page + 1;

        if empty_first_page {
            return Ok(PageOutcome::NoMatches);
        }
        Ok(PageOutcome::Appended { added })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Timer-reset debouncer for search-as-you-type input.
///
/// Every push cancels the pending timer and schedules a new one; only the
/// value that survives the quiet window is delivered on the receiver.
pub struct QueryDebouncer {
    delay: Duration,
    tx: mpsc::UnboundedSender<String>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl QueryDebouncer {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { delay, tx, pending: Mutex::new(None) }, rx)
    }

    /// Record a new input value; last write wins.
    pub fn push(&self, value: String) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let tx = self.tx.clone();
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(value);
        }));
    }
}

/// Collapse internal whitespace runs and trim, the way queries are keyed.
fn norm_query(q: &str) -> String {
    let t = q.trim();
    let mut out = String::with_capacity(t.len());
    let mut last_space = false;
    for ch in t.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    fn image_page(prefix: &str, count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({ "id": format!("{prefix}-{i}"), "urls": { "small": "s.jpg" } }))
            .collect()
    }

    /// Pops one scripted page per call.
    struct ScriptedSource {
        pages: Mutex<VecDeque<Vec<Value>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Vec<Value>>) -> Arc<Self> {
            Arc::new(Self { pages: Mutex::new(pages.into()) })
        }
    }

    #[async_trait]
    impl SearchSource for ScriptedSource {
        async fn fetch_page(&self, _key: &SessionKey, _page: u32, _pp: u32) -> Result<Vec<Value>> {
            Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    /// Blocks each fetch until released, so tests can interleave session
    /// changes with an in-flight request.
    struct GatedSource {
        entered: Notify,
        release: Notify,
        payload: Vec<Value>,
    }

    impl GatedSource {
        fn new(payload: Vec<Value>) -> Arc<Self> {
            Arc::new(Self { entered: Notify::new(), release: Notify::new(), payload })
        }
    }

    #[async_trait]
    impl SearchSource for GatedSource {
        async fn fetch_page(&self, _key: &SessionKey, _page: u32, _pp: u32) -> Result<Vec<Value>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(self.payload.clone())
        }
    }

    fn engine_with(image: Arc<dyn SearchSource>) -> Arc<SearchEngine> {
        let video = ScriptedSource::new(vec![]);
        Arc::new(SearchEngine::new(image, video, 12))
    }

    #[tokio::test]
    async fn full_then_short_page_accumulates_and_stops() {
        // page 1: 12 items, page 2: 5 items
        let source = ScriptedSource::new(vec![image_page("p1", 12), image_page("p2", 5)]);
        let engine = engine_with(source);
        engine.begin("mountains", MediaKind::Image, SearchFilters::default());

        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::Appended { added: 12 });
        assert!(engine.has_more());

        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::Appended { added: 5 });
        assert!(!engine.has_more());
        assert_eq!(engine.results().len(), 17);

        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::Exhausted);
    }

    #[tokio::test]
    async fn empty_first_page_is_no_matches_not_an_error() {
        let source = ScriptedSource::new(vec![vec![]]);
        let engine = engine_with(source);
        engine.begin("qwzx", MediaKind::Image, SearchFilters::default());

        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::NoMatches);
        assert!(!engine.has_more());
        assert!(engine.results().is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_within_a_session_are_dropped() {
        let mut page2 = image_page("p1", 3); // same ids as page 1
        page2.extend(image_page("p2", 2));
        let source = ScriptedSource::new(vec![image_page("p1", 3), page2]);
        let engine = engine_with(source);
        engine.begin("dogs", MediaKind::Image, SearchFilters::default());

        engine.load_next_page().await.unwrap();
        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::Appended { added: 2 });
        assert_eq!(engine.results().len(), 5);
    }

    #[tokio::test]
    async fn unrenderable_payloads_are_dropped_but_count_toward_page_fullness() {
        let mut page = image_page("p1", 11);
        page.push(json!({ "id": "broken", "urls": {} }));
        let source = ScriptedSource::new(vec![page]);
        let engine = engine_with(source);
        engine.begin("cats", MediaKind::Image, SearchFilters::default());

        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::Appended { added: 11 });
        // raw page was full, so pagination continues
        assert!(engine.has_more());
    }

    #[tokio::test]
    async fn changing_the_session_discards_an_in_flight_page() {
        let gated = GatedSource::new(image_page("old", 12));
        let engine = engine_with(gated.clone());
        engine.begin("first", MediaKind::Image, SearchFilters::default());

        let worker = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.load_next_page().await })
        };
        gated.entered.notified().await;

        // filter change invalidates the session while the page is in flight
        engine.begin(
            "first",
            MediaKind::Image,
            SearchFilters { orientation: Some("portrait".into()), ..Default::default() },
        );
        gated.release.notify_one();

        assert_eq!(worker.await.unwrap().unwrap(), PageOutcome::Stale);
        assert!(engine.results().is_empty());
        assert_eq!(engine.current_key().unwrap().filters.orientation.as_deref(), Some("portrait"));
    }

    #[tokio::test]
    async fn only_one_page_request_may_be_outstanding() {
        let gated = GatedSource::new(image_page("p1", 12));
        let engine = engine_with(gated.clone());
        engine.begin("surf", MediaKind::Image, SearchFilters::default());

        let worker = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.load_next_page().await })
        };
        gated.entered.notified().await;

        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::Busy);

        gated.release.notify_one();
        assert_eq!(worker.await.unwrap().unwrap(), PageOutcome::Appended { added: 12 });
    }

    #[tokio::test]
    async fn resubmitting_the_same_key_keeps_the_session() {
        let source = ScriptedSource::new(vec![image_page("p1", 12)]);
        let engine = engine_with(source);
        engine.begin("sea", MediaKind::Image, SearchFilters::default());
        engine.load_next_page().await.unwrap();

        engine.begin("  sea ", MediaKind::Image, SearchFilters::default());
        assert_eq!(engine.results().len(), 12);
    }

    #[tokio::test]
    async fn empty_query_clears_the_session() {
        let source = ScriptedSource::new(vec![image_page("p1", 12)]);
        let engine = engine_with(source);
        engine.begin("sea", MediaKind::Image, SearchFilters::default());
        engine.load_next_page().await.unwrap();

        engine.begin("", MediaKind::Image, SearchFilters::default());
        assert!(engine.results().is_empty());
        assert!(!engine.has_more());
        assert_eq!(engine.load_next_page().await.unwrap(), PageOutcome::EmptyQuery);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_delivers_only_the_settled_value() {
        let (debouncer, mut rx) = QueryDebouncer::new(Duration::from_millis(300));
        debouncer.push("m".into());
        tokio::time::advance(Duration::from_millis(100)).await;
        debouncer.push("mo".into());
        tokio::time::advance(Duration::from_millis(100)).await;
        debouncer.push("mountains".into());
        tokio::time::advance(Duration::from_millis(300)).await;

        assert_eq!(rx.recv().await.unwrap(), "mountains");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_fires_again_after_settling_twice() {
        let (debouncer, mut rx) = QueryDebouncer::new(Duration::from_millis(300));
        debouncer.push("dogs".into());
        tokio::time::advance(Duration::from_millis(301)).await;
        assert_eq!(rx.recv().await.unwrap(), "dogs");

        debouncer.push("cats".into());
        tokio::time::advance(Duration::from_millis(301)).await;
        assert_eq!(rx.recv().await.unwrap(), "cats");
    }
}
