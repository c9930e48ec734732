//! Search widget lifecycle: create, initialize once, attach to a page, run.

use crate::config::{WidgetConfig, DEFAULT_INPUT_ID, DEFAULT_RESULTS_ID};
use crate::controller::{InputController, Key, KeyOutcome, PointerTarget};
use crate::document::Corpus;
use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::loader::{CorpusLoader, CorpusSource};
use crate::render::ResultsView;
use regex_lite::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

lazy_static::lazy_static! {
    static ref ID_ATTR: Regex =
        Regex::new(r#"(?i)\sid\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap();
    static ref META_TAG: Regex = Regex::new(r"(?i)<meta\s[^>]*>").unwrap();
    static ref ATTR: Regex =
        Regex::new(r#"([A-Za-z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap();
}

/// Value of a quoted or bare attribute, whichever alternative matched
fn attr_value<'h>(caps: &Captures<'h>, first: usize) -> Option<&'h str> {
    (first..first + 3).find_map(|i| caps.get(i)).map(|m| m.as_str())
}

/// The loaded corpus and the index built from it. Never updated in place;
/// a new corpus means a new session.
pub struct SearchSession {
    corpus: Corpus,
    index: SearchIndex,
}

impl SearchSession {
    pub fn new(corpus: Corpus) -> Result<Self, SearchError> {
        let index = SearchIndex::build(&corpus)?;
        Ok(Self { corpus, index })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }
}

impl fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSession")
            .field("documents", &self.corpus.len())
            .field("indexed", &self.index.total_documents())
            .finish()
    }
}

/// The parts of the hosting page the widget needs to see
pub trait Page {
    fn has_element(&self, id: &str) -> bool;
    /// Content of `<meta name="{name}">`
    fn meta(&self, name: &str) -> Option<String>;
}

/// A page described by its element ids and meta tags
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    ids: HashSet<String>,
    metas: HashMap<String, String>,
}

impl StaticPage {
    /// Scan rendered HTML for `id` attributes and named meta tags
    pub fn from_html(html: &str) -> Self {
        let ids = ID_ATTR
            .captures_iter(html)
            .filter_map(|c| attr_value(&c, 1).map(str::to_string))
            .collect();

        let mut metas = HashMap::new();
        for tag in META_TAG.find_iter(html) {
            let attrs: HashMap<String, String> = ATTR
                .captures_iter(tag.as_str())
                .filter_map(|c| {
                    let value = attr_value(&c, 2)?;
                    Some((c[1].to_ascii_lowercase(), value.to_string()))
                })
                .collect();
            if let (Some(name), Some(content)) = (attrs.get("name"), attrs.get("content")) {
                metas.insert(name.clone(), content.clone());
            }
        }

        Self { ids, metas }
    }

    pub fn with_element(mut self, id: &str) -> Self {
        self.ids.insert(id.to_string());
        self
    }

    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.metas.insert(name.to_string(), content.to_string());
        self
    }
}

impl Page for StaticPage {
    fn has_element(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn meta(&self, name: &str) -> Option<String> {
        self.metas.get(name).cloned()
    }
}

/// Configuration the widget was first initialized with, and the outcome
struct Setup {
    config: WidgetConfig,
    session: Result<Arc<SearchSession>, SearchError>,
}

/// The search widget of one page.
///
/// Initialization happens at most once per instance. Concurrent callers share
/// the same load and the configuration of the first call sticks, including a
/// failed one. Only one [`InputController`] is ever handed out, so auto and
/// manual initialization on the same page never bind the elements twice.
pub struct SearchWidget<S> {
    loader: CorpusLoader<S>,
    setup: OnceCell<Setup>,
    attached: AtomicBool,
}

impl<S: CorpusSource> SearchWidget<S> {
    pub fn create(source: S) -> Self {
        Self {
            loader: CorpusLoader::new(source),
            setup: OnceCell::new(),
            attached: AtomicBool::new(false),
        }
    }

    /// Configuration in effect, once initialized
    pub fn config(&self) -> Option<&WidgetConfig> {
        self.setup.get().map(|setup| &setup.config)
    }

    /// Fetch the corpus and build the index, or return the earlier outcome.
    /// `config` is ignored when the widget was already initialized.
    pub async fn initialize(&self, config: WidgetConfig) -> Result<Arc<SearchSession>, SearchError> {
        self.setup_with(config).await.session.clone()
    }

    async fn setup_with(&self, config: WidgetConfig) -> &Setup {
        self.setup.get_or_init(|| self.load(config)).await
    }

    async fn load(&self, config: WidgetConfig) -> Setup {
        let url = &config.corpus_url;
        info!(url = %url, "initializing search");

        let session = match self.loader.load(url).await {
            Ok(corpus) => SearchSession::new(corpus).map(Arc::new),
            Err(e) => Err(e),
        };

        match &session {
            Ok(session) => info!(documents = session.corpus().len(), "search ready"),
            Err(SearchError::CorpusParse { message, excerpt }) => {
                error!(url = %url, message = %message, excerpt = %excerpt, "invalid JSON in search data")
            }
            Err(SearchError::CorpusStatus { status, .. }) => {
                error!(url = %url, status, "failed to load search data")
            }
            Err(e) => error!(url = %url, error = %e, "error initializing search"),
        }
        Setup { config, session }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.setup.get(), Some(Setup { session: Ok(_), .. }))
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// The page's controller, bound to this widget's session, or a disabled
    /// one showing the unavailable placeholder if initialization failed.
    /// `None` once a controller has already been handed out.
    pub async fn attach(&self, config: WidgetConfig) -> Option<InputController> {
        let setup = self.setup_with(config).await;
        if self.attached.swap(true, Ordering::SeqCst) {
            debug!("search widget already attached");
            return None;
        }
        Some(match &setup.session {
            Ok(session) => InputController::new(session.clone(), &setup.config),
            Err(_) => InputController::unavailable(&setup.config),
        })
    }

    /// Attach to `page`, which must carry both configured elements. Resolves
    /// to `None` without touching the page if the widget is already attached.
    pub async fn mount(
        &self,
        page: &impl Page,
        config: WidgetConfig,
    ) -> Result<Option<InputController>, SearchError> {
        if self.is_attached() {
            return Ok(None);
        }
        if !page.has_element(&config.input_id) || !page.has_element(&config.results_id) {
            error!(
                input_id = %config.input_id,
                results_id = %config.results_id,
                "search elements not found"
            );
            return Err(SearchError::MissingElements {
                input_id: config.input_id,
                results_id: config.results_id,
            });
        }
        Ok(self.attach(config).await)
    }

    /// Manual initialization for pages that do not rely on [`Self::auto_init`].
    pub async fn init(
        &self,
        page: &impl Page,
        corpus_url: &str,
        input_id: &str,
        results_id: &str,
    ) -> Result<Option<InputController>, SearchError> {
        self.mount(page, WidgetConfig::new(corpus_url, input_id, results_id))
            .await
    }

    /// Set up the widget if the page has the standard `search-input` and
    /// `results-container` elements; otherwise stay completely inactive.
    pub async fn auto_init(&self, page: &impl Page) -> Option<InputController> {
        if !page.has_element(DEFAULT_INPUT_ID) || !page.has_element(DEFAULT_RESULTS_ID) {
            return None;
        }
        self.attach(WidgetConfig::from_page(page)).await
    }

    pub fn dispose(self) {
        debug!(initialized = self.is_initialized(), "search widget disposed");
    }
}

/// Events forwarded from the page
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// The input's current value after a keystroke
    Input(String),
    Key(Key),
    Pointer(PointerTarget),
}

/// Changes the page has to apply
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Render(ResultsView),
    Navigate(String),
}

/// Drive a controller from a stream of page events until the stream ends.
///
/// Everything runs on one task: an event and the debounce timer are never
/// handled at the same time, and an event that arrives together with an
/// expiring timer wins, re-arming it.
pub async fn run_event_loop(
    mut controller: InputController,
    mut events: mpsc::UnboundedReceiver<UiEvent>,
    effects: mpsc::UnboundedSender<Effect>,
) -> InputController {
    loop {
        let before = controller.view().clone();
        let deadline = controller.deadline();

        tokio::select! {
            biased;

            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    UiEvent::Input(value) => controller.on_input(&value, Instant::now()),
                    UiEvent::Key(key) => {
                        if let KeyOutcome::Navigate(url) = controller.on_key(key) {
                            emit(&effects, Effect::Navigate(url));
                        }
                    }
                    UiEvent::Pointer(target) => controller.on_pointer(target),
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                controller.on_timer(Instant::now());
            }
        }

        if controller.view() != &before {
            emit(&effects, Effect::Render(controller.view().clone()));
        }
    }
    controller
}

fn emit(effects: &mpsc::UnboundedSender<Effect>, effect: Effect) {
    if effects.send(effect).is_err() {
        debug!("page went away; dropping effect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CORPUS_URL_META, DEFAULT_CORPUS_URL};
    use crate::loader::FetchedBody;
    use crate::render::SEARCH_UNAVAILABLE;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const CORPUS: &str =
        r#"[{"id":"1","title":"Cache Eviction","content":"LRU policy details","url":"/cache"}]"#;

    #[derive(Clone)]
    struct FakeSource {
        body: FetchedBody,
        calls: Arc<AtomicUsize>,
        urls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSource {
        fn new(status: u16, text: &str) -> Self {
            Self {
                body: FetchedBody {
                    status,
                    text: text.to_string(),
                },
                calls: Arc::new(AtomicUsize::new(0)),
                urls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    impl CorpusSource for FakeSource {
        async fn fetch(&self, url: &str) -> Result<FetchedBody, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            tokio::task::yield_now().await;
            Ok(self.body.clone())
        }
    }

    fn search_page() -> StaticPage {
        StaticPage::default()
            .with_element("search-input")
            .with_element("results-container")
    }

    #[tokio::test]
    async fn test_initialize_fetches_once() {
        let source = FakeSource::new(200, CORPUS);
        let widget = SearchWidget::create(source.clone());

        let (a, b) = tokio::join!(
            widget.initialize(WidgetConfig::default()),
            widget.initialize(WidgetConfig::default())
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        widget
            .initialize(WidgetConfig::new("/other.json", "q", "hits"))
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(source.urls(), vec![DEFAULT_CORPUS_URL.to_string()]);
        assert_eq!(widget.config(), Some(&WidgetConfig::default()));
        assert!(widget.is_initialized());
        widget.dispose();
    }

    #[tokio::test]
    async fn test_failed_initialize_is_final() {
        let source = FakeSource::new(500, "");
        let widget = SearchWidget::create(source.clone());

        let err = widget.initialize(WidgetConfig::default()).await.unwrap_err();
        assert!(err.is_load_error());
        assert_eq!(
            widget.initialize(WidgetConfig::default()).await.unwrap_err(),
            err
        );
        assert_eq!(source.calls(), 1);
        assert!(!widget.is_initialized());
    }

    #[tokio::test]
    async fn test_malformed_corpus_shows_unavailable() {
        let source = FakeSource::new(200, r#"[{"id":"1","title":"x"},]"#);
        let widget = SearchWidget::create(source);

        let controller = widget.attach(WidgetConfig::default()).await.unwrap();
        assert!(!controller.is_available());
        assert!(controller.view().is_visible());
        assert_eq!(controller.view().html(), format!("<li>{}</li>", SEARCH_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_record_without_id_shows_unavailable() {
        let source = FakeSource::new(200, r#"[{"title":"No id","content":"x","url":"/x"}]"#);
        let widget = SearchWidget::create(source);

        assert!(matches!(
            widget.initialize(WidgetConfig::default()).await,
            Err(SearchError::IndexBuild(_))
        ));
        let controller = widget.attach(WidgetConfig::default()).await.unwrap();
        assert!(!controller.is_available());
    }

    #[tokio::test]
    async fn test_init_requires_elements() {
        let source = FakeSource::new(200, CORPUS);
        let widget = SearchWidget::create(source.clone());
        let page = StaticPage::default().with_element("search-input");

        let result = widget
            .init(&page, "/search.json", "search-input", "results-container")
            .await;
        assert!(matches!(result, Err(SearchError::MissingElements { .. })));
        assert_eq!(source.calls(), 0);
        assert!(!widget.is_attached());
    }

    #[tokio::test]
    async fn test_manual_init_uses_given_ids_and_url() {
        let source = FakeSource::new(200, CORPUS);
        let widget = SearchWidget::create(source.clone());
        let page = StaticPage::default().with_element("q").with_element("hits");

        let controller = widget
            .init(&page, "/docs/index.json", "q", "hits")
            .await
            .unwrap()
            .unwrap();
        assert!(controller.is_available());
        assert!(widget.is_initialized());
        assert_eq!(source.urls(), vec!["/docs/index.json".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_init_binds_once() {
        let source = FakeSource::new(200, CORPUS);
        let widget = SearchWidget::create(source.clone());
        let page = search_page();

        let first = widget
            .init(&page, "/search.json", "search-input", "results-container")
            .await
            .unwrap();
        let second = widget
            .init(&page, "/search.json", "search-input", "results-container")
            .await
            .unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_init_after_auto_init_is_a_no_op() {
        let source = FakeSource::new(200, CORPUS);
        let widget = SearchWidget::create(source.clone());
        let page = search_page().with_element("q");

        assert!(widget.auto_init(&page).await.is_some());
        let manual = widget
            .init(&page, "/elsewhere.json", "q", "results-container")
            .await
            .unwrap();
        assert!(manual.is_none());
        assert_eq!(source.calls(), 1);
        assert_eq!(source.urls(), vec![DEFAULT_CORPUS_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_auto_init() {
        let source = FakeSource::new(200, CORPUS);
        let widget = SearchWidget::create(source.clone());
        assert!(widget.auto_init(&StaticPage::default()).await.is_none());
        assert_eq!(source.calls(), 0);
        assert!(widget.config().is_none());

        let page = search_page().with_meta(CORPUS_URL_META, "/help/search.json");
        let controller = widget.auto_init(&page).await.unwrap();
        assert!(controller.is_available());
        assert_eq!(source.urls(), vec!["/help/search.json".to_string()]);
    }

    #[test]
    fn test_static_page_from_html() {
        let page = StaticPage::from_html(
            r#"<html><head><meta charset="utf-8"><meta content="/s.json" name="search-json-url"></head>
            <body><input id="search-input" type="text"><ul id='results-container'></ul></body></html>"#,
        );
        assert!(page.has_element("search-input"));
        assert!(page.has_element("results-container"));
        assert!(!page.has_element("missing"));
        assert_eq!(page.meta(CORPUS_URL_META), Some("/s.json".to_string()));
    }

    #[test]
    fn test_static_page_single_quoted_and_bare_attributes() {
        let page = StaticPage::from_html(
            "<meta name='search-json-url' content='/docs/s.json'>\
             <input id=search-input><ul id='results-container'></ul>",
        );
        assert!(page.has_element("search-input"));
        assert!(page.has_element("results-container"));
        assert_eq!(page.meta(CORPUS_URL_META), Some("/docs/s.json".to_string()));

        let bare = StaticPage::from_html("<meta name=search-json-url content=/help/s.json>");
        assert_eq!(bare.meta(CORPUS_URL_META), Some("/help/s.json".to_string()));
        assert_eq!(WidgetConfig::from_page(&bare).corpus_url, "/help/s.json");
    }

    #[tokio::test]
    async fn test_session_debug_shows_size() {
        let widget = SearchWidget::create(FakeSource::new(200, CORPUS));
        let session = widget.initialize(WidgetConfig::default()).await.unwrap();
        let debug = format!("{:?}", session);
        assert!(debug.contains("documents: 1"));
    }

    async fn cache_controller() -> InputController {
        let widget = SearchWidget::create(FakeSource::new(200, CORPUS));
        widget
            .mount(&search_page(), WidgetConfig::default())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_dispatches_once() {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (effects_tx, mut effects) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_event_loop(cache_controller().await, events_rx, effects_tx));

        for prefix in ["c", "ca", "cac", "cach", "cache"] {
            events.send(UiEvent::Input(prefix.to_string())).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        events.send(UiEvent::Key(Key::Enter)).unwrap();
        drop(events);

        let controller = handle.await.unwrap();
        assert_eq!(controller.searches_dispatched(), 1);
        assert_eq!(controller.last_query(), Some("cache"));

        match effects.recv().await {
            Some(Effect::Render(view)) => {
                assert!(view.is_visible());
                assert_eq!(view.html(), r#"<li><a href="/cache">Cache Eviction</a></li>"#);
            }
            other => panic!("expected render, got {other:?}"),
        }
        assert_eq!(effects.recv().await, Some(Effect::Navigate("/cache".to_string())));
        assert_eq!(effects.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_input_hides_immediately() {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (effects_tx, mut effects) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_event_loop(cache_controller().await, events_rx, effects_tx));

        events.send(UiEvent::Input("cache".to_string())).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        events.send(UiEvent::Input("cache ".to_string())).unwrap();
        events.send(UiEvent::Input("  ".to_string())).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(events);

        let controller = handle.await.unwrap();
        assert_eq!(controller.searches_dispatched(), 1);

        assert!(matches!(effects.recv().await, Some(Effect::Render(v)) if v.is_visible()));
        assert!(matches!(effects.recv().await, Some(Effect::Render(v)) if !v.is_visible() && v.entries().is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outside_click_hides_results() {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (effects_tx, mut effects) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_event_loop(cache_controller().await, events_rx, effects_tx));

        events.send(UiEvent::Input("cache".to_string())).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        events.send(UiEvent::Pointer(PointerTarget::Input)).unwrap();
        events.send(UiEvent::Pointer(PointerTarget::Outside)).unwrap();
        drop(events);

        let controller = handle.await.unwrap();
        assert!(!controller.view().is_visible());
        assert_eq!(controller.view().entries().len(), 1);

        assert!(matches!(effects.recv().await, Some(Effect::Render(v)) if v.is_visible()));
        assert!(matches!(effects.recv().await, Some(Effect::Render(v)) if !v.is_visible()));
        assert_eq!(effects.recv().await, None);
    }
}
