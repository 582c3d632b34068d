//! Mock WebDriver implementation for testing
//!
//! `MockWebDriver` serves pages from an in-memory `MockSite` and emulates the
//! parts of a browser the client relies on: navigation history, per-session
//! cookies, form submission, element state and timed visibility. Pages are
//! plain HTML; the following attributes make elements change over time
//! (values in milliseconds since the page loaded):
//!
//! - `data-present-after`: absent from the DOM until then
//! - `data-remove-after`: removed from the DOM afterwards
//! - `data-appear-after`: hidden until then
//! - `data-hide-after`: hidden afterwards
//! - `data-enable-after`: a `disabled` element becomes enabled
//! - `data-text-after` + `data-text`: text content replaced afterwards
//! - `data-attr-after` + `data-attr-name` + `data-attr-value`: attribute set afterwards

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::traits::{RemoteElement, RemoteSession, SessionConnector};
use super::types::{Capabilities, Cookie, Locator};
use crate::process::BrowserManager;
use crate::{Error, Result};

/// Bytes returned as a screenshot
pub const MOCK_PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Request seen by a mock route
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub url: Url,
    /// Decoded form body of a POST
    pub form: Vec<(String, String)>,
    pub cookies: BTreeMap<String, String>,
}

impl MockRequest {
    /// First query parameter named `name`
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Form body parameter, falling back to the query string
    pub fn param(&self, name: &str) -> Option<String> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .or_else(|| self.query(name))
    }

    /// All values of a parameter (body then query)
    pub fn params(&self, name: &str) -> Vec<String> {
        self.form
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .chain(
                self.url
                    .query_pairs()
                    .filter(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned()),
            )
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Response returned by a mock route
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub set_cookies: Vec<(String, String)>,
}

impl MockResponse {
    pub fn html<S: Into<String>>(body: S) -> Self {
        Self {
            status: 200,
            body: body.into(),
            set_cookies: Vec::new(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: "<html><head><title>Not Found</title></head><body><h1>Not Found</h1></body></html>"
                .to_string(),
            set_cookies: Vec::new(),
        }
    }

    pub fn with_cookie<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.set_cookies.push((name.into(), value.into()));
        self
    }
}

type Handler = Arc<dyn Fn(&MockRequest) -> MockResponse + Send + Sync>;

/// In-memory site keyed by URL path
#[derive(Clone, Default)]
pub struct MockSite {
    routes: HashMap<String, Handler>,
}

impl fmt::Debug for MockSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.routes.keys().collect();
        paths.sort();
        f.debug_struct("MockSite").field("routes", &paths).finish()
    }
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static page
    pub fn page<P: Into<String>, S: Into<String>>(self, path: P, html: S) -> Self {
        let html = html.into();
        self.route(path, move |_| MockResponse::html(html.clone()))
    }

    /// Dynamic page
    pub fn route<P, F>(mut self, path: P, handler: F) -> Self
    where
        P: Into<String>,
        F: Fn(&MockRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.routes.insert(path.into(), Arc::new(handler));
        self
    }

    fn handle(&self, request: &MockRequest) -> MockResponse {
        match self.routes.get(request.url.path()) {
            Some(handler) => handler(request),
            None => MockResponse::not_found(),
        }
    }
}

#[derive(Debug)]
struct DriverShared {
    site: MockSite,
    alive: AtomicBool,
    epoch: AtomicU64,
    sessions: AtomicUsize,
    generation: AtomicU64,
}

/// Mock WebDriver endpoint
#[derive(Debug, Clone)]
pub struct MockWebDriver {
    shared: Arc<DriverShared>,
}

impl MockWebDriver {
    pub fn new(site: MockSite) -> Self {
        Self {
            shared: Arc::new(DriverShared {
                site,
                alive: AtomicBool::new(true),
                epoch: AtomicU64::new(0),
                sessions: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Sessions opened so far
    pub fn session_count(&self) -> usize {
        self.shared.sessions.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Simulate the driver process dying: every open session fails afterwards
    pub fn shutdown(&self) {
        self.shared.alive.store(false, Ordering::SeqCst);
    }

    /// Simulate a fresh driver process; sessions of the previous one stay dead
    pub fn restart(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.alive.store(true, Ordering::SeqCst);
    }

    /// Open a session without going through the trait object
    pub fn open_session(&self) -> Result<MockSession> {
        if !self.is_alive() {
            return Err(Error::webdriver("Mock driver is not running"));
        }
        self.shared.sessions.fetch_add(1, Ordering::SeqCst);

        let document = Document::blank(self.next_generation());
        Ok(MockSession {
            inner: Arc::new(SessionInner {
                id: uuid::Uuid::new_v4().to_string(),
                epoch: self.shared.epoch.load(Ordering::SeqCst),
                driver: self.shared.clone(),
                state: Mutex::new(SessionState {
                    closed: false,
                    history: Vec::new(),
                    position: 0,
                    document,
                    cookies: BTreeMap::new(),
                }),
            }),
        })
    }

    fn next_generation(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for MockWebDriver {
    fn default() -> Self {
        Self::new(MockSite::new())
    }
}

#[async_trait]
impl SessionConnector for MockWebDriver {
    async fn connect(&self, url: &str, _capabilities: Capabilities) -> Result<Arc<dyn RemoteSession>> {
        debug!("Mock session requested from {}", url);
        Ok(Arc::new(self.open_session()?))
    }
}

/// Browser manager backed by a `MockWebDriver`
#[derive(Debug, Clone)]
pub struct MockDriverManager {
    webdriver: MockWebDriver,
    running: bool,
    process_starts: Arc<AtomicUsize>,
}

impl MockDriverManager {
    pub fn new(webdriver: MockWebDriver) -> Self {
        Self {
            webdriver,
            running: false,
            process_starts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn webdriver(&self) -> &MockWebDriver {
        &self.webdriver
    }

    /// Number of times the simulated driver process was started
    pub fn process_starts(&self) -> usize {
        self.process_starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserManager for MockDriverManager {
    async fn start(&mut self) -> Result<Arc<dyn RemoteSession>> {
        if !self.is_running() {
            self.webdriver.restart();
            self.process_starts.fetch_add(1, Ordering::SeqCst);
            self.running = true;
        }
        self.webdriver.connect("mock://driver", Capabilities::new()).await
    }

    async fn quit(&mut self) -> Result<()> {
        if self.running {
            self.webdriver.shutdown();
            self.running = false;
        }
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.running && self.webdriver.is_alive()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug, Clone)]
struct Visit {
    method: String,
    url: Url,
    form: Vec<(String, String)>,
}

impl Visit {
    fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            form: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Document {
    url: String,
    source: String,
    loaded_at: Instant,
    generation: u64,
    values: HashMap<usize, String>,
    checked: HashMap<usize, bool>,
    selected: HashMap<usize, bool>,
}

impl Document {
    fn blank(generation: u64) -> Self {
        Self {
            url: "about:blank".to_string(),
            source: "<html><head></head><body></body></html>".to_string(),
            loaded_at: Instant::now(),
            generation,
            values: HashMap::new(),
            checked: HashMap::new(),
            selected: HashMap::new(),
        }
    }

    fn elapsed(&self, attr: Option<&str>) -> Option<bool> {
        let millis: u128 = attr?.trim().parse().ok()?;
        Some(self.loaded_at.elapsed().as_millis() >= millis)
    }
}

#[derive(Debug)]
struct SessionState {
    closed: bool,
    history: Vec<Visit>,
    position: usize,
    document: Document,
    cookies: BTreeMap<String, Cookie>,
}

impl SessionState {
    fn navigate(&mut self, site: &MockSite, generation: u64, visit: Visit, record: bool) {
        let request = MockRequest {
            method: visit.method.clone(),
            url: visit.url.clone(),
            form: visit.form.clone(),
            cookies: self
                .cookies
                .values()
                .map(|c| (c.name.clone(), c.value.clone()))
                .collect(),
        };

        let response = site.handle(&request);
        debug!("{} {} -> {}", request.method, request.url, response.status);

        for (name, value) in response.set_cookies {
            self.cookies
                .insert(name.clone(), Cookie::new(name, value).with_path("/"));
        }

        self.document = Document {
            url: visit.url.to_string(),
            source: response.body,
            ..Document::blank(generation)
        };

        if record {
            if !self.history.is_empty() {
                self.history.truncate(self.position + 1);
            }
            self.history.push(visit);
            self.position = self.history.len() - 1;
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    epoch: u64,
    driver: Arc<DriverShared>,
    state: Mutex<SessionState>,
}

impl SessionInner {
    fn ensure_alive(&self, state: &SessionState) -> Result<()> {
        if state.closed
            || !self.driver.alive.load(Ordering::SeqCst)
            || self.driver.epoch.load(Ordering::SeqCst) != self.epoch
        {
            return Err(Error::session_closed(format!("Session {} is closed", self.id)));
        }
        Ok(())
    }

    fn next_generation(&self) -> u64 {
        self.driver.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn navigate(&self, state: &mut SessionState, visit: Visit, record: bool) {
        let generation = self.next_generation();
        state.navigate(&self.driver.site, generation, visit, record);
    }

    fn wrap(self: &Arc<Self>, generation: u64, ordinals: Vec<usize>) -> Vec<Arc<dyn RemoteElement>> {
        ordinals
            .into_iter()
            .map(|ordinal| {
                Arc::new(MockElement {
                    id: format!("{}:{}:{}", self.id, generation, ordinal),
                    session: self.clone(),
                    generation,
                    ordinal,
                }) as Arc<dyn RemoteElement>
            })
            .collect()
    }
}

/// Mock browser session
#[derive(Debug, Clone)]
pub struct MockSession {
    inner: Arc<SessionInner>,
}

impl MockSession {
    async fn traverse(&self, step: isize) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;

        let target = state.position as isize + step;
        if state.history.is_empty() || target < 0 || target >= state.history.len() as isize {
            return Ok(());
        }

        state.position = target as usize;
        let visit = state.history[state.position].clone();
        self.inner.navigate(&mut state, visit, false);
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    fn id(&self) -> &str {
        &self.inner.id
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let url = Url::parse(url)?;
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        self.inner.navigate(&mut state, Visit::get(url), true);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        Ok(state.document.url.clone())
    }

    async fn source(&self) -> Result<String> {
        let state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        Ok(state.document.source.clone())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Arc<dyn RemoteElement>>> {
        let state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;

        let document = &state.document;
        let html = Html::parse_document(&document.source);
        let dom = Dom::new(&html, document);
        let ordinals = dom.find(None, locator)?;
        Ok(self.inner.wrap(document.generation, ordinals))
    }

    async fn back(&self) -> Result<()> {
        self.traverse(-1).await
    }

    async fn forward(&self) -> Result<()> {
        self.traverse(1).await
    }

    async fn refresh(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;

        match state.history.get(state.position).cloned() {
            Some(visit) => self.inner.navigate(&mut state, visit, false),
            None => state.document.loaded_at = Instant::now(),
        }
        Ok(())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;

        let document = &state.document;
        if script.contains("document.title") {
            let html = Html::parse_document(&document.source);
            return Ok(Value::String(Dom::new(&html, document).title()));
        }
        if script.contains("location.href") {
            return Ok(Value::String(document.url.clone()));
        }
        if script.contains("readyState") {
            return Ok(Value::String("complete".to_string()));
        }
        if script.contains("arguments[0]") {
            return Ok(args.into_iter().next().unwrap_or(Value::Null));
        }
        Ok(Value::Null)
    }

    async fn execute_async(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.execute(script, args).await
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        Ok(state.cookies.values().cloned().collect())
    }

    async fn add_cookie(&self, cookie: Cookie) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        state.cookies.insert(cookie.name.clone(), cookie);
        Ok(())
    }

    async fn delete_cookie(&self, name: &str) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        state.cookies.remove(name);
        Ok(())
    }

    async fn delete_all_cookies(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        state.cookies.clear();
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let state = self.inner.state.lock().await;
        self.inner.ensure_alive(&state)?;
        Ok(MOCK_PNG.to_vec())
    }

    async fn quit(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.closed = true;
        Ok(())
    }
}

/// What an element interaction asks the session to do next
enum Effect {
    None,
    Navigate(Visit),
}

/// Mock element handle, bound to one loaded document
#[derive(Debug)]
pub struct MockElement {
    id: String,
    session: Arc<SessionInner>,
    generation: u64,
    ordinal: usize,
}

impl MockElement {
    /// Run `f` against this element in the current document
    async fn with<R, F>(&self, f: F) -> Result<R>
    where
        F: for<'a> FnOnce(&Dom<'a>, ElementRef<'a>, &mut Document) -> Result<(R, Effect)> + Send,
    {
        let mut state = self.session.state.lock().await;
        self.session.ensure_alive(&state)?;

        let (result, effect) = {
            let snapshot = state.document.clone();
            let html = Html::parse_document(&snapshot.source);
            let dom = Dom::new(&html, &snapshot);
            let element = self.resolve(&dom)?;
            f(&dom, element, &mut state.document)?
        };

        if let Effect::Navigate(visit) = effect {
            self.session.navigate(&mut state, visit, true);
        }
        Ok(result)
    }

    fn resolve<'a>(&self, dom: &Dom<'a>) -> Result<ElementRef<'a>> {
        if dom.document.generation != self.generation {
            return Err(self.stale());
        }
        match dom.element(self.ordinal) {
            Some(element) if dom.is_present(element) => Ok(element),
            _ => Err(self.stale()),
        }
    }

    fn stale(&self) -> Error {
        Error::stale_reference(format!("Element {} is no longer attached to the DOM", self.id))
    }
}

#[async_trait]
impl RemoteElement for MockElement {
    fn id(&self) -> &str {
        &self.id
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Arc<dyn RemoteElement>>> {
        let ordinals = self
            .with(|dom, element, _| Ok((dom.find(Some(element), locator)?, Effect::None)))
            .await?;
        Ok(self.session.wrap(self.generation, ordinals))
    }

    async fn text(&self) -> Result<String> {
        self.with(|dom, element, _| Ok((dom.text(element), Effect::None))).await
    }

    async fn attr(&self, name: &str) -> Result<Option<String>> {
        self.with(|dom, element, _| Ok((dom.attr(element, name), Effect::None)))
            .await
    }

    async fn prop(&self, name: &str) -> Result<Option<String>> {
        self.with(|dom, element, document| {
            let value = match name {
                "value" => Some(dom.value(element, document)),
                "checked" => Some(dom.is_checked(element, document).to_string()),
                "selected" => Some(dom.is_option_selected(element, document).to_string()),
                "disabled" => Some((!dom.is_enabled(element)).to_string()),
                "tagName" => Some(element.value().name().to_uppercase()),
                other => dom.attr(element, other),
            };
            Ok((value, Effect::None))
        })
        .await
    }

    async fn html(&self, inner: bool) -> Result<String> {
        self.with(|_, element, _| {
            let html = if inner { element.inner_html() } else { element.html() };
            Ok((html, Effect::None))
        })
        .await
    }

    async fn tag_name(&self) -> Result<String> {
        self.with(|_, element, _| Ok((element.value().name().to_string(), Effect::None)))
            .await
    }

    async fn click(&self) -> Result<()> {
        self.with(|dom, element, document| Ok(((), dom.click(element, document)?)))
            .await
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.with(|dom, element, document| {
            if !dom.is_displayed(element) && input_type(element).as_deref() != Some("file") {
                return Err(Error::webdriver("element not interactable"));
            }
            if dom.is_enabled(element) && is_text_control(element) {
                let mut value = dom.value(element, document);
                value.push_str(text);
                document.values.insert(dom.ordinal(element), value);
            }
            Ok(((), Effect::None))
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.with(|dom, element, document| {
            if is_text_control(element) {
                document.values.insert(dom.ordinal(element), String::new());
            }
            Ok(((), Effect::None))
        })
        .await
    }

    async fn is_selected(&self) -> Result<bool> {
        self.with(|dom, element, document| {
            let selected = match element.value().name() {
                "option" => dom.is_option_selected(element, document),
                "input" => dom.is_checked(element, document),
                _ => false,
            };
            Ok((selected, Effect::None))
        })
        .await
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.with(|dom, element, _| Ok((dom.is_enabled(element), Effect::None)))
            .await
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.with(|dom, element, _| Ok((dom.is_displayed(element), Effect::None)))
            .await
    }

    async fn submit(&self) -> Result<()> {
        self.with(|dom, element, document| {
            let form = dom
                .form_owner(element)
                .ok_or_else(|| Error::webdriver("element is not in a form"))?;
            Ok(((), Effect::Navigate(dom.submission(form, None, document)?)))
        })
        .await
    }
}

fn input_type(element: ElementRef<'_>) -> Option<String> {
    if element.value().name() != "input" {
        return None;
    }
    Some(
        element
            .value()
            .attr("type")
            .unwrap_or("text")
            .to_ascii_lowercase(),
    )
}

fn is_text_control(element: ElementRef<'_>) -> bool {
    match element.value().name() {
        "textarea" => true,
        "input" => !matches!(
            input_type(element).as_deref(),
            Some("checkbox" | "radio" | "submit" | "image" | "button" | "reset" | "hidden")
        ),
        _ => false,
    }
}

fn is_submit_button(element: ElementRef<'_>) -> bool {
    match element.value().name() {
        "button" => element
            .value()
            .attr("type")
            .map(|t| t.eq_ignore_ascii_case("submit"))
            .unwrap_or(true),
        "input" => matches!(input_type(element).as_deref(), Some("submit" | "image")),
        _ => false,
    }
}

const INLINE_TAGS: [&str; 14] = [
    "a", "abbr", "b", "code", "em", "i", "label", "s", "small", "span", "strong", "sub", "sup", "u",
];

/// Parsed view over a document plus its live state
struct Dom<'a> {
    html: &'a Html,
    document: &'a Document,
    order: Vec<ElementRef<'a>>,
}

impl<'a> Dom<'a> {
    fn new(html: &'a Html, document: &'a Document) -> Self {
        let order = html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        Self { html, document, order }
    }

    fn element(&self, ordinal: usize) -> Option<ElementRef<'a>> {
        self.order.get(ordinal).copied()
    }

    fn ordinal(&self, element: ElementRef<'a>) -> usize {
        self.order
            .iter()
            .position(|e| e.id() == element.id())
            .unwrap_or(usize::MAX)
    }

    fn title(&self) -> String {
        self.order
            .iter()
            .find(|e| e.value().name() == "title")
            .map(|e| collapse(&e.text().collect::<String>()))
            .unwrap_or_default()
    }

    fn lineage(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
        std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap))
    }

    fn is_present(&self, element: ElementRef<'a>) -> bool {
        Self::lineage(element).all(|e| {
            let attrs = e.value();
            self.document.elapsed(attrs.attr("data-present-after")) != Some(false)
                && self.document.elapsed(attrs.attr("data-remove-after")) != Some(true)
        })
    }

    fn hidden_self(&self, element: ElementRef<'a>) -> bool {
        let attrs = element.value();
        let style_hidden = attrs
            .attr("style")
            .map(|s| s.replace(' ', "").to_ascii_lowercase().contains("display:none"))
            .unwrap_or(false);

        attrs.attr("hidden").is_some()
            || style_hidden
            || matches!(attrs.name(), "head" | "script" | "style" | "title" | "template")
            || input_type(element).as_deref() == Some("hidden")
            || self.document.elapsed(attrs.attr("data-appear-after")) == Some(false)
            || self.document.elapsed(attrs.attr("data-hide-after")) == Some(true)
    }

    fn is_displayed(&self, element: ElementRef<'a>) -> bool {
        Self::lineage(element).all(|e| !self.hidden_self(e))
    }

    fn is_enabled(&self, element: ElementRef<'a>) -> bool {
        let attrs = element.value();
        attrs.attr("disabled").is_none()
            || self.document.elapsed(attrs.attr("data-enable-after")) == Some(true)
    }

    fn attr(&self, element: ElementRef<'a>, name: &str) -> Option<String> {
        let attrs = element.value();
        if attrs.attr("data-attr-name") == Some(name)
            && self.document.elapsed(attrs.attr("data-attr-after")) == Some(true)
        {
            return attrs.attr("data-attr-value").map(String::from);
        }
        attrs.attr(name).map(String::from)
    }

    fn text(&self, element: ElementRef<'a>) -> String {
        if !self.is_displayed(element) {
            return String::new();
        }
        let mut out = String::new();
        self.collect_text(element, &mut out);
        collapse(&out)
    }

    fn collect_text(&self, element: ElementRef<'a>, out: &mut String) {
        let attrs = element.value();
        if self.document.elapsed(attrs.attr("data-text-after")) == Some(true) {
            out.push_str(attrs.attr("data-text").unwrap_or(""));
            return;
        }

        for child in element.children() {
            if let Node::Text(text) = child.value() {
                out.push_str(&**text);
            } else if let Some(child) = ElementRef::wrap(child) {
                if self.hidden_self(child) || !self.is_present(child) {
                    continue;
                }
                let block = !INLINE_TAGS.contains(&child.value().name());
                if block {
                    out.push(' ');
                }
                self.collect_text(child, out);
                if block {
                    out.push(' ');
                }
            }
        }
    }

    fn is_checked(&self, element: ElementRef<'a>, document: &Document) -> bool {
        if !matches!(input_type(element).as_deref(), Some("checkbox" | "radio")) {
            return false;
        }
        document
            .checked
            .get(&self.ordinal(element))
            .copied()
            .unwrap_or_else(|| element.value().attr("checked").is_some())
    }

    fn enclosing_select(&self, option: ElementRef<'a>) -> Option<ElementRef<'a>> {
        option
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "select")
    }

    fn options(&self, select: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        select
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "option")
            .collect()
    }

    fn selected_options(&self, select: ElementRef<'a>, document: &Document) -> Vec<ElementRef<'a>> {
        let options = self.options(select);
        let chosen: Vec<_> = options
            .iter()
            .copied()
            .filter(|o| {
                document
                    .selected
                    .get(&self.ordinal(*o))
                    .copied()
                    .unwrap_or_else(|| o.value().attr("selected").is_some())
            })
            .collect();

        if chosen.is_empty() && select.value().attr("multiple").is_none() {
            return options.into_iter().take(1).collect();
        }
        chosen
    }

    fn is_option_selected(&self, option: ElementRef<'a>, document: &Document) -> bool {
        if option.value().name() != "option" {
            return false;
        }
        match self.enclosing_select(option) {
            Some(select) => self
                .selected_options(select, document)
                .iter()
                .any(|o| o.id() == option.id()),
            None => option.value().attr("selected").is_some(),
        }
    }

    fn option_value(&self, option: ElementRef<'a>) -> String {
        option
            .value()
            .attr("value")
            .map(String::from)
            .unwrap_or_else(|| collapse(&option.text().collect::<String>()))
    }

    fn value(&self, element: ElementRef<'a>, document: &Document) -> String {
        let attrs = element.value();
        let ordinal = self.ordinal(element);
        match attrs.name() {
            "input" => document.values.get(&ordinal).cloned().unwrap_or_else(|| {
                attrs.attr("value").map(String::from).unwrap_or_else(|| {
                    match input_type(element).as_deref() {
                        Some("checkbox" | "radio") => "on".to_string(),
                        _ => String::new(),
                    }
                })
            }),
            "textarea" => document
                .values
                .get(&ordinal)
                .cloned()
                .unwrap_or_else(|| element.text().collect()),
            "select" => self
                .selected_options(element, document)
                .first()
                .map(|o| self.option_value(*o))
                .unwrap_or_default(),
            "option" => self.option_value(element),
            _ => attrs.attr("value").map(String::from).unwrap_or_default(),
        }
    }

    fn form_owner(&self, element: ElementRef<'a>) -> Option<ElementRef<'a>> {
        if element.value().name() == "form" {
            return Some(element);
        }
        if let Some(id) = element.value().attr("form") {
            return self
                .order
                .iter()
                .copied()
                .find(|e| e.value().name() == "form" && e.value().attr("id") == Some(id));
        }
        element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "form")
    }

    fn resolve_url(&self, href: &str) -> Result<Url> {
        Ok(Url::parse(&self.document.url)?.join(href)?)
    }

    /// Request produced by submitting `form`
    fn submission(
        &self,
        form: ElementRef<'a>,
        submitter: Option<ElementRef<'a>>,
        document: &Document,
    ) -> Result<Visit> {
        let mut pairs = Vec::new();

        for control in self.order.iter().copied() {
            if self.form_owner(control).map(|f| f.id()) != Some(form.id()) || control.id() == form.id() {
                continue;
            }
            let name = match control.value().attr("name") {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => continue,
            };
            if !self.is_enabled(control) || !self.is_present(control) {
                continue;
            }
            let is_submitter = submitter.map(|s| s.id() == control.id()).unwrap_or(false);

            match control.value().name() {
                "input" => match input_type(control).as_deref() {
                    Some("checkbox" | "radio") => {
                        if self.is_checked(control, document) {
                            pairs.push((name, self.value(control, document)));
                        }
                    }
                    Some("submit" | "image" | "button" | "reset") => {
                        if is_submitter {
                            pairs.push((name, self.value(control, document)));
                        }
                    }
                    _ => pairs.push((name, self.value(control, document))),
                },
                "textarea" => pairs.push((name, self.value(control, document))),
                "select" => {
                    for option in self.selected_options(control, document) {
                        pairs.push((name.clone(), self.option_value(option)));
                    }
                }
                "button" => {
                    if is_submitter {
                        pairs.push((name, self.value(control, document)));
                    }
                }
                _ => {}
            }
        }

        let action = form.value().attr("action").unwrap_or("").trim();
        let mut url = if action.is_empty() {
            Url::parse(&self.document.url)?
        } else {
            self.resolve_url(action)?
        };
        url.set_fragment(None);

        let post = form
            .value()
            .attr("method")
            .map(|m| m.eq_ignore_ascii_case("post"))
            .unwrap_or(false);

        if post {
            return Ok(Visit {
                method: "POST".to_string(),
                url,
                form: pairs,
            });
        }

        url.set_query(None);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs.iter());
        }
        Ok(Visit::get(url))
    }

    fn click(&self, element: ElementRef<'a>, document: &mut Document) -> Result<Effect> {
        if !self.is_displayed(element) {
            return Err(Error::webdriver("element not interactable"));
        }

        if let Some(link) = Self::lineage(element)
            .find(|e| matches!(e.value().name(), "a" | "area") && e.value().attr("href").is_some())
        {
            let href = link.value().attr("href").unwrap_or("");
            return Ok(Effect::Navigate(Visit::get(self.resolve_url(href)?)));
        }

        if !self.is_enabled(element) {
            return Ok(Effect::None);
        }

        let ordinal = self.ordinal(element);
        match element.value().name() {
            "input" => match input_type(element).as_deref() {
                Some("checkbox") => {
                    let checked = self.is_checked(element, document);
                    document.checked.insert(ordinal, !checked);
                }
                Some("radio") => {
                    let name = element.value().attr("name");
                    let form = self.form_owner(element).map(|f| f.id());
                    for other in self.order.iter().copied() {
                        if input_type(other).as_deref() == Some("radio")
                            && other.value().attr("name") == name
                            && self.form_owner(other).map(|f| f.id()) == form
                        {
                            document.checked.insert(self.ordinal(other), false);
                        }
                    }
                    document.checked.insert(ordinal, true);
                }
                _ => {}
            },
            "option" => {
                if let Some(select) = self.enclosing_select(element) {
                    let multiple = select.value().attr("multiple").is_some();
                    let selected = self.is_option_selected(element, document);
                    if !multiple {
                        for option in self.options(select) {
                            document.selected.insert(self.ordinal(option), false);
                        }
                        document.selected.insert(ordinal, true);
                    } else {
                        for option in self.selected_options(select, document) {
                            document.selected.insert(self.ordinal(option), true);
                        }
                        document.selected.insert(ordinal, !selected);
                    }
                }
            }
            _ => {}
        }

        if is_submit_button(element) {
            if let Some(form) = self.form_owner(element) {
                return Ok(Effect::Navigate(self.submission(form, Some(element), document)?));
            }
        }
        Ok(Effect::None)
    }

    fn find(&self, context: Option<ElementRef<'a>>, locator: &Locator) -> Result<Vec<usize>> {
        let found = match locator {
            Locator::Css(css) => {
                let selector = Selector::parse(css)
                    .map_err(|e| Error::webdriver(format!("invalid selector {}: {:?}", css, e)))?;
                match context {
                    Some(element) => element.select(&selector).collect::<Vec<_>>(),
                    None => self.html.select(&selector).collect(),
                }
            }
            Locator::XPath(expression) => self.evaluate_xpath(context, expression)?,
        };

        let mut ordinals: Vec<usize> = found
            .into_iter()
            .filter(|e| self.is_present(*e))
            .map(|e| self.ordinal(e))
            .collect();
        ordinals.sort_unstable();
        ordinals.dedup();
        Ok(ordinals)
    }

    /// Location paths made of `axis::name` steps, `name`, `.` and `..`; no predicates
    fn evaluate_xpath(&self, context: Option<ElementRef<'a>>, expression: &str) -> Result<Vec<ElementRef<'a>>> {
        let unsupported = || Error::webdriver(format!("unsupported XPath expression: {}", expression));
        let expression = expression.trim();
        if expression.contains('[') || expression.contains('(') || expression.contains('|') {
            return Err(unsupported());
        }

        // `None` stands for the document node
        let mut current: Vec<Option<ElementRef<'a>>> = if expression.starts_with('/') {
            vec![None]
        } else {
            vec![context]
        };

        let mut rest = expression;
        while !rest.is_empty() {
            let descendant = rest.starts_with("//");
            rest = rest.trim_start_matches('/');
            let end = rest.find('/').unwrap_or(rest.len());
            let step = &rest[..end];
            rest = &rest[end..];
            if step.is_empty() {
                return Err(unsupported());
            }

            let (axis, test) = match step.split_once("::") {
                Some((_, _)) if descendant => return Err(unsupported()),
                Some((axis, test)) => (axis, test),
                None if step == "." => ("self", "*"),
                None if step == ".." => ("parent", "*"),
                None if descendant => ("descendant", step),
                None => ("child", step),
            };

            let mut next = Vec::new();
            for node in &current {
                for candidate in self.axis(*node, axis).ok_or_else(unsupported)? {
                    if test == "*" || candidate.value().name().eq_ignore_ascii_case(test) {
                        next.push(Some(candidate));
                    }
                }
            }
            current = next;
        }

        Ok(current.into_iter().flatten().collect())
    }

    fn axis(&self, node: Option<ElementRef<'a>>, axis: &str) -> Option<Vec<ElementRef<'a>>> {
        let Some(element) = node else {
            let root = self.html.root_element();
            return match axis {
                "child" => Some(vec![root]),
                "descendant" | "descendant-or-self" => Some(self.order.clone()),
                "self" => Some(Vec::new()),
                _ => None,
            };
        };

        let elements = match axis {
            "child" => element.children().filter_map(ElementRef::wrap).collect(),
            "descendant" => element.descendants().skip(1).filter_map(ElementRef::wrap).collect(),
            "descendant-or-self" => element.descendants().filter_map(ElementRef::wrap).collect(),
            "parent" => element.parent().and_then(ElementRef::wrap).into_iter().collect(),
            "ancestor" => element.ancestors().filter_map(ElementRef::wrap).collect(),
            "following-sibling" => element.next_siblings().filter_map(ElementRef::wrap).collect(),
            "preceding-sibling" => element.prev_siblings().filter_map(ElementRef::wrap).collect(),
            "self" => vec![element],
            _ => return None,
        };
        Some(elements)
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
