//! Session client
//!
//! `Client` is a cheap handle over one remote browser session. The session is
//! opened lazily through the shared browser manager, and every call that can
//! change the page replaces the stored crawler.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::request::Request;
use super::wait::{ConditionKind, WaitCondition, DEFAULT_WAIT_INTERVAL, DEFAULT_WAIT_TIMEOUT};
use crate::config::Config;
use crate::dom::{Crawler, Form, FormValue, Link};
use crate::process::SharedBrowserManager;
use crate::webdriver::{Cookie, Locator, RemoteSession};
use crate::{Error, Result};

/// Per-client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Relative URIs are joined onto this
    pub base_uri: Option<String>,
    pub wait_timeout: Duration,
    pub wait_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_uri: None,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            wait_interval: DEFAULT_WAIT_INTERVAL,
        }
    }
}

impl ClientOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_uri: Some(config.base_uri()),
            wait_timeout: Duration::from_millis(config.wait_timeout),
            wait_interval: Duration::from_millis(config.wait_interval),
        }
    }

    pub fn with_base_uri<S: Into<String>>(mut self, base_uri: S) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }
}

#[derive(Debug, Default)]
struct ClientState {
    session: Option<Arc<dyn RemoteSession>>,
    crawler: Option<Crawler>,
    closed: bool,
}

/// Browser-kit style client driving one remote session
#[derive(Debug, Clone)]
pub struct Client {
    manager: SharedBrowserManager,
    state: Arc<Mutex<ClientState>>,
    options: Arc<ClientOptions>,
}

impl Client {
    pub fn new(manager: SharedBrowserManager, options: ClientOptions) -> Self {
        Self {
            manager,
            state: Arc::new(Mutex::new(ClientState::default())),
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn manager(&self) -> &SharedBrowserManager {
        &self.manager
    }

    /// Open the session now instead of on first use
    pub async fn start(&self) -> Result<()> {
        self.session().await.map(|_| ())
    }

    /// Whether a session is currently open
    pub async fn is_started(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    /// Live session, opened through the manager on first use
    pub async fn session(&self) -> Result<Arc<dyn RemoteSession>> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(Error::session_closed("The client has been quit"));
        }
        if let Some(session) = &state.session {
            return Ok(session.clone());
        }

        let mut manager = self.manager.lock().await;
        let session = manager.start().await?;
        info!("Opened session {} on {}", session.id(), manager.name());
        state.session = Some(session.clone());
        Ok(session)
    }

    fn resolve_uri(&self, uri: &str) -> Result<String> {
        match Url::parse(uri) {
            Ok(url) => Ok(url.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.options.base_uri.as_deref().ok_or_else(|| {
                    Error::configuration(format!("Cannot resolve \"{}\" without a base URI", uri))
                })?;
                Ok(Url::parse(base)?.join(uri)?.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the stored crawler with the current document
    async fn snapshot(&self, session: Arc<dyn RemoteSession>) -> Result<Crawler> {
        let root = session.find_all(&Locator::xpath("/html")).await?;
        let uri = session.current_url().await?;
        let crawler = Crawler::new(root, uri, session);
        self.state.lock().await.crawler = Some(crawler.clone());
        Ok(crawler)
    }

    // ---- navigation ----

    /// Navigate to `uri`, relative ones resolved against the base URI
    pub async fn get(&self, uri: &str) -> Result<Crawler> {
        let session = self.session().await?;
        let url = self.resolve_uri(uri)?;
        debug!("GET {}", url);
        session.goto(&url).await?;
        self.snapshot(session).await
    }

    /// Replay a request; the browser can only do plain GET navigations
    pub async fn request(&self, request: Request) -> Result<Crawler> {
        request.ensure_navigable()?;
        self.get(&request.uri).await
    }

    pub async fn click(&self, link: &Link) -> Result<Crawler> {
        match link {
            Link::Remote(link) => {
                let session = self.session().await?;
                link.element().click().await?;
                self.snapshot(session).await
            }
            Link::Static(link) => self.get(link.uri()).await,
        }
    }

    /// Click the first link whose text or image alt matches `text`
    pub async fn click_link(&self, text: &str) -> Result<Crawler> {
        let link = self.crawler().await?.select_link(text).await?.link().await?;
        self.click(&link).await
    }

    /// Apply `values` and submit through the browser
    pub async fn submit(&self, mut form: Form, values: &[(String, FormValue)]) -> Result<Crawler> {
        form.set_values(values).await?;
        match form {
            Form::Remote(form) => {
                let session = self.session().await?;
                form.submit().await?;
                self.snapshot(session).await
            }
            Form::Static(form) => {
                if form.method() != "GET" {
                    return Err(Error::unsupported(format!(
                        "Static {} forms cannot be submitted by the browser",
                        form.method()
                    )));
                }
                self.get(&form.uri()?).await
            }
        }
    }

    /// Submit the form owning the button matching `button`
    pub async fn submit_form(&self, button: &str, values: &[(String, FormValue)]) -> Result<Crawler> {
        let form = self.crawler().await?.select_button(button).await?.form(None).await?;
        self.submit(form, values).await
    }

    pub async fn back(&self) -> Result<Crawler> {
        let session = self.session().await?;
        session.back().await?;
        self.snapshot(session).await
    }

    pub async fn forward(&self) -> Result<Crawler> {
        let session = self.session().await?;
        session.forward().await?;
        self.snapshot(session).await
    }

    pub async fn reload(&self) -> Result<Crawler> {
        let session = self.session().await?;
        session.refresh().await?;
        self.snapshot(session).await
    }

    pub fn follow_redirect(&self) -> Result<Crawler> {
        Err(Error::unsupported("The browser follows redirects by itself"))
    }

    /// Redirects are always followed; turning that off is unsupported
    pub fn follow_redirects(&self, follow: bool) -> Result<()> {
        if follow {
            Ok(())
        } else {
            Err(Error::unsupported("The browser always follows redirects"))
        }
    }

    pub fn history(&self) -> Result<Vec<String>> {
        Err(Error::unsupported("Browser history is not exposed"))
    }

    pub fn internal_request(&self) -> Result<Request> {
        Err(Error::unsupported("The underlying request is not available"))
    }

    pub fn internal_response(&self) -> Result<String> {
        Err(Error::unsupported("The underlying response is not available"))
    }

    // ---- session control ----

    /// Fresh session on the same driver, cookies cleared first
    pub async fn restart(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock().await;
            state.crawler = None;
            state.closed = false;
            state.session.take()
        };
        if let Some(session) = previous {
            if let Err(e) = session.delete_all_cookies().await {
                warn!("Failed to clear cookies of session {}: {}", session.id(), e);
            }
            if let Err(e) = session.quit().await {
                warn!("Failed to quit session {}: {}", session.id(), e);
            }
        }
        self.start().await
    }

    /// End the session, and the driver too when `stop_driver` is set
    pub async fn quit(&self, stop_driver: bool) -> Result<()> {
        let session = {
            let mut state = self.state.lock().await;
            state.closed = true;
            state.crawler = None;
            state.session.take()
        };
        if let Some(session) = session {
            info!("Quitting session {}", session.id());
            if let Err(e) = session.quit().await {
                warn!("Failed to quit session {}: {}", session.id(), e);
            }
        }
        if stop_driver {
            self.manager.lock().await.quit().await?;
        }
        Ok(())
    }

    /// Whether the session still answers
    pub async fn ping(&self) -> bool {
        let session = self.state.lock().await.session.clone();
        match session {
            Some(session) => session.current_url().await.is_ok(),
            None => false,
        }
    }

    pub async fn current_url(&self) -> Result<String> {
        self.session().await?.current_url().await
    }

    /// Last crawler, or a snapshot of the current document if none is stored
    pub async fn crawler(&self) -> Result<Crawler> {
        if let Some(crawler) = self.state.lock().await.crawler.clone() {
            return Ok(crawler);
        }
        self.refresh_crawler().await
    }

    pub async fn refresh_crawler(&self) -> Result<Crawler> {
        let session = self.session().await?;
        self.snapshot(session).await
    }

    // ---- scripts ----

    pub async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let session = self.session().await?;
        let value = session.execute(script, args).await?;
        self.snapshot(session).await?;
        Ok(value)
    }

    pub async fn execute_async_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let session = self.session().await?;
        let value = session.execute_async(script, args).await?;
        self.snapshot(session).await?;
        Ok(value)
    }

    /// PNG of the viewport, also written to `path` when given
    pub async fn take_screenshot(&self, path: Option<&Path>) -> Result<Vec<u8>> {
        let png = self.session().await?.screenshot().await?;
        if let Some(path) = path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, &png).await?;
            debug!("Screenshot saved to {}", path.display());
        }
        Ok(png)
    }

    // ---- cookies ----

    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        self.session().await?.cookies().await
    }

    pub async fn cookie(&self, name: &str) -> Result<Option<Cookie>> {
        Ok(self.cookies().await?.into_iter().find(|cookie| cookie.name == name))
    }

    pub async fn set_cookie(&self, cookie: Cookie) -> Result<()> {
        self.session().await?.add_cookie(cookie).await
    }

    pub async fn delete_cookie(&self, name: &str) -> Result<()> {
        self.session().await?.delete_cookie(name).await
    }

    pub async fn clear_cookies(&self) -> Result<()> {
        self.session().await?.delete_all_cookies().await
    }

    // ---- waits ----

    fn condition(&self, selector: &str, kind: ConditionKind, timeout: Option<Duration>) -> WaitCondition {
        WaitCondition::new(selector, kind)
            .timeout(timeout.unwrap_or(self.options.wait_timeout))
            .interval(self.options.wait_interval)
    }

    /// Poll `condition`, then return a fresh crawler
    pub async fn wait(&self, condition: &WaitCondition) -> Result<Crawler> {
        let session = self.session().await?;
        if let Err(e) = condition.wait(&session).await {
            if e.is_timeout() {
                warn!("{}", e);
            }
            return Err(e);
        }
        self.snapshot(session).await
    }

    /// Wait for an element matching `selector` to be present
    pub async fn wait_for(
        &self,
        selector: &str,
        timeout: Option<Duration>,
        interval: Option<Duration>,
    ) -> Result<Crawler> {
        let condition = self
            .condition(selector, ConditionKind::Present, timeout)
            .interval(interval.unwrap_or(self.options.wait_interval));
        self.wait(&condition).await
    }

    pub async fn wait_for_visibility(&self, selector: &str, timeout: Option<Duration>) -> Result<Crawler> {
        self.wait(&self.condition(selector, ConditionKind::Visible, timeout)).await
    }

    pub async fn wait_for_invisibility(&self, selector: &str, timeout: Option<Duration>) -> Result<Crawler> {
        self.wait(&self.condition(selector, ConditionKind::Invisible, timeout)).await
    }

    pub async fn wait_for_element_to_contain(
        &self,
        selector: &str,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<Crawler> {
        let kind = ConditionKind::ContainsText(text.to_string());
        self.wait(&self.condition(selector, kind, timeout)).await
    }

    pub async fn wait_for_element_to_not_contain(
        &self,
        selector: &str,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<Crawler> {
        let kind = ConditionKind::NotContainsText(text.to_string());
        self.wait(&self.condition(selector, kind, timeout)).await
    }

    pub async fn wait_for_attribute_to_contain(
        &self,
        selector: &str,
        attribute: &str,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<Crawler> {
        let kind = ConditionKind::AttributeContains {
            attribute: attribute.to_string(),
            text: text.to_string(),
        };
        self.wait(&self.condition(selector, kind, timeout)).await
    }

    pub async fn wait_for_attribute_to_not_contain(
        &self,
        selector: &str,
        attribute: &str,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<Crawler> {
        let kind = ConditionKind::AttributeNotContains {
            attribute: attribute.to_string(),
            text: text.to_string(),
        };
        self.wait(&self.condition(selector, kind, timeout)).await
    }

    pub async fn wait_for_enabled(&self, selector: &str, timeout: Option<Duration>) -> Result<Crawler> {
        self.wait(&self.condition(selector, ConditionKind::Enabled, timeout)).await
    }

    pub async fn wait_for_disabled(&self, selector: &str, timeout: Option<Duration>) -> Result<Crawler> {
        self.wait(&self.condition(selector, ConditionKind::Disabled, timeout)).await
    }

    /// Wait for the element currently matching `selector` to leave the document
    pub async fn wait_for_staleness(&self, selector: &str, timeout: Option<Duration>) -> Result<Crawler> {
        self.wait(&self.condition(selector, ConditionKind::Stale, timeout)).await
    }
}
