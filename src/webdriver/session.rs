//! WebDriver session implementation backed by fantoccini

use async_trait::async_trait;
use fantoccini::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::{RemoteElement, RemoteSession};
use super::types::{Cookie, Locator};
use crate::Error;

fn to_locator(locator: &Locator) -> fantoccini::Locator<'_> {
    match locator {
        Locator::Css(css) => fantoccini::Locator::Css(css),
        Locator::XPath(xpath) => fantoccini::Locator::XPath(xpath),
    }
}

/// Remote session implementation
#[derive(Debug, Clone)]
pub struct RemoteSessionImpl {
    id: String,
    client: Client,
}

impl RemoteSessionImpl {
    /// Wrap a connected client
    pub async fn new(client: Client) -> Result<Self, Error> {
        let id = client
            .session_id()
            .await?
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        info!("WebDriver session {} opened", id);
        Ok(Self { id, client })
    }

    fn wrap(&self, elements: Vec<fantoccini::elements::Element>) -> Vec<Arc<dyn RemoteElement>> {
        elements
            .into_iter()
            .map(|element| {
                Arc::new(RemoteElementImpl::new(self.client.clone(), element)) as Arc<dyn RemoteElement>
            })
            .collect()
    }
}

#[async_trait]
impl RemoteSession for RemoteSessionImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn goto(&self, url: &str) -> Result<(), Error> {
        debug!("Session {} navigating to {}", self.id, url);
        self.client.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, Error> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn source(&self) -> Result<String, Error> {
        Ok(self.client.source().await?)
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Arc<dyn RemoteElement>>, Error> {
        let elements = self.client.find_all(to_locator(locator)).await?;
        Ok(self.wrap(elements))
    }

    async fn back(&self) -> Result<(), Error> {
        self.client.back().await?;
        Ok(())
    }

    async fn forward(&self) -> Result<(), Error> {
        self.client.forward().await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), Error> {
        self.client.refresh().await?;
        Ok(())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, Error> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn execute_async(&self, script: &str, args: Vec<Value>) -> Result<Value, Error> {
        Ok(self.client.execute_async(script, args).await?)
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, Error> {
        let cookies = self.client.get_all_cookies().await?;
        Ok(cookies
            .iter()
            .map(|c| Cookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                path: c.path().map(str::to_string),
                domain: c.domain().map(str::to_string),
                secure: c.secure().unwrap_or(false),
                http_only: c.http_only().unwrap_or(false),
            })
            .collect())
    }

    async fn add_cookie(&self, cookie: Cookie) -> Result<(), Error> {
        let mut remote = fantoccini::cookies::Cookie::new(cookie.name, cookie.value);
        if let Some(path) = cookie.path {
            remote.set_path(path);
        }
        if let Some(domain) = cookie.domain {
            remote.set_domain(domain);
        }
        remote.set_secure(cookie.secure);
        remote.set_http_only(cookie.http_only);
        self.client.add_cookie(remote).await?;
        Ok(())
    }

    async fn delete_cookie(&self, name: &str) -> Result<(), Error> {
        self.client.delete_cookie(name).await?;
        Ok(())
    }

    async fn delete_all_cookies(&self) -> Result<(), Error> {
        self.client.delete_all_cookies().await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        Ok(self.client.screenshot().await?)
    }

    async fn quit(&self) -> Result<(), Error> {
        info!("Closing WebDriver session {}", self.id);
        self.client.clone().close().await?;
        Ok(())
    }
}

/// Remote element implementation
#[derive(Debug, Clone)]
pub struct RemoteElementImpl {
    id: String,
    client: Client,
    element: fantoccini::elements::Element,
}

impl RemoteElementImpl {
    pub fn new(client: Client, element: fantoccini::elements::Element) -> Self {
        Self {
            id: element.element_id().to_string(),
            client,
            element,
        }
    }
}

#[async_trait]
impl RemoteElement for RemoteElementImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Arc<dyn RemoteElement>>, Error> {
        let elements = self.element.find_all(to_locator(locator)).await?;
        Ok(elements
            .into_iter()
            .map(|element| {
                Arc::new(RemoteElementImpl::new(self.client.clone(), element)) as Arc<dyn RemoteElement>
            })
            .collect())
    }

    async fn text(&self) -> Result<String, Error> {
        Ok(self.element.text().await?)
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, Error> {
        Ok(self.element.attr(name).await?)
    }

    async fn prop(&self, name: &str) -> Result<Option<String>, Error> {
        Ok(self.element.prop(name).await?)
    }

    async fn html(&self, inner: bool) -> Result<String, Error> {
        Ok(self.element.html(inner).await?)
    }

    async fn tag_name(&self) -> Result<String, Error> {
        Ok(self.element.tag_name().await?.to_lowercase())
    }

    async fn click(&self) -> Result<(), Error> {
        self.element.click().await?;
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<(), Error> {
        self.element.send_keys(text).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.element.clear().await?;
        Ok(())
    }

    async fn is_selected(&self) -> Result<bool, Error> {
        Ok(self.element.is_selected().await?)
    }

    async fn is_enabled(&self) -> Result<bool, Error> {
        Ok(self.element.is_enabled().await?)
    }

    async fn is_displayed(&self) -> Result<bool, Error> {
        Ok(self.element.is_displayed().await?)
    }

    async fn submit(&self) -> Result<(), Error> {
        let target = serde_json::to_value(&self.element)?;
        self.client
            .execute(
                "var el = arguments[0]; (el.form || el).submit();",
                vec![target],
            )
            .await?;
        Ok(())
    }
}
