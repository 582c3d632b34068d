//! Remote browser boundary traits
//!
//! This module defines the abstract interfaces to a WebDriver session. The wire
//! protocol itself lives in the WebDriver client library.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::types::{Capabilities, Cookie, Locator};

/// One live remote browser session
#[async_trait]
pub trait RemoteSession: Send + Sync + std::fmt::Debug {
    /// Opaque session identifier owned by the driver
    fn id(&self) -> &str;

    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> Result<(), crate::Error>;

    /// Current browser URL
    async fn current_url(&self) -> Result<String, crate::Error>;

    /// Serialized page source
    async fn source(&self) -> Result<String, crate::Error>;

    /// Find all elements matching a locator, in document order
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Arc<dyn RemoteElement>>, crate::Error>;

    /// Go back in history
    async fn back(&self) -> Result<(), crate::Error>;

    /// Go forward in history
    async fn forward(&self) -> Result<(), crate::Error>;

    /// Reload the current page
    async fn refresh(&self) -> Result<(), crate::Error>;

    /// Execute synchronous JavaScript
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, crate::Error>;

    /// Execute asynchronous JavaScript (last argument is the callback)
    async fn execute_async(&self, script: &str, args: Vec<Value>) -> Result<Value, crate::Error>;

    /// All cookies visible to the current page
    async fn cookies(&self) -> Result<Vec<Cookie>, crate::Error>;

    async fn add_cookie(&self, cookie: Cookie) -> Result<(), crate::Error>;

    async fn delete_cookie(&self, name: &str) -> Result<(), crate::Error>;

    async fn delete_all_cookies(&self) -> Result<(), crate::Error>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>, crate::Error>;

    /// End the session
    async fn quit(&self) -> Result<(), crate::Error>;
}

/// Handle to an element in a remote document
#[async_trait]
pub trait RemoteElement: Send + Sync + std::fmt::Debug {
    /// Web element reference
    fn id(&self) -> &str;

    /// Find descendants (CSS) or evaluate an XPath rooted at this element
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Arc<dyn RemoteElement>>, crate::Error>;

    /// Rendered text
    async fn text(&self) -> Result<String, crate::Error>;

    /// Attribute as written in the markup
    async fn attr(&self, name: &str) -> Result<Option<String>, crate::Error>;

    /// Live DOM property (`value`, `checked`, ...)
    async fn prop(&self, name: &str) -> Result<Option<String>, crate::Error>;

    /// Inner or outer HTML
    async fn html(&self, inner: bool) -> Result<String, crate::Error>;

    async fn tag_name(&self) -> Result<String, crate::Error>;

    async fn click(&self) -> Result<(), crate::Error>;

    async fn send_keys(&self, text: &str) -> Result<(), crate::Error>;

    async fn clear(&self) -> Result<(), crate::Error>;

    async fn is_selected(&self) -> Result<bool, crate::Error>;

    async fn is_enabled(&self) -> Result<bool, crate::Error>;

    async fn is_displayed(&self) -> Result<bool, crate::Error>;

    /// Submit the enclosing form natively (no submit button)
    async fn submit(&self) -> Result<(), crate::Error>;
}

/// Opens sessions against a WebDriver endpoint
#[async_trait]
pub trait SessionConnector: Send + Sync + std::fmt::Debug {
    async fn connect(
        &self,
        url: &str,
        capabilities: Capabilities,
    ) -> Result<Arc<dyn RemoteSession>, crate::Error>;
}
