//! Links: live element or static target

use std::sync::Arc;

use super::static_page::StaticLink;
use crate::webdriver::RemoteElement;

/// Link backed by a live element
#[derive(Debug, Clone)]
pub struct RemoteLink {
    element: Arc<dyn RemoteElement>,
    uri: String,
}

impl RemoteLink {
    pub fn new<S: Into<String>>(element: Arc<dyn RemoteElement>, uri: S) -> Self {
        Self {
            element,
            uri: uri.into(),
        }
    }

    pub fn element(&self) -> &Arc<dyn RemoteElement> {
        &self.element
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Link to follow with `Client::click`
#[derive(Debug, Clone)]
pub enum Link {
    /// Clicked natively in the browser
    Remote(RemoteLink),
    /// Followed by navigating to its URI
    Static(StaticLink),
}

impl Link {
    /// Absolute target URI
    pub fn uri(&self) -> &str {
        match self {
            Link::Remote(link) => link.uri(),
            Link::Static(link) => link.uri(),
        }
    }

    pub fn method(&self) -> &'static str {
        "GET"
    }
}

impl From<StaticLink> for Link {
    fn from(link: StaticLink) -> Self {
        Link::Static(link)
    }
}

impl From<RemoteLink> for Link {
    fn from(link: RemoteLink) -> Self {
        Link::Remote(link)
    }
}
