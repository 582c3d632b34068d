//! Manager for an already running WebDriver endpoint (e.g. a Selenium hub)

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::traits::BrowserManager;
use crate::webdriver::{Capabilities, RemoteSession, SessionConnector};
use crate::Result;

/// No subprocess: sessions are requested from `url` directly
#[derive(Debug)]
pub struct RemoteDriverManager {
    url: String,
    capabilities: Capabilities,
    connector: Arc<dyn SessionConnector>,
    running: bool,
}

impl RemoteDriverManager {
    pub fn new<S: Into<String>>(
        url: S,
        capabilities: Capabilities,
        connector: Arc<dyn SessionConnector>,
    ) -> Self {
        Self {
            url: url.into(),
            capabilities,
            connector,
            running: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BrowserManager for RemoteDriverManager {
    async fn start(&mut self) -> Result<Arc<dyn RemoteSession>> {
        let session = self.connector.connect(&self.url, self.capabilities.clone()).await?;
        self.running = true;
        info!("Remote session {} created on {}", session.id(), self.url);
        Ok(session)
    }

    async fn quit(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.running
    }

    fn name(&self) -> &str {
        "remote"
    }
}
