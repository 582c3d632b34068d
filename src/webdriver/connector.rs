//! Session connector for real WebDriver endpoints

use async_trait::async_trait;
use fantoccini::ClientBuilder;
use std::sync::Arc;
use tracing::{debug, info};

use super::session::RemoteSessionImpl;
use super::traits::{RemoteSession, SessionConnector};
use super::types::Capabilities;
use crate::Error;

/// Opens fantoccini sessions
#[derive(Debug, Clone, Default)]
pub struct WebDriverConnector;

impl WebDriverConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionConnector for WebDriverConnector {
    async fn connect(&self, url: &str, capabilities: Capabilities) -> Result<Arc<dyn RemoteSession>, Error> {
        info!("Requesting new session from {}", url);
        debug!("Capabilities: {}", serde_json::Value::Object(capabilities.clone()));

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(url)
            .await?;

        Ok(Arc::new(RemoteSessionImpl::new(client).await?))
    }
}
