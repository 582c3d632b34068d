//! Suite context
//!
//! Owns the web server, the browser manager and every client created during a
//! test run, and tears them down in order. One context per suite; nothing is
//! kept in statics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::screenshot::ErrorScreenshots;
use crate::client::{Client, ClientOptions};
use crate::config::Config;
use crate::process::{
    shared, BrowserFamily, LocalDriverManager, RemoteDriverManager, SharedBrowserManager,
    WebServerManager, WebServerOptions,
};
use crate::webdriver::SessionConnector;
use crate::{Error, Result};

/// When sessions and processes are recycled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleMode {
    /// Keep the driver and primary session for the whole suite
    #[default]
    PerSuite,
    /// Tear everything down after each test
    PerTest,
}

/// Test lifecycle coordinator
#[derive(Debug)]
pub struct SuiteContext {
    config: Config,
    connector: Arc<dyn SessionConnector>,
    mode: LifecycleMode,
    web_server: Option<WebServerManager>,
    manager: Option<SharedBrowserManager>,
    clients: Vec<Client>,
    screenshots: ErrorScreenshots,
}

impl SuiteContext {
    pub fn new(config: Config, connector: Arc<dyn SessionConnector>) -> Self {
        let screenshots = ErrorScreenshots::from_config(&config);
        Self {
            config,
            connector,
            mode: LifecycleMode::default(),
            web_server: None,
            manager: None,
            clients: Vec::new(),
            screenshots,
        }
    }

    pub fn with_mode(mut self, mode: LifecycleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Use this manager instead of building one from the configuration
    pub fn with_manager(mut self, manager: SharedBrowserManager) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_screenshots(mut self, screenshots: ErrorScreenshots) -> Self {
        self.screenshots = screenshots;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> LifecycleMode {
        self.mode
    }

    pub fn base_uri(&self) -> String {
        self.config.base_uri()
    }

    /// Start the web server once; skipped when the app is served externally
    pub async fn start_web_server(&mut self) -> Result<()> {
        if let Some(uri) = &self.config.external_base_uri {
            debug!("Using external application at {}", uri);
            return Ok(());
        }

        if self.web_server.is_none() {
            let options = WebServerOptions::from_config(&self.config);
            self.web_server = Some(WebServerManager::new(options)?);
        }
        match self.web_server.as_mut() {
            Some(server) => server.start().await,
            None => Err(Error::internal("Web server manager missing after creation")),
        }
    }

    pub fn is_web_server_started(&mut self) -> bool {
        self.web_server
            .as_mut()
            .map(WebServerManager::is_started)
            .unwrap_or(false)
    }

    /// Shared browser manager, built from the configuration on first use
    pub fn browser_manager(&mut self) -> Result<SharedBrowserManager> {
        if let Some(manager) = &self.manager {
            return Ok(manager.clone());
        }

        let manager = match &self.config.selenium_host {
            Some(host) => {
                let capabilities = BrowserFamily::from_config(&self.config)?.capabilities();
                info!("Using remote WebDriver endpoint {}", host);
                shared(RemoteDriverManager::new(host.clone(), capabilities, self.connector.clone()))
            }
            None => shared(LocalDriverManager::from_config(&self.config, self.connector.clone())?),
        };
        self.manager = Some(manager.clone());
        Ok(manager)
    }

    /// Open a new session; the first one becomes the primary client
    pub async fn create_client(&mut self, mut options: ClientOptions) -> Result<Client> {
        self.start_web_server().await?;
        if options.base_uri.is_none() {
            options.base_uri = Some(self.base_uri());
        }

        let client = Client::new(self.browser_manager()?, options);
        client.start().await?;
        self.clients.push(client.clone());
        debug!("Client {} created", self.clients.len());
        Ok(client)
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn primary_client(&self) -> Option<&Client> {
        self.clients.first()
    }

    /// Screenshot every client after a failed test; never fails
    pub async fn on_test_failure(&self, test_id: &str, failure_type: &str) -> Vec<PathBuf> {
        self.screenshots.capture(&self.clients, test_id, failure_type).await
    }

    /// Reset state between tests according to the lifecycle mode
    pub async fn end_test(&mut self) -> Result<()> {
        match self.mode {
            LifecycleMode::PerTest => self.teardown().await,
            LifecycleMode::PerSuite => {
                if self.clients.is_empty() {
                    return Ok(());
                }
                for client in self.clients.drain(1..) {
                    if let Err(e) = client.quit(false).await {
                        warn!("Failed to quit additional client: {}", e);
                    }
                }
                match self.clients.first() {
                    Some(primary) => primary.restart().await,
                    None => Ok(()),
                }
            }
        }
    }

    /// Quit every session, then the browser manager, then the web server.
    ///
    /// Every step runs even if an earlier one failed; the first error is returned.
    pub async fn teardown(&mut self) -> Result<()> {
        for client in self.clients.drain(..) {
            if let Err(e) = client.quit(false).await {
                warn!("Failed to quit client: {}", e);
            }
        }

        let mut first_error = None;

        // The manager stays registered; its next start spawns a fresh driver
        if let Some(manager) = &self.manager {
            let mut manager = manager.lock().await;
            info!("Stopping {}", manager.name());
            if let Err(e) = manager.quit().await {
                warn!("Failed to stop {}: {}", manager.name(), e);
                first_error.get_or_insert(e);
            }
        }

        if let Some(mut server) = self.web_server.take() {
            let stopped = match server.quit().await {
                Ok(()) => {
                    server
                        .wait_until_port_released(Duration::from_millis(self.config.startup_timeout))
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = stopped {
                warn!("Failed to stop the web server: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
