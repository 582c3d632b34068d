//! Local browser driver manager (chromedriver, geckodriver)

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::browser::{resolve_driver_binary, BrowserFamily};
use super::managed::{ManagedProcess, ProcessCommand};
use super::traits::BrowserManager;
use crate::config::Config;
use crate::webdriver::{RemoteSession, SessionConnector};
use crate::Result;

/// Where and how the driver process listens
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    pub host: String,
    pub port: u16,
    /// Status endpoint probed for readiness
    pub status_path: String,
    pub startup_timeout: Duration,
    pub env: HashMap<String, String>,
}

impl DriverOptions {
    pub fn for_family(family: &BrowserFamily) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: family.default_port(),
            status_path: "/status".to_string(),
            startup_timeout: Duration::from_secs(30),
            env: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config, family: &BrowserFamily) -> Self {
        Self {
            startup_timeout: Duration::from_millis(config.startup_timeout),
            ..Self::for_family(family)
        }
    }
}

/// Spawns a driver binary and opens sessions against it
#[derive(Debug)]
pub struct LocalDriverManager {
    family: BrowserFamily,
    driver_binary: PathBuf,
    options: DriverOptions,
    connector: Arc<dyn SessionConnector>,
    process: Option<ManagedProcess>,
}

impl LocalDriverManager {
    /// Create a manager; `driver_binary` falls back to the OS default
    pub fn new(
        family: BrowserFamily,
        driver_binary: Option<PathBuf>,
        options: DriverOptions,
        connector: Arc<dyn SessionConnector>,
    ) -> Self {
        let driver_binary = resolve_driver_binary(driver_binary, None, family.driver_name());
        Self {
            family,
            driver_binary,
            options,
            connector,
            process: None,
        }
    }

    /// Family, driver binary override and timeouts from `config`
    pub fn from_config(config: &Config, connector: Arc<dyn SessionConnector>) -> Result<Self> {
        let family = BrowserFamily::from_config(config)?;
        let driver_binary = resolve_driver_binary(
            None,
            family.driver_binary_override(config),
            family.driver_name(),
        );
        let options = DriverOptions::from_config(config, &family);
        Ok(Self {
            family,
            driver_binary,
            options,
            connector,
            process: None,
        })
    }

    /// Explicit driver binary, taking precedence over any override
    pub fn with_driver_binary<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.driver_binary = path.into();
        self
    }

    pub fn family(&self) -> &BrowserFamily {
        &self.family
    }

    pub fn driver_binary(&self) -> &Path {
        &self.driver_binary
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// WebDriver endpoint
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.options.host, self.options.port)
    }

    /// Driver process id while running
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(ManagedProcess::pid)
    }

    fn command(&self) -> ProcessCommand {
        let mut command = ProcessCommand::new(&self.driver_binary).arg(format!("--port={}", self.options.port));
        for (key, value) in &self.options.env {
            command = command.env(key, value);
        }
        command
    }

    async fn ensure_process(&mut self) -> Result<()> {
        if let Some(process) = self.process.as_mut() {
            if process.is_running() {
                return Ok(());
            }
        }

        let status_url = format!("{}{}", self.url(), self.options.status_path);
        let mut process = ManagedProcess::new(
            self.family.driver_name(),
            self.command(),
            self.options.host.clone(),
            self.options.port,
            status_url,
        )
        .startup_timeout(self.options.startup_timeout);

        process.start().await?;
        self.process = Some(process);
        Ok(())
    }
}

#[async_trait]
impl BrowserManager for LocalDriverManager {
    async fn start(&mut self) -> Result<Arc<dyn RemoteSession>> {
        self.ensure_process().await?;

        let session = self
            .connector
            .connect(&self.url(), self.family.capabilities())
            .await?;
        info!("{} session {} created", self.family.name(), session.id());
        Ok(session)
    }

    async fn quit(&mut self) -> Result<()> {
        if let Some(mut process) = self.process.take() {
            process.stop().await?;
        }
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.process.as_mut().map(ManagedProcess::is_running).unwrap_or(false)
    }

    fn name(&self) -> &str {
        self.family.driver_name()
    }
}
