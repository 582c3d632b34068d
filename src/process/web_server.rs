//! Web server manager for the application under test

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::managed::{ManagedProcess, ProcessCommand};
use super::probe;
use crate::config::Config;
use crate::{Error, Result};

/// Default argument template of the built-in development server
pub const DEFAULT_ARGUMENTS: [&str; 5] = ["-S", "{host}:{port}", "-t", "{docroot}", "{router}"];

/// Web server options
#[derive(Debug, Clone, PartialEq)]
pub struct WebServerOptions {
    pub hostname: String,
    pub port: u16,
    pub document_root: PathBuf,
    pub router: Option<PathBuf>,
    /// Path probed for readiness; empty means the server root
    pub readiness_path: String,
    /// Interpreter name (looked up on `PATH`) or path
    pub runtime: String,
    /// Argument template with `{host}`, `{port}`, `{docroot}` and `{router}` placeholders
    pub arguments: Vec<String>,
    pub env: HashMap<String, String>,
    pub startup_timeout: Duration,
}

impl Default for WebServerOptions {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 9080,
            document_root: PathBuf::from("./public"),
            router: None,
            readiness_path: String::new(),
            runtime: "php".to_string(),
            arguments: DEFAULT_ARGUMENTS.iter().map(|s| s.to_string()).collect(),
            env: HashMap::new(),
            startup_timeout: Duration::from_secs(30),
        }
    }
}

impl WebServerOptions {
    pub fn from_config(config: &Config) -> Self {
        let mut env = HashMap::new();
        env.insert("APP_ENV".to_string(), config.app_env.clone());

        Self {
            hostname: config.web_server_host.clone(),
            port: config.web_server_port,
            document_root: config.web_server_dir.clone(),
            router: config.web_server_router.clone(),
            readiness_path: config.readiness_path.clone(),
            runtime: config.web_server_runtime.clone(),
            env,
            startup_timeout: Duration::from_millis(config.startup_timeout),
            ..Default::default()
        }
    }
}

/// Starts and stops the web server process
#[derive(Debug)]
pub struct WebServerManager {
    options: WebServerOptions,
    runtime: PathBuf,
    process: Option<ManagedProcess>,
}

impl WebServerManager {
    /// Resolve the runtime now: a missing interpreter fails here, not in `start`
    pub fn new(options: WebServerOptions) -> Result<Self> {
        let runtime = resolve_runtime(&options.runtime)?;
        Ok(Self {
            options,
            runtime,
            process: None,
        })
    }

    pub fn options(&self) -> &WebServerOptions {
        &self.options
    }

    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    pub fn base_uri(&self) -> String {
        format!("http://{}:{}", self.options.hostname, self.options.port)
    }

    pub fn readiness_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_uri(),
            self.options.readiness_path.trim_start_matches('/')
        )
    }

    /// Expanded argument list
    pub fn arguments(&self) -> Vec<String> {
        let router = self
            .options
            .router
            .as_ref()
            .map(|r| r.display().to_string());

        self.options
            .arguments
            .iter()
            .filter(|arg| router.is_some() || arg.as_str() != "{router}")
            .map(|arg| {
                arg.replace("{host}", &self.options.hostname)
                    .replace("{port}", &self.options.port.to_string())
                    .replace("{docroot}", &self.options.document_root.display().to_string())
                    .replace("{router}", router.as_deref().unwrap_or(""))
            })
            .collect()
    }

    /// Start the server unless it already runs
    pub async fn start(&mut self) -> Result<()> {
        if self.is_started() {
            return Ok(());
        }

        let mut command = ProcessCommand::new(&self.runtime).args(self.arguments());
        for (key, value) in &self.options.env {
            command = command.env(key, value);
        }

        let mut process = ManagedProcess::new(
            "web server",
            command,
            self.options.hostname.clone(),
            self.options.port,
            self.readiness_url(),
        )
        .ignore_http_errors(true)
        .startup_timeout(self.options.startup_timeout);

        process.start().await?;
        info!("Web server listening on {}", self.base_uri());
        self.process = Some(process);
        Ok(())
    }

    /// Stop the server. The port may still be held briefly; see
    /// [`WebServerManager::wait_until_port_released`].
    pub async fn quit(&mut self) -> Result<()> {
        if let Some(mut process) = self.process.take() {
            process.stop().await?;
        }
        Ok(())
    }

    pub fn is_started(&mut self) -> bool {
        self.process.as_mut().map(ManagedProcess::is_running).unwrap_or(false)
    }

    pub async fn wait_until_port_released(&self, timeout: Duration) -> Result<()> {
        probe::wait_until_port_available(&self.options.hostname, self.options.port, timeout).await
    }
}

/// Locate the interpreter: an explicit path must exist, a bare name must be on `PATH`
pub fn resolve_runtime(runtime: &str) -> Result<PathBuf> {
    let path = Path::new(runtime);
    if path.is_absolute() || path.components().count() > 1 {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::runtime_unavailable(format!("{} does not exist", runtime)));
    }

    which::which(runtime)
        .map_err(|e| Error::runtime_unavailable(format!("{} not found on PATH: {}", runtime, e)))
}
