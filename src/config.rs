//! Configuration management for Browserkit-Oxide

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Runtime configuration, usually read from `BROWSERKIT_*` variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Web server bind host
    pub web_server_host: String,

    /// Web server port
    pub web_server_port: u16,

    /// Document root served by the web server
    pub web_server_dir: PathBuf,

    /// Optional router / front controller script
    pub web_server_router: Option<PathBuf>,

    /// Interpreter used to run the web server
    pub web_server_runtime: String,

    /// Path probed to decide the web server is up (empty = root)
    pub readiness_path: String,

    /// Value of `APP_ENV` for the web server
    pub app_env: String,

    /// Already running application; no web server is spawned when set
    pub external_base_uri: Option<String>,

    /// `chrome` or `firefox`
    pub browser: String,

    pub headless: bool,
    pub no_sandbox: bool,
    pub reduced_motion: bool,
    pub devtools: bool,

    /// Custom Chrome binary, sent in the capabilities
    pub chrome_binary: Option<PathBuf>,

    /// Custom chromedriver binary
    pub chrome_driver_binary: Option<PathBuf>,

    /// Extra Chrome arguments
    pub chrome_arguments: Vec<String>,

    /// Custom Firefox binary, sent in the capabilities
    pub firefox_binary: Option<PathBuf>,

    /// Custom geckodriver binary
    pub gecko_driver_binary: Option<PathBuf>,

    /// Extra Firefox arguments
    pub firefox_arguments: Vec<String>,

    /// Remote WebDriver endpoint used instead of a local driver
    pub selenium_host: Option<String>,

    /// Readiness bound for spawned processes, in milliseconds
    pub startup_timeout: u64,

    /// Default `wait_for` timeout in milliseconds
    pub wait_timeout: u64,

    /// Default `wait_for` poll interval in milliseconds
    pub wait_interval: u64,

    /// Directory receiving failure screenshots
    pub error_screenshot_dir: Option<PathBuf>,

    /// Print `[[ATTACHMENT|path]]` lines for captured screenshots
    pub error_screenshot_attach: bool,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 9080,
            web_server_dir: PathBuf::from("./public"),
            web_server_router: None,
            web_server_runtime: "php".to_string(),
            readiness_path: String::new(),
            app_env: "test".to_string(),
            external_base_uri: None,
            browser: "chrome".to_string(),
            headless: true,
            no_sandbox: false,
            reduced_motion: true,
            devtools: false,
            chrome_binary: None,
            chrome_driver_binary: None,
            chrome_arguments: Vec::new(),
            firefox_binary: None,
            gecko_driver_binary: None,
            firefox_arguments: Vec::new(),
            selenium_host: None,
            startup_timeout: 30000,
            wait_timeout: 30000,
            wait_interval: 250,
            error_screenshot_dir: None,
            error_screenshot_attach: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, e.g. a fixed map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("BROWSERKIT_WEB_SERVER_HOST") {
            config.web_server_host = host;
        }

        if let Some(port) = lookup("BROWSERKIT_WEB_SERVER_PORT") {
            config.web_server_port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid BROWSERKIT_WEB_SERVER_PORT"))?;
        }

        if let Some(dir) = lookup("BROWSERKIT_WEB_SERVER_DIR") {
            config.web_server_dir = PathBuf::from(dir);
        }

        config.web_server_router = non_empty(lookup("BROWSERKIT_WEB_SERVER_ROUTER")).map(PathBuf::from);

        if let Some(runtime) = non_empty(lookup("BROWSERKIT_WEB_SERVER_RUNTIME")) {
            config.web_server_runtime = runtime;
        }

        if let Some(path) = lookup("BROWSERKIT_READINESS_PATH") {
            config.readiness_path = path;
        }

        if let Some(app_env) = non_empty(lookup("BROWSERKIT_APP_ENV")) {
            config.app_env = app_env;
        }

        config.external_base_uri = non_empty(lookup("BROWSERKIT_EXTERNAL_BASE_URI"));

        if let Some(browser) = non_empty(lookup("BROWSERKIT_BROWSER")) {
            config.browser = browser.to_lowercase();
        }

        if let Some(value) = lookup("BROWSERKIT_NO_HEADLESS") {
            config.headless = !parse_flag("BROWSERKIT_NO_HEADLESS", &value)?;
        }

        if let Some(value) = lookup("BROWSERKIT_NO_SANDBOX") {
            config.no_sandbox = parse_flag("BROWSERKIT_NO_SANDBOX", &value)?;
        }

        if let Some(value) = lookup("BROWSERKIT_NO_REDUCED_MOTION") {
            config.reduced_motion = !parse_flag("BROWSERKIT_NO_REDUCED_MOTION", &value)?;
        }

        if let Some(value) = lookup("BROWSERKIT_DEVTOOLS") {
            config.devtools = parse_flag("BROWSERKIT_DEVTOOLS", &value)?;
        }

        config.chrome_binary = non_empty(lookup("BROWSERKIT_CHROME_BINARY")).map(PathBuf::from);
        config.chrome_driver_binary =
            non_empty(lookup("BROWSERKIT_CHROME_DRIVER_BINARY")).map(PathBuf::from);
        config.chrome_arguments = split_arguments(lookup("BROWSERKIT_CHROME_ARGUMENTS"));

        config.firefox_binary = non_empty(lookup("BROWSERKIT_FIREFOX_BINARY")).map(PathBuf::from);
        config.gecko_driver_binary =
            non_empty(lookup("BROWSERKIT_GECKO_DRIVER_BINARY")).map(PathBuf::from);
        config.firefox_arguments = split_arguments(lookup("BROWSERKIT_FIREFOX_ARGUMENTS"));

        config.selenium_host = non_empty(lookup("BROWSERKIT_SELENIUM_HOST"));

        if let Some(timeout) = lookup("BROWSERKIT_STARTUP_TIMEOUT") {
            config.startup_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid BROWSERKIT_STARTUP_TIMEOUT"))?;
        }

        if let Some(timeout) = lookup("BROWSERKIT_WAIT_TIMEOUT") {
            config.wait_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid BROWSERKIT_WAIT_TIMEOUT"))?;
        }

        if let Some(interval) = lookup("BROWSERKIT_WAIT_INTERVAL") {
            config.wait_interval = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid BROWSERKIT_WAIT_INTERVAL"))?;
        }

        config.error_screenshot_dir =
            non_empty(lookup("BROWSERKIT_ERROR_SCREENSHOT_DIR")).map(PathBuf::from);

        if let Some(value) = lookup("BROWSERKIT_ERROR_SCREENSHOT_ATTACH") {
            config.error_screenshot_attach = parse_flag("BROWSERKIT_ERROR_SCREENSHOT_ATTACH", &value)?;
        }

        if let Some(log_level) = lookup("BROWSERKIT_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Base URI of the application under test
    pub fn base_uri(&self) -> String {
        match &self.external_base_uri {
            Some(uri) => uri.clone(),
            None => format!("http://{}:{}", self.web_server_host, self.web_server_port),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_arguments(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Accepts the usual truthy spellings; an empty value counts as set
fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration(format!("Invalid {}", name))),
    }
}
