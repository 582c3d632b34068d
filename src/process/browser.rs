//! Per-browser-family options and capabilities
//!
//! Chrome takes its headless/sandbox switches as plain browser arguments.
//! Firefox exposes headless mode, window size and binary as typed fields that
//! are translated into `moz:firefoxOptions`.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::webdriver::Capabilities;
use crate::{Error, Result};

pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1200, 1100);

/// Chrome options
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChromeOptions {
    /// Custom browser binary, sent as `goog:chromeOptions.binary`
    pub binary: Option<PathBuf>,
    /// Browser command line arguments
    pub arguments: Vec<String>,
}

impl ChromeOptions {
    /// Options with the default arguments derived from `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.chrome_binary.clone(),
            arguments: Self::default_arguments(config),
        }
    }

    /// Replace the default arguments entirely
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_arguments(config: &Config) -> Vec<String> {
        let mut args = Vec::new();

        if config.headless {
            args.push("--headless".to_string());
            args.push(format!("--window-size={},{}", DEFAULT_WINDOW_SIZE.0, DEFAULT_WINDOW_SIZE.1));
            args.push("--disable-gpu".to_string());
        } else if config.devtools {
            args.push("--auto-open-devtools-for-tabs".to_string());
        }

        if config.no_sandbox {
            args.push("--no-sandbox".to_string());
        }

        if config.reduced_motion {
            args.push("--force-prefers-reduced-motion".to_string());
        }

        args.extend(config.chrome_arguments.iter().cloned());
        args
    }

    pub fn capabilities(&self) -> Capabilities {
        let mut chrome = serde_json::Map::new();
        chrome.insert("args".to_string(), json!(self.arguments));
        if let Some(binary) = &self.binary {
            chrome.insert("binary".to_string(), json!(binary.display().to_string()));
        }

        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), Value::Object(chrome));
        caps
    }
}

/// Firefox options
#[derive(Debug, Clone, PartialEq)]
pub struct FirefoxOptions {
    /// Custom browser binary, sent as `moz:firefoxOptions.binary`
    pub binary: Option<PathBuf>,
    pub headless: bool,
    pub window_size: Option<(u32, u32)>,
    pub reduced_motion: bool,
    pub devtools: bool,
    /// Extra arguments appended after the typed ones
    pub arguments: Vec<String>,
}

impl Default for FirefoxOptions {
    fn default() -> Self {
        Self {
            binary: None,
            headless: true,
            window_size: Some(DEFAULT_WINDOW_SIZE),
            reduced_motion: true,
            devtools: false,
            arguments: Vec::new(),
        }
    }
}

impl FirefoxOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.firefox_binary.clone(),
            headless: config.headless,
            window_size: Some(DEFAULT_WINDOW_SIZE),
            reduced_motion: config.reduced_motion,
            devtools: config.devtools,
            arguments: config.firefox_arguments.clone(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless".to_string());
        } else if self.devtools {
            args.push("--devtools".to_string());
        }
        if let Some((width, height)) = self.window_size {
            args.push(format!("--width={}", width));
            args.push(format!("--height={}", height));
        }
        args.extend(self.arguments.iter().cloned());

        let mut firefox = serde_json::Map::new();
        firefox.insert("args".to_string(), json!(args));
        if let Some(binary) = &self.binary {
            firefox.insert("binary".to_string(), json!(binary.display().to_string()));
        }
        if self.reduced_motion {
            firefox.insert("prefs".to_string(), json!({ "ui.prefersReducedMotion": 1 }));
        }

        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), json!("firefox"));
        caps.insert("moz:firefoxOptions".to_string(), Value::Object(firefox));
        caps
    }
}

/// Browser family with its typed options
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserFamily {
    Chrome(ChromeOptions),
    Firefox(FirefoxOptions),
}

impl BrowserFamily {
    /// Family named by `config.browser`
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.browser.as_str() {
            "chrome" | "chromium" => Ok(BrowserFamily::Chrome(ChromeOptions::from_config(config))),
            "firefox" => Ok(BrowserFamily::Firefox(FirefoxOptions::from_config(config))),
            other => Err(Error::configuration(format!("Unsupported browser: {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BrowserFamily::Chrome(_) => "chrome",
            BrowserFamily::Firefox(_) => "firefox",
        }
    }

    pub fn driver_name(&self) -> &'static str {
        match self {
            BrowserFamily::Chrome(_) => "chromedriver",
            BrowserFamily::Firefox(_) => "geckodriver",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            BrowserFamily::Chrome(_) => 9515,
            BrowserFamily::Firefox(_) => 4444,
        }
    }

    /// Driver binary override taken from the configuration
    pub fn driver_binary_override(&self, config: &Config) -> Option<PathBuf> {
        match self {
            BrowserFamily::Chrome(_) => config.chrome_driver_binary.clone(),
            BrowserFamily::Firefox(_) => config.gecko_driver_binary.clone(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            BrowserFamily::Chrome(options) => options.capabilities(),
            BrowserFamily::Firefox(options) => options.capabilities(),
        }
    }
}

/// Driver binary resolution: explicit path, then override, then OS default
pub fn resolve_driver_binary(
    explicit: Option<PathBuf>,
    env_override: Option<PathBuf>,
    driver_name: &str,
) -> PathBuf {
    explicit
        .or(env_override)
        .unwrap_or_else(|| default_driver_binary(driver_name))
}

/// `drivers/<name>` next to the project if present, else `<name>` from `PATH`,
/// else the bare name. A wrong guess surfaces when spawning.
pub fn default_driver_binary(driver_name: &str) -> PathBuf {
    let executable = if cfg!(windows) {
        format!("{}.exe", driver_name)
    } else {
        driver_name.to_string()
    };

    let local = Path::new("drivers").join(&executable);
    if local.exists() {
        return local;
    }

    which::which(&executable).unwrap_or_else(|_| PathBuf::from(executable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_default_arguments() {
        let config = Config {
            no_sandbox: true,
            chrome_arguments: vec!["--lang=fr".to_string()],
            ..Default::default()
        };

        let options = ChromeOptions::from_config(&config);
        assert_eq!(
            options.arguments,
            vec![
                "--headless",
                "--window-size=1200,1100",
                "--disable-gpu",
                "--no-sandbox",
                "--force-prefers-reduced-motion",
                "--lang=fr",
            ]
        );
    }

    #[test]
    fn test_chrome_headed_devtools() {
        let config = Config {
            headless: false,
            devtools: true,
            reduced_motion: false,
            ..Default::default()
        };

        assert_eq!(
            ChromeOptions::default_arguments(&config),
            vec!["--auto-open-devtools-for-tabs"]
        );
    }

    #[test]
    fn test_chrome_explicit_arguments_replace_defaults() {
        let options = ChromeOptions::from_config(&Config::default()).with_arguments(["--incognito"]);
        assert_eq!(options.arguments, vec!["--incognito"]);
    }

    #[test]
    fn test_chrome_capabilities() {
        let options = ChromeOptions {
            binary: Some(PathBuf::from("/opt/chrome/chrome")),
            arguments: vec!["--headless".to_string()],
        };

        let caps = options.capabilities();
        assert_eq!(caps["browserName"], json!("chrome"));
        assert_eq!(caps["goog:chromeOptions"]["args"], json!(["--headless"]));
        assert_eq!(caps["goog:chromeOptions"]["binary"], json!("/opt/chrome/chrome"));
    }

    #[test]
    fn test_firefox_capabilities_translate_typed_fields() {
        let options = FirefoxOptions {
            binary: Some(PathBuf::from("/opt/firefox/firefox")),
            ..Default::default()
        };

        let caps = options.capabilities();
        let firefox = &caps["moz:firefoxOptions"];
        assert_eq!(caps["browserName"], json!("firefox"));
        assert_eq!(firefox["args"], json!(["--headless", "--width=1200", "--height=1100"]));
        assert_eq!(firefox["binary"], json!("/opt/firefox/firefox"));
        assert_eq!(firefox["prefs"]["ui.prefersReducedMotion"], json!(1));
    }

    #[test]
    fn test_family_from_config() {
        let config = Config {
            browser: "firefox".to_string(),
            ..Default::default()
        };
        let family = BrowserFamily::from_config(&config).unwrap();
        assert_eq!(family.name(), "firefox");
        assert_eq!(family.driver_name(), "geckodriver");
        assert_eq!(family.default_port(), 4444);

        let config = Config {
            browser: "opera".to_string(),
            ..Default::default()
        };
        assert!(matches!(BrowserFamily::from_config(&config), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_driver_binary_precedence() {
        let explicit = resolve_driver_binary(
            Some(PathBuf::from("/explicit/chromedriver")),
            Some(PathBuf::from("/env/chromedriver")),
            "chromedriver",
        );
        assert_eq!(explicit, PathBuf::from("/explicit/chromedriver"));

        let from_env = resolve_driver_binary(None, Some(PathBuf::from("/env/chromedriver")), "chromedriver");
        assert_eq!(from_env, PathBuf::from("/env/chromedriver"));

        let default = resolve_driver_binary(None, None, "browserkit-missing-driver");
        assert!(default.ends_with(if cfg!(windows) {
            "browserkit-missing-driver.exe"
        } else {
            "browserkit-missing-driver"
        }));
    }
}
