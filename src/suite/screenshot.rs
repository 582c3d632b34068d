//! Screenshots taken when a test fails

use chrono::{DateTime, Local};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::client::Client;
use crate::config::Config;

/// Where failure screenshots go; disabled without a directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorScreenshots {
    pub dir: Option<PathBuf>,
    /// Print a `[[ATTACHMENT|path]]` line per screenshot
    pub attach: bool,
}

impl ErrorScreenshots {
    pub fn new<P: Into<PathBuf>>(dir: P, attach: bool) -> Self {
        Self {
            dir: Some(dir.into()),
            attach,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            dir: config.error_screenshot_dir.clone(),
            attach: config.error_screenshot_attach,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// `<dir>/<timestamp>_<type>_<test>-<index>.png`
    pub fn path_for(
        &self,
        taken_at: DateTime<Local>,
        failure_type: &str,
        test_id: &str,
        index: usize,
    ) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        Some(dir.join(format!(
            "{}_{}_{}-{}.png",
            taken_at.format("%Y-%m-%d_%H-%M-%S"),
            sanitize(failure_type),
            sanitize(test_id),
            index
        )))
    }

    /// Screenshot every client; failures are logged and skipped
    pub async fn capture(&self, clients: &[Client], test_id: &str, failure_type: &str) -> Vec<PathBuf> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let taken_at = Local::now();
        let mut saved = Vec::new();
        for (position, client) in clients.iter().enumerate() {
            let Some(path) = self.path_for(taken_at, failure_type, test_id, position + 1) else {
                continue;
            };
            match client.take_screenshot(Some(&path)).await {
                Ok(_) => {
                    info!("Saved failure screenshot {}", path.display());
                    if self.attach {
                        println!("[[ATTACHMENT|{}]]", path.display());
                    }
                    saved.push(path);
                }
                Err(e) => warn!("Could not take a screenshot for {}: {}", test_id, e),
            }
        }
        saved
    }
}

/// Keep file names portable
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' => '-',
            ':' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_path_layout() {
        let screenshots = ErrorScreenshots::new("/tmp/shots", false);
        let taken_at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = screenshots
            .path_for(taken_at, "failure", "tests::login::test_sign in", 2)
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/tmp/shots/2024-03-09_14-05-07_failure_tests__login__test_sign_in-2.png")
        );
    }

    #[test]
    fn test_disabled_without_dir() {
        let screenshots = ErrorScreenshots::from_config(&Config::default());
        assert!(!screenshots.is_enabled());
        assert!(screenshots.path_for(Local::now(), "error", "t", 1).is_none());
    }
}
