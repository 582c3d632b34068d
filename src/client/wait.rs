//! Wait conditions polled against the live session

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::webdriver::{Locator, RemoteElement, RemoteSession};
use crate::{Error, Result};

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(250);

/// What a wait expects of the located element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionKind {
    Present,
    Visible,
    Invisible,
    ContainsText(String),
    NotContainsText(String),
    AttributeContains { attribute: String, text: String },
    AttributeNotContains { attribute: String, text: String },
    Enabled,
    Disabled,
    Stale,
}

impl ConditionKind {
    /// Phrase used in the timeout message
    pub fn failure_phrase(&self) -> String {
        match self {
            ConditionKind::Present => "not found".to_string(),
            ConditionKind::Visible => "not visible".to_string(),
            ConditionKind::Invisible => "still visible".to_string(),
            ConditionKind::ContainsText(text) => format!("does not contain \"{}\"", text),
            ConditionKind::NotContainsText(text) => format!("still contains \"{}\"", text),
            ConditionKind::AttributeContains { attribute, text } => {
                format!("attribute \"{}\" does not contain \"{}\"", attribute, text)
            }
            ConditionKind::AttributeNotContains { attribute, text } => {
                format!("attribute \"{}\" still contains \"{}\"", attribute, text)
            }
            ConditionKind::Enabled => "not enabled".to_string(),
            ConditionKind::Disabled => "not disabled".to_string(),
            ConditionKind::Stale => "still attached".to_string(),
        }
    }
}

/// Locator, expectation and bounds of one wait
#[derive(Debug, Clone, PartialEq)]
pub struct WaitCondition {
    pub locator: Locator,
    pub kind: ConditionKind,
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitCondition {
    pub fn new(selector: &str, kind: ConditionKind) -> Self {
        Self {
            locator: Locator::parse(selector),
            kind,
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_WAIT_INTERVAL,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// `Element "<locator>" <phrase> within <n> seconds.`
    pub fn timeout_message(&self) -> String {
        format!(
            "Element \"{}\" {} within {} seconds.",
            self.locator,
            self.kind.failure_phrase(),
            format_seconds(self.timeout)
        )
    }

    /// Poll until the condition holds or the timeout elapses
    pub async fn wait(&self, session: &Arc<dyn RemoteSession>) -> Result<()> {
        let started = Instant::now();

        // Staleness tracks the element found first, not the locator
        let tracked = match self.kind {
            ConditionKind::Stale => match session.find_all(&self.locator).await?.into_iter().next() {
                Some(element) => Some(element),
                None => return Ok(()),
            },
            _ => None,
        };

        loop {
            let satisfied = match &tracked {
                Some(element) => is_detached(element).await?,
                None => self.holds(session).await?,
            };
            if satisfied {
                debug!("{} {:?} after {:?}", self.locator, self.kind, started.elapsed());
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Err(Error::timeout(self.timeout_message()));
            }
            tokio::time::sleep(self.interval.min(self.timeout - elapsed)).await;
        }
    }

    /// One evaluation; elements vanishing mid-check count as "not yet"
    async fn holds(&self, session: &Arc<dyn RemoteSession>) -> Result<bool> {
        match self.evaluate(session).await {
            Ok(satisfied) => Ok(satisfied),
            Err(Error::StaleReference(_)) | Err(Error::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn evaluate(&self, session: &Arc<dyn RemoteSession>) -> Result<bool> {
        let element = session.find_all(&self.locator).await?.into_iter().next();

        if let ConditionKind::Invisible = self.kind {
            return match element {
                Some(element) => Ok(!element.is_displayed().await?),
                None => Ok(true),
            };
        }

        let Some(element) = element else {
            return Ok(false);
        };

        Ok(match &self.kind {
            ConditionKind::Present => true,
            ConditionKind::Visible => element.is_displayed().await?,
            ConditionKind::ContainsText(text) => element.text().await?.contains(text.as_str()),
            ConditionKind::NotContainsText(text) => !element.text().await?.contains(text.as_str()),
            ConditionKind::AttributeContains { attribute, text } => element
                .attr(attribute)
                .await?
                .map(|value| value.contains(text.as_str()))
                .unwrap_or(false),
            ConditionKind::AttributeNotContains { attribute, text } => !element
                .attr(attribute)
                .await?
                .map(|value| value.contains(text.as_str()))
                .unwrap_or(false),
            ConditionKind::Enabled => element.is_enabled().await?,
            ConditionKind::Disabled => !element.is_enabled().await?,
            ConditionKind::Invisible | ConditionKind::Stale => false,
        })
    }
}

async fn is_detached(element: &Arc<dyn RemoteElement>) -> Result<bool> {
    match element.tag_name().await {
        Ok(_) => Ok(false),
        Err(Error::StaleReference(_)) | Err(Error::ElementNotFound(_)) => Ok(true),
        Err(e) => Err(e),
    }
}

/// Whole seconds print without a fraction
pub fn format_seconds(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        duration.as_secs_f64().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let condition = WaitCondition::new("#missing", ConditionKind::Present).timeout(Duration::from_secs(1));
        assert_eq!(condition.timeout_message(), "Element \"#missing\" not found within 1 seconds.");

        let condition = WaitCondition::new("//p", ConditionKind::Visible).timeout(Duration::from_millis(1500));
        assert_eq!(condition.timeout_message(), "Element \"//p\" not visible within 1.5 seconds.");
        assert!(condition.locator.is_xpath());
    }

    #[test]
    fn test_failure_phrases() {
        assert_eq!(
            ConditionKind::ContainsText("Done".to_string()).failure_phrase(),
            "does not contain \"Done\""
        );
        assert_eq!(
            ConditionKind::AttributeNotContains {
                attribute: "class".to_string(),
                text: "busy".to_string()
            }
            .failure_phrase(),
            "attribute \"class\" still contains \"busy\""
        );
        assert_eq!(ConditionKind::Stale.failure_phrase(), "still attached");
    }

    #[test]
    fn test_defaults() {
        let condition = WaitCondition::new("p", ConditionKind::Enabled);
        assert_eq!(condition.timeout, DEFAULT_WAIT_TIMEOUT);
        assert_eq!(condition.interval, DEFAULT_WAIT_INTERVAL);
        assert_eq!(format_seconds(Duration::from_secs(30)), "30");
    }
}
