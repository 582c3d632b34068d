//! Browser manager trait
//!
//! A browser manager owns whatever backs remote sessions (a local driver
//! process or a remote endpoint) and hands out new sessions.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::webdriver::RemoteSession;

#[async_trait]
pub trait BrowserManager: Send + Sync + std::fmt::Debug {
    /// Start the backing driver if needed, then open a new session.
    ///
    /// Calling it again while running reuses the driver and opens another session.
    async fn start(&mut self) -> Result<Arc<dyn RemoteSession>, crate::Error>;

    /// Stop the backing driver; idempotent
    async fn quit(&mut self) -> Result<(), crate::Error>;

    /// Whether the backing driver is alive
    fn is_running(&mut self) -> bool;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Manager shared by every client created from it
pub type SharedBrowserManager = Arc<Mutex<dyn BrowserManager>>;

/// Wrap a manager for sharing between clients
pub fn shared<M: BrowserManager + 'static>(manager: M) -> SharedBrowserManager {
    Arc::new(Mutex::new(manager))
}
