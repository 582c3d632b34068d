//! Browserkit-Oxide: browser-kit style testing over real browsers
//!
//! This library drives a browser through WebDriver behind a crawler/client API
//! and manages the local processes a test run needs: the browser driver and a
//! development web server for the application under test.

pub mod error;
pub mod config;

pub mod webdriver;
pub mod process;
pub mod dom;
pub mod client;
pub mod suite;

// Re-exports
pub use client::{Client, ClientOptions};
pub use dom::{Crawler, Form, FormValue, Link};
pub use error::{Error, Result};
pub use suite::{LifecycleMode, SuiteContext};

/// Browserkit-Oxide library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
