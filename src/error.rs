//! Unified error types for Browserkit-Oxide

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Browserkit-Oxide
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP errors raised while probing a process
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote WebDriver protocol errors
    #[error("WebDriver error: {0}")]
    WebDriver(String),

    /// Another process already listens on the requested host:port
    #[error("Port in use: {0}")]
    PortInUse(String),

    /// Interpreter or binary could not be located
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// Driver or web server did not become ready within its bound
    #[error("Start timeout: {0}")]
    DriverStartTimeout(String),

    /// Managed process exited while it was expected to run
    #[error("Process exited: {0}")]
    ProcessExited(String),

    /// Wait condition not met in time. Displayed verbatim.
    #[error("{0}")]
    Timeout(String),

    /// Operation meaningless for a browser-backed session
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Element vanished from the live document
    #[error("Stale element reference: {0}")]
    StaleReference(String),

    /// Element not found
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Form field rejected a value
    #[error("Invalid field value: {0}")]
    InvalidFieldValue(String),

    /// Session was quit or its driver stopped
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebDriver error
    pub fn webdriver<S: Into<String>>(msg: S) -> Self {
        Error::WebDriver(msg.into())
    }

    /// Create a new port in use error
    pub fn port_in_use<S: Into<String>>(addr: S) -> Self {
        Error::PortInUse(addr.into())
    }

    /// Create a new runtime unavailable error
    pub fn runtime_unavailable<S: Into<String>>(msg: S) -> Self {
        Error::RuntimeUnavailable(msg.into())
    }

    /// Create a new start timeout error
    pub fn driver_start_timeout<S: Into<String>>(msg: S) -> Self {
        Error::DriverStartTimeout(msg.into())
    }

    /// Create a new process exited error
    pub fn process_exited<S: Into<String>>(msg: S) -> Self {
        Error::ProcessExited(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::UnsupportedOperation(msg.into())
    }

    /// Create a new stale reference error
    pub fn stale_reference<S: Into<String>>(msg: S) -> Self {
        Error::StaleReference(msg.into())
    }

    /// Create a new element not found error
    pub fn element_not_found<S: Into<String>>(msg: S) -> Self {
        Error::ElementNotFound(msg.into())
    }

    /// Create a new invalid field value error
    pub fn invalid_field_value<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFieldValue(msg.into())
    }

    /// Create a new session closed error
    pub fn session_closed<S: Into<String>>(msg: S) -> Self {
        Error::SessionClosed(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Wait conditions that ran out of time. Tests usually treat these as soft failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Contract violations: never retried.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedOperation(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Error::StaleReference(_))
    }
}

impl From<fantoccini::error::CmdError> for Error {
    fn from(err: fantoccini::error::CmdError) -> Self {
        if err.is_no_such_element() {
            return Error::ElementNotFound(err.to_string());
        }
        let message = err.to_string();
        if message.contains("stale element reference") {
            Error::StaleReference(message)
        } else if message.contains("invalid session id") || message.contains("session deleted") {
            Error::SessionClosed(message)
        } else {
            Error::WebDriver(message)
        }
    }
}

impl From<fantoccini::error::NewSessionError> for Error {
    fn from(err: fantoccini::error::NewSessionError) -> Self {
        Error::WebDriver(format!("Failed to create session: {}", err))
    }
}
