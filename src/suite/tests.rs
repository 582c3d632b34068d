//! Suite context tests against the mock driver

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::client::ClientOptions;
use crate::config::Config;
use crate::process::{shared, BrowserManager};
use crate::webdriver::mock::{MockDriverManager, MockSite, MockWebDriver};
use crate::webdriver::{Cookie, RemoteSession};
use crate::{Error, Result};

fn config() -> Config {
    Config {
        external_base_uri: Some("http://localhost".to_string()),
        ..Config::default()
    }
}

fn context(mode: LifecycleMode) -> (SuiteContext, MockDriverManager) {
    let webdriver = MockWebDriver::new(MockSite::new().page("/", "<html><body><h1>Home</h1></body></html>"));
    let manager = MockDriverManager::new(webdriver.clone());
    let context = SuiteContext::new(config(), Arc::new(webdriver))
        .with_mode(mode)
        .with_manager(shared(manager.clone()));
    (context, manager)
}

#[tokio::test]
async fn test_first_client_is_primary() {
    let (mut context, manager) = context(LifecycleMode::PerSuite);
    assert!(context.primary_client().is_none());

    let primary = context.create_client(ClientOptions::default()).await.unwrap();
    let second = context.create_client(ClientOptions::default()).await.unwrap();
    assert_eq!(context.clients().len(), 2);
    assert_eq!(manager.process_starts(), 1);
    assert_eq!(manager.webdriver().session_count(), 2);

    assert_eq!(primary.options().base_uri.as_deref(), Some("http://localhost"));
    let crawler = second.get("/").await.unwrap();
    assert_eq!(crawler.filter("h1").await.unwrap().text().await.unwrap(), "Home");
    assert!(context.primary_client().unwrap().ping().await);
}

#[tokio::test]
async fn test_external_base_uri_skips_web_server() {
    let (mut context, _) = context(LifecycleMode::PerSuite);
    tokio_test::assert_ok!(context.start_web_server().await);
    assert!(!context.is_web_server_started());
}

#[tokio::test]
async fn test_missing_runtime_is_reported() {
    let config = Config {
        web_server_runtime: "/nonexistent/bin/runtime".to_string(),
        ..Config::default()
    };
    let mut context = SuiteContext::new(config, Arc::new(MockWebDriver::default()));
    let result = context.start_web_server().await;
    assert!(matches!(result, Err(Error::RuntimeUnavailable(_))));
}

#[tokio::test]
async fn test_per_suite_end_test_keeps_driver() {
    let (mut context, manager) = context(LifecycleMode::PerSuite);
    let primary = context.create_client(ClientOptions::default()).await.unwrap();
    let second = context.create_client(ClientOptions::default()).await.unwrap();
    primary.get("/").await.unwrap();
    primary.set_cookie(Cookie::new("token", "abc")).await.unwrap();

    context.end_test().await.unwrap();

    assert_eq!(context.clients().len(), 1);
    assert!(!second.ping().await);
    assert!(primary.cookies().await.unwrap().is_empty());
    assert!(manager.webdriver().is_alive());
    assert_eq!(manager.process_starts(), 1);
}

#[tokio::test]
async fn test_per_test_end_test_tears_down() {
    let (mut context, manager) = context(LifecycleMode::PerTest);
    let client = context.create_client(ClientOptions::default()).await.unwrap();
    client.get("/").await.unwrap();

    context.end_test().await.unwrap();
    assert!(context.clients().is_empty());
    assert!(!manager.webdriver().is_alive());

    context.create_client(ClientOptions::default()).await.unwrap();
    assert_eq!(manager.process_starts(), 2);
}

#[tokio::test]
async fn test_failure_screenshots() {
    let dir = tempfile::tempdir().unwrap();
    let (context, _) = context(LifecycleMode::PerSuite);
    let mut context = context.with_screenshots(ErrorScreenshots::new(dir.path(), true));
    context.create_client(ClientOptions::default()).await.unwrap();
    context.create_client(ClientOptions::default()).await.unwrap();

    let saved = context.on_test_failure("login::test_sign_in", "failure").await;
    assert_eq!(saved.len(), 2);
    for (index, path) in saved.iter().enumerate() {
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(&format!("_failure_login__test_sign_in-{}.png", index + 1)), "{}", name);
    }
}

#[tokio::test]
async fn test_failure_screenshots_never_fail() {
    let dir = tempfile::tempdir().unwrap();
    let (context, manager) = context(LifecycleMode::PerSuite);
    let mut context = context.with_screenshots(ErrorScreenshots::new(dir.path(), false));
    context.create_client(ClientOptions::default()).await.unwrap();

    manager.webdriver().shutdown();
    assert!(context.on_test_failure("t", "error").await.is_empty());

    let (context, _) = self::context(LifecycleMode::PerSuite);
    assert!(context.on_test_failure("t", "error").await.is_empty());
}

/// Mock driver whose shutdown always reports an error
#[derive(Debug)]
struct UnstoppableManager(MockDriverManager);

#[async_trait]
impl BrowserManager for UnstoppableManager {
    async fn start(&mut self) -> Result<Arc<dyn RemoteSession>> {
        self.0.start().await
    }

    async fn quit(&mut self) -> Result<()> {
        Err(Error::webdriver("driver refused to stop"))
    }

    fn is_running(&mut self) -> bool {
        self.0.is_running()
    }

    fn name(&self) -> &str {
        "unstoppable"
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_teardown_continues_after_manager_error() {
    use std::os::unix::fs::PermissionsExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let dir = tempfile::tempdir().unwrap();
    let runtime = dir.path().join("runtime");
    std::fs::write(&runtime, "#!/bin/sh\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&runtime, std::fs::Permissions::from_mode(0o755)).unwrap();

    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let responder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
        }
    });

    let config = Config {
        web_server_runtime: runtime.display().to_string(),
        web_server_port: port,
        startup_timeout: 5000,
        ..Config::default()
    };
    let webdriver = MockWebDriver::new(MockSite::new().page("/", "<html><body></body></html>"));
    let manager = UnstoppableManager(MockDriverManager::new(webdriver.clone()));
    let mut context = SuiteContext::new(config, Arc::new(webdriver)).with_manager(shared(manager));

    let client = context.create_client(ClientOptions::default()).await.unwrap();
    assert!(context.is_web_server_started());
    responder.abort();

    let result = context.teardown().await;
    assert!(matches!(result, Err(Error::WebDriver(_))));
    assert!(context.clients().is_empty());
    assert!(!client.ping().await);
    assert!(!context.is_web_server_started());
    tokio_test::assert_ok!(tokio::net::TcpListener::bind(("127.0.0.1", port)).await);
}
